//! Formatting helpers for dashboard output.

use chrono::{DateTime, Utc};

use docdrop_core::{FileStatus, FileStatusPhase};

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count as B, KB, MB or GB (base 1024).
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a ratio in `[0, 1]` as a whole percentage.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", (ratio.clamp(0.0, 1.0) * 100.0).floor())
}

/// Progress column for a status record.
///
/// Uploads show transferred bytes; other phases show their counters, or
/// nothing when the phase reports no progress.
pub fn format_record_progress(record: &FileStatus) -> String {
    let current = record.current_phase_progress;
    let max = record.current_phase_max_progress;
    match record.phase {
        FileStatusPhase::Uploading => {
            format!("{} / {}", format_bytes(current), format_bytes(max))
        }
        FileStatusPhase::Started | FileStatusPhase::Working if max > 0 => {
            format_percent(record.phase_ratio())
        }
        FileStatusPhase::Started
        | FileStatusPhase::Working
        | FileStatusPhase::Success
        | FileStatusPhase::Failed => "-".to_string(),
    }
}

/// Truncate to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Relative age of a timestamp ("just now", "5 mins ago", "3h ago", date).
pub fn format_relative_time(timestamp: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(timestamp);
    if elapsed.num_seconds() < 0 || elapsed.num_days() >= 7 {
        return timestamp.format("%Y-%m-%d").to_string();
    }
    match (elapsed.num_minutes(), elapsed.num_hours(), elapsed.num_days()) {
        (0, _, _) => "just now".to_string(),
        (m, 0, _) => format!("{} mins ago", m),
        (_, h, 0) => format!("{}h ago", h),
        (_, _, d) => format!("{}d ago", d),
    }
}

/// "1 file" / "3 files", "1 entry" / "2 entries".
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        return format!("{} {}", count, noun);
    }
    match noun.strip_suffix('y') {
        Some(stem) if !stem.ends_with(['a', 'e', 'o', 'u']) => format!("{} {}ies", count, stem),
        _ => format!("{} {}s", count, noun),
    }
}
