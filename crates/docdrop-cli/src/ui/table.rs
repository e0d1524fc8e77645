//! Table rendering with comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `docdrop upload`, `commit`, `replay` | `render_status_table()` |
//! | `docdrop staged` | `render_staged_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use docdrop_core::{DropEntry, FileStatus};

use super::color::terminal_width;
use super::format::{format_bytes, format_record_progress, format_relative_time, truncate_str};
use super::style::Style;

/// Columns other than FILE and MESSAGE take roughly this much space.
const FIXED_COLUMNS_WIDTH: usize = 44;

/// Render status records.
///
/// # Example Output
///
/// ```text
/// STATUS     FILE           PROGRESS          AGE        MESSAGE
/// UPLOADING  scan-01.pdf    1.2 MB / 3.0 MB   just now
/// FAILED     broken.pdf     -                 2 mins ago Unsupported file type
/// ```
pub fn render_status_table(records: &[FileStatus], style: &Style) -> String {
    if records.is_empty() {
        return String::new();
    }

    let text_budget = terminal_width().saturating_sub(FIXED_COLUMNS_WIDTH).max(20);
    let name_width = (text_budget / 2).max(12);
    let message_width = text_budget.saturating_sub(name_width).max(12);

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("STATUS"),
        Cell::new("FILE"),
        Cell::new("PROGRESS").set_alignment(CellAlignment::Right),
        Cell::new("AGE"),
        Cell::new("MESSAGE"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),
    ]);

    for record in records {
        let message = record
            .message
            .as_deref()
            .map(|m| truncate_str(m, message_width))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(style.phase(record.phase)),
            Cell::new(truncate_str(&record.filename, name_width)),
            Cell::new(format_record_progress(record)).set_alignment(CellAlignment::Right),
            Cell::new(format_relative_time(record.created_at)),
            Cell::new(style.severity_text(record.severity(), &message)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the staged sequence with its indices.
///
/// # Example Output
///
/// ```text
/// #  KIND  NAME        SIZE
/// 0  file  page-1.pdf  120.0 KB
/// 1  dir   attachments -
/// ```
pub fn render_staged_table(entries: &[DropEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("KIND"),
        Cell::new("NAME"),
        Cell::new("SIZE").set_alignment(CellAlignment::Right),
        Cell::new("PATH"),
    ]);

    let path_width = terminal_width().saturating_sub(48).max(20);
    for (index, entry) in entries.iter().enumerate() {
        let kind = if entry.is_directory() { "dir" } else { "file" };
        let size = entry
            .size()
            .map(format_bytes)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(index).set_alignment(CellAlignment::Right),
            Cell::new(kind),
            Cell::new(truncate_str(entry.name(), 30)),
            Cell::new(size).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&entry.path().display().to_string(), path_width)),
        ]);
    }

    table.trim_fmt().to_string()
}
