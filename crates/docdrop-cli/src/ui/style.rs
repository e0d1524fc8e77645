//! Message styling for CLI output.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |
//!
//! Status records are colored by [`Severity`]: in-progress blue, danger red,
//! success green.

use owo_colors::OwoColorize;

use docdrop_core::{FileStatusPhase, Severity};

use super::color::ColorMode;

/// Message type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Operation completed.
    Ok,
    /// Operation failed.
    Err,
    /// Completed with caveats.
    Warn,
    /// Neutral status.
    Info,
    /// Actionable next step.
    Hint,
}

impl MessageType {
    /// Prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Styling interface for CLI output.
///
/// # Example
///
/// ```ignore
/// let style = Style::new(ColorMode::Never);
/// assert_eq!(style.message(MessageType::Ok, "Staged 2 entries"), "[ok] Staged 2 entries");
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    /// Create a Style with an explicit color mode.
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Whether colors are enabled.
    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if !self.colors_enabled() {
            return format!("{} {}", prefix, text);
        }
        let colored = match msg_type {
            MessageType::Ok => prefix.green().to_string(),
            MessageType::Err => prefix.red().to_string(),
            MessageType::Warn => prefix.yellow().to_string(),
            MessageType::Info => prefix.blue().to_string(),
            MessageType::Hint => prefix.cyan().to_string(),
        };
        format!("{} {}", colored, text)
    }

    /// Format an indented detail line following a message.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// Format a section header.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format an error with optional cause and hint lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);
        if let Some(cause) = cause {
            output.push_str(&format!("\n      Cause: {}", cause));
        }
        if let Some(hint) = hint {
            output.push_str(&format!("\n      Hint: {}", hint));
        }
        output
    }

    /// Format a phase label colored by its severity.
    pub fn phase(&self, phase: FileStatusPhase) -> String {
        let label = phase.to_string().to_uppercase();
        if !self.colors_enabled() {
            return label;
        }
        match Severity::for_phase(phase) {
            Severity::InProgress => label.blue().to_string(),
            Severity::Danger => label.red().to_string(),
            Severity::Success => label.green().to_string(),
        }
    }

    /// Format text in the color of `severity`.
    pub fn severity_text(&self, severity: Severity, text: &str) -> String {
        if !self.colors_enabled() {
            return text.to_string();
        }
        match severity {
            Severity::InProgress => text.to_string(),
            Severity::Danger => text.red().to_string(),
            Severity::Success => text.green().to_string(),
        }
    }

    /// Format a file name (cyan).
    pub fn file_name(&self, name: &str) -> String {
        if self.colors_enabled() {
            name.cyan().to_string()
        } else {
            name.to_string()
        }
    }

    /// Format a secondary line (dimmed).
    pub fn dim(&self, text: &str) -> String {
        if self.colors_enabled() {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_no_color() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.message(MessageType::Ok, "Done"), "[ok] Done");
        assert_eq!(style.message(MessageType::Hint, "Try again"), "[hint] Try again");
    }

    #[test]
    fn test_message_with_color_keeps_text() {
        let style = Style::new(ColorMode::Always);
        let out = style.message(MessageType::Err, "Broken");
        assert!(out.contains("[err]"));
        assert!(out.ends_with("Broken"));
        assert_ne!(out, "[err] Broken");
    }

    #[test]
    fn test_error_with_context() {
        let style = Style::new(ColorMode::Never);
        let out = style.error_with_context("Upload failed", Some("HTTP 413"), Some("Split the file"));
        assert_eq!(
            out,
            "[err] Upload failed\n      Cause: HTTP 413\n      Hint: Split the file"
        );
    }

    #[test]
    fn test_phase_label() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.phase(FileStatusPhase::Working), "WORKING");
        assert_eq!(style.phase(FileStatusPhase::Failed), "FAILED");
    }

    #[test]
    fn test_detail_indent() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.message_detail("Task", "t-1"), "     Task: t-1");
    }
}
