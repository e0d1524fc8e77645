//! Live progress display while watching uploads.
//!
//! Uses `indicatif`. Nothing is drawn when stdout is not a TTY, with
//! `--quiet`, or with `--json`.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Resolution of the aggregate upload bar.
pub const BAR_SCALE: u64 = 1_000;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const BAR_CHARS: &str = "█░";

/// How progress feedback is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Animated bar on a TTY.
    Interactive,
    /// Final results only.
    Quiet,
    /// No human output at all (JSON).
    Silent,
}

impl ProgressMode {
    /// Pick a mode from flags and the terminal.
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    /// Whether animated output is shown.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Spinner or bar wrapping an indicatif progress bar.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Spinner for waiting on the server.
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        if !mode.is_interactive() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(SPINNER_CHARS);
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// Bar for the aggregate upload ratio, scaled to [`BAR_SCALE`].
    pub fn upload_bar(mode: ProgressMode) -> Self {
        if !mode.is_interactive() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(BAR_SCALE);
        let style = ProgressStyle::default_bar()
            .template("[{bar:24.cyan/dim}] {percent:>3}% {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(BAR_CHARS);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Set the bar from a ratio in `[0, 1]`.
    pub fn set_ratio(&self, ratio: f64) {
        let pos = (ratio.clamp(0.0, 1.0) * BAR_SCALE as f64).round() as u64;
        self.bar.set_position(pos);
    }

    /// Replace the trailing message.
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Remove the line from the terminal.
    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json_is_silent() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, true), ProgressMode::Silent);
    }

    #[test]
    fn test_detect_quiet() {
        assert_eq!(ProgressMode::detect(true, false), ProgressMode::Quiet);
    }

    #[test]
    fn test_hidden_bar_accepts_updates() {
        let progress = Progress::upload_bar(ProgressMode::Quiet);
        progress.set_ratio(0.5);
        progress.set_message("Processing: 1");
        progress.finish_clear();
    }
}
