//! # CLI UI Module
//!
//! Styling and formatting layer for docdrop output.
//!
//! ## Design Principles
//!
//! 1. **Scannable**: failed uploads stand out at a glance
//! 2. **Bounded**: the dashboard never grows past its visible limit
//! 3. **Accessible**: works without colors (respects `NO_COLOR`)
//! 4. **Scriptable**: machine-readable with `--json`
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal width
//! - `style`: Message prefixes and severity coloring
//! - `format`: Bytes, percentages, relative time, truncation
//! - `table`: Dashboard and staging tables (comfy-table)
//! - `progress`: Aggregate upload progress bar (indicatif)

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};
