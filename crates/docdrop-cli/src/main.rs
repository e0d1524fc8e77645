//! # docdrop CLI
//!
//! Command-line upload dashboard for a document server.
//!
//! This binary drives `docdrop-core`: it uploads or stages files and renders
//! the status feed. Run `docdrop --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
