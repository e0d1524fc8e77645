//! Error types for docdrop-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for docdrop operations.
#[derive(Error, Debug)]
pub enum DropError {
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidConfig(String),

    /// A configuration value is invalid.
    ///
    /// Used for validation errors detected after parsing (e.g., `maxVisible: 0`).
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// A staging index was outside the staged sequence.
    #[error("Staged index {index} is out of range (staged entries: {len})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the staged sequence at the time of the call.
        len: usize,
    },

    /// Nothing is staged, so there is nothing to submit.
    #[error("No staged files to upload. Run `docdrop stage <paths>` first.")]
    EmptyStaging,

    /// A path or file was not found.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Staging I/O error.
    #[error("Staging IO error: {0}")]
    StagingIo(String),

    /// Staging parse error.
    #[error("Staging parse error: {0}")]
    StagingParse(String),

    /// A feed event could not be decoded.
    #[error("Feed parse error at line {line}: {message}")]
    FeedParse {
        /// 1-based line number in the event source.
        line: usize,
        /// Description of the parse failure.
        message: String,
    },

    /// Failed to read a recorded feed.
    #[error("Feed I/O error at `{path}`: {message}")]
    FeedIo {
        /// Path to the feed file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The upload transport could not be set up or a request failed.
    #[error("Upload transport error: {0}")]
    Transport(String),

    /// The document server rejected a request.
    #[error("Server responded with {status} for {url}")]
    ServerStatus {
        /// HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
