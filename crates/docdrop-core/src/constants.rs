//! Common constants used throughout docdrop-core.
//!
//! Centralizes file names, endpoint paths and dashboard defaults.

// ============================================================================
// Directory and file names
// ============================================================================

/// The name of the global docdrop configuration directory.
///
/// Located at `~/.docdrop/` on Unix-like systems.
pub const DOCDROP_HOME_DIR: &str = ".docdrop";

/// Global configuration file name inside [`DOCDROP_HOME_DIR`].
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// Per-workspace state directory (holds the persisted staging area).
pub const WORKSPACE_STATE_DIR: &str = ".docdrop";

/// Persisted staging file inside [`WORKSPACE_STATE_DIR`].
pub const STAGING_FILENAME: &str = "staging.json";

// ============================================================================
// Dashboard defaults
// ============================================================================

/// Number of status records shown in the primary dashboard list.
pub const DEFAULT_MAX_VISIBLE: usize = 5;

/// Default locale for the summary message catalog.
pub const DEFAULT_LOCALE: &str = "en";

// ============================================================================
// Server endpoints
// ============================================================================

/// Default document server URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Endpoint that accepts document uploads (multipart `document` parts).
pub const UPLOAD_ENDPOINT: &str = "/api/documents/post_document/";

/// Endpoint used to poll server-side consumption tasks.
pub const TASKS_ENDPOINT: &str = "/api/tasks/";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default task poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default upper bound on how long the CLI watches a submission.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 300;

/// Message attached to a record once the server accepted the upload.
pub const UPLOAD_ACCEPTED_MESSAGE: &str = "Upload complete, waiting...";
