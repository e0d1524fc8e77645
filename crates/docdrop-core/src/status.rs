//! Per-file status records and their lifecycle phases.
//!
//! A [`FileStatus`] follows one file from the moment it enters the upload
//! transport until the server finished consuming it (or failed to).
//!
//! ## Key Types
//!
//! - [`FileStatusPhase`] - Ordered lifecycle phase
//! - [`StatusId`] - Unique identifier of a status record
//! - [`FileStatus`] - The record itself
//! - [`Severity`] - Display severity derived from the phase

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// FileStatusPhase
// ============================================================================

/// Lifecycle phase of a file, ordered by progression.
///
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatusPhase {
    /// Bytes are being sent to the server.
    Uploading,
    /// The server accepted the file and queued it for consumption.
    Started,
    /// The server is consuming the file.
    Working,
    /// The document was added.
    Success,
    /// Upload or consumption failed.
    Failed,
}

impl FileStatusPhase {
    /// All phases in lifecycle order.
    pub const ALL: [FileStatusPhase; 5] = [
        Self::Uploading,
        Self::Started,
        Self::Working,
        Self::Success,
        Self::Failed,
    ];

    /// Whether no further transitions are expected.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Success | Self::Failed => true,
            Self::Uploading | Self::Started | Self::Working => false,
        }
    }
}

impl fmt::Display for FileStatusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploading => write!(f, "uploading"),
            Self::Started => write!(f, "started"),
            Self::Working => write!(f, "working"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for FileStatusPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(Self::Uploading),
            "started" | "starting" => Ok(Self::Started),
            "working" => Ok(Self::Working),
            "success" => Ok(Self::Success),
            "failed" | "failure" => Ok(Self::Failed),
            _ => Err(format!(
                "Unknown phase: '{}'. Use uploading, started, working, success or failed.",
                s
            )),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Semantic severity tag used to color a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Still moving through the pipeline.
    InProgress,
    /// Failed.
    Danger,
    /// Added successfully.
    Success,
}

impl Severity {
    /// Map a phase to its severity.
    ///
    /// The match is exhaustive: adding a phase forces a decision here.
    pub fn for_phase(phase: FileStatusPhase) -> Self {
        match phase {
            FileStatusPhase::Uploading | FileStatusPhase::Started | FileStatusPhase::Working => {
                Self::InProgress
            }
            FileStatusPhase::Failed => Self::Danger,
            FileStatusPhase::Success => Self::Success,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in-progress"),
            Self::Danger => write!(f, "danger"),
            Self::Success => write!(f, "success"),
        }
    }
}

// ============================================================================
// StatusId
// ============================================================================

/// Unique identifier of a status record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(pub String);

impl StatusId {
    /// Generate a new unique status ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a StatusId from a string without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FileStatus
// ============================================================================

/// One file's journey through upload and server-side processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Record identity.
    pub id: StatusId,

    /// Display name (usually the filename).
    pub filename: String,

    /// Current lifecycle phase.
    pub phase: FileStatusPhase,

    /// Progress within the current phase.
    pub current_phase_progress: u64,

    /// Maximum progress within the current phase.
    pub current_phase_max_progress: u64,

    /// Error text for failed records, informational text otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Server task id, known once the upload was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Id of the created document on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<u64>,

    /// When the record entered the feed.
    pub created_at: DateTime<Utc>,
}

impl FileStatus {
    /// Create a record for a file that is about to be uploaded.
    pub fn new_upload(filename: impl Into<String>) -> Self {
        Self::with_phase(filename, FileStatusPhase::Uploading)
    }

    /// Create a record in an arbitrary starting phase.
    pub fn with_phase(filename: impl Into<String>, phase: FileStatusPhase) -> Self {
        Self {
            id: StatusId::generate(),
            filename: filename.into(),
            phase,
            current_phase_progress: 0,
            current_phase_max_progress: 0,
            message: None,
            task_id: None,
            document_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the record reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Severity used to color this record.
    pub fn severity(&self) -> Severity {
        Severity::for_phase(self.phase)
    }

    /// Apply a phase/progress update.
    ///
    /// Updates are ignored once the record is terminal, and updates whose
    /// phase orders before the current phase are ignored. Progress is
    /// clamped to `max`. Returns `true` if the record changed.
    pub fn update_progress(&mut self, phase: FileStatusPhase, current: u64, max: u64) -> bool {
        if self.is_terminal() || phase < self.phase {
            return false;
        }
        let current = current.min(max);
        let changed = self.phase != phase
            || self.current_phase_progress != current
            || self.current_phase_max_progress != max;
        self.phase = phase;
        self.current_phase_progress = current;
        self.current_phase_max_progress = max;
        changed
    }

    /// Mark the record as failed with an error message.
    ///
    /// Returns `false` if the record was already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase = FileStatusPhase::Failed;
        self.message = Some(message.into());
        true
    }

    /// Fraction of the current phase completed, in `[0, 1]`.
    pub fn phase_ratio(&self) -> f64 {
        self.current_phase_progress as f64 / self.current_phase_max_progress.max(1) as f64
    }
}

// ============================================================================
// Tests
// ============================================================================
