//! The status feed: authoritative list of [`FileStatus`] records.
//!
//! The feed is an explicitly owned state object. Producers (the upload
//! transport, the task poller, a recorded event file) never touch it
//! directly; they emit [`FeedEvent`]s which the owning thread applies in
//! delivery order via [`StatusFeed::apply`].
//!
//! Records are kept most-recent-first: new records are inserted at the front.
//!
//! ## Recorded feeds
//!
//! A feed can be replayed from a JSONL file, one [`FeedEvent`] per line:
//!
//! ```text
//! {"type":"uploadRegistered","id":"a","filename":"scan.pdf","totalBytes":1024}
//! {"type":"uploadProgress","id":"a","loaded":512,"total":1024}
//! {"type":"consumer","taskId":"t-1","filename":"scan.pdf","status":"SUCCESS","currentProgress":100,"maxProgress":100}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::UPLOAD_ACCEPTED_MESSAGE;
use crate::errors::DropError;
use crate::status::{FileStatus, FileStatusPhase, StatusId};

// ============================================================================
// FeedEvent
// ============================================================================

/// Server-side consumer status message.
///
/// Mirrors the payload the document server pushes while it consumes a file.
/// `status` accepts the server spellings `STARTING` and `FAILURE` as well as
/// the phase names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerMessage {
    /// Name of the consumed file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Server task id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Phase reported by the server.
    #[serde(deserialize_with = "deserialize_phase")]
    pub status: FileStatusPhase,

    /// Progress within the reported phase.
    #[serde(default)]
    pub current_progress: u64,

    /// Maximum progress within the reported phase.
    #[serde(default)]
    pub max_progress: u64,

    /// Human-readable message (error text on failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Created document id on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<u64>,
}

fn deserialize_phase<'de, D>(deserializer: D) -> Result<FileStatusPhase, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// An event delivered into the status feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedEvent {
    /// A file entered the upload transport.
    #[serde(rename_all = "camelCase")]
    UploadRegistered {
        /// Record id chosen by the transport.
        id: StatusId,
        /// Display name.
        filename: String,
        /// Size of the request body, if known.
        #[serde(default)]
        total_bytes: u64,
    },

    /// Upload byte progress.
    #[serde(rename_all = "camelCase")]
    UploadProgress {
        /// Record id.
        id: StatusId,
        /// Bytes sent so far.
        loaded: u64,
        /// Total bytes.
        total: u64,
    },

    /// The server accepted the upload and queued a consumption task.
    #[serde(rename_all = "camelCase")]
    UploadAccepted {
        /// Record id.
        id: StatusId,
        /// Server task id.
        task_id: String,
    },

    /// The upload request failed.
    #[serde(rename_all = "camelCase")]
    UploadFailed {
        /// Record id.
        id: StatusId,
        /// Error text.
        message: String,
    },

    /// Server-side consumer progress.
    Consumer(ConsumerMessage),
}

// ============================================================================
// StatusFeed
// ============================================================================

/// Owned, in-memory list of status records (most recent first).
#[derive(Debug, Default, Clone)]
pub struct StatusFeed {
    records: Vec<FileStatus>,
}

impl StatusFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of all active records, most recent first.
    pub fn active_records(&self) -> &[FileStatus] {
        &self.records
    }

    /// Number of active records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the feed holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id.
    pub fn get(&self, id: &StatusId) -> Option<&FileStatus> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Insert a record at the front of the feed.
    ///
    /// A record whose id is already present is ignored.
    pub fn insert(&mut self, status: FileStatus) -> bool {
        if self.get(&status.id).is_some() {
            tracing::warn!("Ignoring duplicate status record {}", status.id);
            return false;
        }
        self.records.insert(0, status);
        true
    }

    /// Records whose phase equals `phase`; all records when `None`.
    pub fn records_in_phase(&self, phase: Option<FileStatusPhase>) -> Vec<&FileStatus> {
        self.records
            .iter()
            .filter(|r| phase.map_or(true, |p| r.phase == p))
            .collect()
    }

    /// Records that have not reached a terminal phase.
    pub fn not_completed(&self) -> Vec<&FileStatus> {
        self.records.iter().filter(|r| !r.is_terminal()).collect()
    }

    /// Remove one record by identity. Returns `false` if it was absent.
    pub fn dismiss(&mut self, id: &StatusId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        before != self.records.len()
    }

    /// Remove every terminal record. Returns the number removed.
    pub fn dismiss_completed(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !r.is_terminal());
        before - self.records.len()
    }

    /// Apply one feed event. Returns `true` if any record changed.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::UploadRegistered {
                id,
                filename,
                total_bytes,
            } => {
                let mut status = FileStatus::new_upload(filename);
                status.id = id;
                status.current_phase_max_progress = total_bytes;
                self.insert(status)
            }
            FeedEvent::UploadProgress { id, loaded, total } => match self.get_mut(&id) {
                Some(record) => record.update_progress(FileStatusPhase::Uploading, loaded, total),
                None => {
                    tracing::warn!("Upload progress for unknown record {}", id);
                    false
                }
            },
            FeedEvent::UploadAccepted { id, task_id } => match self.get_mut(&id) {
                Some(record) => {
                    if record.is_terminal() {
                        return false;
                    }
                    let mut changed = false;
                    if record.task_id.is_none() {
                        record.task_id = Some(task_id);
                        changed = true;
                    }
                    // The consumer may already have moved the record past Started.
                    if record.update_progress(FileStatusPhase::Started, 0, 0) {
                        record.message = Some(UPLOAD_ACCEPTED_MESSAGE.to_string());
                        changed = true;
                    }
                    changed
                }
                None => {
                    tracing::warn!("Upload accepted for unknown record {}", id);
                    false
                }
            },
            FeedEvent::UploadFailed { id, message } => match self.get_mut(&id) {
                Some(record) => record.fail(message),
                None => {
                    tracing::warn!("Upload failure for unknown record {}", id);
                    false
                }
            },
            FeedEvent::Consumer(message) => self.apply_consumer(message),
        }
    }

    fn get_mut(&mut self, id: &StatusId) -> Option<&mut FileStatus> {
        self.records.iter_mut().find(|r| &r.id == id)
    }

    /// Locate the record a consumer message refers to.
    ///
    /// Task id wins; otherwise the first in-flight record with the same
    /// filename that has no task id yet.
    fn find_consumer_target(&self, task_id: Option<&str>, filename: Option<&str>) -> Option<usize> {
        if let Some(task_id) = task_id {
            if let Some(idx) = self
                .records
                .iter()
                .position(|r| r.task_id.as_deref() == Some(task_id))
            {
                return Some(idx);
            }
        }
        let filename = filename?;
        self.records
            .iter()
            .position(|r| r.task_id.is_none() && !r.is_terminal() && r.filename == filename)
    }

    fn apply_consumer(&mut self, message: ConsumerMessage) -> bool {
        let target =
            self.find_consumer_target(message.task_id.as_deref(), message.filename.as_deref());
        let (idx, inserted) = match target {
            Some(idx) => (idx, false),
            None => {
                // Files uploaded by other clients show up here as well. The
                // record starts at the first phase and takes the message below.
                let filename = message
                    .filename
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::debug!("Consumer message for untracked file {}", filename);
                self.records.insert(0, FileStatus::new_upload(filename));
                (0, true)
            }
        };

        let record = &mut self.records[idx];
        if record.is_terminal() {
            return false;
        }
        if record.task_id.is_none() {
            record.task_id = message.task_id;
        }
        let changed =
            record.update_progress(message.status, message.current_progress, message.max_progress);
        if changed || inserted {
            if message.message.is_some() {
                record.message = message.message;
            }
            if message.document_id.is_some() {
                record.document_id = message.document_id;
            }
            tracing::debug!(
                "Status {} ({}) -> {}",
                record.filename,
                record.id,
                record.phase
            );
        }
        changed || inserted
    }
}

// ============================================================================
// Recorded feeds
// ============================================================================

/// Parse one JSONL line into a feed event.
pub fn parse_feed_line(line: &str, line_num: usize) -> Result<FeedEvent, DropError> {
    serde_json::from_str(line).map_err(|e| DropError::FeedParse {
        line: line_num,
        message: e.to_string(),
    })
}

/// Read a recorded feed (JSONL, one event per line; blank lines skipped).
pub fn read_feed_events(path: &Path) -> Result<Vec<FeedEvent>, DropError> {
    let file = File::open(path).map_err(|e| DropError::FeedIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut events = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| DropError::FeedIo {
            path: path.to_path_buf(),
            message: format!("Failed to read line {}: {}", idx + 1, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(parse_feed_line(&line, idx + 1)?);
    }
    Ok(events)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registered(id: &str, filename: &str) -> FeedEvent {
        FeedEvent::UploadRegistered {
            id: StatusId::new(id),
            filename: filename.to_string(),
            total_bytes: 100,
        }
    }

    fn consumer(task_id: Option<&str>, filename: &str, status: FileStatusPhase) -> FeedEvent {
        FeedEvent::Consumer(ConsumerMessage {
            filename: Some(filename.to_string()),
            task_id: task_id.map(str::to_string),
            status,
            current_progress: 0,
            max_progress: 0,
            message: None,
            document_id: None,
        })
    }

    #[test]
    fn test_new_records_are_most_recent_first() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(registered("b", "b.pdf"));
        let names: Vec<_> = feed.active_records().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let mut feed = StatusFeed::new();
        assert!(feed.apply(registered("a", "a.pdf")));
        assert!(!feed.apply(registered("a", "other.pdf")));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_upload_progress_updates_record() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(FeedEvent::UploadProgress {
            id: StatusId::new("a"),
            loaded: 40,
            total: 100,
        });
        let record = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(record.current_phase_progress, 40);
        assert_eq!(record.phase, FileStatusPhase::Uploading);
    }

    #[test]
    fn test_upload_accepted_moves_to_started() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(FeedEvent::UploadAccepted {
            id: StatusId::new("a"),
            task_id: "t-1".to_string(),
        });
        let record = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(record.phase, FileStatusPhase::Started);
        assert_eq!(record.task_id.as_deref(), Some("t-1"));
        assert_eq!(record.message.as_deref(), Some(UPLOAD_ACCEPTED_MESSAGE));
    }

    #[test]
    fn test_upload_failed_keeps_message() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(FeedEvent::UploadFailed {
            id: StatusId::new("a"),
            message: "HTTP 413".to_string(),
        });
        let record = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(record.phase, FileStatusPhase::Failed);
        assert_eq!(record.message.as_deref(), Some("HTTP 413"));
    }

    #[test]
    fn test_consumer_matches_by_task_id_first() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "same.pdf"));
        feed.apply(registered("b", "same.pdf"));
        feed.apply(FeedEvent::UploadAccepted {
            id: StatusId::new("a"),
            task_id: "t-a".to_string(),
        });
        feed.apply(consumer(Some("t-a"), "same.pdf", FileStatusPhase::Working));

        assert_eq!(
            feed.get(&StatusId::new("a")).unwrap().phase,
            FileStatusPhase::Working
        );
        assert_eq!(
            feed.get(&StatusId::new("b")).unwrap().phase,
            FileStatusPhase::Uploading
        );
    }

    #[test]
    fn test_consumer_falls_back_to_filename() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "scan.pdf"));
        feed.apply(consumer(Some("t-9"), "scan.pdf", FileStatusPhase::Working));
        let record = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(record.phase, FileStatusPhase::Working);
        assert_eq!(record.task_id.as_deref(), Some("t-9"));
    }

    #[test]
    fn test_consumer_for_unknown_file_creates_record() {
        let mut feed = StatusFeed::new();
        feed.apply(consumer(Some("t-1"), "remote.pdf", FileStatusPhase::Started));
        assert_eq!(feed.len(), 1);
        let record = &feed.active_records()[0];
        assert_eq!(record.filename, "remote.pdf");
        assert_eq!(record.phase, FileStatusPhase::Started);
    }

    #[test]
    fn test_consumer_cannot_revive_terminal_record() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(FeedEvent::UploadAccepted {
            id: StatusId::new("a"),
            task_id: "t".to_string(),
        });
        feed.apply(consumer(Some("t"), "a.pdf", FileStatusPhase::Success));
        assert!(!feed.apply(consumer(Some("t"), "a.pdf", FileStatusPhase::Working)));
        assert_eq!(
            feed.get(&StatusId::new("a")).unwrap().phase,
            FileStatusPhase::Success
        );
    }

    #[test]
    fn test_untracked_failure_keeps_details() {
        let mut feed = StatusFeed::new();
        let changed = feed.apply(FeedEvent::Consumer(ConsumerMessage {
            filename: Some("remote.pdf".to_string()),
            task_id: Some("t-1".to_string()),
            status: FileStatusPhase::Failed,
            current_progress: 0,
            max_progress: 0,
            message: Some("Not a PDF".to_string()),
            document_id: None,
        }));

        assert!(changed);
        let record = &feed.active_records()[0];
        assert_eq!(record.phase, FileStatusPhase::Failed);
        assert_eq!(record.message.as_deref(), Some("Not a PDF"));
        assert_eq!(record.task_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_untracked_success_keeps_details() {
        let mut feed = StatusFeed::new();
        let changed = feed.apply(FeedEvent::Consumer(ConsumerMessage {
            filename: Some("remote.pdf".to_string()),
            task_id: Some("t-2".to_string()),
            status: FileStatusPhase::Success,
            current_progress: 100,
            max_progress: 100,
            message: None,
            document_id: Some(42),
        }));

        assert!(changed);
        let record = &feed.active_records()[0];
        assert_eq!(record.phase, FileStatusPhase::Success);
        assert_eq!(record.document_id, Some(42));
        assert_eq!(record.task_id.as_deref(), Some("t-2"));
        assert_eq!(record.current_phase_progress, 100);
        assert_eq!(record.current_phase_max_progress, 100);
    }

    #[test]
    fn test_untracked_message_without_progress_still_counts() {
        let mut feed = StatusFeed::new();
        assert!(feed.apply(consumer(Some("t-3"), "remote.pdf", FileStatusPhase::Uploading)));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_consumer_skips_failed_record_with_same_name() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "scan.pdf"));
        feed.apply(FeedEvent::UploadFailed {
            id: StatusId::new("a"),
            message: "HTTP 500".to_string(),
        });

        assert!(feed.apply(consumer(Some("t-9"), "scan.pdf", FileStatusPhase::Working)));
        assert_eq!(feed.len(), 2);
        let newest = &feed.active_records()[0];
        assert_eq!(newest.phase, FileStatusPhase::Working);
        assert_eq!(newest.task_id.as_deref(), Some("t-9"));

        let failed = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(failed.phase, FileStatusPhase::Failed);
        assert_eq!(failed.message.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_late_accept_keeps_consumer_progress() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "scan.pdf"));
        feed.apply(FeedEvent::Consumer(ConsumerMessage {
            filename: Some("scan.pdf".to_string()),
            task_id: Some("t-1".to_string()),
            status: FileStatusPhase::Working,
            current_progress: 30,
            max_progress: 100,
            message: Some("Parsing document".to_string()),
            document_id: None,
        }));

        let changed = feed.apply(FeedEvent::UploadAccepted {
            id: StatusId::new("a"),
            task_id: "t-1".to_string(),
        });

        assert!(!changed);
        let record = feed.get(&StatusId::new("a")).unwrap();
        assert_eq!(record.phase, FileStatusPhase::Working);
        assert_eq!(record.current_phase_progress, 30);
        assert_eq!(record.message.as_deref(), Some("Parsing document"));
    }

    #[test]
    fn test_dismiss_is_idempotent() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        assert!(feed.dismiss(&StatusId::new("a")));
        assert!(!feed.dismiss(&StatusId::new("a")));
        assert!(feed.is_empty());
    }

    #[test]
    fn test_records_in_phase() {
        let mut feed = StatusFeed::new();
        feed.apply(registered("a", "a.pdf"));
        feed.apply(registered("b", "b.pdf"));
        feed.apply(FeedEvent::UploadFailed {
            id: StatusId::new("b"),
            message: "boom".to_string(),
        });
        assert_eq!(feed.records_in_phase(Some(FileStatusPhase::Failed)).len(), 1);
        assert_eq!(feed.records_in_phase(Some(FileStatusPhase::Uploading)).len(), 1);
        assert_eq!(feed.records_in_phase(None).len(), 2);
        assert_eq!(feed.not_completed().len(), 1);
    }

    #[test]
    fn test_consumer_message_accepts_server_spelling() {
        let json = r#"{"type":"consumer","taskId":"t","filename":"x.pdf","status":"STARTING","currentProgress":0,"maxProgress":100}"#;
        let event = parse_feed_line(json, 1).unwrap();
        match event {
            FeedEvent::Consumer(msg) => assert_eq!(msg.status, FileStatusPhase::Started),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_feed_line_error_reports_line() {
        let err = parse_feed_line("{not json", 7).unwrap_err();
        match err {
            DropError::FeedParse { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_read_feed_events_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"type":"uploadRegistered","id":"a","filename":"a.pdf","totalBytes":10}"#,
                "\n\n",
                r#"{"type":"uploadProgress","id":"a","loaded":5,"total":10}"#,
                "\n"
            ),
        )
        .unwrap();

        let events = read_feed_events(&path).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_read_feed_events_missing_file() {
        let err = read_feed_events(Path::new("/nonexistent/events.jsonl")).unwrap_err();
        assert!(matches!(err, DropError::FeedIo { .. }));
    }
}
