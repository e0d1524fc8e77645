//! Bounded, prioritized views over the status feed.
//!
//! The [`StatusAggregator`] owns the [`StatusFeed`] and derives every view
//! fresh from it on each call. Nothing is cached.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_VISIBLE;
use crate::feed::{FeedEvent, StatusFeed};
use crate::messages::SummaryMessages;
use crate::status::{FileStatus, FileStatusPhase, Severity, StatusId};

// ============================================================================
// DashboardSnapshot
// ============================================================================

/// Number of records per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCounts {
    pub uploading: usize,
    pub started: usize,
    pub working: usize,
    pub success: usize,
    pub failed: usize,
}

impl PhaseCounts {
    fn tally(records: &[FileStatus]) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.phase {
                FileStatusPhase::Uploading => counts.uploading += 1,
                FileStatusPhase::Started => counts.started += 1,
                FileStatusPhase::Working => counts.working += 1,
                FileStatusPhase::Success => counts.success += 1,
                FileStatusPhase::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Records that are not terminal.
    pub fn not_completed(&self) -> usize {
        self.uploading + self.started + self.working
    }

    /// All records.
    pub fn total(&self) -> usize {
        self.not_completed() + self.success + self.failed
    }
}

/// Serializable point-in-time view of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Primary list (at most `max_visible` records).
    pub visible: Vec<FileStatus>,

    /// Records beyond the primary list.
    pub hidden: Vec<FileStatus>,

    /// Summary line.
    pub summary: String,

    /// Aggregate upload progress in `[0, 1]`.
    pub upload_progress: f64,

    /// Per-phase counts.
    pub counts: PhaseCounts,
}

impl DashboardSnapshot {
    /// Whether every record in the snapshot is terminal.
    pub fn all_terminal(&self) -> bool {
        self.counts.not_completed() == 0
    }
}

// ============================================================================
// StatusAggregator
// ============================================================================

/// Owner of the status feed and source of all dashboard views.
#[derive(Debug, Clone)]
pub struct StatusAggregator {
    feed: StatusFeed,
    max_visible: usize,
    messages: SummaryMessages,
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VISIBLE, SummaryMessages::default())
    }
}

impl StatusAggregator {
    /// Create an aggregator over an empty feed.
    pub fn new(max_visible: usize, messages: SummaryMessages) -> Self {
        Self {
            feed: StatusFeed::new(),
            max_visible,
            messages,
        }
    }

    /// Size of the primary list.
    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    /// The underlying feed.
    pub fn feed(&self) -> &StatusFeed {
        &self.feed
    }

    /// Route a feed event into the owned feed.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        self.feed.apply(event)
    }

    /// Insert a record directly.
    pub fn insert(&mut self, status: FileStatus) -> bool {
        self.feed.insert(status)
    }

    /// At most `max_visible` records, most recent first.
    pub fn visible_statuses(&self) -> &[FileStatus] {
        let records = self.feed.active_records();
        &records[..records.len().min(self.max_visible)]
    }

    /// Records beyond the primary list; empty while fewer than
    /// `max_visible` records exist.
    pub fn hidden_statuses(&self) -> &[FileStatus] {
        let records = self.feed.active_records();
        if records.len() < self.max_visible {
            return &[];
        }
        &records[self.max_visible..]
    }

    /// Records in exactly `phase`, or all records for `None`.
    pub fn statuses_by_phase(&self, phase: Option<FileStatusPhase>) -> Vec<&FileStatus> {
        self.feed.records_in_phase(phase)
    }

    /// Records that are still in flight.
    pub fn not_completed(&self) -> Vec<&FileStatus> {
        self.feed.not_completed()
    }

    /// Summary line: processing, failed and added clauses, zero clauses omitted.
    pub fn summary_text(&self) -> String {
        let counts = PhaseCounts::tally(self.feed.active_records());
        self.messages
            .render(counts.not_completed(), counts.failed, counts.success)
    }

    /// Byte-weighted progress across all uploading records.
    ///
    /// Zero when nothing is uploading.
    pub fn aggregate_upload_progress(&self) -> f64 {
        let (current, max) = self
            .feed
            .active_records()
            .iter()
            .filter(|r| r.phase == FileStatusPhase::Uploading)
            .fold((0u64, 0u64), |(c, m), r| {
                (
                    c.saturating_add(r.current_phase_progress),
                    m.saturating_add(r.current_phase_max_progress),
                )
            });
        current as f64 / max.max(1) as f64
    }

    /// Whether `record` reached Success or Failed.
    pub fn is_terminal(&self, record: &FileStatus) -> bool {
        record.is_terminal()
    }

    /// Display severity for `record`.
    pub fn color_for(&self, record: &FileStatus) -> Severity {
        Severity::for_phase(record.phase)
    }

    /// Remove one record. Idempotent.
    pub fn dismiss(&mut self, id: &StatusId) -> bool {
        let removed = self.feed.dismiss(id);
        if removed {
            tracing::debug!("Dismissed status {}", id);
        }
        removed
    }

    /// Remove all terminal records and return how many were removed.
    pub fn dismiss_completed(&mut self) -> usize {
        let removed = self.feed.dismiss_completed();
        tracing::debug!("Dismissed {} completed status records", removed);
        removed
    }

    /// Capture the current dashboard state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            visible: self.visible_statuses().to_vec(),
            hidden: self.hidden_statuses().to_vec(),
            summary: self.summary_text(),
            upload_progress: self.aggregate_upload_progress(),
            counts: PhaseCounts::tally(self.feed.active_records()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
