//! # docdrop-core
//!
//! **Upload dashboard core** for a document-management server.
//!
//! Files are dropped, then either uploaded right away or staged (and
//! optionally merged into one document on submission). A live feed of
//! per-file status records is aggregated into a bounded, prioritized view.
//!
//! ## Main Types
//!
//! - [`DashboardSession`] – owns all dashboard state and the event channel
//! - [`StatusAggregator`] – bounded views, summary line and progress
//! - [`StagingManager`] – staged sequence, reorder, unstage, commit
//! - [`HttpTransport`] – multipart uploads to the server
//! - [`DropError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`status`] – status records and lifecycle phases
//! - [`feed`] – the status feed and its events
//! - [`aggregator`] – dashboard views
//! - [`staging`] – staging manager and persisted staging state
//! - [`transport`] – upload transport trait and HTTP implementation
//! - [`poller`] – server task polling
//! - [`config`] – configuration
//!
//! ## Example
//!
//! ```ignore
//! use docdrop_core::{feed_channel, DashboardSession, DocdropConfig, DropEntry, HttpTransport};
//! use std::path::Path;
//!
//! let config = DocdropConfig::load_default()?;
//! let (tx, rx) = feed_channel();
//! let transport = HttpTransport::new(&config.server, tx)?;
//! let mut session = DashboardSession::from_config(&config, transport, rx);
//!
//! session.drop_files(vec![DropEntry::from_path(Path::new("scan.pdf"))?])?;
//! session.pump();
//! println!("{}", session.aggregator().summary_text());
//! ```

// Modules
pub mod aggregator;
pub mod config;
pub mod constants;
pub mod drop_entry;
pub mod errors;
pub mod feed;
pub mod messages;
pub mod poller;
pub mod session;
pub mod staging;
pub mod status;
pub mod transport;

// Re-exports for convenience
pub use aggregator::{DashboardSnapshot, PhaseCounts, StatusAggregator};
pub use config::{DashboardConfig, DocdropConfig, PollConfig, ServerConfig, StagingConfig};
pub use constants::{
    DEFAULT_MAX_VISIBLE, DOCDROP_HOME_DIR, GLOBAL_CONFIG_FILENAME, STAGING_FILENAME,
    TASKS_ENDPOINT, UPLOAD_ACCEPTED_MESSAGE, UPLOAD_ENDPOINT, WORKSPACE_STATE_DIR,
};
pub use drop_entry::DropEntry;
pub use errors::DropError;
pub use feed::{parse_feed_line, read_feed_events, ConsumerMessage, FeedEvent, StatusFeed};
pub use messages::{MessageOverrides, SummaryMessages};
pub use poller::{phase_for_task_state, TaskInfo, TaskPoller};
pub use session::{feed_channel, DashboardSession};
pub use staging::{StagingManager, StagingState};
pub use status::{FileStatus, FileStatusPhase, Severity, StatusId};
pub use transport::{
    expand_entries, parse_task_id, plan_units, HttpTransport, UploadFile, UploadTransport,
    UploadUnit,
};
