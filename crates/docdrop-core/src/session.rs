//! One dashboard session: the owner of all dashboard state.
//!
//! A [`DashboardSession`] owns the [`StatusAggregator`] (and through it the
//! status feed), the [`StagingManager`] and the receiving end of the feed
//! channel. Collaborators running on other threads only hold a
//! `Sender<FeedEvent>`; the owning thread applies their events in delivery
//! order whenever it calls [`pump`](DashboardSession::pump).

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use crate::aggregator::{DashboardSnapshot, StatusAggregator};
use crate::config::{DocdropConfig, PollConfig};
use crate::drop_entry::DropEntry;
use crate::errors::DropError;
use crate::feed::FeedEvent;
use crate::poller::TaskPoller;
use crate::staging::StagingManager;
use crate::transport::UploadTransport;

/// Create the channel collaborators report into.
pub fn feed_channel() -> (Sender<FeedEvent>, Receiver<FeedEvent>) {
    mpsc::channel()
}

/// Dashboard state plus the inbound event channel.
pub struct DashboardSession<T> {
    aggregator: StatusAggregator,
    staging: StagingManager<T>,
    events: Receiver<FeedEvent>,
}

impl<T: UploadTransport> DashboardSession<T> {
    /// Assemble a session from its parts.
    pub fn new(
        aggregator: StatusAggregator,
        staging: StagingManager<T>,
        events: Receiver<FeedEvent>,
    ) -> Self {
        Self {
            aggregator,
            staging,
            events,
        }
    }

    /// Build a session from configuration with an empty staging area.
    pub fn from_config(config: &DocdropConfig, transport: T, events: Receiver<FeedEvent>) -> Self {
        let aggregator =
            StatusAggregator::new(config.dashboard.max_visible, config.summary_messages());
        let staging = StagingManager::new(transport, config.staging.merge_staged_files);
        Self::new(aggregator, staging, events)
    }

    /// The aggregator.
    pub fn aggregator(&self) -> &StatusAggregator {
        &self.aggregator
    }

    /// The aggregator, mutably (for dismissals).
    pub fn aggregator_mut(&mut self) -> &mut StatusAggregator {
        &mut self.aggregator
    }

    /// The staging manager.
    pub fn staging(&self) -> &StagingManager<T> {
        &self.staging
    }

    /// The staging manager, mutably.
    pub fn staging_mut(&mut self) -> &mut StagingManager<T> {
        &mut self.staging
    }

    /// Feed a drop into the staging manager.
    pub fn drop_files(&mut self, entries: Vec<DropEntry>) -> Result<(), DropError> {
        self.staging.on_drop(entries)
    }

    /// Commit the staged sequence, rejecting an empty one.
    pub fn commit_staged(&mut self) -> Result<usize, DropError> {
        if self.staging.staged().is_empty() {
            return Err(DropError::EmptyStaging);
        }
        self.staging.commit()
    }

    /// Apply every event that is already waiting. Never blocks.
    ///
    /// Returns the number of events that changed a record.
    pub fn pump(&mut self) -> usize {
        let mut changed = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if self.aggregator.apply(event) {
                        changed += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Wait up to `timeout` for one event, then drain the rest.
    pub fn pump_blocking(&mut self, timeout: Duration) -> usize {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                let first = usize::from(self.aggregator.apply(event));
                first + self.pump()
            }
            Err(RecvTimeoutError::Timeout) => 0,
            Err(RecvTimeoutError::Disconnected) => {
                // No producers left; keep the caller's pacing.
                std::thread::sleep(timeout);
                0
            }
        }
    }

    /// Task ids of in-flight records that the server already accepted.
    pub fn pending_task_ids(&self) -> Vec<String> {
        self.aggregator
            .not_completed()
            .into_iter()
            .filter_map(|r| r.task_id.clone())
            .collect()
    }

    /// Pump events (and poll tasks) until every record is terminal or
    /// `poll.max_wait_secs` elapsed.
    ///
    /// `on_update` runs after each round. Returns `true` if the feed settled.
    pub fn watch<F>(&mut self, poller: Option<&TaskPoller>, poll: &PollConfig, mut on_update: F) -> bool
    where
        F: FnMut(&StatusAggregator),
    {
        let interval = Duration::from_millis(poll.interval_ms);
        let deadline = Instant::now() + Duration::from_secs(poll.max_wait_secs);

        self.pump();
        loop {
            on_update(&self.aggregator);
            if self.aggregator.not_completed().is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Stopped watching after {}s with {} records in flight",
                    poll.max_wait_secs,
                    self.aggregator.not_completed().len()
                );
                return false;
            }

            self.pump_blocking(interval);
            if let Some(poller) = poller {
                let task_ids = self.pending_task_ids();
                if !task_ids.is_empty() {
                    poller.poll_once(&task_ids);
                    self.pump();
                }
            }
        }
    }

    /// Current dashboard state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.aggregator.snapshot()
    }

    /// Tear the session down, returning the final dashboard state.
    ///
    /// Waiting events are applied first. In-flight uploads are not cancelled.
    pub fn shutdown(mut self) -> DashboardSnapshot {
        self.pump();
        tracing::debug!("Dashboard session closed");
        self.aggregator.snapshot()
    }
}
