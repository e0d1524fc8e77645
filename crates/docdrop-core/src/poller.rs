//! Polls server-side consumption tasks and reports them as feed events.
//!
//! The poller never reads the status feed. Callers hand it the task ids they
//! care about; it answers by sending [`FeedEvent::Consumer`] messages.

use std::sync::mpsc::Sender;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::ServerConfig;
use crate::constants::TASKS_ENDPOINT;
use crate::errors::DropError;
use crate::feed::{ConsumerMessage, FeedEvent};
use crate::status::FileStatusPhase;
use crate::transport::build_client;

/// Task record as returned by the tasks endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    /// Server task id.
    pub task_id: String,

    /// Task state (`PENDING`, `STARTED`, `SUCCESS`, `FAILURE`, ...).
    pub status: String,

    /// Name of the consumed file.
    #[serde(default)]
    pub task_file_name: Option<String>,

    /// Result or error text.
    #[serde(default)]
    pub result: Option<String>,

    /// Created document id; sent as a string or a number.
    #[serde(default)]
    pub related_document: Option<serde_json::Value>,
}

/// Map a task state to a phase.
///
/// Unknown states yield `None` and are skipped.
pub fn phase_for_task_state(state: &str) -> Option<FileStatusPhase> {
    match state.to_ascii_uppercase().as_str() {
        "PENDING" | "RECEIVED" => Some(FileStatusPhase::Started),
        "STARTED" | "RETRY" => Some(FileStatusPhase::Working),
        "SUCCESS" => Some(FileStatusPhase::Success),
        "FAILURE" | "REVOKED" => Some(FileStatusPhase::Failed),
        _ => None,
    }
}

impl TaskInfo {
    /// Convert into a consumer message, if the state is known.
    pub fn to_consumer_message(&self) -> Option<ConsumerMessage> {
        let phase = phase_for_task_state(&self.status)?;
        let (current, max) = if phase.is_terminal() { (100, 100) } else { (0, 100) };
        let document_id = self.related_document.as_ref().and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });
        Some(ConsumerMessage {
            filename: self.task_file_name.clone(),
            task_id: Some(self.task_id.clone()),
            status: phase,
            current_progress: current,
            max_progress: max,
            message: self.result.clone(),
            document_id,
        })
    }
}

/// Client for the tasks endpoint.
pub struct TaskPoller {
    client: Client,
    tasks_url: String,
    events: Sender<FeedEvent>,
}

impl TaskPoller {
    /// Build a poller for `server`, reporting into `events`.
    pub fn new(server: &ServerConfig, events: Sender<FeedEvent>) -> Result<Self, DropError> {
        Ok(Self {
            client: build_client(server)?,
            tasks_url: format!("{}{}", server.url.trim_end_matches('/'), TASKS_ENDPOINT),
            events,
        })
    }

    /// Query each task once and send one event per known task state.
    ///
    /// Returns the number of events sent. A failing request is logged and
    /// skipped so one bad task does not hide the others.
    pub fn poll_once(&self, task_ids: &[String]) -> usize {
        let mut sent = 0;
        for task_id in task_ids {
            match self.fetch(task_id) {
                Ok(tasks) => {
                    for task in tasks {
                        if let Some(message) = task.to_consumer_message() {
                            if self.events.send(FeedEvent::Consumer(message)).is_ok() {
                                sent += 1;
                            }
                        } else {
                            tracing::debug!("Ignoring task {} in state {}", task.task_id, task.status);
                        }
                    }
                }
                Err(e) => tracing::warn!("Failed to poll task {}: {}", task_id, e),
            }
        }
        sent
    }

    fn fetch(&self, task_id: &str) -> Result<Vec<TaskInfo>, DropError> {
        let response = self
            .client
            .get(&self.tasks_url)
            .query(&[("task_id", task_id)])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DropError::ServerStatus {
                status: status.as_u16(),
                url: self.tasks_url.clone(),
            });
        }
        Ok(response.json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: &str) -> TaskInfo {
        TaskInfo {
            task_id: "t-1".to_string(),
            status: status.to_string(),
            task_file_name: Some("scan.pdf".to_string()),
            result: None,
            related_document: None,
        }
    }

    #[test]
    fn test_phase_for_task_state() {
        assert_eq!(phase_for_task_state("PENDING"), Some(FileStatusPhase::Started));
        assert_eq!(phase_for_task_state("started"), Some(FileStatusPhase::Working));
        assert_eq!(phase_for_task_state("SUCCESS"), Some(FileStatusPhase::Success));
        assert_eq!(phase_for_task_state("FAILURE"), Some(FileStatusPhase::Failed));
        assert_eq!(phase_for_task_state("UNKNOWN"), None);
    }

    #[test]
    fn test_success_carries_document_id() {
        let mut info = task("SUCCESS");
        info.related_document = Some(serde_json::json!("42"));
        let message = info.to_consumer_message().unwrap();
        assert_eq!(message.document_id, Some(42));
        assert_eq!(message.current_progress, 100);
        assert_eq!(message.task_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_failure_carries_result_text() {
        let mut info = task("FAILURE");
        info.result = Some("Not a PDF".to_string());
        let message = info.to_consumer_message().unwrap();
        assert_eq!(message.status, FileStatusPhase::Failed);
        assert_eq!(message.message.as_deref(), Some("Not a PDF"));
    }

    #[test]
    fn test_deserialize_task_list() {
        let json = r#"[{"task_id":"t-1","status":"STARTED","task_file_name":"a.pdf","related_document":7}]"#;
        let tasks: Vec<TaskInfo> = serde_json::from_str(json).unwrap();
        let message = tasks[0].to_consumer_message().unwrap();
        assert_eq!(message.status, FileStatusPhase::Working);
        assert_eq!(message.document_id, Some(7));
    }
}
