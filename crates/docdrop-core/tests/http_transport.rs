//! HTTP tests for the upload transport and the task poller.
//!
//! A local mock server stands in for the document server.

use std::fs;
use std::sync::mpsc::Receiver;

use httpmock::prelude::*;
use tempfile::TempDir;

use docdrop_core::{
    feed_channel, DropEntry, FeedEvent, FileStatusPhase, HttpTransport, ServerConfig, StatusFeed,
    TaskPoller, UploadTransport, TASKS_ENDPOINT, UPLOAD_ACCEPTED_MESSAGE, UPLOAD_ENDPOINT,
};

const TOKEN: &str = "s3cret";

fn server_config(server: &MockServer) -> ServerConfig {
    ServerConfig {
        url: server.base_url(),
        token: Some(TOKEN.to_string()),
        ..ServerConfig::default()
    }
}

/// Write documents into a temp dir and return their drop entries.
fn documents(temp: &TempDir, files: &[(&str, &str)]) -> Vec<DropEntry> {
    files
        .iter()
        .map(|(name, content)| {
            let path = temp.path().join(name);
            fs::write(&path, content).unwrap();
            DropEntry::from_path(&path).unwrap()
        })
        .collect()
}

fn drain(rx: &Receiver<FeedEvent>) -> Vec<FeedEvent> {
    rx.try_iter().collect()
}

fn accepted_task_ids(events: &[FeedEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            FeedEvent::UploadAccepted { task_id, .. } => Some(task_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_unmerged_upload_posts_one_request_per_file() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(POST)
            .path(UPLOAD_ENDPOINT)
            .header("Authorization", format!("Token {}", TOKEN))
            .body_contains("name=\"document\"")
            .body_contains("filename=\"a.pdf\"");
        then.status(200).body("\"task-a\"");
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path(UPLOAD_ENDPOINT)
            .header("Authorization", format!("Token {}", TOKEN))
            .body_contains("name=\"document\"")
            .body_contains("filename=\"b.pdf\"");
        then.status(200).body("{\"task_id\":\"task-b\"}");
    });

    let temp = TempDir::new().unwrap();
    let entries = documents(&temp, &[("a.pdf", "first"), ("b.pdf", "second")]);
    let (tx, rx) = feed_channel();
    let transport = HttpTransport::new(&server_config(&server), tx).unwrap();

    transport.upload(entries, false, None).unwrap();
    transport.join_workers();

    first.assert_hits(1);
    second.assert_hits(1);

    let events = drain(&rx);
    let registered = events
        .iter()
        .filter(|e| matches!(e, FeedEvent::UploadRegistered { .. }))
        .count();
    assert_eq!(registered, 2);
    assert_eq!(accepted_task_ids(&events), vec!["task-a", "task-b"]);

    // The events drive the feed to Started with the server task ids.
    let mut feed = StatusFeed::new();
    for event in events {
        feed.apply(event);
    }
    assert_eq!(feed.len(), 2);
    for record in feed.active_records() {
        assert_eq!(record.phase, FileStatusPhase::Started);
        assert_eq!(record.message.as_deref(), Some(UPLOAD_ACCEPTED_MESSAGE));
        assert!(record.task_id.is_some());
    }
}

#[test]
fn test_merged_upload_sends_all_parts_with_title() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(UPLOAD_ENDPOINT)
            .header("Authorization", format!("Token {}", TOKEN))
            .body_contains("filename=\"page-1.pdf\"")
            .body_contains("filename=\"page-2.pdf\"")
            .body_contains("name=\"merge\"")
            .body_contains("name=\"title\"")
            .body_contains("letter.pdf");
        then.status(200).body("\"task-merged\"");
    });

    let temp = TempDir::new().unwrap();
    let entries = documents(&temp, &[("page-1.pdf", "one"), ("page-2.pdf", "two")]);
    let (tx, rx) = feed_channel();
    let transport = HttpTransport::new(&server_config(&server), tx).unwrap();

    transport
        .upload(entries, true, Some("letter.pdf".to_string()))
        .unwrap();
    transport.join_workers();

    mock.assert_hits(1);

    let events = drain(&rx);
    match &events[0] {
        FeedEvent::UploadRegistered {
            filename,
            total_bytes,
            ..
        } => {
            assert_eq!(filename, "letter.pdf");
            assert_eq!(*total_bytes, 6);
        }
        other => panic!("unexpected first event: {:?}", other),
    }
    assert_eq!(accepted_task_ids(&events), vec!["task-merged"]);

    let last_progress = events
        .iter()
        .filter_map(|e| match e {
            FeedEvent::UploadProgress { loaded, total, .. } => Some((*loaded, *total)),
            _ => None,
        })
        .last();
    assert_eq!(last_progress, Some((6, 6)));
}

#[test]
fn test_rejected_upload_reports_server_status() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(UPLOAD_ENDPOINT);
        then.status(401).body("{\"detail\":\"Invalid token.\"}");
    });

    let temp = TempDir::new().unwrap();
    let entries = documents(&temp, &[("a.pdf", "content")]);
    let (tx, rx) = feed_channel();
    let transport = HttpTransport::new(&server_config(&server), tx).unwrap();

    transport.upload(entries, false, None).unwrap();
    transport.join_workers();
    mock.assert();

    let failure = drain(&rx).into_iter().find_map(|e| match e {
        FeedEvent::UploadFailed { message, .. } => Some(message),
        _ => None,
    });
    let message = failure.expect("upload should fail");
    assert!(message.contains("401"), "message: {}", message);
}

#[test]
fn test_poll_once_reports_task_states() {
    let server = MockServer::start();
    let done = server.mock(|when, then| {
        when.method(GET)
            .path(TASKS_ENDPOINT)
            .query_param("task_id", "t-1")
            .header("Authorization", format!("Token {}", TOKEN));
        then.status(200).body(
            r#"[{"task_id":"t-1","status":"SUCCESS","task_file_name":"scan.pdf","result":"Success","related_document":"42"}]"#,
        );
    });
    let running = server.mock(|when, then| {
        when.method(GET)
            .path(TASKS_ENDPOINT)
            .query_param("task_id", "t-2");
        then.status(200)
            .body(r#"[{"task_id":"t-2","status":"STARTED","task_file_name":"big.pdf"}]"#);
    });

    let (tx, rx) = feed_channel();
    let poller = TaskPoller::new(&server_config(&server), tx).unwrap();

    let sent = poller.poll_once(&["t-1".to_string(), "t-2".to_string()]);
    assert_eq!(sent, 2);
    done.assert();
    running.assert();

    let messages: Vec<_> = drain(&rx)
        .into_iter()
        .filter_map(|e| match e {
            FeedEvent::Consumer(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].task_id.as_deref(), Some("t-1"));
    assert_eq!(messages[0].status, FileStatusPhase::Success);
    assert_eq!(messages[0].document_id, Some(42));
    assert_eq!(messages[1].filename.as_deref(), Some("big.pdf"));
    assert_eq!(messages[1].status, FileStatusPhase::Working);
}

#[test]
fn test_poll_once_skips_failing_requests() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(TASKS_ENDPOINT);
        then.status(500);
    });

    let (tx, rx) = feed_channel();
    let poller = TaskPoller::new(&server_config(&server), tx).unwrap();

    assert_eq!(poller.poll_once(&["t-1".to_string()]), 0);
    assert!(drain(&rx).is_empty());
}
