//! Upload transport: hands dropped files to the document server.
//!
//! [`UploadTransport`] is the boundary the staging manager talks to. The call
//! is fire-and-forget: results come back as [`FeedEvent`]s on the session's
//! channel, never as return values.
//!
//! [`HttpTransport`] is the concrete implementation. Each `upload` call spawns
//! one worker thread that:
//!
//! 1. expands directory entries into the files they contain,
//! 2. registers one status record per upload unit (one per file, or one for
//!    the whole batch when merging),
//! 3. POSTs the files as multipart `document` parts, reporting byte progress,
//! 4. reports acceptance (with the server task id) or failure.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ignore::WalkBuilder;
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::ServerConfig;
use crate::constants::UPLOAD_ENDPOINT;
use crate::drop_entry::DropEntry;
use crate::errors::DropError;
use crate::feed::FeedEvent;
use crate::status::StatusId;

// ============================================================================
// UploadTransport
// ============================================================================

/// Sink for files leaving the staging manager.
pub trait UploadTransport {
    /// Submit `files`. When `merge` is set the server combines them into one
    /// document named `merged_name`.
    ///
    /// Returns once the files were handed off; an error means the handoff
    /// itself failed and nothing was submitted.
    fn upload(
        &self,
        files: Vec<DropEntry>,
        merge: bool,
        merged_name: Option<String>,
    ) -> Result<(), DropError>;
}

impl<T: UploadTransport + ?Sized> UploadTransport for &T {
    fn upload(
        &self,
        files: Vec<DropEntry>,
        merge: bool,
        merged_name: Option<String>,
    ) -> Result<(), DropError> {
        (**self).upload(files, merge, merged_name)
    }
}

impl<T: UploadTransport + ?Sized> UploadTransport for Box<T> {
    fn upload(
        &self,
        files: Vec<DropEntry>,
        merge: bool,
        merged_name: Option<String>,
    ) -> Result<(), DropError> {
        (**self).upload(files, merge, merged_name)
    }
}

// ============================================================================
// Upload units
// ============================================================================

/// One file on disk, resolved from a drop entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Multipart file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Files submitted in one request, tracked by one status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUnit {
    /// Status record id.
    pub id: StatusId,
    /// Display name of the record.
    pub display_name: String,
    /// Files in request order.
    pub files: Vec<UploadFile>,
    /// Server-side merge requested.
    pub merge: bool,
    /// Title for the merged document.
    pub title: Option<String>,
}

impl UploadUnit {
    /// Sum of file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Expand drop entries into files, in drop order.
///
/// Directories are walked recursively, honoring ignore files and skipping
/// hidden entries; files inside one directory are sorted by path.
pub fn expand_entries(entries: &[DropEntry]) -> Vec<UploadFile> {
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            DropEntry::LocalFile { path, name, size } => files.push(UploadFile {
                path: path.clone(),
                name: name.clone(),
                size: *size,
            }),
            DropEntry::DirectoryEntry { path, .. } => {
                let walker = WalkBuilder::new(path)
                    .hidden(true)
                    .git_ignore(true)
                    .follow_links(false)
                    .sort_by_file_path(|a, b| a.cmp(b))
                    .build();
                for result in walker {
                    let dir_entry = match result {
                        Ok(e) => e,
                        Err(e) => {
                            tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                            continue;
                        }
                    };
                    if !dir_entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    let size = dir_entry.metadata().map(|m| m.len()).unwrap_or(0);
                    let file_path = dir_entry.into_path();
                    let name = file_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file_path.display().to_string());
                    files.push(UploadFile {
                        path: file_path,
                        name,
                        size,
                    });
                }
            }
        }
    }
    files
}

/// Group files into upload units.
///
/// Without merge every file is its own unit. With merge all files form one
/// unit named after `merged_name` (or the first file when no name is given).
pub fn plan_units(
    files: Vec<UploadFile>,
    merge: bool,
    merged_name: Option<String>,
) -> Vec<UploadUnit> {
    if files.is_empty() {
        return Vec::new();
    }

    if merge {
        let title = merged_name.filter(|n| !n.trim().is_empty());
        let display_name = title
            .clone()
            .unwrap_or_else(|| files[0].name.clone());
        return vec![UploadUnit {
            id: StatusId::generate(),
            display_name,
            files,
            merge: true,
            title,
        }];
    }

    files
        .into_iter()
        .map(|file| UploadUnit {
            id: StatusId::generate(),
            display_name: file.name.clone(),
            files: vec![file],
            merge: false,
            title: None,
        })
        .collect()
}

/// Extract the task id from an upload response body.
///
/// The server answers with a bare JSON string; an object carrying `task_id`
/// is accepted as well.
pub fn parse_task_id(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body).ok()? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Object(map) => map
            .get("task_id")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}

// ============================================================================
// Progress reporting
// ============================================================================

/// Reader that counts bytes pulled by the HTTP client.
struct ProgressReader<R> {
    inner: R,
    unit_id: StatusId,
    loaded: Arc<AtomicU64>,
    last_reported: Arc<AtomicU64>,
    total: u64,
    events: Sender<FeedEvent>,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            return Ok(0);
        }
        let loaded = self.loaded.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        let step = (self.total / 100).max(1);
        let last = self.last_reported.load(Ordering::Relaxed);
        if loaded >= self.total || loaded - last >= step {
            self.last_reported.store(loaded, Ordering::Relaxed);
            let _ = self.events.send(FeedEvent::UploadProgress {
                id: self.unit_id.clone(),
                loaded,
                total: self.total,
            });
        }
        Ok(n)
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Uploads files to the document server over HTTP.
pub struct HttpTransport {
    client: Client,
    upload_url: String,
    authenticated: bool,
    events: Sender<FeedEvent>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpTransport {
    /// Build a transport for `server`, reporting into `events`.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::Transport`] if the token is not a valid header
    /// value or the HTTP client cannot be created.
    pub fn new(server: &ServerConfig, events: Sender<FeedEvent>) -> Result<Self, DropError> {
        let client = build_client(server)?;
        let upload_url = format!("{}{}", server.url.trim_end_matches('/'), UPLOAD_ENDPOINT);
        Ok(Self {
            client,
            upload_url,
            authenticated: server.has_token(),
            events,
            workers: Mutex::new(Vec::new()),
        })
    }

    /// The endpoint files are posted to.
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Block until every worker spawned so far has finished.
    pub fn join_workers(&self) {
        let handles = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("Upload worker panicked");
            }
        }
    }
}

impl UploadTransport for HttpTransport {
    fn upload(
        &self,
        files: Vec<DropEntry>,
        merge: bool,
        merged_name: Option<String>,
    ) -> Result<(), DropError> {
        let units = plan_units(expand_entries(&files), merge, merged_name);
        if units.is_empty() {
            tracing::debug!("Nothing to upload");
            return Ok(());
        }
        if !self.authenticated {
            tracing::warn!("server.token is not set; uploading unauthenticated");
        }

        // Register before spawning so records exist as soon as this returns.
        for unit in &units {
            let _ = self.events.send(FeedEvent::UploadRegistered {
                id: unit.id.clone(),
                filename: unit.display_name.clone(),
                total_bytes: unit.total_bytes(),
            });
        }

        let client = self.client.clone();
        let url = self.upload_url.clone();
        let events = self.events.clone();
        let handle = thread::Builder::new()
            .name("docdrop-upload".to_string())
            .spawn(move || {
                for unit in units {
                    post_unit(&client, &url, &unit, &events);
                }
            })
            .map_err(|e| DropError::Transport(format!("Failed to spawn upload worker: {}", e)))?;

        if let Ok(mut workers) = self.workers.lock() {
            workers.push(handle);
        }
        Ok(())
    }
}

/// Build the shared blocking client with auth header and timeout.
pub(crate) fn build_client(server: &ServerConfig) -> Result<Client, DropError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = server.token.as_deref().filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Token {}", token))
            .map_err(|e| DropError::Transport(format!("Invalid API token: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(server.timeout_secs))
        .build()
        .map_err(|e| DropError::Transport(format!("Failed to build HTTP client: {}", e)))
}

fn post_unit(client: &Client, url: &str, unit: &UploadUnit, events: &Sender<FeedEvent>) {
    let event = match send_unit(client, url, unit, events) {
        Ok(task_id) => {
            tracing::debug!("Upload of {} accepted as task {}", unit.display_name, task_id);
            FeedEvent::UploadAccepted {
                id: unit.id.clone(),
                task_id,
            }
        }
        Err(e) => {
            tracing::warn!("Upload of {} failed: {}", unit.display_name, e);
            FeedEvent::UploadFailed {
                id: unit.id.clone(),
                message: e.to_string(),
            }
        }
    };
    let _ = events.send(event);
}

fn send_unit(
    client: &Client,
    url: &str,
    unit: &UploadUnit,
    events: &Sender<FeedEvent>,
) -> Result<String, DropError> {
    let loaded = Arc::new(AtomicU64::new(0));
    let last_reported = Arc::new(AtomicU64::new(0));
    let total = unit.total_bytes();

    let mut form = multipart::Form::new();
    for file in &unit.files {
        let handle = File::open(&file.path).map_err(|e| {
            DropError::Transport(format!("Failed to open {}: {}", file.path.display(), e))
        })?;
        let reader = ProgressReader {
            inner: handle,
            unit_id: unit.id.clone(),
            loaded: Arc::clone(&loaded),
            last_reported: Arc::clone(&last_reported),
            total,
            events: events.clone(),
        };
        let part = multipart::Part::reader_with_length(reader, file.size).file_name(file.name.clone());
        form = form.part("document", part);
    }
    if unit.merge {
        form = form.text("merge", "true");
    }
    if let Some(title) = &unit.title {
        form = form.text("title", title.clone());
    }

    let response = client.post(url).multipart(form).send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(DropError::ServerStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    parse_task_id(&body).ok_or_else(|| {
        DropError::Transport(format!("Upload response carried no task id: {}", body))
    })
}

// ============================================================================
// Tests
// ============================================================================
