//! Client-side staging of dropped files before submission.
//!
//! The [`StagingManager`] owns the staged sequence. Its order is the merge
//! order. On [`commit`](StagingManager::commit) ownership of the sequence
//! moves to the upload transport and the sequence is cleared.
//!
//! ## On-Disk Format
//!
//! Between CLI invocations the staging area lives in
//! `<workspace>/.docdrop/staging.json` as a single [`StagingState`] document.
//! Every save writes a temporary file and renames it into place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{STAGING_FILENAME, WORKSPACE_STATE_DIR};
use crate::drop_entry::DropEntry;
use crate::errors::DropError;
use crate::transport::UploadTransport;

// ============================================================================
// StagingState
// ============================================================================

/// Persisted staging area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingState {
    /// Whether drops are staged (and merged on commit).
    #[serde(default)]
    pub merge_staged_files: bool,

    /// Name of the merged document; empty when unset.
    #[serde(default)]
    pub merged_name: String,

    /// Staged entries in merge order.
    #[serde(default)]
    pub entries: Vec<DropEntry>,

    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Default for StagingState {
    fn default() -> Self {
        Self {
            merge_staged_files: false,
            merged_name: String::new(),
            entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

impl StagingState {
    /// Path of the staging file for a workspace root.
    pub fn path_for(workspace: &Path) -> PathBuf {
        workspace.join(WORKSPACE_STATE_DIR).join(STAGING_FILENAME)
    }

    /// Load the staging area of a workspace.
    ///
    /// Returns an empty state if nothing was staged yet.
    pub fn load(workspace: &Path) -> Result<Self, DropError> {
        let path = Self::path_for(workspace);
        if !path.exists() {
            tracing::debug!("No staging file at {}, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            DropError::StagingIo(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DropError::StagingParse(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Persist the staging area of a workspace.
    pub fn save(&self, workspace: &Path) -> Result<(), DropError> {
        let path = Self::path_for(workspace);
        let dir = workspace.join(WORKSPACE_STATE_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            DropError::StagingIo(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| {
                DropError::StagingIo(format!("Failed to create {}: {}", tmp_path.display(), e))
            })?;
            file.write_all(json.as_bytes()).map_err(|e| {
                DropError::StagingIo(format!("Failed to write {}: {}", tmp_path.display(), e))
            })?;
            file.sync_all().map_err(|e| {
                DropError::StagingIo(format!("Failed to sync {}: {}", tmp_path.display(), e))
            })?;
        }
        fs::rename(&tmp_path, &path).map_err(|e| {
            DropError::StagingIo(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            "Saved {} staged entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}

// ============================================================================
// StagingManager
// ============================================================================

/// Accumulates dropped files and hands them to the upload transport.
#[derive(Debug)]
pub struct StagingManager<T> {
    transport: T,
    staged: Vec<DropEntry>,
    merge_staged_files: bool,
    merged_name: String,
}

impl<T: UploadTransport> StagingManager<T> {
    /// Create a manager with an empty staged sequence.
    pub fn new(transport: T, merge_staged_files: bool) -> Self {
        Self {
            transport,
            staged: Vec::new(),
            merge_staged_files,
            merged_name: String::new(),
        }
    }

    /// Restore a manager from persisted state.
    pub fn from_state(transport: T, state: StagingState) -> Self {
        Self {
            transport,
            staged: state.entries,
            merge_staged_files: state.merge_staged_files,
            merged_name: state.merged_name,
        }
    }

    /// Capture the current state for persistence.
    pub fn state(&self) -> StagingState {
        StagingState {
            merge_staged_files: self.merge_staged_files,
            merged_name: self.merged_name.clone(),
            entries: self.staged.clone(),
            updated_at: Utc::now(),
        }
    }

    /// The transport entries are forwarded to.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Staged entries in merge order.
    pub fn staged(&self) -> &[DropEntry] {
        &self.staged
    }

    /// Whether drops are staged instead of uploaded.
    pub fn merge_staged_files(&self) -> bool {
        self.merge_staged_files
    }

    /// Toggle stage mode. Already staged entries are kept.
    pub fn set_merge_staged_files(&mut self, merge: bool) {
        self.merge_staged_files = merge;
    }

    /// Name of the merged document; empty when unset.
    pub fn merged_name(&self) -> &str {
        &self.merged_name
    }

    /// Set the merged document name.
    pub fn set_merged_name(&mut self, name: impl Into<String>) {
        self.merged_name = name.into();
    }

    /// Handle a drop.
    ///
    /// In stage mode the entries are appended in drop order. Otherwise they go
    /// to the transport right away, unmerged, and the staged sequence is left
    /// untouched.
    pub fn on_drop(&mut self, entries: Vec<DropEntry>) -> Result<(), DropError> {
        if self.merge_staged_files {
            tracing::debug!("Staging {} dropped entries", entries.len());
            self.staged.extend(entries);
            Ok(())
        } else {
            tracing::debug!("Uploading {} dropped entries", entries.len());
            self.transport.upload(entries, false, None)
        }
    }

    /// Move the entry at `from` to position `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), DropError> {
        let len = self.staged.len();
        for index in [from, to] {
            if index >= len {
                return Err(DropError::IndexOutOfRange { index, len });
            }
        }
        let entry = self.staged.remove(from);
        self.staged.insert(to, entry);
        Ok(())
    }

    /// Remove and return the entry at `index`.
    pub fn unstage(&mut self, index: usize) -> Result<DropEntry, DropError> {
        let len = self.staged.len();
        if index >= len {
            return Err(DropError::IndexOutOfRange { index, len });
        }
        Ok(self.staged.remove(index))
    }

    /// Submit the staged sequence in one transport call.
    ///
    /// The merged name is only passed in stage mode. After a successful
    /// handoff the staged sequence and merged name are cleared. Returns the
    /// number of entries handed off.
    pub fn commit(&mut self) -> Result<usize, DropError> {
        let merge = self.merge_staged_files;
        let merged_name = merge.then(|| self.merged_name.clone());
        let entries = self.staged.clone();
        let count = entries.len();

        self.transport.upload(entries, merge, merged_name)?;

        self.staged.clear();
        self.merged_name.clear();
        tracing::debug!("Committed {} staged entries (merge: {})", count, merge);
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================
