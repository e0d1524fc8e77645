//! Entries produced by a file drop.
//!
//! A drop yields a batch of [`DropEntry`] values. Files and directories are
//! distinct variants, so callers check capabilities explicitly instead of
//! probing the payload at runtime.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DropError;

/// One dropped item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DropEntry {
    /// A regular file.
    #[serde(rename_all = "camelCase")]
    LocalFile {
        /// Location on disk.
        path: PathBuf,
        /// Display name.
        name: String,
        /// Size in bytes at drop time.
        size: u64,
    },

    /// A directory; expanded into its files by the transport.
    #[serde(rename_all = "camelCase")]
    DirectoryEntry {
        /// Location on disk.
        path: PathBuf,
        /// Display name.
        name: String,
    },
}

impl DropEntry {
    /// Build an entry for a file without touching the filesystem.
    pub fn local_file(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self::LocalFile { path, name, size }
    }

    /// Inspect `path` once and build the matching variant.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::PathNotFound`] if the path does not exist.
    pub fn from_path(path: &Path) -> Result<Self, DropError> {
        let metadata = fs::metadata(path)
            .map_err(|_| DropError::PathNotFound(path.display().to_string()))?;
        let name = display_name(path);

        if metadata.is_dir() {
            Ok(Self::DirectoryEntry {
                path: path.to_path_buf(),
                name,
            })
        } else {
            Ok(Self::LocalFile {
                path: path.to_path_buf(),
                name,
                size: metadata.len(),
            })
        }
    }

    /// Display name of the entry.
    pub fn name(&self) -> &str {
        match self {
            Self::LocalFile { name, .. } | Self::DirectoryEntry { name, .. } => name,
        }
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        match self {
            Self::LocalFile { path, .. } | Self::DirectoryEntry { path, .. } => path,
        }
    }

    /// Whether this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::LocalFile { .. })
    }

    /// Whether this is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::DirectoryEntry { .. })
    }

    /// The file path, for file entries only.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::LocalFile { path, .. } => Some(path),
            Self::DirectoryEntry { .. } => None,
        }
    }

    /// Size in bytes, for file entries only.
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::LocalFile { size, .. } => Some(*size),
            Self::DirectoryEntry { .. } => None,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("invoice.pdf");
        fs::write(&file, b"%PDF-1.4").unwrap();

        let entry = DropEntry::from_path(&file).unwrap();
        assert!(entry.is_file());
        assert!(!entry.is_directory());
        assert_eq!(entry.name(), "invoice.pdf");
        assert_eq!(entry.size(), Some(8));
        assert_eq!(entry.file_path(), Some(file.as_path()));
    }

    #[test]
    fn test_from_path_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("scans");
        fs::create_dir(&dir).unwrap();

        let entry = DropEntry::from_path(&dir).unwrap();
        assert!(entry.is_directory());
        assert_eq!(entry.file_path(), None);
        assert_eq!(entry.name(), "scans");
    }

    #[test]
    fn test_from_path_missing() {
        let err = DropEntry::from_path(Path::new("/nonexistent/file.pdf")).unwrap_err();
        assert!(matches!(err, DropError::PathNotFound(_)));
    }

    #[test]
    fn test_serialization_tag() {
        let entry = DropEntry::local_file("/tmp/a.pdf", 3);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"localFile\""));
        let back: DropEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
