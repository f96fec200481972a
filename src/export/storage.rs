//! Durable local storage for finished sessions

use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};

/// Byte store for persisted session documents
///
/// Relative paths are resolved against the store's root; absolute paths are
/// used as-is.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStorage: Send + Sync {
    /// Write a document, replacing any previous content
    ///
    /// Returns the full path written.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf>;

    /// Read a previously written document
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Filesystem-backed storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory documents are written under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path for a document
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn persistence_error(path: &Path, err: std::io::Error) -> TrackerError {
    TrackerError::Persistence {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

impl SessionStorage for FsStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| persistence_error(&full, e))?;
        }

        // Write beside the target and rename so a crash never leaves half a file
        let tmp = full.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| persistence_error(&full, e))?;
        std::fs::rename(&tmp, &full).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            persistence_error(&full, e)
        })?;

        tracing::debug!(path = %full.display(), bytes = bytes.len(), "Session document written");
        Ok(full)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|e| persistence_error(&full, e))
    }
}
