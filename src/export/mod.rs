//! Session export: durable local write, then network upload
//!
//! A finished [`Session`] is serialized once. The bytes are written to
//! `tracks/<file name>` in local storage and then posted to the backend. The
//! two steps are independent: a failed local write is reported as a warning
//! and the upload still runs, and a failed upload can be retried later from
//! the persisted copy with [`SessionExporter::retry_upload`].

pub mod storage;
pub mod upload;

pub use storage::{FsStorage, SessionStorage};
pub use upload::{track_endpoint, HttpUploader, SessionUploader, UploadReceipt};

use crossbeam_channel::{bounded, Receiver};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{Result, ResultExt, TrackerError};
use crate::session::Session;

/// Directory, relative to the storage root, holding session documents
pub const TRACKS_DIR: &str = "tracks";

/// Outcome of exporting one session
#[derive(Debug)]
pub struct ExportResult {
    /// Where the session was written, if the local write succeeded
    pub persisted_path: Option<PathBuf>,
    /// Local write failure; the session is still held by the caller
    pub persistence_warning: Option<TrackerError>,
    /// Upload outcome
    pub upload: Result<UploadReceipt>,
}

impl ExportResult {
    /// Check if the local copy was written
    pub fn is_persisted(&self) -> bool {
        self.persisted_path.is_some()
    }

    /// Check if the backend accepted the session
    pub fn is_uploaded(&self) -> bool {
        self.upload.is_ok()
    }

    /// Check if both steps succeeded
    pub fn is_complete(&self) -> bool {
        self.is_persisted() && self.is_uploaded()
    }

    /// Check if a later `retry_upload` could fix this export
    pub fn can_retry_upload(&self) -> bool {
        self.is_persisted() && matches!(&self.upload, Err(e) if e.is_retryable())
    }
}

/// Persists and uploads sealed sessions
#[derive(Clone)]
pub struct SessionExporter {
    storage: Arc<dyn SessionStorage>,
    uploader: Arc<dyn SessionUploader>,
}

impl std::fmt::Debug for SessionExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExporter").finish_non_exhaustive()
    }
}

impl SessionExporter {
    pub fn new(storage: Arc<dyn SessionStorage>, uploader: Arc<dyn SessionUploader>) -> Self {
        Self { storage, uploader }
    }

    /// Filesystem storage and HTTP upload as configured
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let root = config.storage.resolved_data_dir()?;
        let uploader = HttpUploader::new(&config.api)?;
        tracing::debug!(root = %root.display(), endpoint = uploader.endpoint(), "Exporter configured");
        Ok(Self::new(Arc::new(FsStorage::new(root)), Arc::new(uploader)))
    }

    /// Storage path of a session's document, relative to the storage root
    pub fn relative_path(session: &Session) -> PathBuf {
        Path::new(TRACKS_DIR).join(session.file_name())
    }

    /// Write the session locally, then upload it
    ///
    /// Fails only if the session is still open or cannot be serialized.
    /// Persistence and upload failures are reported inside the result.
    pub fn export(&self, session: &Session) -> Result<ExportResult> {
        if !session.is_sealed() {
            return Err(TrackerError::SessionOpen);
        }

        let bytes = serde_json::to_vec_pretty(session)?;
        let relative = Self::relative_path(session);

        let (persisted_path, persistence_warning) = match self.storage.write(&relative, &bytes) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Session persisted");
                (Some(path), None)
            }
            Err(e) => {
                tracing::warn!("Session kept in memory only: {}", e);
                (None, Some(e))
            }
        };

        let upload = self.uploader.upload(&bytes);
        match &upload {
            Ok(receipt) => tracing::info!(status = receipt.status, "Session uploaded"),
            Err(e) => tracing::warn!("Session upload failed: {}", e),
        }

        Ok(ExportResult {
            persisted_path,
            persistence_warning,
            upload,
        })
    }

    /// Run [`SessionExporter::export`] on a worker thread
    ///
    /// The receiver yields exactly one result.
    pub fn export_in_background(&self, session: Session) -> Receiver<Result<ExportResult>> {
        let (tx, rx) = bounded(1);
        let exporter = self.clone();
        std::thread::spawn(move || {
            let result = exporter.export(&session);
            // Caller may have stopped waiting
            let _ = tx.send(result);
        });
        rx
    }

    /// Read a persisted session back
    pub fn load(&self, path: &Path) -> Result<Session> {
        let bytes = self.storage.read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(TrackerError::from)
            .with_context(|| format!("Invalid session document {}", path.display()))
    }

    /// Upload a previously persisted session again
    pub fn retry_upload(&self, path: &Path) -> Result<UploadReceipt> {
        let session = self.load(path)?;
        let bytes = serde_json::to_vec_pretty(&session)?;
        let receipt = self.uploader.upload(&bytes)?;
        tracing::info!(path = %path.display(), status = receipt.status, "Persisted session uploaded");
        Ok(receipt)
    }
}
