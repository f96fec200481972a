//! Hand-written storage and uploader fakes for integration tests

use gametrack_rs::export::{SessionStorage, SessionUploader, UploadReceipt};
use gametrack_rs::{Result, TrackerError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Storage that keeps documents in memory
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl SessionStorage for MemoryStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), bytes.to_vec());
        Ok(path.to_path_buf())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| TrackerError::Persistence {
                path: path.to_path_buf(),
                message: "not found".to_string(),
            })
    }
}

/// Storage whose writes always fail
pub struct FailingStorage;

impl SessionStorage for FailingStorage {
    fn write(&self, path: &Path, _bytes: &[u8]) -> Result<PathBuf> {
        Err(TrackerError::Persistence {
            path: path.to_path_buf(),
            message: "read-only filesystem".to_string(),
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Err(TrackerError::Persistence {
            path: path.to_path_buf(),
            message: "read-only filesystem".to_string(),
        })
    }
}

/// Uploader that accepts everything and keeps the bodies
#[derive(Default)]
pub struct RecordingUploader {
    bodies: Mutex<Vec<Vec<u8>>>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }

    /// Last uploaded body parsed as JSON
    pub fn last_json(&self) -> Option<serde_json::Value> {
        self.bodies
            .lock()
            .unwrap()
            .last()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

impl SessionUploader for RecordingUploader {
    fn upload(&self, body: &[u8]) -> Result<UploadReceipt> {
        self.bodies.lock().unwrap().push(body.to_vec());
        Ok(UploadReceipt::new(201, "{\"ok\":true}"))
    }
}

/// Uploader that fails a fixed number of times, then accepts
pub struct FlakyUploader {
    failures_left: AtomicUsize,
    status: Option<u16>,
    attempts: AtomicUsize,
}

impl FlakyUploader {
    /// Fail `failures` times with the given HTTP status (`None` = offline)
    pub fn new(failures: usize, status: Option<u16>) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            status,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SessionUploader for FlakyUploader {
    fn upload(&self, _body: &[u8]) -> Result<UploadReceipt> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TrackerError::Upload {
                status: self.status,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(UploadReceipt::new(200, ""))
    }
}
