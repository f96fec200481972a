//! Error handling for the session recorder
//!
//! This module defines the error taxonomy shared by every component and a
//! Result alias for use throughout the crate.
//!
//! Sensor and persistence failures are absorbed by the recorder and only show
//! up in logs and statistics. Upload failures are returned to the caller so
//! the UI can offer a retry.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::RecorderState;

/// Which platform sensor produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Geolocation (GPS / network location)
    Position,
    /// Compass / device orientation
    Heading,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Position => write!(f, "position"),
            SensorKind::Heading => write!(f, "heading"),
        }
    }
}

/// Errors surfaced by a sensor stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// The user or the platform denied access to the sensor
    #[error("{sensor} access denied")]
    PermissionDenied { sensor: SensorKind },

    /// The sensor is missing or failed to produce a reading
    #[error("{sensor} unavailable: {message}")]
    Unavailable { sensor: SensorKind, message: String },

    /// No reading arrived within the platform's timeout
    #[error("{sensor} timed out")]
    Timeout { sensor: SensorKind },
}

impl SensorError {
    /// The sensor this error came from
    pub fn sensor(&self) -> SensorKind {
        match self {
            SensorError::PermissionDenied { sensor }
            | SensorError::Unavailable { sensor, .. }
            | SensorError::Timeout { sensor } => *sensor,
        }
    }
}

/// Main error type for recorder operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Position or heading unavailable or denied
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Map viewport requested before the map finished loading
    #[error("Map not ready: {0}")]
    NotReady(String),

    /// Operation called in the wrong lifecycle state
    #[error("Cannot {operation} while recorder is {state}")]
    State {
        operation: &'static str,
        state: RecorderState,
    },

    /// `init` called on a recorder that is already recording
    #[error("Recorder already initialized")]
    AlreadyInitialized,

    /// Export requested for a session that has not been finished
    #[error("Session is still open; finish it before exporting")]
    SessionOpen,

    /// Local durable write failed
    #[error("Failed to persist session to {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },

    /// Network upload failed or the service rejected the session
    #[error("Upload failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upload { status: Option<u16>, message: String },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TrackerError>,
    },
}

impl TrackerError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TrackerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Upload { status, .. } => {
                // 4xx other than timeout/rate-limit means the payload itself was rejected
                !matches!(status, Some(s) if (400..500).contains(s) && *s != 408 && *s != 429)
            }
            TrackerError::NotReady(_) => true,
            TrackerError::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
