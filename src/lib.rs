//! # gametrack-rs: gameplay session telemetry recorder
//!
//! Records what a player does during a location-based game: where they walk,
//! which way they face, how they move the map and what happens in the game.
//! A finished session is written to local storage and uploaded to the game
//! backend as one JSON document.
//!
//! ## Architecture
//!
//! - **Sensors**: position and compass sources push readings into channels
//!   owned by cancelable streams; the heading stream filters jitter
//! - **Viewport**: camera snapshots and change notifications from the map view
//! - **Interaction**: per-task pan/zoom/rotation counters
//! - **Session**: the recorder state machine and the session data model
//! - **Export**: durable local write followed by upload
//!
//! Platform collaborators (sensors, map, device info, storage, network) sit
//! behind traits; simulated implementations live next to each trait.
//!
//! ## Example
//!
//! ```ignore
//! use gametrack_rs::{
//!     config::AppConfig,
//!     export::SessionExporter,
//!     session::SessionRecorder,
//!     types::HostDeviceInfo,
//! };
//!
//! let config = AppConfig::load_or_default();
//! let mut recorder = SessionRecorder::with_config(positions, compass, Arc::new(HostDeviceInfo), &config.tracking)
//!     .with_exporter(SessionExporter::from_config(&config)?);
//!
//! recorder.init("g1", "Harbour Walk", map, vec!["p1".into()])?;
//! recorder.set_task(json!({"id": "t1"}))?;
//! recorder.add_waypoint(Payload::new())?;
//! let session = recorder.finish()?;
//! let result = recorder.export(&session)?;
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod geo;
pub mod interaction;
pub mod sensors;
pub mod session;
pub mod types;
pub mod viewport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Result, SensorError, TrackerError};
pub use export::{ExportResult, SessionExporter};
pub use session::{Payload, RecorderState, Session, SessionRecorder};
pub use types::{DeviceInfo, Position, ViewportSnapshot};
