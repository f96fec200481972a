//! Gameplay session recording
//!
//! A [`SessionRecorder`] captures one [`Session`] at a time:
//!
//! - `init` opens a session and subscribes to position, heading and map changes
//! - `set_task` switches the active task and zeroes the interaction counters
//! - `add_waypoint` / `add_event` append records stamped with the current
//!   position, viewport, heading and counters
//! - `finish` releases every subscription and seals the session
//!
//! Sealed sessions are exported with [`crate::export::SessionExporter`].

pub mod recorder;
pub mod types;

pub use recorder::SessionRecorder;
pub use types::{
    Event, Payload, RecordContext, RecorderState, Session, SessionSummary, Task, Waypoint,
    RESERVED_KEYS,
};
