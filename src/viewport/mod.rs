//! Map viewport access
//!
//! The map widget itself lives outside this crate. It is reached through the
//! [`MapView`] trait, which exposes camera getters and a change-notification
//! channel. [`ViewportSnapshotter`] turns the getters into an all-or-nothing
//! [`ViewportSnapshot`]; [`ViewportListener`] owns a change subscription.

pub mod simulated;

pub use simulated::SimulatedMap;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, TrackerError};
use crate::sensors::{event_channel, EventSink};
use crate::types::{LngLat, LngLatBounds, ViewportSnapshot};

/// Kind of camera movement that just finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    PanEnd,
    ZoomEnd,
    RotateEnd,
}

/// What caused a camera movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeCause {
    /// Touch, mouse or keyboard input from the player
    UserGesture,
    /// Camera moved by code (fly-to, follow-me, fit-bounds)
    Programmatic,
}

/// A viewport-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportChange {
    pub kind: ChangeKind,
    pub cause: ChangeCause,
}

impl ViewportChange {
    pub fn user(kind: ChangeKind) -> Self {
        Self {
            kind,
            cause: ChangeCause::UserGesture,
        }
    }

    pub fn programmatic(kind: ChangeKind) -> Self {
        Self {
            kind,
            cause: ChangeCause::Programmatic,
        }
    }

    pub fn is_user(&self) -> bool {
        self.cause == ChangeCause::UserGesture
    }
}

/// Identifier of a registered change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The map widget, as seen by the recorder
///
/// Getters return `None` until the map has loaded.
pub trait MapView: Send + Sync {
    fn bounds(&self) -> Option<LngLatBounds>;
    fn center(&self) -> Option<LngLat>;
    fn zoom(&self) -> Option<f64>;
    fn bearing(&self) -> Option<f64>;
    fn pitch(&self) -> Option<f64>;

    /// Register for change notifications
    fn on_viewport_change(&self, sink: EventSink<ViewportChange>) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn off(&self, id: ListenerId);
}

/// Captures viewport snapshots on demand
#[derive(Clone)]
pub struct ViewportSnapshotter {
    map: Arc<dyn MapView>,
}

impl std::fmt::Debug for ViewportSnapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportSnapshotter").finish_non_exhaustive()
    }
}

impl ViewportSnapshotter {
    pub fn new(map: Arc<dyn MapView>) -> Self {
        Self { map }
    }

    /// Read the current camera state
    ///
    /// Fails with `NotReady` if any field is unavailable.
    pub fn capture(&self) -> Result<ViewportSnapshot> {
        let missing = |field: &str| TrackerError::NotReady(format!("map {} unavailable", field));

        Ok(ViewportSnapshot {
            bounds: self.map.bounds().ok_or_else(|| missing("bounds"))?,
            center: self.map.center().ok_or_else(|| missing("center"))?,
            zoom: self.map.zoom().ok_or_else(|| missing("zoom"))?,
            bearing: self.map.bearing().ok_or_else(|| missing("bearing"))?,
            pitch: self.map.pitch().ok_or_else(|| missing("pitch"))?,
        })
    }
}

/// Owned change subscription on a map
pub struct ViewportListener {
    map: Arc<dyn MapView>,
    id: Option<ListenerId>,
    rx: Receiver<ViewportChange>,
}

impl ViewportListener {
    /// Register a listener on the map
    pub fn attach(map: Arc<dyn MapView>) -> Self {
        let (sink, rx) = event_channel();
        let id = map.on_viewport_change(sink);
        tracing::debug!(?id, "Viewport listener attached");
        Self {
            map,
            id: Some(id),
            rx,
        }
    }

    /// Take all notifications delivered so far, in order
    pub fn drain(&self) -> Vec<ViewportChange> {
        if self.id.is_none() {
            return Vec::new();
        }
        self.rx.try_iter().collect()
    }

    /// Check if still registered
    pub fn is_attached(&self) -> bool {
        self.id.is_some()
    }

    /// Unregister; idempotent
    pub fn detach(&mut self) {
        if let Some(id) = self.id.take() {
            self.map.off(id);
            tracing::debug!(?id, "Viewport listener detached");
        }
    }
}

impl Drop for ViewportListener {
    fn drop(&mut self) {
        self.detach();
    }
}
