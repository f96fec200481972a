//! In-memory map view for testing without a map widget

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::sensors::EventSink;
use crate::types::{LngLat, LngLatBounds, ViewportSnapshot};

use super::{ChangeKind, ListenerId, MapView, ViewportChange};

/// Map view backed by a settable camera
///
/// Mirrors the behaviour of common web map libraries, including firing two
/// `zoom-end` notifications per user zoom gesture.
#[derive(Default)]
pub struct SimulatedMap {
    camera: Mutex<Option<ViewportSnapshot>>,
    listeners: Mutex<HashMap<ListenerId, EventSink<ViewportChange>>>,
    next_id: AtomicU64,
}

impl SimulatedMap {
    /// A map that has not finished loading
    pub fn new() -> Self {
        Self::default()
    }

    /// A map already showing `camera`
    pub fn loaded(camera: ViewportSnapshot) -> Self {
        let map = Self::new();
        map.set_camera(camera);
        map
    }

    /// Finish loading / jump to a camera state
    pub fn set_camera(&self, camera: ViewportSnapshot) {
        *self.camera.lock().unwrap_or_else(|e| e.into_inner()) = Some(camera);
    }

    /// Change the zoom level, if loaded
    pub fn set_zoom(&self, zoom: f64) {
        if let Some(camera) = self.camera.lock().unwrap_or_else(|e| e.into_inner()).as_mut() {
            camera.zoom = zoom;
        }
    }

    /// Move the center, shifting the bounds with it
    pub fn set_center(&self, center: LngLat) {
        if let Some(camera) = self.camera.lock().unwrap_or_else(|e| e.into_inner()).as_mut() {
            let d_lng = center.lng - camera.center.lng;
            let d_lat = center.lat - camera.center.lat;
            camera.center = center;
            camera.bounds = LngLatBounds::new(
                LngLat::new(camera.bounds.sw.lng + d_lng, camera.bounds.sw.lat + d_lat),
                LngLat::new(camera.bounds.ne.lng + d_lng, camera.bounds.ne.lat + d_lat),
            );
        }
    }

    /// Deliver a raw notification to every listener
    pub fn emit(&self, change: ViewportChange) {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for sink in listeners.values() {
            sink.deliver(change);
        }
    }

    /// A user drag ending
    pub fn user_pan(&self) {
        self.emit(ViewportChange::user(ChangeKind::PanEnd));
    }

    /// A user pinch/scroll zoom ending; fires `zoom-end` twice
    pub fn user_zoom(&self) {
        self.emit(ViewportChange::user(ChangeKind::ZoomEnd));
        self.emit(ViewportChange::user(ChangeKind::ZoomEnd));
    }

    /// A user two-finger rotation ending
    pub fn user_rotate(&self) {
        self.emit(ViewportChange::user(ChangeKind::RotateEnd));
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn camera(&self) -> Option<ViewportSnapshot> {
        *self.camera.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MapView for SimulatedMap {
    fn bounds(&self) -> Option<LngLatBounds> {
        self.camera().map(|c| c.bounds)
    }

    fn center(&self) -> Option<LngLat> {
        self.camera().map(|c| c.center)
    }

    fn zoom(&self) -> Option<f64> {
        self.camera().map(|c| c.zoom)
    }

    fn bearing(&self) -> Option<f64> {
        self.camera().map(|c| c.bearing)
    }

    fn pitch(&self) -> Option<f64> {
        self.camera().map(|c| c.pitch)
    }

    fn on_viewport_change(&self, sink: EventSink<ViewportChange>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, sink);
        id
    }

    fn off(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}
