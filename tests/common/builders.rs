//! Test data builders for recorder scenarios

use gametrack_rs::export::SessionExporter;
use gametrack_rs::sensors::simulated::ManualSource;
use gametrack_rs::session::{Payload, SessionRecorder};
use gametrack_rs::types::{DeviceInfo, LngLat, LngLatBounds, Position, ViewportSnapshot};
use gametrack_rs::viewport::SimulatedMap;
use serde_json::{json, Value};
use std::sync::Arc;

/// Builder for record payloads
#[derive(Default)]
pub struct PayloadBuilder {
    payload: Payload,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for an event payload with a `type` field
    pub fn event(kind: &str) -> Self {
        Self::new().field("type", json!(kind))
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Payload {
        self.payload
    }
}

/// Default camera used by test maps
pub fn test_camera() -> ViewportSnapshot {
    ViewportSnapshot {
        bounds: LngLatBounds::new(LngLat::new(7.60, 51.95), LngLat::new(7.65, 51.97)),
        center: LngLat::new(7.625, 51.96),
        zoom: 15.0,
        bearing: 0.0,
        pitch: 0.0,
    }
}

/// A recorder wired to manual sensors and an in-memory map
pub struct TestRig {
    pub positions: Arc<ManualSource<Position>>,
    pub compass: Arc<ManualSource<f64>>,
    pub map: Arc<SimulatedMap>,
    pub recorder: SessionRecorder,
}

impl TestRig {
    pub fn new() -> Self {
        Self::with_map(SimulatedMap::loaded(test_camera()))
    }

    pub fn with_map(map: SimulatedMap) -> Self {
        let positions = Arc::new(ManualSource::<Position>::new());
        let compass = Arc::new(ManualSource::<f64>::new());
        let map = Arc::new(map);
        let recorder = SessionRecorder::new(
            positions.clone(),
            compass.clone(),
            Arc::new(DeviceInfo::new("test", "rig", "1.0")),
        );

        Self {
            positions,
            compass,
            map,
            recorder,
        }
    }

    /// Attach an exporter to the recorder
    pub fn with_exporter(mut self, exporter: SessionExporter) -> Self {
        self.recorder = self.recorder.with_exporter(exporter);
        self
    }

    /// Start a session named "Test Game" with one player
    pub fn start(&mut self) {
        self.recorder
            .init("game-1", "Test Game", self.map.clone(), vec!["player-1".to_string()])
            .expect("init should succeed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_builder() {
        let payload = PayloadBuilder::event("START").field("step", json!(1)).build();
        assert_eq!(payload.get("type"), Some(&json!("START")));
        assert_eq!(payload.get("step"), Some(&json!(1)));
    }
}
