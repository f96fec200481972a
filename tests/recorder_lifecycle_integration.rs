//! Integration tests for the recorder lifecycle
//!
//! These tests drive a recorder through complete sessions:
//! - init, task switches, records and finish
//! - rejected calls outside an active session
//! - sensor failures and late deliveries

mod common;

use common::builders::{PayloadBuilder, TestRig};
use common::fakes::{MemoryStorage, RecordingUploader};
use gametrack_rs::error::{SensorError, SensorKind};
use gametrack_rs::export::SessionExporter;
use gametrack_rs::session::{Payload, RecorderState};
use gametrack_rs::types::Position;
use gametrack_rs::viewport::SimulatedMap;
use gametrack_rs::TrackerError;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_full_session_scenario() {
    let storage = Arc::new(MemoryStorage::new());
    let uploader = Arc::new(RecordingUploader::new());
    let mut rig =
        TestRig::new().with_exporter(SessionExporter::new(storage.clone(), uploader.clone()));

    rig.start();
    rig.recorder.set_task(json!({"id": "A"})).unwrap();
    rig.positions.push(Position::new(51.96, 7.62, 5.0));
    rig.recorder
        .add_waypoint(PayloadBuilder::new().field("name", json!("p1")).build())
        .unwrap();

    for _ in 0..3 {
        rig.map.user_pan();
    }
    rig.recorder
        .add_event(PayloadBuilder::event("e1").build())
        .unwrap();

    thread::sleep(Duration::from_millis(5));
    let session = rig.recorder.finish().unwrap();

    assert_eq!(session.waypoints().len(), 1);
    assert_eq!(session.waypoints()[0].payload.get("name"), Some(&json!("p1")));
    assert_eq!(session.events().len(), 1);
    assert_eq!(session.events()[0].payload.get("type"), Some(&json!("e1")));
    assert_eq!(session.events()[0].context.interaction.pan_count, 3);
    assert_eq!(session.events()[0].task, Some(json!({"id": "A"})));
    assert!(session.end_time().unwrap() > session.start_time());

    let result = rig.recorder.export(&session).unwrap();
    assert!(result.is_complete());
    assert_eq!(storage.paths().len(), 1);

    let uploaded = uploader.last_json().unwrap();
    assert_eq!(uploaded["game"], json!("game-1"));
    assert_eq!(uploaded["playersCount"], json!(1));
    assert_eq!(uploaded["events"][0]["interaction"]["panCount"], json!(3));
    assert_eq!(uploaded["waypoints"][0]["position"]["latitude"], json!(51.96));
    assert_eq!(uploaded["events"][0]["interaction"]["rotationCount"], json!(0.0));
    assert_eq!(uploaded["waypoints"][0]["interaction"]["rotation"], json!(0.0));
    assert_eq!(uploaded["events"][0]["task"]["id"], json!("A"));
}

#[test]
fn test_calls_outside_session_leave_no_trace() {
    let mut rig = TestRig::new();

    assert!(rig.recorder.add_waypoint(Payload::new()).is_err());
    assert!(rig.recorder.add_event(Payload::new()).is_err());
    assert!(rig.recorder.finish().is_err());
    assert_eq!(rig.recorder.state(), RecorderState::Uninitialized);

    rig.start();
    rig.recorder.add_waypoint(Payload::new()).unwrap();
    let session = rig.recorder.finish().unwrap();

    let err = rig.recorder.add_waypoint(Payload::new()).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::State {
            state: RecorderState::Finished,
            ..
        }
    ));
    assert_eq!(session.waypoints().len(), 1);
}

#[test]
fn test_task_switch_zeroes_counters_only() {
    let mut rig = TestRig::new();
    rig.start();

    rig.recorder.set_task(json!("first")).unwrap();
    rig.map.user_pan();
    rig.map.user_zoom();
    rig.compass.push(0.0);
    rig.compass.push(40.0);
    rig.recorder.add_event(PayloadBuilder::event("mid").build()).unwrap();
    rig.recorder.add_waypoint(Payload::new()).unwrap();

    rig.recorder.set_task(json!("second")).unwrap();
    let counters = rig.recorder.interaction();
    assert_eq!(counters.pan_count, 0);
    assert_eq!(counters.zoom_count, 0);
    assert_eq!(counters.rotation_accum_deg, 0.0);

    let session = rig.recorder.finish().unwrap();
    assert_eq!(session.events().len(), 1);
    assert_eq!(session.waypoints().len(), 1);

    let recorded = session.events()[0].context.interaction;
    assert_eq!(recorded.pan_count, 1);
    assert_eq!(recorded.zoom_count, 1);
    common::assert_float_eq(recorded.rotation_accum_deg, 40.0, 1e-9);
}

#[test]
fn test_programmatic_camera_moves_not_counted() {
    let mut rig = TestRig::new();
    rig.start();

    rig.map.emit(gametrack_rs::viewport::ViewportChange::programmatic(
        gametrack_rs::viewport::ChangeKind::PanEnd,
    ));
    rig.map.user_pan();

    assert_eq!(rig.recorder.interaction().pan_count, 1);
}

#[test]
fn test_map_rotate_gesture_not_counted() {
    let mut rig = TestRig::new();
    rig.start();

    rig.map.user_rotate();
    rig.map.user_rotate();
    rig.recorder
        .add_event(PayloadBuilder::event("spun map").build())
        .unwrap();

    let counters = rig.recorder.interaction();
    assert_eq!(counters.pan_count, 0);
    assert_eq!(counters.zoom_count, 0);
    assert_eq!(counters.rotation_accum_deg, 0.0);

    let session = rig.recorder.finish().unwrap();
    assert_eq!(session.events()[0].context.interaction.rotation_accum_deg, 0.0);
}

#[test]
fn test_heading_jitter_not_counted_as_rotation() {
    let mut rig = TestRig::new();
    rig.start();

    for heading in [10.0, 20.0, 5.0] {
        rig.compass.push(heading);
    }
    assert_eq!(rig.recorder.interaction().rotation_accum_deg, 0.0);

    rig.recorder.set_task(json!("turning")).unwrap();
    for heading in [10.0, 30.0, 5.0] {
        rig.compass.push(heading);
    }
    common::assert_float_eq(rig.recorder.interaction().rotation_accum_deg, 45.0, 1e-9);
}

#[test]
fn test_sensor_errors_do_not_end_session() {
    let mut rig = TestRig::new();
    rig.start();

    rig.positions.fail(SensorError::Timeout {
        sensor: SensorKind::Position,
    });
    rig.recorder.add_waypoint(Payload::new()).unwrap();
    assert_eq!(rig.recorder.position_stats().errors, 1);

    rig.positions.push(Position::new(51.0, 7.0, 8.0));
    rig.recorder.add_waypoint(Payload::new()).unwrap();

    let session = rig.recorder.finish().unwrap();
    assert!(session.waypoints()[0].context.position.is_none());
    assert!(session.waypoints()[1].context.position.is_some());
}

#[test]
fn test_permission_denied_records_without_position() {
    let mut rig = TestRig::new();
    rig.positions.deny(true);
    rig.start();

    rig.compass.push(200.0);
    rig.recorder.add_waypoint(Payload::new()).unwrap();
    let session = rig.recorder.finish().unwrap();

    let context = &session.waypoints()[0].context;
    assert!(context.position.is_none());
    assert_eq!(context.heading, Some(200.0));
}

#[test]
fn test_deliveries_after_finish_are_dropped() {
    let mut rig = TestRig::new();
    rig.start();
    rig.recorder.finish().unwrap();

    assert_eq!(rig.positions.active_watches(), 0);
    assert_eq!(rig.positions.push(Position::new(1.0, 1.0, 1.0)), 0);
    assert_eq!(rig.map.listener_count(), 0);
    rig.map.user_pan();
    assert_eq!(rig.recorder.interaction().pan_count, 0);
}

#[test]
fn test_record_skipped_until_map_loads() {
    let mut rig = TestRig::with_map(SimulatedMap::new());
    rig.start();

    let err = rig.recorder.add_event(PayloadBuilder::event("early").build()).unwrap_err();
    assert!(matches!(err, TrackerError::NotReady(_)));

    rig.map.set_camera(common::builders::test_camera());
    rig.recorder.add_event(PayloadBuilder::event("ready").build()).unwrap();

    let session = rig.recorder.finish().unwrap();
    assert_eq!(session.events().len(), 1);
    assert_eq!(session.events()[0].payload.get("type"), Some(&json!("ready")));
}

#[test]
fn test_recorder_reusable_after_finish() {
    let mut rig = TestRig::new();
    rig.start();
    rig.map.user_pan();
    rig.recorder.add_waypoint(Payload::new()).unwrap();
    let first = rig.recorder.finish().unwrap();

    rig.start();
    assert_eq!(rig.recorder.interaction().pan_count, 0);
    rig.recorder.add_waypoint(Payload::new()).unwrap();
    let second = rig.recorder.finish().unwrap();

    assert_eq!(first.waypoints().len(), 1);
    assert_eq!(second.waypoints().len(), 1);
    assert!(second.start_time() >= first.start_time());
}

#[test]
fn test_scripted_sources_feed_recorder() {
    use gametrack_rs::sensors::simulated::{straight_walk, sweeping_compass};
    use gametrack_rs::session::SessionRecorder;
    use gametrack_rs::types::DeviceInfo;

    let interval = Duration::from_millis(2);
    let map = Arc::new(SimulatedMap::loaded(common::builders::test_camera()));
    let mut recorder = SessionRecorder::new(
        Arc::new(straight_walk(51.96, 7.62, 90.0, 3.0, 10_000, interval)),
        Arc::new(sweeping_compass(90.0, 10.0, 8, interval)),
        Arc::new(DeviceInfo::new("sim", "scripted", "0")),
    );

    recorder.init("g", "Scripted", map, Vec::new()).unwrap();
    thread::sleep(common::test_timeout());
    recorder.add_waypoint(Payload::new()).unwrap();
    let session = recorder.finish().unwrap();

    let position = session.waypoints()[0].context.position.unwrap();
    assert!(position.longitude > 7.62);
    // Sweep of +-10 never crosses the 15 degree threshold
    assert_eq!(session.waypoints()[0].context.interaction.rotation_accum_deg, 0.0);
}
