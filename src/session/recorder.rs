//! Session recorder for capturing gameplay sessions
//!
//! The recorder owns the position and heading subscriptions and the viewport
//! listener for the duration of a session. Sensor deliveries queue up in
//! channels and are applied, in order, at the start of every operation that
//! observes recorder state. All mutation therefore happens on the owner's
//! thread and counter resets can never interleave with increments.

use chrono::Utc;
use std::sync::Arc;

use crate::config::TrackingConfig;
use crate::error::{Result, TrackerError};
use crate::export::{ExportResult, SessionExporter};
use crate::interaction::InteractionCounter;
use crate::sensors::{GeoStream, HeadingStream, OrientationSource, PositionSource, SensorStats};
use crate::types::{DeviceInfoProvider, InteractionCounters, Position};
use crate::viewport::{MapView, ViewportListener, ViewportSnapshotter};

use super::types::{Event, Payload, RecordContext, RecorderState, Session, Task, Waypoint, RESERVED_KEYS};

/// Map bindings held while a session is active
struct ViewportBinding {
    snapshotter: ViewportSnapshotter,
    listener: ViewportListener,
}

/// Records one gameplay session at a time
pub struct SessionRecorder {
    state: RecorderState,
    high_accuracy: bool,
    geo: GeoStream,
    heading: HeadingStream,
    device: Arc<dyn DeviceInfoProvider>,
    counter: InteractionCounter,
    viewport: Option<ViewportBinding>,
    session: Option<Session>,
    task: Option<Task>,
    exporter: Option<SessionExporter>,
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder")
            .field("state", &self.state)
            .field("geo", &self.geo)
            .field("heading", &self.heading)
            .field("counter", &self.counter)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl SessionRecorder {
    /// Create a recorder with default tracking settings
    pub fn new(
        positions: Arc<dyn PositionSource>,
        orientation: Arc<dyn OrientationSource>,
        device: Arc<dyn DeviceInfoProvider>,
    ) -> Self {
        Self::with_config(positions, orientation, device, &TrackingConfig::default())
    }

    /// Create a recorder with specific tracking settings
    pub fn with_config(
        positions: Arc<dyn PositionSource>,
        orientation: Arc<dyn OrientationSource>,
        device: Arc<dyn DeviceInfoProvider>,
        config: &TrackingConfig,
    ) -> Self {
        Self {
            state: RecorderState::Uninitialized,
            high_accuracy: config.high_accuracy,
            geo: GeoStream::new(positions),
            heading: HeadingStream::with_threshold(orientation, config.heading_threshold_deg),
            device,
            counter: InteractionCounter::new(),
            viewport: None,
            session: None,
            task: None,
            exporter: None,
        }
    }

    /// Attach the exporter used by [`SessionRecorder::export`]
    pub fn with_exporter(mut self, exporter: SessionExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Get current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Check if recording
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Start a new session
    ///
    /// Sensor subscription failures are logged and tolerated; the session
    /// records without that sensor.
    pub fn init(
        &mut self,
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        map: Arc<dyn MapView>,
        players: Vec<String>,
    ) -> Result<()> {
        if self.state.is_active() {
            tracing::warn!("init called on an active recorder");
            return Err(TrackerError::AlreadyInitialized);
        }

        self.geo.reset();
        self.heading.reset();
        self.counter.reset();
        self.task = None;

        if let Err(e) = self.geo.subscribe(self.high_accuracy) {
            tracing::warn!("Recording without position: {}", e);
        }
        if let Err(e) = self.heading.subscribe() {
            tracing::warn!("Recording without heading: {}", e);
        }

        self.viewport = Some(ViewportBinding {
            snapshotter: ViewportSnapshotter::new(map.clone()),
            listener: ViewportListener::attach(map),
        });

        let session = Session::new(game_id, game_name, self.device.device_info(), players);
        tracing::info!(
            game = session.game_id(),
            name = session.game_name(),
            players = session.players().len(),
            "Session started"
        );
        self.session = Some(session);
        self.state = RecorderState::Active;
        Ok(())
    }

    /// Switch to a new task, zeroing the interaction counters
    pub fn set_task(&mut self, task: Task) -> Result<()> {
        self.require_active("set task")?;

        // Deliveries that arrived before this call belong to the previous task
        self.ingest();
        self.counter.reset();
        tracing::debug!(?task, "Task changed");
        self.task = Some(task);
        Ok(())
    }

    /// Record a location checkpoint
    ///
    /// Outside an active session this logs a warning and returns a state
    /// error without touching any data.
    pub fn add_waypoint(&mut self, payload: Payload) -> Result<()> {
        self.require_active("add waypoint")?;
        let context = self.capture_context()?;
        let waypoint = Waypoint {
            context,
            payload: strip_reserved(payload),
        };

        if let Some(session) = self.session.as_mut() {
            session.push_waypoint(waypoint);
            tracing::debug!(count = session.waypoints().len(), "Waypoint recorded");
        }
        Ok(())
    }

    /// Record a gameplay event, tagged with the active task
    pub fn add_event(&mut self, payload: Payload) -> Result<()> {
        self.require_active("add event")?;
        let context = self.capture_context()?;
        let event = Event {
            context,
            task: self.task.clone(),
            payload: strip_reserved(payload),
        };

        if let Some(session) = self.session.as_mut() {
            session.push_event(event);
            tracing::debug!(count = session.events().len(), "Event recorded");
        }
        Ok(())
    }

    /// Stop all streams and seal the session
    ///
    /// Nothing delivered after this returns is ever applied.
    pub fn finish(&mut self) -> Result<Session> {
        self.require_active("finish")?;
        self.release_streams();

        let mut session = self.session.take().ok_or(TrackerError::State {
            operation: "finish",
            state: self.state,
        })?;
        session.seal(Utc::now());
        self.state = RecorderState::Finished;

        tracing::info!(
            waypoints = session.waypoints().len(),
            events = session.events().len(),
            "Session finished"
        );
        Ok(session)
    }

    /// Persist and upload a sealed session with the attached exporter
    ///
    /// The session need not come from this recorder.
    pub fn export(&self, session: &Session) -> Result<ExportResult> {
        let exporter = self
            .exporter
            .as_ref()
            .ok_or_else(|| TrackerError::Config("no exporter configured".to_string()))?;
        exporter.export(session)
    }

    /// Apply every pending sensor and map delivery
    ///
    /// Delivery queues are bounded, so hosts should call this from their frame
    /// or tick loop when records are sparse. Does nothing outside an active
    /// session.
    pub fn pump(&mut self) {
        if self.state.is_active() {
            self.ingest();
        }
    }

    /// Current interaction counters, including pending deliveries
    pub fn interaction(&mut self) -> InteractionCounters {
        if self.state.is_active() {
            self.ingest();
        }
        self.counter.snapshot()
    }

    /// Most recent position fix, including pending deliveries
    pub fn latest_position(&mut self) -> Option<Position> {
        if self.state.is_active() {
            self.ingest();
        }
        self.geo.latest()
    }

    /// Most recent compass heading
    pub fn heading(&mut self) -> Option<f64> {
        if self.state.is_active() {
            self.ingest();
        }
        self.heading.current()
    }

    /// Active task, if any
    pub fn current_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// The open session, if recording
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Position delivery statistics
    pub fn position_stats(&self) -> &SensorStats {
        self.geo.stats()
    }

    /// Heading delivery statistics
    pub fn heading_stats(&self) -> &SensorStats {
        self.heading.stats()
    }

    /// Check if any stream or listener is still live
    pub fn has_live_subscriptions(&self) -> bool {
        self.geo.is_active()
            || self.heading.is_active()
            || self
                .viewport
                .as_ref()
                .is_some_and(|v| v.listener.is_attached())
    }

    fn require_active(&self, operation: &'static str) -> Result<()> {
        if self.state.is_active() {
            return Ok(());
        }
        tracing::warn!("Ignoring {} while recorder is {}", operation, self.state);
        Err(TrackerError::State {
            operation,
            state: self.state,
        })
    }

    /// Apply every delivery queued since the last call
    fn ingest(&mut self) {
        self.geo.poll();
        let rotation = self.heading.poll();
        self.counter.add_rotation(rotation);

        if let Some(binding) = &self.viewport {
            for change in binding.listener.drain() {
                self.counter.observe(change);
            }
        }
    }

    fn capture_context(&mut self) -> Result<RecordContext> {
        self.ingest();

        let binding = self.viewport.as_ref().ok_or_else(|| {
            TrackerError::NotReady("no map attached to the recorder".to_string())
        })?;
        let viewport = binding.snapshotter.capture().map_err(|e| {
            tracing::warn!("Record skipped: {}", e);
            e
        })?;

        Ok(RecordContext {
            timestamp: Utc::now(),
            position: self.geo.latest(),
            viewport,
            heading: self.heading.current(),
            interaction: self.counter.snapshot(),
        })
    }

    fn release_streams(&mut self) {
        self.geo.stop();
        self.heading.stop();
        if let Some(binding) = self.viewport.as_mut() {
            binding.listener.detach();
        }
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        self.release_streams();
    }
}

/// Remove payload keys the recorder writes itself
fn strip_reserved(mut payload: Payload) -> Payload {
    for key in RESERVED_KEYS {
        if payload.remove(*key).is_some() {
            tracing::debug!(key, "Dropped reserved payload key");
        }
    }
    payload
}
