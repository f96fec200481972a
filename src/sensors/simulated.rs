//! Simulated sensor sources for testing without device hardware
//!
//! # Sources
//!
//! - [`ManualSource`] - Readings are pushed explicitly by the caller, on the
//!   caller's thread. Deterministic; used throughout the test suite.
//! - [`ScriptedSource`] - A background thread per watch plays readings from a
//!   generator at a fixed interval. Used by the `simulate` command.
//!
//! Both implement [`PositionSource`] for `Position` readings and
//! [`OrientationSource`] for `f64` headings.
//!
//! # Example
//!
//! ```ignore
//! use gametrack_rs::sensors::simulated::ManualSource;
//!
//! let compass = Arc::new(ManualSource::<f64>::new());
//! let mut stream = HeadingStream::new(compass.clone());
//! stream.subscribe()?;
//!
//! compass.push(10.0);
//! compass.push(30.0);
//! assert_eq!(stream.poll(), 20.0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::error::{SensorError, SensorKind};
use crate::geo;
use crate::types::Position;

use super::{EventSink, OrientationSource, PositionSource, SensorEvent, WatchId, WatchOptions};

/// Source whose readings are pushed by hand
pub struct ManualSource<T> {
    watches: Mutex<HashMap<WatchId, EventSink<SensorEvent<T>>>>,
    next_id: AtomicU64,
    denied: AtomicBool,
    last_options: Mutex<Option<WatchOptions>>,
}

impl<T> Default for ManualSource<T> {
    fn default() -> Self {
        Self {
            watches: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            denied: AtomicBool::new(false),
            last_options: Mutex::new(None),
        }
    }
}

impl<T: Clone> ManualSource<T> {
    /// Create a source with no watches
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent watches fail with permission denied
    pub fn deny(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Deliver a reading to every live watch
    ///
    /// Returns the number of watches that accepted it.
    pub fn push(&self, value: T) -> usize {
        let watches = self.watches.lock().unwrap_or_else(|e| e.into_inner());
        watches
            .values()
            .filter(|sink| sink.sample(value.clone()))
            .count()
    }

    /// Deliver an error to every live watch
    pub fn fail(&self, error: SensorError) -> usize {
        let watches = self.watches.lock().unwrap_or_else(|e| e.into_inner());
        watches
            .values()
            .filter(|sink| sink.error(error.clone()))
            .count()
    }

    /// Number of watches not yet cleared
    pub fn active_watches(&self) -> usize {
        self.watches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Options passed to the most recent position watch
    pub fn last_options(&self) -> Option<WatchOptions> {
        *self.last_options.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a copy of a live sink, as a platform callback would hold it
    ///
    /// Lets tests deliver a reading after the watch has been cleared.
    pub fn sink(&self, id: WatchId) -> Option<EventSink<SensorEvent<T>>> {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    /// Ids of the live watches
    pub fn watch_ids(&self) -> Vec<WatchId> {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }

    fn start(
        &self,
        sensor: SensorKind,
        sink: EventSink<SensorEvent<T>>,
    ) -> Result<WatchId, SensorError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(SensorError::PermissionDenied { sensor });
        }
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, sink);
        Ok(id)
    }

    fn clear(&self, id: WatchId) {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }
}

impl PositionSource for ManualSource<Position> {
    fn watch(
        &self,
        options: WatchOptions,
        sink: EventSink<SensorEvent<Position>>,
    ) -> Result<WatchId, SensorError> {
        *self.last_options.lock().unwrap_or_else(|e| e.into_inner()) = Some(options);
        self.start(SensorKind::Position, sink)
    }

    fn clear_watch(&self, id: WatchId) {
        self.clear(id);
    }
}

impl OrientationSource for ManualSource<f64> {
    fn watch(&self, sink: EventSink<SensorEvent<f64>>) -> Result<WatchId, SensorError> {
        self.start(SensorKind::Heading, sink)
    }

    fn clear_watch(&self, id: WatchId) {
        self.clear(id);
    }
}

/// Generator producing the reading for a tick, or `None` to end the stream
pub type SampleGenerator<T> = Arc<dyn Fn(usize) -> Option<T> + Send + Sync>;

/// Source that plays generated readings on a background thread
pub struct ScriptedSource<T> {
    generator: SampleGenerator<T>,
    interval: Duration,
    running: Mutex<HashMap<WatchId, Arc<AtomicBool>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> ScriptedSource<T> {
    /// Play readings produced by `generator` every `interval`
    pub fn from_fn<F>(interval: Duration, generator: F) -> Self
    where
        F: Fn(usize) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            generator: Arc::new(generator),
            interval,
            running: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Play a fixed list of readings once
    pub fn from_samples(samples: Vec<T>, interval: Duration) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_fn(interval, move |tick| samples.get(tick).cloned())
    }

    fn start(&self, sink: EventSink<SensorEvent<T>>) -> WatchId {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stop = Arc::new(AtomicBool::new(false));
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, stop.clone());

        let generator = self.generator.clone();
        let interval = self.interval;
        std::thread::spawn(move || {
            let mut tick = 0;
            while !stop.load(Ordering::SeqCst) {
                let Some(value) = generator(tick) else {
                    break;
                };
                if !sink.sample(value) && sink.is_closed() {
                    break;
                }
                tick += 1;
                std::thread::sleep(interval);
            }
            tracing::trace!(?id, ticks = tick, "Scripted watch ended");
        });
        id
    }

    fn clear(&self, id: WatchId) {
        if let Some(stop) = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
        {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

impl<T> Drop for ScriptedSource<T> {
    fn drop(&mut self) {
        let running = self.running.get_mut().unwrap_or_else(|e| e.into_inner());
        for stop in running.values() {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

impl PositionSource for ScriptedSource<Position> {
    fn watch(
        &self,
        _options: WatchOptions,
        sink: EventSink<SensorEvent<Position>>,
    ) -> Result<WatchId, SensorError> {
        Ok(self.start(sink))
    }

    fn clear_watch(&self, id: WatchId) {
        self.clear(id);
    }
}

impl OrientationSource for ScriptedSource<f64> {
    fn watch(&self, sink: EventSink<SensorEvent<f64>>) -> Result<WatchId, SensorError> {
        Ok(self.start(sink))
    }

    fn clear_watch(&self, id: WatchId) {
        self.clear(id);
    }
}

/// A walker moving in a straight line, one fix per tick
pub fn straight_walk(
    start_lat: f64,
    start_lon: f64,
    bearing_deg: f64,
    step_m: f64,
    steps: usize,
    interval: Duration,
) -> ScriptedSource<Position> {
    ScriptedSource::from_fn(interval, move |tick| {
        if tick >= steps {
            return None;
        }
        let (lat, lon) = geo::destination(start_lat, start_lon, bearing_deg, step_m * tick as f64);
        Some(Position::with_timestamp(lat, lon, 4.0, Utc::now()))
    })
}

/// A compass sweeping back and forth by `amplitude_deg` around `center_deg`
pub fn sweeping_compass(
    center_deg: f64,
    amplitude_deg: f64,
    period_ticks: usize,
    interval: Duration,
) -> ScriptedSource<f64> {
    let period = period_ticks.max(1) as f64;
    ScriptedSource::from_fn(interval, move |tick| {
        let phase = (tick as f64 / period) * std::f64::consts::TAU;
        Some(geo::normalize_degrees(center_deg + amplitude_deg * phase.sin()))
    })
}
