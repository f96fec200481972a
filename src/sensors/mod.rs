//! Sensor streams for position and heading
//!
//! Platform sensors deliver readings on their own threads. Each delivery is
//! pushed into a bounded crossbeam channel owned by the consuming stream, so a
//! sensor callback never blocks and never contends with the recorder. The
//! stream applies pending readings whenever its owner polls it. Once
//! [`EVENT_QUEUE_CAPACITY`] deliveries are pending, further ones are dropped
//! until the owner polls again.
//!
//! # Components
//!
//! - [`PositionSource`] / [`OrientationSource`] - Platform collaborators that
//!   start and stop native watches
//! - [`EventSink`] - Sending half handed to a platform watch
//! - [`GeoStream`] - Position subscription, last-value-wins
//! - [`HeadingStream`] - Heading subscription with threshold smoothing
//! - [`simulated`] - In-process sources for tests and the `simulate` command
//!
//! # Cancellation
//!
//! Unsubscribing clears the platform watch and drops the receiving half of the
//! channel. A reading that was already in flight fails to enqueue and is lost,
//! which is exactly what a finished session wants.

pub mod geo_stream;
pub mod heading_stream;
pub mod simulated;

pub use geo_stream::GeoStream;
pub use heading_stream::{circular_diff, HeadingSmoother, HeadingStream, DEFAULT_HEADING_THRESHOLD_DEG};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::SensorError;
use crate::types::Position;

/// Maximum deliveries held per channel between polls
pub const EVENT_QUEUE_CAPACITY: usize = 4096;

/// A single delivery from a platform sensor
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent<T> {
    /// A new reading
    Sample(T),
    /// The sensor failed; the watch may or may not continue afterwards
    Error(SensorError),
}

/// Sending half of a sensor or viewport channel
///
/// Cloneable and cheap; platform adapters keep one per watch.
#[derive(Debug)]
pub struct EventSink<T> {
    tx: Sender<T>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSink<T> {
    /// Deliver an event
    ///
    /// Returns false if the consumer has gone away or its queue is full; the
    /// event is discarded.
    pub fn deliver(&self, event: T) -> bool {
        self.tx.try_send(event).is_ok()
    }

    /// True once the receiving half has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }
}

impl<T> EventSink<SensorEvent<T>> {
    /// Deliver a reading
    pub fn sample(&self, value: T) -> bool {
        self.deliver(SensorEvent::Sample(value))
    }

    /// Deliver a sensor failure
    pub fn error(&self, error: SensorError) -> bool {
        self.deliver(SensorEvent::Error(error))
    }
}

/// Create a connected sink/receiver pair
pub fn event_channel<T>() -> (EventSink<T>, Receiver<T>) {
    let (tx, rx) = bounded(EVENT_QUEUE_CAPACITY);
    (EventSink { tx }, rx)
}

/// Platform-assigned identifier of a native watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Opaque handle returned by `subscribe`
///
/// Handles are unique for the lifetime of the process, so a stale handle
/// from an earlier subscription never cancels a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl SubscriptionHandle {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Options for a position watch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    /// Request GPS-grade accuracy
    pub high_accuracy: bool,
    /// Give up on a fix after this long
    pub timeout: Option<Duration>,
    /// Accept cached fixes up to this age
    pub maximum_age: Option<Duration>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: None,
            maximum_age: None,
        }
    }
}

/// Platform geolocation source
pub trait PositionSource: Send + Sync {
    /// Start a continuous watch delivering into `sink`
    fn watch(
        &self,
        options: WatchOptions,
        sink: EventSink<SensorEvent<Position>>,
    ) -> std::result::Result<WatchId, SensorError>;

    /// Stop a watch; unknown ids are ignored
    fn clear_watch(&self, id: WatchId);
}

/// Platform compass / orientation source delivering degrees
pub trait OrientationSource: Send + Sync {
    /// Start a continuous watch delivering into `sink`
    fn watch(&self, sink: EventSink<SensorEvent<f64>>) -> std::result::Result<WatchId, SensorError>;

    /// Stop a watch; unknown ids are ignored
    fn clear_watch(&self, id: WatchId);
}

/// Live subscription: platform watch plus the receiving half of its channel
#[derive(Debug)]
pub(crate) struct Subscription<T> {
    pub handle: SubscriptionHandle,
    pub watch_id: WatchId,
    pub rx: Receiver<SensorEvent<T>>,
}

/// Delivery statistics for a sensor stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorStats {
    /// Readings applied to the stream
    pub samples_received: u64,
    /// Errors surfaced by the platform
    pub errors: u64,
    /// Readings dropped as noise or invalid
    pub discarded: u64,
    /// Wall time of the most recent reading
    pub last_sample_at: Option<DateTime<Utc>>,
    /// Most recent platform error
    pub last_error: Option<SensorError>,
}

impl SensorStats {
    /// Record an applied reading
    pub fn record_sample(&mut self) {
        self.samples_received += 1;
        self.last_sample_at = Some(Utc::now());
    }

    /// Record a platform error
    pub fn record_error(&mut self, error: SensorError) {
        self.errors += 1;
        self.last_error = Some(error);
    }

    /// Record a dropped reading
    pub fn record_discarded(&mut self) {
        self.discarded += 1;
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
