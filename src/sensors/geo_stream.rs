//! Position stream over a platform geolocation source

use std::sync::Arc;

use crate::error::Result;
use crate::types::Position;

use super::{event_channel, PositionSource, SensorEvent, SensorStats, Subscription, SubscriptionHandle, WatchOptions};

/// Cancelable position subscription holding the most recent fix
pub struct GeoStream {
    source: Arc<dyn PositionSource>,
    subscription: Option<Subscription<Position>>,
    latest: Option<Position>,
    stats: SensorStats,
}

impl std::fmt::Debug for GeoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoStream")
            .field("active", &self.is_active())
            .field("latest", &self.latest)
            .field("stats", &self.stats)
            .finish()
    }
}

impl GeoStream {
    /// Create a stream over a position source (not yet subscribed)
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source,
            subscription: None,
            latest: None,
            stats: SensorStats::default(),
        }
    }

    /// Start receiving fixes
    ///
    /// Subscribing while already active returns the existing handle.
    pub fn subscribe(&mut self, high_accuracy: bool) -> Result<SubscriptionHandle> {
        if let Some(sub) = &self.subscription {
            return Ok(sub.handle);
        }

        let options = WatchOptions {
            high_accuracy,
            ..WatchOptions::default()
        };
        let (sink, rx) = event_channel();
        let watch_id = self.source.watch(options, sink).map_err(|e| {
            self.stats.record_error(e.clone());
            e
        })?;

        let handle = SubscriptionHandle::next();
        tracing::debug!(?watch_id, high_accuracy, "Position watch started");
        self.subscription = Some(Subscription {
            handle,
            watch_id,
            rx,
        });
        Ok(handle)
    }

    /// Stop receiving fixes
    ///
    /// Idempotent: a handle that is not the live subscription is ignored.
    /// Returns true if a live subscription was stopped.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        match &self.subscription {
            Some(sub) if sub.handle == handle => {
                self.stop();
                true
            }
            _ => false,
        }
    }

    /// Stop whatever subscription is live
    pub fn stop(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.source.clear_watch(sub.watch_id);
            tracing::debug!(watch_id = ?sub.watch_id, "Position watch cleared");
            // rx dropped here; late deliveries are rejected by the channel
        }
    }

    /// Check if a subscription is live
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Apply pending deliveries and return the most recent fix
    pub fn poll(&mut self) -> Option<Position> {
        let Some(sub) = &self.subscription else {
            return self.latest;
        };

        for event in sub.rx.try_iter() {
            match event {
                SensorEvent::Sample(position) => {
                    if position.latitude.is_finite() && position.longitude.is_finite() {
                        self.latest = Some(position);
                        self.stats.record_sample();
                    } else {
                        self.stats.record_discarded();
                    }
                }
                SensorEvent::Error(e) => {
                    tracing::warn!("Position sensor error: {}", e);
                    self.stats.record_error(e);
                }
            }
        }

        self.latest
    }

    /// Most recent fix without applying pending deliveries
    pub fn latest(&self) -> Option<Position> {
        self.latest
    }

    /// Delivery statistics
    pub fn stats(&self) -> &SensorStats {
        &self.stats
    }

    /// Forget the last fix and statistics (for a new session)
    pub fn reset(&mut self) {
        self.latest = None;
        self.stats.reset();
    }
}

impl Drop for GeoStream {
    fn drop(&mut self) {
        self.stop();
    }
}
