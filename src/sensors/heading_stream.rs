//! Compass heading stream with threshold-and-latch smoothing
//!
//! Raw compass readings jitter by several degrees even when the device is
//! still. Rotation is therefore only counted when a reading differs from the
//! last *stable* heading by more than a threshold; that reading then becomes
//! the new stable reference. Smaller changes still update the displayed
//! heading but neither move the reference nor add rotation.

use std::sync::Arc;

use crate::error::Result;
use crate::geo::normalize_degrees;

use super::{event_channel, OrientationSource, SensorEvent, SensorStats, Subscription, SubscriptionHandle};

/// Heading change (degrees) a reading must exceed to count as rotation
pub const DEFAULT_HEADING_THRESHOLD_DEG: f64 = 15.0;

/// Minimal signed angular difference from `from` to `to`, in `[-180, 180)`
pub fn circular_diff(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// Threshold-and-latch heading filter
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingSmoother {
    threshold_deg: f64,
    last_stable: Option<f64>,
    current: Option<f64>,
}

impl Default for HeadingSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadingSmoother {
    /// Create a smoother with the default 15° threshold
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_HEADING_THRESHOLD_DEG)
    }

    /// Create with a specific threshold
    pub fn with_threshold(threshold_deg: f64) -> Self {
        Self {
            threshold_deg: threshold_deg.abs(),
            last_stable: None,
            current: None,
        }
    }

    /// Feed a reading and return the rotation it contributes
    ///
    /// The first reading only initializes the stable reference. Returns 0.0
    /// for readings within the threshold.
    pub fn push(&mut self, heading: f64) -> f64 {
        let heading = normalize_degrees(heading);
        self.current = Some(heading);

        let Some(stable) = self.last_stable else {
            self.last_stable = Some(heading);
            return 0.0;
        };

        let diff = circular_diff(stable, heading).abs();
        if diff > self.threshold_deg {
            self.last_stable = Some(heading);
            diff
        } else {
            0.0
        }
    }

    /// Latest reading, for display
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    /// Last reading accepted as a genuine orientation change
    pub fn last_stable(&self) -> Option<f64> {
        self.last_stable
    }

    /// Noise threshold in degrees
    pub fn threshold_deg(&self) -> f64 {
        self.threshold_deg
    }

    /// Forget all readings
    pub fn clear(&mut self) {
        self.last_stable = None;
        self.current = None;
    }
}

/// Cancelable heading subscription
pub struct HeadingStream {
    source: Arc<dyn OrientationSource>,
    subscription: Option<Subscription<f64>>,
    smoother: HeadingSmoother,
    stats: SensorStats,
}

impl std::fmt::Debug for HeadingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadingStream")
            .field("active", &self.is_active())
            .field("smoother", &self.smoother)
            .field("stats", &self.stats)
            .finish()
    }
}

impl HeadingStream {
    /// Create a stream with the default threshold (not yet subscribed)
    pub fn new(source: Arc<dyn OrientationSource>) -> Self {
        Self::with_threshold(source, DEFAULT_HEADING_THRESHOLD_DEG)
    }

    /// Create a stream with a specific noise threshold
    pub fn with_threshold(source: Arc<dyn OrientationSource>, threshold_deg: f64) -> Self {
        Self {
            source,
            subscription: None,
            smoother: HeadingSmoother::with_threshold(threshold_deg),
            stats: SensorStats::default(),
        }
    }

    /// Start receiving headings
    ///
    /// Subscribing while already active returns the existing handle.
    pub fn subscribe(&mut self) -> Result<SubscriptionHandle> {
        if let Some(sub) = &self.subscription {
            return Ok(sub.handle);
        }

        let (sink, rx) = event_channel();
        let watch_id = self.source.watch(sink).map_err(|e| {
            self.stats.record_error(e.clone());
            e
        })?;

        let handle = SubscriptionHandle::next();
        tracing::debug!(?watch_id, "Heading watch started");
        self.subscription = Some(Subscription {
            handle,
            watch_id,
            rx,
        });
        Ok(handle)
    }

    /// Stop receiving headings; idempotent
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
            tracing::debug!(watch_id = ?sub.watch_id, "Heading watch cleared");
        }
    }

    /// Check if a subscription is live
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Apply pending readings in delivery order
    ///
    /// Returns the rotation (degrees) accepted from these readings.
    pub fn poll(&mut self) -> f64 {
        let Some(sub) = &self.subscription else {
            return 0.0;
        };

        let mut rotation = 0.0;
        for event in sub.rx.try_iter() {
            match event {
                SensorEvent::Sample(heading) if heading.is_finite() => {
                    let initializing = self.smoother.last_stable().is_none();
                    let delta = self.smoother.push(heading);
                    if delta > 0.0 {
                        tracing::trace!(heading, delta, "Heading change accepted");
                    } else if !initializing {
                        self.stats.record_discarded();
                    }
                    rotation += delta;
                    self.stats.record_sample();
                }
                SensorEvent::Sample(_) => self.stats.record_discarded(),
                SensorEvent::Error(e) => {
                    tracing::warn!("Heading sensor error: {}", e);
                    self.stats.record_error(e);
                }
            }
        }
        rotation
    }

    /// Latest heading for display
    pub fn current(&self) -> Option<f64> {
        self.smoother.current()
    }

    /// The smoothing filter state
    pub fn smoother(&self) -> &HeadingSmoother {
        &self.smoother
    }

    /// Delivery statistics
    pub fn stats(&self) -> &SensorStats {
        &self.stats
    }

    /// Forget readings and statistics (for a new session)
    pub fn reset(&mut self) {
        self.smoother.clear();
        self.stats.reset();
    }
}

impl Drop for HeadingStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::simulated::ManualSource;

    fn accumulate(samples: &[f64]) -> f64 {
        let mut smoother = HeadingSmoother::new();
        samples.iter().map(|&h| smoother.push(h)).sum()
    }

    #[test]
    fn test_small_changes_are_noise() {
        assert_eq!(accumulate(&[10.0, 20.0, 5.0]), 0.0);
    }

    #[test]
    fn test_large_changes_accumulate_against_latched_reference() {
        // 10 -> 30 is 20°, then 30 -> 5 is 25°
        assert_eq!(accumulate(&[10.0, 30.0, 5.0]), 45.0);
    }

    #[test]
    fn test_exactly_threshold_not_counted() {
        assert_eq!(accumulate(&[0.0, 15.0]), 0.0);
        assert_eq!(accumulate(&[0.0, 15.5]), 15.5);
    }

    #[test]
    fn test_wraparound_uses_shortest_arc() {
        // 350 -> 10 is a 20° turn, not 340°
        assert_eq!(accumulate(&[350.0, 10.0]), 20.0);
    }

    #[test]
    fn test_first_sample_only_initializes() {
        let mut smoother = HeadingSmoother::new();
        assert_eq!(smoother.push(200.0), 0.0);
        assert_eq!(smoother.last_stable(), Some(200.0));
    }

    #[test]
    fn test_noise_updates_display_but_not_reference() {
        let mut smoother = HeadingSmoother::new();
        smoother.push(100.0);
        smoother.push(105.0);
        assert_eq!(smoother.current(), Some(105.0));
        assert_eq!(smoother.last_stable(), Some(100.0));
    }

    #[test]
    fn test_slow_drift_counts_once_threshold_exceeded() {
        // Each step is 5°, reference stays at 0 until 20 is reached
        assert_eq!(accumulate(&[0.0, 5.0, 10.0, 15.0, 20.0]), 20.0);
    }

    #[test]
    fn test_circular_diff() {
        assert_eq!(circular_diff(10.0, 30.0), 20.0);
        assert_eq!(circular_diff(30.0, 10.0), -20.0);
        assert_eq!(circular_diff(350.0, 10.0), 20.0);
        assert_eq!(circular_diff(10.0, 350.0), -20.0);
    }

    #[test]
    fn test_stream_poll_returns_accepted_rotation() {
        let source = Arc::new(ManualSource::<f64>::new());
        let mut stream = HeadingStream::new(source.clone());
        stream.subscribe().unwrap();

        for h in [10.0, 30.0, 5.0] {
            source.push(h);
        }
        assert_eq!(stream.poll(), 45.0);
        assert_eq!(stream.current(), Some(5.0));
        assert_eq!(stream.poll(), 0.0);
    }

    #[test]
    fn test_stream_discards_nan() {
        let source = Arc::new(ManualSource::<f64>::new());
        let mut stream = HeadingStream::new(source.clone());
        stream.subscribe().unwrap();
        source.push(f64::NAN);

        assert_eq!(stream.poll(), 0.0);
        assert_eq!(stream.current(), None);
        assert_eq!(stream.stats().discarded, 1);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_each_contribution_exceeds_threshold(
            samples in prop::collection::vec(-720.0f64..720.0, 1..60)
        ) {
            let mut smoother = HeadingSmoother::new();
            for h in samples {
                let delta = smoother.push(h);
                prop_assert!(delta == 0.0 || delta > DEFAULT_HEADING_THRESHOLD_DEG);
                prop_assert!(delta <= 180.0);
            }
        }

        #[test]
        fn test_display_heading_in_range(
            samples in prop::collection::vec(-720.0f64..720.0, 1..60)
        ) {
            let mut smoother = HeadingSmoother::new();
            for h in samples {
                smoother.push(h);
                let current = smoother.current().unwrap();
                prop_assert!((0.0..360.0).contains(&current));
            }
        }
    }
}
