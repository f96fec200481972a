//! Map interaction statistics
//!
//! Counts completed user gestures on the map for the active task. Camera moves
//! made by code are ignored.
//!
//! Map libraries fire `zoom-end` twice for one pinch or scroll gesture. The
//! raw fire count is kept as-is and halved (truncating) when read, so the
//! reported `zoom_count` matches completed gestures.

use crate::types::InteractionCounters;
use crate::viewport::{ChangeKind, ViewportChange};

/// Per-task pan/zoom/rotation counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionCounter {
    pan_count: u32,
    raw_zoom_ends: u32,
    rotation_accum_deg: f64,
}

impl InteractionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a viewport notification
    ///
    /// Returns true if it changed a counter.
    pub fn observe(&mut self, change: ViewportChange) -> bool {
        if !change.is_user() {
            return false;
        }
        match change.kind {
            ChangeKind::PanEnd => {
                self.pan_count = self.pan_count.saturating_add(1);
                true
            }
            ChangeKind::ZoomEnd => {
                self.raw_zoom_ends = self.raw_zoom_ends.saturating_add(1);
                true
            }
            // Rotation is measured from the compass, not the map camera
            ChangeKind::RotateEnd => false,
        }
    }

    /// Add rotation accepted by the heading filter
    ///
    /// Non-positive or non-finite amounts are ignored so the total never drops.
    pub fn add_rotation(&mut self, degrees: f64) {
        if degrees.is_finite() && degrees > 0.0 {
            self.rotation_accum_deg += degrees;
        }
    }

    /// Current counters, with zoom fires normalized to gestures
    pub fn snapshot(&self) -> InteractionCounters {
        InteractionCounters {
            pan_count: self.pan_count,
            zoom_count: self.raw_zoom_ends / 2,
            rotation_accum_deg: self.rotation_accum_deg,
        }
    }

    /// Number of `zoom-end` notifications seen, before halving
    pub fn raw_zoom_end_count(&self) -> u32 {
        self.raw_zoom_ends
    }

    /// Zero all counters (new task)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
