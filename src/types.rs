//! Core value types shared across sensors, viewport and session recording
//!
//! Everything here is a plain immutable value: once a sample or snapshot is
//! produced it is copied into records and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geolocation fix delivered by the position source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// When the platform took the fix
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Altitude in meters, if the platform reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Ground speed in m/s, if the platform reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Course over ground in degrees, if the platform reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl Position {
    /// Create a fix stamped with the current time
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self::with_timestamp(latitude, longitude, accuracy, Utc::now())
    }

    /// Create a fix with an explicit timestamp
    pub fn with_timestamp(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
            altitude: None,
            speed: None,
            heading: None,
        }
    }

    /// Map coordinate of this fix
    pub fn lng_lat(&self) -> LngLat {
        LngLat::new(self.longitude, self.latitude)
    }
}

/// Longitude/latitude pair in map order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Rectangular map bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LngLatBounds {
    /// South-west corner
    pub sw: LngLat,
    /// North-east corner
    pub ne: LngLat,
}

impl LngLatBounds {
    pub fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }

    /// Check whether a coordinate lies inside the bounds
    pub fn contains(&self, point: LngLat) -> bool {
        point.lat >= self.sw.lat
            && point.lat <= self.ne.lat
            && point.lng >= self.sw.lng
            && point.lng <= self.ne.lng
    }
}

/// Point-in-time capture of the map camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSnapshot {
    pub bounds: LngLatBounds,
    pub center: LngLat,
    pub zoom: f64,
    /// Map rotation in degrees
    pub bearing: f64,
    /// Map tilt in degrees
    pub pitch: f64,
}

/// Interaction statistics attached to every record
///
/// `zoom_count` is already normalized to completed gestures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCounters {
    pub pan_count: u32,
    pub zoom_count: u32,
    /// Cumulative rotation magnitude in degrees
    #[serde(rename = "rotation", alias = "rotationCount")]
    pub rotation_accum_deg: f64,
}

/// Static descriptor of the device running the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: String,
    pub model: String,
    pub os_version: String,
    /// Additional platform-specific fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceInfo {
    pub fn new(
        platform: impl Into<String>,
        model: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            model: model.into(),
            os_version: os_version.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach an extra descriptor field
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Provides the device descriptor once per session
pub trait DeviceInfoProvider: Send + Sync {
    fn device_info(&self) -> DeviceInfo;
}

/// Describes the machine the recorder runs on
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDeviceInfo;

impl DeviceInfoProvider for HostDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(std::env::consts::OS, std::env::consts::ARCH, "unknown")
            .with_extra("family", std::env::consts::FAMILY)
            .with_extra("appVersion", env!("CARGO_PKG_VERSION"))
    }
}

impl DeviceInfoProvider for DeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        self.clone()
    }
}
