//! Spherical geodesy helpers
//!
//! Great-circle distance and initial bearing on a spherical earth. Accurate to
//! well under a percent at walking scale, which is all the session summary
//! needs.

use serde_json::json;

use crate::types::{LngLat, Position};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Convert degrees to radians
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

/// Convert radians to degrees
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}

/// Haversine distance between two coordinates in meters
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = deg_to_rad(lat2 - lat1);
    let d_lon = deg_to_rad(lon2 - lon1);

    let a = (d_lat / 2.0).sin().powi(2)
        + deg_to_rad(lat1).cos() * deg_to_rad(lat2).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from the first to the second coordinate
///
/// Returns degrees in `[0, 360)`, where 0 = North, 90 = East.
pub fn bearing(start_lat: f64, start_lon: f64, dest_lat: f64, dest_lon: f64) -> f64 {
    let start_lat = deg_to_rad(start_lat);
    let dest_lat = deg_to_rad(dest_lat);
    let d_lon = deg_to_rad(dest_lon - start_lon);

    let y = d_lon.sin() * dest_lat.cos();
    let x = start_lat.cos() * dest_lat.sin() - start_lat.sin() * dest_lat.cos() * d_lon.cos();

    normalize_degrees(rad_to_deg(y.atan2(x)))
}

/// Point reached by travelling `distance` meters from a start on an initial bearing
///
/// Returns `(latitude, longitude)` in degrees.
pub fn destination(lat: f64, lon: f64, bearing_deg: f64, distance: f64) -> (f64, f64) {
    let delta = distance / EARTH_RADIUS_M;
    let theta = deg_to_rad(bearing_deg);
    let phi1 = deg_to_rad(lat);
    let lambda1 = deg_to_rad(lon);

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (rad_to_deg(phi2), (rad_to_deg(lambda2) + 540.0).rem_euclid(360.0) - 180.0)
}

/// Wrap any angle into `[0, 360)`
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Distance between two position fixes in meters
pub fn distance_between(a: &Position, b: &Position) -> f64 {
    distance_m(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Total length of a path through the given fixes
pub fn path_length_m<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<&Position> = None;
    for pos in positions {
        if let Some(prev) = previous {
            total += distance_between(prev, pos);
        }
        previous = Some(pos);
    }
    total
}

/// GeoJSON point feature for a coordinate
pub fn to_geojson_point(point: LngLat) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": [point.lng, point.lat]
        }
    })
}
