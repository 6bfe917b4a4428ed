use serde::{Deserialize, Serialize};

/// Mean Earth radius (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance between two points given in degrees.
pub fn haversine_meters(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let half_lat = (to.latitude - from.latitude).abs().to_radians() / 2.0;
    let half_lon = (to.longitude - from.longitude).abs().to_radians() / 2.0;

    let h = half_lat.sin().powi(2) + lat_from.cos() * lat_to.cos() * half_lon.sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Distance truncated to whole meters.
pub fn distance_meters(from: GeoPoint, to: GeoPoint) -> u64 {
    haversine_meters(from, to).trunc() as u64
}
