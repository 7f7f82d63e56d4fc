//! Great-circle geometry on a spherical Earth.

use crate::model::LatLng;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum of haversine distances along a path. Zero for fewer than two points.
pub fn path_length_km(path: &[LatLng]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}
