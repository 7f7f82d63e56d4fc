//! Route types: sites to visit and road paths between them.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A mowing site that may be added to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub name: String,

    /// `None` when the site has no GPS fix. Such sites can't be placed.
    #[serde(default)]
    pub position: Option<LatLng>,

    /// Mowed area in square meters, when surveyed.
    #[serde(default)]
    pub area_m2: Option<f64>,
}

/// A road-following path between two or more waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub path: Vec<LatLng>,
    pub distance_km: f64,
    pub duration_min: f64,
}
