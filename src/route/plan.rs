//! Route planning: stats and geometry for an ordered list of stops.
//!
//! When the routing service can't answer, the plan falls back to straight
//! lines and haversine distance, and says so: `approximate` is set on every
//! fallback segment and on the plan as a whole, so the route is never
//! presented as a real road path when it isn't one.

use serde::Serialize;

use crate::geo::{haversine_km, path_length_km};
use crate::model::{LatLng, Waypoint};

use super::client::{RoutingBackend, RoutingClient};

/// One leg between consecutive placed stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSegment {
    pub path: Vec<LatLng>,
    pub distance_km: f64,

    /// `None` when the leg is a straight-line estimate.
    pub duration_min: Option<f64>,

    /// Straight line rather than a road path.
    pub approximate: bool,
}

/// Everything the route view needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    /// Stops in visiting order.
    pub stops: Vec<Waypoint>,

    /// Ids of stops that have no position and are left off the map.
    pub unplaced: Vec<String>,

    pub segments: Vec<PlannedSegment>,

    /// Whole-route distance. `None` with fewer than two placed stops.
    pub distance_km: Option<f64>,

    /// Whole-route driving time, when the routing service provided it.
    pub duration_min: Option<f64>,

    /// Summed mowing area of every stop.
    pub total_area_m2: f64,

    /// True if any part of the route is a straight-line estimate.
    pub approximate: bool,

    /// Directions link for handing the route to a navigation app.
    pub navigation_url: Option<String>,
}

/// Plans a route through `stops` in the given order.
pub fn plan_route<B: RoutingBackend + Sync>(
    client: &RoutingClient<B>,
    stops: &[Waypoint],
) -> RoutePlan {
    let points: Vec<LatLng> = stops.iter().filter_map(|s| s.position).collect();
    let unplaced = stops
        .iter()
        .filter(|s| s.position.is_none())
        .map(|s| s.id.clone())
        .collect();
    let total_area_m2 = stops.iter().filter_map(|s| s.area_m2).sum();

    let mut plan = RoutePlan {
        stops: stops.to_vec(),
        unplaced,
        segments: Vec::new(),
        distance_km: None,
        duration_min: None,
        total_area_m2,
        approximate: false,
        navigation_url: google_maps_url(&points),
    };
    if points.len() < 2 {
        return plan;
    }

    match client.fetch_route(&points) {
        Some(route) => {
            plan.distance_km = Some(route.distance_km);
            plan.duration_min = Some(route.duration_min);
        }
        None => {
            plan.distance_km = Some(path_length_km(&points));
            plan.approximate = true;
        }
    }

    plan.segments = client
        .fetch_route_segments(&points)
        .into_iter()
        .zip(points.windows(2))
        .map(|(route, pair)| match route {
            Some(route) => PlannedSegment {
                path: route.path,
                distance_km: route.distance_km,
                duration_min: Some(route.duration_min),
                approximate: false,
            },
            None => PlannedSegment {
                path: pair.to_vec(),
                distance_km: haversine_km(pair[0], pair[1]),
                duration_min: None,
                approximate: true,
            },
        })
        .collect();
    plan.approximate |= plan.segments.iter().any(|s| s.approximate);

    plan
}

/// Google Maps driving directions through `points`, first to last.
///
/// `None` with fewer than two points.
pub fn google_maps_url(points: &[LatLng]) -> Option<String> {
    let [origin, middle @ .., destination] = points else {
        return None;
    };
    let mut url = format!(
        "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}",
        origin.lat, origin.lng, destination.lat, destination.lng
    );
    if !middle.is_empty() {
        let waypoints = middle
            .iter()
            .map(|p| format!("{},{}", p.lat, p.lng))
            .collect::<Vec<_>>()
            .join("|");
        url.push_str("&waypoints=");
        url.push_str(&waypoints);
    }
    url.push_str("&travelmode=driving");
    Some(url)
}
