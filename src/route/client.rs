//! Road routing: turn an ordered list of points into a road-following path.
//!
//! Best effort by contract. [`RoutingClient::fetch_route`] returns `None`
//! on any failure, and callers fall back to straight lines (see
//! [`super::plan`]). Results are cached in memory, keyed by the input
//! coordinates rounded to 5 decimals (about 1.1 m).

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use lru::LruCache;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{LatLng, RouteResult};

use super::polyline::{self, PolylineError};

/// Public OSRM demo server.
pub const DEFAULT_ROUTING_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_PROFILE: &str = "driving";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

/// Upper bound on segment requests in flight at once.
const MAX_PARALLEL_REQUESTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("routing service answered '{0}'")]
    Status(String),

    #[error("routing service returned no route")]
    NoRoute,

    #[error("bad route geometry: {0}")]
    Geometry(#[from] PolylineError),
}

/// Route service payload. Only the first route is used.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteResponse {
    pub code: String,

    #[serde(default)]
    pub routes: Vec<RouteBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteBody {
    /// Encoded polyline.
    pub geometry: String,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

/// Something that can answer a route query.
pub trait RoutingBackend {
    fn route(&self, waypoints: &[LatLng]) -> Result<RouteResponse, RoutingError>;
}

/// OSRM HTTP backend: `GET <url>/route/v1/<profile>/<lng,lat;...>`.
pub struct OsrmBackend {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmBackend {
    pub fn new(base_url: &str, profile: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        })
    }

    fn route_url(&self, waypoints: &[LatLng]) -> String {
        // OSRM wants longitude first.
        let coords = waypoints
            .iter()
            .map(|p| format!("{},{}", p.lng, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}/route/v1/{}/{coords}", self.base_url, self.profile)
    }
}

impl RoutingBackend for OsrmBackend {
    fn route(&self, waypoints: &[LatLng]) -> Result<RouteResponse, RoutingError> {
        let response = self
            .client
            .get(self.route_url(waypoints))
            .query(&[("overview", "full"), ("geometries", "polyline")])
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

/// Caching front for a [`RoutingBackend`].
pub struct RoutingClient<B> {
    backend: B,
    cache: Mutex<LruCache<String, RouteResult>>,
}

impl<B: RoutingBackend> RoutingClient<B> {
    pub fn new(backend: B, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Road route through `waypoints` in order, or `None` if there are fewer
    /// than two points or the service can't provide one.
    pub fn fetch_route(&self, waypoints: &[LatLng]) -> Option<RouteResult> {
        if waypoints.len() < 2 {
            return None;
        }

        let key = cache_key(waypoints);
        if let Some(hit) = self.lock_cache().get(&key) {
            debug!(%key, "route cache hit");
            return Some(hit.clone());
        }

        match self.resolve(waypoints) {
            Ok(result) => {
                self.lock_cache().put(key, result.clone());
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "routing failed, caller falls back to straight lines");
                None
            }
        }
    }

    fn resolve(&self, waypoints: &[LatLng]) -> Result<RouteResult, RoutingError> {
        let response = self.backend.route(waypoints)?;
        if response.code != "Ok" {
            return Err(RoutingError::Status(response.code));
        }
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(RoutingError::NoRoute)?;
        Ok(RouteResult {
            path: polyline::decode(&route.geometry)?,
            distance_km: route.distance / 1000.0,
            duration_min: route.duration / 60.0,
        })
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<String, RouteResult>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: RoutingBackend + Sync> RoutingClient<B> {
    /// One route per consecutive pair, fetched concurrently in batches of
    /// at most `MAX_PARALLEL_REQUESTS`.
    ///
    /// The output has one entry per pair, in input order, whatever order the
    /// requests finish in.
    pub fn fetch_route_segments(&self, waypoints: &[LatLng]) -> Vec<Option<RouteResult>> {
        let pairs: Vec<&[LatLng]> = waypoints.windows(2).collect();
        let mut segments = Vec::with_capacity(pairs.len());

        for batch in pairs.chunks(MAX_PARALLEL_REQUESTS) {
            thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|&pair| s.spawn(move || self.fetch_route(pair)))
                    .collect();
                segments.extend(handles.into_iter().map(|h| h.join().unwrap_or(None)));
            });
        }
        segments
    }
}

/// Stable key: each point rounded to 5 decimals, in order.
fn cache_key(waypoints: &[LatLng]) -> String {
    waypoints
        .iter()
        .map(|p| format!("{:.5},{:.5}", p.lat, p.lng))
        .collect::<Vec<_>>()
        .join("|")
}
