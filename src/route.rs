//! Route planning for a day's mowing sites.
//!
//! - [`optimize`] orders sites into a short tour.
//! - [`client`] asks a routing service for real road paths, with caching.
//! - [`plan`] combines both into what the route view shows, falling back to
//!   straight lines when the service is unavailable.

pub mod client;
pub mod optimize;
pub mod plan;
pub mod polyline;

pub use client::{OsrmBackend, RoutingBackend, RoutingClient};
pub use optimize::optimize_order;
pub use plan::{RoutePlan, plan_route};
