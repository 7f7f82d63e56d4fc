//! Core data model for mowdeck.
//!
//! These types describe the single tracked machine, the writes waiting to
//! reach the remote store, the sites a route visits, and maintenance
//! schedules.

mod machine;
mod route;
mod service;
mod write;

pub use machine::MachineState;
pub use route::{LatLng, RouteResult, Waypoint};
pub use service::{Notification, ServiceDone, ServiceInterval, Severity};
pub use write::{MAX_RETRIES, MotorHoursUpdate, QueuedWrite, WriteKind, WriteOp};
