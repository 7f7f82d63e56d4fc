//! Machine state: the single tracked mower.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Last motor-hours value the remote store is known to hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineState {
    pub machine_id: String,

    /// Cumulative engine runtime. Never decreases.
    pub motor_hours: f64,

    /// When `motor_hours` was last confirmed. `None` until the first update.
    pub updated_at: Option<Timestamp>,
}

impl MachineState {
    /// A machine with no recorded runtime.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            motor_hours: 0.0,
            updated_at: None,
        }
    }
}
