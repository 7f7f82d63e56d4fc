//! Write types: mutations waiting to reach the remote store.
//!
//! A `QueuedWrite` serializes to the same shape the device has always kept
//! in local storage, one JSON object per pending mutation:
//!
//! ```json
//! { "id": "...", "type": "mth_update", "data": { ... }, "createdAt": "...", "retries": 0 }
//! ```

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Retry attempts a queued write gets before it is moved out of the queue.
pub const MAX_RETRIES: u32 = 5;

/// A pending mutation awaiting remote application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedWrite {
    pub id: Uuid,

    #[serde(flatten)]
    pub op: WriteOp,

    pub created_at: Timestamp,

    /// Failed drain attempts so far. Only ever incremented.
    pub retries: u32,
}

impl QueuedWrite {
    /// Wraps an operation as a fresh queue entry.
    pub fn new(op: WriteOp) -> Self {
        Self {
            id: Uuid::new_v4(),
            op,
            created_at: Timestamp::now(),
            retries: 0,
        }
    }

    /// Records one more failed attempt. Returns `true` while retries remain.
    pub fn record_failure(&mut self) -> bool {
        self.retries = self.retries.saturating_add(1);
        self.retries < MAX_RETRIES
    }
}

/// What a write does. Tagged so each stored entry is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WriteOp {
    /// Insert a service record row.
    #[serde(rename = "service")]
    ServiceRecord(Map<String, Value>),

    /// Insert an operation record row.
    #[serde(rename = "operation")]
    OperationRecord(Map<String, Value>),

    /// Bump the machine's motor-hours counter.
    #[serde(rename = "mth_update")]
    MotorHours(MotorHoursUpdate),
}

impl WriteOp {
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::ServiceRecord(_) => WriteKind::ServiceRecord,
            Self::OperationRecord(_) => WriteKind::OperationRecord,
            Self::MotorHours(_) => WriteKind::MotorHours,
        }
    }
}

/// The operation kind without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    ServiceRecord,
    OperationRecord,
    MotorHours,
}

impl WriteKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::ServiceRecord => "service",
            Self::OperationRecord => "operation",
            Self::MotorHours => "mth_update",
        }
    }
}

/// A motor-hours reading for one machine.
///
/// `timestamp` is when the reading was taken, not when it reached the
/// remote store; a drained update carries its original timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorHoursUpdate {
    pub machine_id: String,
    pub new_mth: f64,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn serializes_in_stored_shape() {
        let write = QueuedWrite {
            id: Uuid::nil(),
            op: WriteOp::MotorHours(MotorHoursUpdate {
                machine_id: "m1".into(),
                new_mth: 125.0,
                timestamp: Timestamp::new(1_700_000_000, 0).unwrap(),
            }),
            created_at: Timestamp::new(1_700_000_000, 0).unwrap(),
            retries: 2,
        };

        let value = serde_json::to_value(&write).unwrap();
        assert_eq!(value["type"], "mth_update");
        assert_eq!(value["data"]["machineId"], "m1");
        assert_eq!(value["data"]["newMth"], 125.0);
        assert_eq!(value["retries"], 2);
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn reads_service_entry_written_by_older_clients() {
        let raw = json!({
            "id": "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
            "type": "service",
            "data": { "popis": "Oil change", "mth_pri_servisu": 240 },
            "createdAt": "2024-05-01T08:00:00Z",
            "retries": 0
        });

        let write: QueuedWrite = serde_json::from_value(raw).unwrap();
        assert_eq!(write.op.kind(), WriteKind::ServiceRecord);
        let WriteOp::ServiceRecord(row) = &write.op else {
            panic!("expected service record");
        };
        assert_eq!(row["popis"], "Oil change");
    }

    #[test]
    fn record_failure_reports_exhaustion_at_max() {
        let mut write = QueuedWrite::new(WriteOp::OperationRecord(Map::new()));
        for _ in 0..MAX_RETRIES - 1 {
            assert!(write.record_failure());
        }
        assert!(!write.record_failure());
        assert_eq!(write.retries, MAX_RETRIES);
    }
}
