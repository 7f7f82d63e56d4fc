//! Service interval types: maintenance schedules and the reminders they raise.

use serde::{Deserialize, Serialize};

/// A recurring maintenance task, due every `interval_mth` motor-hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInterval {
    pub id: String,
    pub name: String,
    pub interval_mth: f64,

    /// Motor-hours at which the first service falls due, if not at zero.
    #[serde(default)]
    pub first_service_mth: Option<f64>,
}

/// A completed service, reduced to what scheduling needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDone {
    pub interval_id: String,
    pub mth_at_service: f64,
}

/// How urgent a reminder is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Critical,
    Warning,
}

/// A maintenance reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub interval_id: String,

    /// Identifies this reminder for one service cycle. Dismissing it hides
    /// the reminder until the next service is recorded.
    pub dismiss_key: String,

    pub severity: Severity,
    pub title: String,

    /// Motor-hours left until due. Negative when overdue.
    pub remaining_mth: f64,
}
