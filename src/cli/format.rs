//! Output formatting for CLI display.

use uuid::Uuid;

use crate::model::{Notification, QueuedWrite, Severity, WriteOp};
use crate::route::RoutePlan;
use crate::sync::DrainReport;

/// First eight hex digits of an id, enough to tell writes apart.
pub(super) fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Motor-hours with at most one decimal, no trailing `.0`.
pub(super) fn format_mth(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract().abs() < f64::EPSILON {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

/// One line per queued write: id, kind, what it does, retries, age.
pub(super) fn format_write(write: &QueuedWrite) -> String {
    let detail = match &write.op {
        WriteOp::MotorHours(update) => {
            format!("{} → {} mth", update.machine_id, format_mth(update.new_mth))
        }
        WriteOp::ServiceRecord(row) | WriteOp::OperationRecord(row) => {
            format!("{} field(s)", row.len())
        }
    };
    let mut line = format!(
        "{}  [{}]  {detail}  {}",
        short_id(write.id),
        write.op.kind().label(),
        write.created_at
    );
    if write.retries > 0 {
        line.push_str(&format!("  (retries: {})", write.retries));
    }
    line
}

pub(super) fn format_drain_report(report: &DrainReport) -> String {
    if *report == DrainReport::default() {
        return "Nothing to sync".to_string();
    }
    format!(
        "Synced {}, retrying {}, failed {}",
        report.succeeded, report.retrying, report.failed
    )
}

pub(super) fn format_notification(n: &Notification) -> String {
    match n.severity {
        Severity::Critical => format!(
            "[critical] {}: overdue by {} mth  ({})",
            n.title,
            format_mth(n.remaining_mth.abs()),
            n.dismiss_key
        ),
        Severity::Warning => format!(
            "[warning]  {}: {} mth until service  ({})",
            n.title,
            format_mth(n.remaining_mth),
            n.dismiss_key
        ),
    }
}

/// Stops, distance, time and area on one line.
pub(super) fn format_plan_summary(plan: &RoutePlan) -> String {
    let placed = plan.stops.len() - plan.unplaced.len();
    let mut parts = vec![format!("{placed} stop(s)")];

    if let Some(km) = plan.distance_km {
        let approx = if plan.approximate { "~" } else { "" };
        parts.push(format!("{approx}{km:.1} km"));
    }
    if let Some(min) = plan.duration_min {
        parts.push(format!("{min:.0} min"));
    }
    if plan.total_area_m2 > 0.0 {
        parts.push(format!("{:.0} m²", plan.total_area_m2));
    }

    let mut line = parts.join(", ");
    if plan.approximate {
        line.push_str(" (straight-line estimate where roads were unavailable)");
    }
    if !plan.unplaced.is_empty() {
        line.push_str(&format!(
            "; {} site(s) without position left off the map",
            plan.unplaced.len()
        ));
    }
    line
}
