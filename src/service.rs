//! Service reminders derived from maintenance intervals and motor-hours.

use std::collections::BTreeSet;

use crate::model::{Notification, ServiceDone, ServiceInterval, Severity};

/// Share of an interval left before a reminder turns into a warning.
const WARNING_SHARE: f64 = 0.2;

/// Reminders for every interval that is due or nearly due at `current_mth`.
///
/// An interval's cycle starts at its latest recorded service, or at its
/// first-service mark when it has never been serviced. Reminders whose
/// dismiss key is in `dismissed` are left out. Critical reminders come
/// first; otherwise the interval order is kept.
pub fn due_notifications(
    intervals: &[ServiceInterval],
    services: &[ServiceDone],
    current_mth: f64,
    dismissed: &BTreeSet<String>,
) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = intervals
        .iter()
        .filter_map(|interval| {
            let last_mth = last_service_mth(interval, services);
            let remaining_mth = last_mth + interval.interval_mth - current_mth;
            let severity = if remaining_mth <= 0.0 {
                Severity::Critical
            } else if remaining_mth <= interval.interval_mth * WARNING_SHARE {
                Severity::Warning
            } else {
                return None;
            };
            Some(Notification {
                interval_id: interval.id.clone(),
                dismiss_key: format!("{}_{last_mth}", interval.id),
                severity,
                title: interval.name.clone(),
                remaining_mth,
            })
        })
        .filter(|n| !dismissed.contains(&n.dismiss_key))
        .collect();

    notifications.sort_by_key(|n| n.severity);
    notifications
}

fn last_service_mth(interval: &ServiceInterval, services: &[ServiceDone]) -> f64 {
    services
        .iter()
        .filter(|s| s.interval_id == interval.id)
        .map(|s| s.mth_at_service)
        .max_by(f64::total_cmp)
        .unwrap_or_else(|| interval.first_service_mth.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(id: &str, every: f64, first: Option<f64>) -> ServiceInterval {
        ServiceInterval {
            id: id.into(),
            name: format!("Service {id}"),
            interval_mth: every,
            first_service_mth: first,
        }
    }

    fn done(id: &str, mth: f64) -> ServiceDone {
        ServiceDone {
            interval_id: id.into(),
            mth_at_service: mth,
        }
    }

    #[test]
    fn overdue_is_critical_and_nearly_due_is_warning() {
        let intervals = [interval("oil", 100.0, None), interval("blades", 50.0, None)];
        let services = [done("oil", 200.0), done("blades", 260.0)];

        let notes = due_notifications(&intervals, &services, 305.0, &BTreeSet::new());

        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].interval_id, "oil");
        assert_eq!(notes[0].severity, Severity::Critical);
        assert!((notes[0].remaining_mth + 5.0).abs() < 1e-9);
        assert_eq!(notes[1].interval_id, "blades");
        assert_eq!(notes[1].severity, Severity::Warning);
        assert!((notes[1].remaining_mth - 5.0).abs() < 1e-9);
    }

    #[test]
    fn critical_sorts_before_warning() {
        let intervals = [interval("blades", 50.0, None), interval("oil", 100.0, None)];
        let services = [done("blades", 260.0), done("oil", 200.0)];

        let notes = due_notifications(&intervals, &services, 305.0, &BTreeSet::new());

        let order: Vec<_> = notes.iter().map(|n| n.interval_id.as_str()).collect();
        assert_eq!(order, vec!["oil", "blades"]);
    }

    #[test]
    fn far_from_due_raises_nothing() {
        let notes = due_notifications(
            &[interval("oil", 100.0, None)],
            &[done("oil", 200.0)],
            250.0,
            &BTreeSet::new(),
        );
        assert!(notes.is_empty());
    }

    #[test]
    fn latest_service_starts_the_cycle() {
        let services = [done("oil", 100.0), done("oil", 300.0), done("oil", 200.0)];

        let notes = due_notifications(
            &[interval("oil", 100.0, None)],
            &services,
            395.0,
            &BTreeSet::new(),
        );

        assert_eq!(notes[0].dismiss_key, "oil_300");
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[test]
    fn never_serviced_counts_from_first_service_mark() {
        let notes = due_notifications(
            &[interval("belt", 500.0, Some(50.0))],
            &[],
            560.0,
            &BTreeSet::new(),
        );

        assert_eq!(notes[0].severity, Severity::Critical);
        assert_eq!(notes[0].dismiss_key, "belt_50");
    }

    #[test]
    fn never_serviced_without_mark_counts_from_zero() {
        let notes = due_notifications(
            &[interval("belt", 500.0, None)],
            &[],
            420.0,
            &BTreeSet::new(),
        );

        assert_eq!(notes[0].dismiss_key, "belt_0");
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[test]
    fn dismissed_reminders_are_hidden_until_next_service() {
        let intervals = [interval("oil", 100.0, None)];
        let dismissed = BTreeSet::from(["oil_200".to_string()]);

        let hidden = due_notifications(&intervals, &[done("oil", 200.0)], 305.0, &dismissed);
        assert!(hidden.is_empty());

        // A new service starts a new cycle with a new key.
        let services = [done("oil", 200.0), done("oil", 300.0)];
        let shown = due_notifications(&intervals, &services, 395.0, &dismissed);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].dismiss_key, "oil_300");
    }
}
