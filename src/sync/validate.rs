//! Business rules checked before a write may leave the device.
//!
//! The same checks run when a write is submitted and again when a queued
//! write is replayed, so the two paths can't drift apart.

use serde_json::{Map, Value};

use super::SyncError;

/// A motor-hours reading must be a finite, non-negative number no lower
/// than `current`.
pub fn validate_motor_hours(current: f64, new: f64) -> Result<(), SyncError> {
    if !new.is_finite() || new < 0.0 {
        return Err(SyncError::InvalidPayload(format!(
            "motor-hours must be a non-negative number, got {new}"
        )));
    }
    if new < current {
        return Err(SyncError::MotorHoursRegression {
            current,
            attempted: new,
        });
    }
    Ok(())
}

/// A record row must carry at least one column.
pub fn validate_record(row: &Map<String, Value>) -> Result<(), SyncError> {
    if row.is_empty() {
        return Err(SyncError::InvalidPayload("record has no fields".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn equal_value_is_allowed() {
        assert!(validate_motor_hours(120.5, 120.5).is_ok());
        assert!(validate_motor_hours(120.5, 125.0).is_ok());
    }

    #[test]
    fn lower_value_is_a_regression() {
        let err = validate_motor_hours(120.5, 120.0).unwrap_err();
        assert!(matches!(
            err,
            SyncError::MotorHoursRegression { current, attempted }
                if (current - 120.5).abs() < f64::EPSILON && (attempted - 120.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn non_finite_or_negative_is_invalid() {
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let err = validate_motor_hours(0.0, bad).unwrap_err();
            assert!(matches!(err, SyncError::InvalidPayload(_)), "{bad}");
        }
    }

    #[test]
    fn empty_record_is_invalid() {
        assert!(validate_record(&Map::new()).is_err());

        let Value::Object(row) = json!({ "popis": "Blade swap" }) else {
            unreachable!()
        };
        assert!(validate_record(&row).is_ok());
    }
}
