//! Encoded polyline decoding (precision 5), the geometry format routing
//! services return.

use crate::model::LatLng;

const PRECISION: f64 = 1e5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("invalid character at byte {0}")]
    InvalidChar(usize),

    #[error("polyline ends in the middle of a coordinate")]
    Truncated,

    #[error("coordinate at byte {0} is too long")]
    Overflow(usize),

    #[error("point at byte {0} is outside the valid latitude/longitude range")]
    OutOfRange(usize),
}

/// Decodes an encoded polyline into `[lat, lng]` points.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lng) = (0_i64, 0_i64);
    let mut points = Vec::new();

    while index < bytes.len() {
        let start = index;
        lat = lat
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;
        lng = lng
            .checked_add(next_delta(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(start))?;

        #[allow(clippy::cast_precision_loss)]
        let point = LatLng::new(lat as f64 / PRECISION, lng as f64 / PRECISION);
        if point.lat.abs() > 90.0 || point.lng.abs() > 180.0 {
            return Err(PolylineError::OutOfRange(start));
        }
        points.push(point);
    }

    Ok(points)
}

/// Reads one zigzag-encoded varint of 5-bit chunks.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result: i64 = 0;
    let mut shift = 0_u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated);
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidChar(*index));
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(start));
        }
        *index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(point: LatLng, lat: f64, lng: f64) {
        assert!(
            (point.lat - lat).abs() < 1e-9 && (point.lng - lng).abs() < 1e-9,
            "expected ({lat}, {lng}), got ({}, {})",
            point.lat,
            point.lng
        );
    }

    #[test]
    fn decodes_reference_polyline() {
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();

        assert_eq!(points.len(), 3);
        assert_close(points[0], 38.5, -120.2);
        assert_close(points[1], 40.7, -120.95);
        assert_close(points[2], 43.252, -126.453);
    }

    #[test]
    fn empty_string_is_empty_path() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn truncated_input_is_an_error() {
        // Latitude of the first point only.
        assert_eq!(decode("_p~iF"), Err(PolylineError::Truncated));
        // Cut inside a chunk sequence.
        assert_eq!(decode("_p~"), Err(PolylineError::Truncated));
    }

    #[test]
    fn huge_deltas_are_rejected_not_wrapped() {
        let point = format!("}}{}F?", "~".repeat(11));
        assert_eq!(decode(&point), Err(PolylineError::OutOfRange(0)));
        assert_eq!(decode(&point.repeat(3)), Err(PolylineError::OutOfRange(0)));
    }

    #[test]
    fn point_beyond_the_pole_is_out_of_range() {
        // Latitude 38.5 twice over: 77.0 is fine, 115.5 is not.
        let line = "_p~iF~ps|U_p~iF?_p~iF?";
        assert_eq!(decode(line), Err(PolylineError::OutOfRange(16)));
    }

    #[test]
    fn invalid_character_is_an_error() {
        assert_eq!(decode("_p~iF ps|U"), Err(PolylineError::InvalidChar(5)));
    }
}
