//! Decoder for the encoded polyline format used by the mapping backend.
//!
//! Each coordinate is stored as a delta from the previous one, scaled by 1e5,
//! zig-zag signed and split into 5-bit chunks offset by 63 so every chunk is a
//! printable ASCII character.

use crate::geo::LatLng;
use thiserror::Error;

const PRECISION: f64 = 1e5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolylineError {
    #[error("invalid character {character:?} at byte {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("encoded value starting at byte {position} is truncated")]
    Truncated { position: usize },

    #[error("encoded value starting at byte {position} overflows")]
    Overflow { position: usize },

    #[error("point starting at byte {position} is not a valid coordinate: {point}")]
    OutOfRange { point: LatLng, position: usize },
}

/// Decode an encoded polyline into its coordinate sequence
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while index < bytes.len() {
        let start = index;
        let (dlat, next) = decode_value(bytes, start)?;
        if next >= bytes.len() {
            // A latitude without its longitude
            return Err(PolylineError::Truncated { position: next });
        }
        let (dlng, next) = decode_value(bytes, next)?;
        index = next;

        lat = lat
            .checked_add(dlat)
            .ok_or(PolylineError::Overflow { position: start })?;
        lng = lng
            .checked_add(dlng)
            .ok_or(PolylineError::Overflow { position: start })?;

        let point = LatLng::new(lat as f64 / PRECISION, lng as f64 / PRECISION);
        if !point.is_valid() {
            return Err(PolylineError::OutOfRange {
                point,
                position: start,
            });
        }
        points.push(point);
    }

    Ok(points)
}

/// Read one zig-zag encoded value, returning it and the index after it
fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    let mut index = start;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or(PolylineError::Truncated { position: start })?;
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                character: byte as char,
                position: index,
            });
        }
        if shift > 55 {
            return Err(PolylineError::Overflow { position: start });
        }

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        index += 1;

        if chunk < 0x20 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((value, index))
}
