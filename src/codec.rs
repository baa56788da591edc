// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decoder for Google's Encoded Polyline Algorithm Format.
//!
//! Strava summary polylines are encoded at precision 5: each coordinate is a
//! delta from the previous one, zig-zag encoded, split into 5-bit groups with
//! a continuation bit (0x20), and offset by 63 into printable ASCII.
//!
//! Decoding is pure; the same input always yields the identical sequence, so
//! callers may cache decoded tracks freely.

use geo::{BoundingRect, Coord, LineString, Rect};

const PRECISION_SCALE: f64 = 1e5;

/// Errors from decoding an encoded polyline.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Encoded polyline ends inside a coordinate")]
    Truncated,

    #[error("Invalid character at byte {index}")]
    InvalidCharacter { index: usize },

    #[error("Continuation sequence overflows a coordinate delta")]
    Overflow,
}

/// Decode an encoded polyline into a line string (x = longitude, y = latitude).
///
/// Empty input yields an empty line string. Malformed input fails with a
/// [`DecodeError`] instead of reading out of bounds.
pub fn decode(encoded: &str) -> Result<LineString<f64>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut index = 0usize;
    let mut lat = 0i64;
    let mut lng = 0i64;
    let mut coords = Vec::new();

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        coords.push(Coord {
            x: lng as f64 / PRECISION_SCALE,
            y: lat as f64 / PRECISION_SCALE,
        });
    }

    Ok(LineString::new(coords))
}

/// Decode into `[lat, lng]` pairs, the order the map payloads carry.
pub fn decode_latlng(encoded: &str) -> Result<Vec<[f64; 2]>, DecodeError> {
    let line = decode(encoded)?;
    Ok(line.coords().map(|c| [c.y, c.x]).collect())
}

/// Bounding rectangle of a decoded track, for map-view framing.
/// `None` for an empty track.
pub fn track_bounds(line: &LineString<f64>) -> Option<Rect<f64>> {
    line.bounding_rect()
}

/// Read one variable-length, zig-zag-encoded signed delta.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, DecodeError> {
    let mut shift = 0u32;
    let mut result = 0u64;

    loop {
        let Some(&c) = bytes.get(*index) else {
            return Err(DecodeError::Truncated);
        };
        if !(63..=126).contains(&c) {
            return Err(DecodeError::InvalidCharacter { index: *index });
        }
        if shift >= 64 {
            return Err(DecodeError::Overflow);
        }
        *index += 1;

        let chunk = u64::from(c - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    let raw = result as i64;
    Ok(if raw & 1 != 0 { !(raw >> 1) } else { raw >> 1 })
}
