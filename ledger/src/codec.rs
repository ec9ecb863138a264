use crate::errors::{Error, Result};

/// Degrees are stored as i32 millionths of a degree (~0.1 m resolution).
pub const DEGREE_SCALE: f64 = 1_000_000.0;

/// Celsius is stored as i16 tenths of a degree.
pub const TEMP_SCALE: f64 = 10.0;

/// Encodes degrees to fixed-point, truncating toward zero.
///
/// Inputs that are non-finite or whose scaled value falls outside i32 fail
/// with `EncodingOverflow` and must not be stored.
pub fn encode_degrees(field: &'static str, degrees: f64) -> Result<i32> {
    let scaled = (degrees * DEGREE_SCALE).trunc();
    if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return Err(Error::EncodingOverflow {
            field,
            value: degrees,
        });
    }
    Ok(scaled as i32)
}

/// Encodes Celsius to fixed-point, truncating toward zero.
pub fn encode_celsius(field: &'static str, celsius: f64) -> Result<i16> {
    let scaled = (celsius * TEMP_SCALE).trunc();
    if !scaled.is_finite() || scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
        return Err(Error::EncodingOverflow {
            field,
            value: celsius,
        });
    }
    Ok(scaled as i16)
}

pub fn decode_degrees(fixed: i32) -> f64 {
    fixed as f64 / DEGREE_SCALE
}

pub fn decode_celsius(fixed: i16) -> f64 {
    fixed as f64 / TEMP_SCALE
}
