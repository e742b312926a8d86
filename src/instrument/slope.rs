//! Slope conversion
//!
//! Linear map between ramp speed (units per millisecond) and the raw ramp
//! register. Raw 1 is the slowest ramp, 0 to full scale in 1600 ms; raw
//! 32000 the fastest, 0 to full scale in 0.05 ms.
//!
//! ```text
//! raw = round(a * x + b)
//! a   = (MIN_RAW - MAX_RAW) / (fs/MAX_TIME - fs/MIN_TIME)
//! b   = (MAX_RAW * fs/MAX_TIME - fs/MIN_TIME * MIN_RAW) / (fs/MAX_TIME - fs/MIN_TIME)
//! ```

use crate::error::{BridgeError, Result};

/// Fastest ramp duration (ms)
pub const MIN_TIME_MS: f64 = 0.05;

/// Slowest ramp duration (ms)
pub const MAX_TIME_MS: f64 = 1600.0;

pub const MIN_RAW: u32 = 1;
pub const MAX_RAW: u32 = 32000;

/// Line coefficients `(a, b)` for a full scale value
pub fn coefficients(full_scale: f64) -> Result<(f64, f64)> {
    if !full_scale.is_finite() || full_scale <= 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "slope conversion needs a positive full scale, got {}",
            full_scale
        )));
    }

    let min_raw = f64::from(MIN_RAW);
    let max_raw = f64::from(MAX_RAW);
    let slowest = full_scale / MAX_TIME_MS;
    let fastest = full_scale / MIN_TIME_MS;

    let a = (min_raw - max_raw) / (slowest - fastest);
    let b = (max_raw * slowest - fastest * min_raw) / (slowest - fastest);
    Ok((a, b))
}

/// Convert units/ms to a raw register value
///
/// Fails when the result falls outside `MIN_RAW..=MAX_RAW`.
pub fn to_raw(per_ms: f64, full_scale: f64) -> Result<u32> {
    let (a, b) = coefficients(full_scale)?;
    let raw = (a * per_ms + b).round();

    if !(f64::from(MIN_RAW)..=f64::from(MAX_RAW)).contains(&raw) {
        return Err(BridgeError::InvalidArgument(format!(
            "slope {}/ms converts to raw {}, outside {}..={}",
            per_ms, raw, MIN_RAW, MAX_RAW
        )));
    }
    Ok(raw as u32)
}

/// Convert a raw register value to units/ms
pub fn from_raw(raw: u32, full_scale: f64) -> Result<f64> {
    let (a, b) = coefficients(full_scale)?;
    Ok((f64::from(raw) - b) / a)
}

/// Representable range in units/ms: `(slowest, fastest)`
pub fn range(full_scale: f64) -> Result<(f64, f64)> {
    Ok((from_raw(MIN_RAW, full_scale)?, from_raw(MAX_RAW, full_scale)?))
}

/// Whether `raw` is a valid register value
pub fn is_valid_raw(raw: u32) -> bool {
    (MIN_RAW..=MAX_RAW).contains(&raw)
}
