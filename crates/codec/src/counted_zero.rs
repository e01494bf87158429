//! Run-length compression of zero-valued channels

use crate::error::{Error, Result};

/// Threshold below which a channel count is treated as zero, matching the
/// `10 * FLT_MIN` tolerance used by the format this codec interoperates with
pub const ZERO_THRESHOLD: f64 = 10.0 * f32::MIN_POSITIVE as f64;

/// Hard cap on the number of samples an expansion may produce
pub const MAX_EXPANDED_SAMPLES: usize = 131_072;

fn is_zero(x: f64) -> bool {
    x.abs() < ZERO_THRESHOLD
}

/// Replace every run of zero-valued channels with `[0.0, run_length]`
pub fn compress_to_counted_zeros(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut i = 0;
    while i < values.len() {
        if is_zero(values[i]) {
            let start = i;
            while i < values.len() && is_zero(values[i]) {
                i += 1;
            }
            out.push(0.0);
            out.push((i - start) as f64);
        } else {
            out.push(values[i]);
            i += 1;
        }
    }
    out
}

/// Inverse of [`compress_to_counted_zeros`]
pub fn expand_counted_zeros(values: &[f64]) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut i = 0;
    while i < values.len() {
        if is_zero(values[i]) {
            let run_len = *values.get(i + 1).unwrap_or(&0.0);
            if run_len <= 0.0 {
                return Err(Error::NonPositiveZeroRun);
            }
            let run_len = run_len as usize;
            if out.len() + run_len > MAX_EXPANDED_SAMPLES {
                return Err(Error::ZeroExpansionTooLarge(MAX_EXPANDED_SAMPLES));
            }
            out.extend(std::iter::repeat(0.0).take(run_len));
            i += 2;
        } else {
            if out.len() >= MAX_EXPANDED_SAMPLES {
                return Err(Error::ZeroExpansionTooLarge(MAX_EXPANDED_SAMPLES));
            }
            out.push(values[i]);
            i += 1;
        }
    }
    Ok(out)
}
