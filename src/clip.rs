// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

/// Clamps every element of `buffer` in place to `[low, +inf)` and/or
/// `(-inf, high]`. A `None` threshold is not applied.
pub fn clip(buffer: &mut [f64], low: Option<f64>, high: Option<f64>) {
    match (low, high) {
        (None, None) => (),
        (Some(low), None) => buffer.iter_mut().for_each(|v| *v = v.max(low)),
        (None, Some(high)) => buffer.iter_mut().for_each(|v| *v = v.min(high)),
        (Some(low), Some(high)) => {
            for v in buffer.iter_mut() {
                // Applied in sequence rather than f64::clamp(), which panics
                // when low > high.
                *v = v.max(low).min(high);
            }
        }
    }
}

// mod tests.
