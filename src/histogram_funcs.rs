// Copyright (c) 2024 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use crate::error::{try_resize, Result};

/// Returns the histogram bin for `value` among `size` equal-width bins
/// spanning [min, max]. Values outside the range saturate into the first or
/// last bin, so every value lands in some bin.
pub fn bin_for_value(value: f64, min: f64, max: f64, size: usize) -> usize {
    debug_assert!(size > 0);
    let width = (max - min) / size as f64;
    if !(width > 0.0) {
        // Degenerate range: split at min.
        return if value < min { 0 } else { size - 1 };
    }
    // Float to usize conversion saturates: negative and NaN give 0.
    let bin = ((value - min) / width).floor() as usize;
    bin.min(size - 1)
}

/// Accumulates `values` into `histogram`, whose length is the bin count. The
/// histogram is zeroed first.
pub fn fill_histogram(values: &[f64], min: f64, max: f64, histogram: &mut [u32]) {
    histogram.fill(0);
    if histogram.is_empty() {
        return;
    }
    let size = histogram.len();
    for &value in values {
        histogram[bin_for_value(value, min, max, size)] += 1;
    }
}

/// Shannon entropy (bits) of the distribution described by `histogram`.
/// Empty bins contribute nothing; an empty histogram has zero entropy.
pub fn entropy_for_histogram(histogram: &[u32]) -> f64 {
    let count: u64 = histogram.iter().map(|&h| h as u64).sum();
    if count == 0 {
        return 0.0;
    }
    let mut entropy = 0.0;
    for &bin_count in histogram {
        if bin_count == 0 {
            continue;
        }
        let p = bin_count as f64 / count as f64;
        entropy -= p * p.log2();
    }
    entropy
}

/// Histogram buffer of a ROI plus its entropy. The buffer length equals the
/// size of the last computation, or 0 after [Histogram::clear()].
#[derive(Clone, Debug, Default)]
pub struct Histogram {
    counts: Vec<u32>,
    entropy: f64,
}

impl Histogram {
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    /// Drops the counts and their storage.
    pub fn clear(&mut self) {
        self.counts = Vec::new();
        self.entropy = 0.0;
    }

    /// Recomputes the histogram of `values`. A change of `size` reallocates
    /// the buffer; on allocation failure the previous histogram is retained.
    /// `size` below 1 is treated as 1.
    pub fn compute(&mut self, values: &[f64], size: usize, min: f64, max: f64)
                   -> Result<()> {
        let size = size.max(1);
        if size != self.counts.len() {
            let mut counts = Vec::<u32>::new();
            try_resize(&mut counts, size, 0, "histogram")?;
            self.counts = counts;
        }
        fill_histogram(values, min, max, &mut self.counts);
        self.entropy = entropy_for_histogram(&self.counts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;
    use crate::error::RoiError;
    use super::*;

    #[test]
    fn test_saturating_bins() {
        let mut histogram = [0_u32; 4];
        fill_histogram(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 0.0, 4.0, &mut histogram);
        assert_eq!(histogram, [1, 1, 1, 3]);
        assert_abs_diff_eq!(entropy_for_histogram(&histogram),
                            3.0 / 6.0 * 6_f64.log2() + 0.5,
                            epsilon = 1e-12);

        fill_histogram(&[-10.0, f64::NAN, 0.5, 1e9], 0.0, 4.0, &mut histogram);
        assert_eq!(histogram, [3, 0, 0, 1]);
    }

    #[test]
    fn test_counts_sum_to_element_count() {
        let values: Vec<f64> = (0..57).map(|v| (v * 7 % 23) as f64 - 4.0).collect();
        for &(min, max, size) in &[(0.0, 10.0, 5), (-3.0, 3.0, 1),
                                   (5.0, 5.0, 8), (10.0, 0.0, 3), (-100.0, 100.0, 256)] {
            let mut histogram = vec![0_u32; size];
            fill_histogram(&values, min, max, &mut histogram);
            assert_eq!(histogram.iter().sum::<u32>(), values.len() as u32,
                       "min {} max {} size {}", min, max, size);
        }
    }

    #[test]
    fn test_entropy_extremes() {
        assert_eq!(entropy_for_histogram(&[0, 12, 0, 0]), 0.0);
        assert_eq!(entropy_for_histogram(&[0, 0, 0]), 0.0);
        assert_abs_diff_eq!(entropy_for_histogram(&[3, 3, 3, 3, 3, 3, 3, 3]),
                            3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(entropy_for_histogram(&[5, 5]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_histogram_resize_discards() {
        let mut histogram = Histogram::default();
        histogram.compute(&[0.0, 1.0, 2.0, 3.0], 4, 0.0, 4.0).unwrap();
        assert_eq!(histogram.counts(), &[1, 1, 1, 1]);
        assert_abs_diff_eq!(histogram.entropy(), 2.0, epsilon = 1e-12);

        histogram.compute(&[0.0, 1.0, 2.0, 3.0], 2, 0.0, 4.0).unwrap();
        assert_eq!(histogram.counts(), &[2, 2]);

        histogram.compute(&[7.0], 0, 0.0, 4.0).unwrap();
        assert_eq!(histogram.counts(), &[1]);
        assert_eq!(histogram.entropy(), 0.0);

        histogram.clear();
        assert!(histogram.counts().is_empty());
    }

    #[test]
    fn test_histogram_allocation_failure_keeps_counts() {
        let mut histogram = Histogram::default();
        histogram.compute(&[0.0, 3.0], 2, 0.0, 4.0).unwrap();
        let result = histogram.compute(&[1.0], usize::MAX, 0.0, 4.0);
        assert!(matches!(result, Err(RoiError::Allocation{what: "histogram", ..})));
        assert_eq!(histogram.counts(), &[1, 1]);
        assert_abs_diff_eq!(histogram.entropy(), 1.0, epsilon = 1e-12);
    }
}  // mod tests.
