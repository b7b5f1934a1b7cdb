// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use crate::error::{try_resize, Result};
use crate::frame::MAX_DIMS;

/// Upper bound of the centroid averaging window.
pub const MAX_CENTROID_FRAMES: usize = 100;

/// Reduction of a ROI buffer. See [compute_statistics()].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoiStatistics {
    pub num_elements: usize,
    pub total: f64,
    /// `total` minus the border-strip background estimate.
    pub net: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,

    /// Intensity-weighted center of this frame's ROI, in output element
    /// units. Y is 0 for a 1-D ROI. None when the total intensity is zero.
    pub centroid: Option<(f64, f64)>,
}

// Pads `shape` to MAX_DIMS with unit dimensions.
fn padded(shape: &[usize]) -> [usize; MAX_DIMS] {
    let mut sizes = [1_usize; MAX_DIMS];
    sizes[..shape.len()].copy_from_slice(shape);
    sizes
}

/// Single pass over `values` (laid out per `shape`, dimension 0 fastest)
/// computing total, mean, min, max, net and the frame centroid.
///
/// Net subtracts an estimated background from the total: the mean of the
/// elements lying within `bgd_width` of the ROI edge along any dimension,
/// times the element count. With `bgd_width <= 0` net equals total.
pub fn compute_statistics(values: &[f64], shape: &[usize], bgd_width: i64)
                          -> RoiStatistics {
    debug_assert!(shape.len() <= MAX_DIMS);
    debug_assert_eq!(values.len(), shape.iter().product::<usize>());
    let num_elements = values.len();
    if num_elements == 0 {
        return RoiStatistics::default();
    }
    let [nx, ny, nz] = padded(shape);
    let ndims = shape.len();
    let width = if bgd_width > 0 { bgd_width as usize } else { 0 };
    let in_border = |i: usize, n: usize| i < width || i + width >= n;

    let mut total = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut m1x = 0.0;
    let mut m1y = 0.0;
    let mut border_sum = 0.0;
    let mut border_count = 0_usize;

    let mut index = 0;
    for z in 0..nz {
        let z_border = width > 0 && ndims > 2 && in_border(z, nz);
        for y in 0..ny {
            let y_border = z_border || (width > 0 && ndims > 1 && in_border(y, ny));
            for x in 0..nx {
                let value = values[index];
                index += 1;
                total += value;
                min = min.min(value);
                max = max.max(value);
                m1x += x as f64 * value;
                m1y += y as f64 * value;
                if y_border || (width > 0 && in_border(x, nx)) {
                    border_sum += value;
                    border_count += 1;
                }
            }
        }
    }
    let net = if border_count > 0 {
        total - border_sum / border_count as f64 * num_elements as f64
    } else {
        total
    };
    let centroid = if total != 0.0 && total.is_finite() {
        Some((m1x / total, if ndims > 1 { m1y / total } else { 0.0 }))
    } else {
        None
    };
    RoiStatistics{num_elements, total, net,
                  mean: total / num_elements as f64,
                  min, max, centroid}
}

/// Fills `profiles` with one profile per dimension of `shape`: element i of
/// profile d is the sum of all values whose index along d is i.
pub fn compute_profiles(values: &[f64], shape: &[usize], profiles: &mut Vec<Vec<f64>>)
                        -> Result<()> {
    profiles.resize_with(shape.len(), Vec::new);
    for (profile, &size) in profiles.iter_mut().zip(shape) {
        try_resize(profile, size, 0.0, "profile")?;
        profile.fill(0.0);
    }
    let [nx, ny, nz] = padded(shape);
    let mut index = 0;
    for z in 0..nz {
        for y in 0..ny {
            let row = &values[index..index + nx];
            index += nx;
            let row_sum: f64 = row.iter().sum();
            for (x, value) in row.iter().enumerate() {
                profiles[0][x] += value;
            }
            if shape.len() > 1 {
                profiles[1][y] += row_sum;
            }
            if shape.len() > 2 {
                profiles[2][z] += row_sum;
            }
        }
    }
    Ok(())
}

/// Ring of the most recent frame centroids. The reported centroid is the
/// mean of the samples currently held, which smooths frame-to-frame jitter.
#[derive(Clone, Debug)]
pub struct CentroidWindow {
    samples: [(f64, f64); MAX_CENTROID_FRAMES],
    window: usize,
    // Next slot to write.
    cursor: usize,
    count: usize,
}

impl CentroidWindow {
    /// `window` is clamped to 1..=[MAX_CENTROID_FRAMES].
    pub fn new(window: usize) -> CentroidWindow {
        CentroidWindow{samples: [(0.0, 0.0); MAX_CENTROID_FRAMES],
                       window: window.clamp(1, MAX_CENTROID_FRAMES),
                       cursor: 0, count: 0}
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Changes the window length. Any change discards collected samples.
    pub fn set_window(&mut self, window: usize) {
        let window = window.clamp(1, MAX_CENTROID_FRAMES);
        if window != self.window {
            self.window = window;
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.count = 0;
    }

    /// Adds a sample, evicting the oldest one once the window is full.
    pub fn push(&mut self, x: f64, y: f64) {
        self.samples[self.cursor] = (x, y);
        self.cursor = (self.cursor + 1) % self.window;
        self.count = (self.count + 1).min(self.window);
    }

    pub fn average(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        // Once full, the window's slots are exactly the held samples; before
        // that the samples occupy slots 0..count.
        let (sum_x, sum_y) = self.samples[..self.count].iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        Some((sum_x / self.count as f64, sum_y / self.count as f64))
    }
}

#[cfg(test)]
mod tests {
    extern crate approx;
    use approx::assert_abs_diff_eq;
    use super::*;

    #[test]
    fn test_all_ones_4x4() {
        let stats = compute_statistics(&[1.0; 16], &[4, 4], 0);
        assert_eq!(stats.num_elements, 16);
        assert_eq!(stats.total, 16.0);
        assert_eq!(stats.net, 16.0);
        assert_eq!(stats.mean, 1.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.centroid, Some((1.5, 1.5)));
    }

    #[test]
    fn test_min_max_mean() {
        let stats = compute_statistics(&[3.0, -2.0, 7.0, 0.0], &[4], 0);
        assert_eq!(stats.total, 8.0);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 7.0);
    }

    #[test]
    fn test_net_with_border() {
        // 4x4 with border of 2 and a 2x2 core of 10. Border width 1 covers
        // the 12 outer elements.
        let values = [2.0, 2.0, 2.0, 2.0,
                      2.0, 10.0, 10.0, 2.0,
                      2.0, 10.0, 10.0, 2.0,
                      2.0, 2.0, 2.0, 2.0];
        let stats = compute_statistics(&values, &[4, 4], 1);
        assert_eq!(stats.total, 64.0);
        // Background estimate 2 per element over 16 elements.
        assert_eq!(stats.net, 32.0);

        // A border covering everything leaves nothing above background.
        let stats = compute_statistics(&values, &[4, 4], 2);
        assert_eq!(stats.net, 0.0);
    }

    #[test]
    fn test_net_1d_border_ignores_missing_dimensions() {
        let stats = compute_statistics(&[1.0, 5.0, 5.0, 1.0], &[4], 1);
        assert_eq!(stats.total, 12.0);
        assert_eq!(stats.net, 8.0);
    }

    #[test]
    fn test_centroid() {
        let mut values = [0.0; 100];
        values[5 * 10 + 5] = 7.0;
        let stats = compute_statistics(&values, &[10, 10], 0);
        assert_eq!(stats.centroid, Some((5.0, 5.0)));

        values[5 * 10 + 7] = 7.0;
        let stats = compute_statistics(&values, &[10, 10], 0);
        assert_eq!(stats.centroid, Some((6.0, 5.0)));

        let stats = compute_statistics(&[0.0, 1.0, 3.0], &[3], 0);
        assert_abs_diff_eq!(stats.centroid.unwrap().0, 1.75, epsilon = 1e-12);
        assert_eq!(stats.centroid.unwrap().1, 0.0);

        let stats = compute_statistics(&[0.0; 4], &[2, 2], 0);
        assert_eq!(stats.centroid, None);
    }

    #[test]
    fn test_empty() {
        let stats = compute_statistics(&[], &[0, 3], 1);
        assert_eq!(stats, RoiStatistics::default());
    }

    #[test]
    fn test_profiles() {
        let values = [1.0, 2.0, 3.0,
                      4.0, 5.0, 6.0];
        let mut profiles = Vec::<Vec<f64>>::new();
        compute_profiles(&values, &[3, 2], &mut profiles).unwrap();
        assert_eq!(profiles, vec![vec![5.0, 7.0, 9.0], vec![6.0, 15.0]]);

        // Recomputing for a 1-D shape drops the stale profile.
        compute_profiles(&[1.0, 1.0], &[2], &mut profiles).unwrap();
        assert_eq!(profiles, vec![vec![1.0, 1.0]]);

        let cube: Vec<f64> = (0..8).map(|v| v as f64).collect();
        compute_profiles(&cube, &[2, 2, 2], &mut profiles).unwrap();
        assert_eq!(profiles[0], vec![12.0, 16.0]);
        assert_eq!(profiles[1], vec![10.0, 18.0]);
        assert_eq!(profiles[2], vec![6.0, 22.0]);
    }

    #[test]
    fn test_centroid_window_converges() {
        let mut window = CentroidWindow::new(3);
        assert_eq!(window.average(), None);
        for _ in 0..3 {
            window.push(5.0, 5.0);
        }
        assert_eq!(window.average(), Some((5.0, 5.0)));

        window.push(8.0, 2.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), Some((6.0, 4.0)));
        window.push(8.0, 2.0);
        window.push(8.0, 2.0);
        // All of the earlier samples have been evicted.
        assert_eq!(window.average(), Some((8.0, 2.0)));
    }

    #[test]
    fn test_centroid_window_resets_on_change() {
        let mut window = CentroidWindow::new(4);
        window.push(1.0, 1.0);
        window.push(3.0, 3.0);
        assert_eq!(window.average(), Some((2.0, 2.0)));
        window.set_window(4);
        assert_eq!(window.len(), 2);
        window.set_window(2);
        assert!(window.is_empty());
        window.push(9.0, 0.0);
        assert_eq!(window.average(), Some((9.0, 0.0)));

        window.set_window(0);
        assert_eq!(window.window(), 1);
        window.set_window(1000);
        assert_eq!(window.window(), MAX_CENTROID_FRAMES);
    }
}  // mod tests.
