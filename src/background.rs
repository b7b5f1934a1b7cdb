// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use log::{debug, warn};

use crate::error::{try_resize, Result};

/// Result of [Background::subtract()].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BackgroundOutcome {
    /// Background subtraction is turned off; buffer untouched.
    Disabled,
    /// No valid snapshot exists; buffer untouched.
    NoSnapshot,
    /// The snapshot no longer matches the ROI shape; buffer untouched.
    ShapeMismatch,
    Subtracted,
}

/// Background reference for one ROI: an owned copy of a previously extracted
/// ROI buffer plus the shape it was taken with.
#[derive(Debug, Default)]
pub struct Background {
    values: Vec<f64>,
    shape: Vec<usize>,
    valid: bool,
}

impl Background {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Stores a copy of `buffer` (of the given `shape`) as the background.
    /// On allocation failure the previous snapshot is kept as is.
    pub fn capture(&mut self, buffer: &[f64], shape: &[usize]) -> Result<()> {
        debug_assert_eq!(buffer.len(), shape.iter().product::<usize>());
        try_resize(&mut self.values, buffer.len(), 0.0, "background")?;
        self.values.copy_from_slice(buffer);
        self.shape.clear();
        self.shape.extend_from_slice(shape);
        self.valid = true;
        debug!("Captured background of shape {:?}", shape);
        Ok(())
    }

    /// Invalidates the snapshot and releases its storage.
    pub fn clear(&mut self) {
        self.values = Vec::new();
        self.shape.clear();
        self.valid = false;
    }

    /// Invalidates the snapshot when it was taken with a shape other than
    /// `shape`. Runs on every processed frame, whether or not subtraction is
    /// enabled. Returns whether the snapshot is still valid.
    pub fn check_shape(&mut self, shape: &[usize]) -> bool {
        if self.valid && self.shape != shape {
            warn!("Background shape {:?} does not match ROI shape {:?}; \
                   background invalidated", self.shape, shape);
            self.valid = false;
        }
        self.valid
    }

    /// Subtracts the snapshot from `buffer` element-wise when `enabled` and
    /// the snapshot is valid for `shape`. Results may be negative. The
    /// snapshot itself is not modified; see [Background::check_shape()].
    pub fn subtract(&self, buffer: &mut [f64], shape: &[usize], enabled: bool)
                    -> BackgroundOutcome {
        if !enabled {
            return BackgroundOutcome::Disabled;
        }
        if !self.valid {
            return BackgroundOutcome::NoSnapshot;
        }
        if self.shape != shape {
            return BackgroundOutcome::ShapeMismatch;
        }
        for (value, background) in buffer.iter_mut().zip(&self.values) {
            *value -= background;
        }
        BackgroundOutcome::Subtracted
    }
}

// mod tests.
