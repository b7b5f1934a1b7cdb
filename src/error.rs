// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors surfaced by the ROI engine. None of these escape the per-ROI
/// processing boundary during frame processing; they are collected in the
/// [FrameReport](crate::engine::FrameReport) instead.
#[derive(Debug, Error)]
pub enum RoiError {
    #[error("Unsupported data type code {0}")]
    UnsupportedNumericKind(i64),

    #[error("Unsupported frame rank {ndims}; expected 1 to {max} dimensions")]
    UnsupportedRank { ndims: usize, max: usize },

    #[error("Frame buffer holds {actual} elements but dimensions {dims:?} need {expected}")]
    BufferSize { dims: Vec<usize>, expected: usize, actual: usize },

    #[error("Could not allocate {what} buffer of {len} elements: {source}")]
    Allocation {
        what: &'static str,
        len: usize,
        source: TryReserveError,
    },

    #[error("ROI index {index} out of range; engine has {max_rois} ROIs")]
    InvalidRoiIndex { index: usize, max_rois: usize },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Parameter '{0}' is read-only")]
    ReadOnlyParameter(&'static str),

    #[error("Parameter '{name}' expects a {expected} value")]
    ParameterType { name: &'static str, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, RoiError>;

/// Resizes `buf` to `len` elements, reporting allocation failure instead of
/// aborting. `buf` is left untouched when the reservation fails.
pub(crate) fn try_resize<T: Clone>(buf: &mut Vec<T>, len: usize, value: T,
                                   what: &'static str) -> Result<()> {
    if len > buf.len() {
        buf.try_reserve_exact(len - buf.len())
            .map_err(|source| RoiError::Allocation{what, len, source})?;
    }
    buf.resize(len, value);
    Ok(())
}
