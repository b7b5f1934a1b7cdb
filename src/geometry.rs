// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoiError};
use crate::frame::MAX_DIMS;

/// Requested extent of a ROI along one dimension, as configured through the
/// DIMn_MIN / DIMn_SIZE / DIMn_BIN / DIMn_REVERSE parameters. Values are
/// signed because they arrive unvalidated from the parameter layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimDefinition {
    /// First source element.
    pub start: i64,
    /// Number of output (binned) elements. 0 means "as many as fit".
    pub size: i64,
    /// Source elements averaged into one output element.
    pub bin: i64,
    pub reverse: bool,

    /// Largest `size` that fits the last source frame given `start` and
    /// `bin`. Written back by [resolve_geometry()]; read-only to users.
    #[serde(skip)]
    pub max_size: usize,
}

impl Default for DimDefinition {
    fn default() -> Self {
        DimDefinition{start: 0, size: 0, bin: 1, reverse: false, max_size: 0}
    }
}

/// Validated extraction parameters for one dimension. Always satisfies
/// `bin >= 1` and `start + size * bin <= source size`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResolvedDim {
    pub start: usize,
    pub size: usize,
    pub bin: usize,
    pub reverse: bool,
}

/// Validated extraction geometry, one entry per source dimension.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Geometry {
    dims: Vec<ResolvedDim>,
}

impl Geometry {
    pub fn dims(&self) -> &[ResolvedDim] {
        &self.dims
    }

    pub fn output_shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.size).collect()
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().map(|d| d.size).product()
    }
}

// Returns the resolved dimension and the maximum available size.
fn resolve_dim(def: &DimDefinition, source_size: usize) -> (ResolvedDim, usize) {
    if source_size == 0 {
        return (ResolvedDim{start: 0, size: 0, bin: 1, reverse: def.reverse}, 0);
    }
    let bin = (def.bin.max(1) as u64).min(source_size as u64) as usize;
    // Last position at which one full bin still fits.
    let max_start = source_size - bin;
    let start = def.start.clamp(0, max_start as i64) as usize;
    let max_size = (source_size - start) / bin;
    let size = if def.size <= 0 || def.size as u64 > max_size as u64 {
        max_size
    } else {
        def.size as usize
    };
    (ResolvedDim{start, size, bin, reverse: def.reverse}, max_size)
}

/// Clamps the requested ROI extents to the dimensions of the source frame.
/// Out of range requests are never an error; they are silently clamped (and
/// noted in the debug log). The maximum available size of each dimension is
/// written back to `defs`. Definitions for dimensions beyond the source rank
/// are ignored.
///
/// # Errors
/// [RoiError::UnsupportedRank] if the source has no dimensions or more than
/// [MAX_DIMS].
pub fn resolve_geometry(defs: &mut [DimDefinition; MAX_DIMS], source_dims: &[usize])
                        -> Result<Geometry> {
    if source_dims.is_empty() || source_dims.len() > MAX_DIMS {
        return Err(RoiError::UnsupportedRank{ndims: source_dims.len(),
                                             max: MAX_DIMS});
    }
    let mut dims = Vec::<ResolvedDim>::with_capacity(source_dims.len());
    for (index, &source_size) in source_dims.iter().enumerate() {
        let def = &mut defs[index];
        let (resolved, max_size) = resolve_dim(def, source_size);
        def.max_size = max_size;
        let requested_size = if def.size <= 0 { max_size as i64 } else { def.size };
        if resolved.start as i64 != def.start || resolved.bin as i64 != def.bin ||
            resolved.size as i64 != requested_size
        {
            debug!("Dimension {} clamped from start {} size {} bin {} to {:?} \
                    (source size {})",
                   index, def.start, def.size, def.bin, resolved, source_size);
        }
        dims.push(resolved);
    }
    Ok(Geometry{dims})
}

// mod tests.
