// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! RoiStats extracts regions of interest (ROIs) from a stream of numeric
//! frames and computes per-ROI statistics. Given a frame of 1 to 3
//! dimensions, each configured ROI yields a sub-array plus its total, net,
//! mean, min, max, centroid, profiles and histogram.
//!
//! Features:
//!
//! * Per-dimension start, size, binning and reversal. Out of range requests
//!   are clamped to the frame rather than rejected.
//! * Conversion of the extracted ROI to a different numeric type, or keeping
//!   the type of the source frame.
//! * Background subtraction against a snapshot grabbed from an earlier frame.
//! * Low and high clipping.
//! * Net intensity, estimating the background from a border strip of the ROI.
//! * Centroid averaged over a window of recent frames to smooth jitter.
//! * Histogram with Shannon entropy.
//! * A fixed set of ROIs processed per frame, with aggregate total and net
//!   arrays across all ROIs. A failing ROI does not block the others.
//!
//! # Pipeline
//!
//! For each enabled ROI and each frame:
//!
//! 1. The ROI geometry is resolved against the frame dimensions
//!    ([geometry::resolve_geometry()]).
//! 2. The sub-array is extracted, binned (bin averages) and reversed as
//!    requested, then converted to the target numeric kind
//!    ([image_funcs::extract_roi()]). This is the ROI's output frame.
//! 3. A grabbed background is subtracted if enabled ([background]).
//! 4. Clipping limits are applied ([clip]).
//! 5. Statistics, profiles and histogram are computed over the result
//!    ([statistics], [histogram_funcs]).
//!
//! The output frame is forwarded before background subtraction and
//! clipping; those only affect the statistics.
//!
//! # Usage
//!
//! Create a [RoiEngine] with a fixed number of ROIs, configure them through
//! [RoiEngine::definition_mut()] or the named parameters of
//! [RoiEngine::set_param()], and feed frames to
//! [RoiEngine::process_frame()].
//!
//! # Caveats
//!
//! Frames must be dense with dimension 0 varying fastest. Frames of rank 4
//! or higher are rejected.

pub mod background;
pub mod clip;
pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod histogram_funcs;
pub mod image_funcs;
pub mod params;
pub mod roi;
pub mod statistics;

pub use engine::{EngineConfig, FrameReport, RoiEngine};
pub use error::{Result, RoiError};
pub use frame::{FrameData, NdFrame, NumericKind};
pub use params::{ParamValue, RoiParam};
pub use roi::{RoiDefinition, RoiState};
pub use statistics::RoiStatistics;
