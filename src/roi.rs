// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::Instant;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::background::{Background, BackgroundOutcome};
use crate::clip::clip;
use crate::error::Result;
use crate::frame::{NdFrame, NumericKind, MAX_DIMS};
use crate::geometry::{resolve_geometry, DimDefinition};
use crate::histogram_funcs::Histogram;
use crate::image_funcs::extract_roi;
use crate::statistics::{compute_profiles, compute_statistics, CentroidWindow,
                        RoiStatistics};

/// ROI_DATA_TYPE value meaning "same kind as the source frame".
pub const AUTO_DATA_TYPE: i32 = -1;

/// User configuration of one ROI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiDefinition {
    pub name: String,
    /// Whether the ROI is processed at all.
    pub enabled: bool,
    /// Display hint: outline this ROI when rendering frames.
    pub highlight: bool,
    pub dims: [DimDefinition; MAX_DIMS],
    /// [NumericKind] code of the extracted frame, or [AUTO_DATA_TYPE].
    pub data_type: i32,

    pub low_clip: f64,
    pub do_low_clip: bool,
    pub high_clip: f64,
    pub do_high_clip: bool,

    pub do_background: bool,

    pub compute_statistics: bool,
    /// Width of the border strip used to estimate the background for `net`.
    pub bgd_width: i64,
    /// Number of recent frames whose centroids are averaged, 1 to 100.
    pub centroid_frames: i64,
    pub compute_profiles: bool,

    pub compute_histogram: bool,
    pub hist_size: i64,
    pub hist_min: f64,
    pub hist_max: f64,
}

impl Default for RoiDefinition {
    fn default() -> Self {
        RoiDefinition{
            name: String::new(),
            enabled: false,
            highlight: false,
            dims: Default::default(),
            data_type: AUTO_DATA_TYPE,
            low_clip: 0.0,
            do_low_clip: false,
            high_clip: 0.0,
            do_high_clip: false,
            do_background: false,
            compute_statistics: true,
            bgd_width: 0,
            centroid_frames: 1,
            compute_profiles: false,
            compute_histogram: false,
            hist_size: 256,
            hist_min: 0.0,
            hist_max: 255.0,
        }
    }
}

impl RoiDefinition {
    /// Resolves `data_type` against the kind of the source frame.
    pub fn target_kind(&self, source_kind: NumericKind) -> Result<NumericKind> {
        if self.data_type == AUTO_DATA_TYPE {
            Ok(source_kind)
        } else {
            NumericKind::from_code(self.data_type)
        }
    }

    fn clip_limits(&self) -> (Option<f64>, Option<f64>) {
        (if self.do_low_clip { Some(self.low_clip) } else { None },
         if self.do_high_clip { Some(self.high_clip) } else { None })
    }
}

/// Per-frame state and published outputs of one ROI. Buffers are kept across
/// frames and reallocated only when the ROI shape or kind changes.
///
/// A frame is first processed into scratch buffers; the published outputs
/// are swapped in only once every fallible step has succeeded.
#[derive(Debug)]
pub struct RoiState {
    // Extracted sub-array in the target kind, before background and clipping.
    output: NdFrame,
    // Extracted values widened to f64; background subtraction, clipping and
    // the reductions operate here.
    working: Vec<f64>,
    shape: Vec<usize>,
    background: Background,
    grab_background: bool,
    background_outcome: Option<BackgroundOutcome>,
    statistics: RoiStatistics,
    centroid_window: CentroidWindow,
    centroid: (f64, f64),
    profiles: Vec<Vec<f64>>,
    histogram: Histogram,

    // Scratch counterparts of output, working, profiles and histogram.
    next_output: NdFrame,
    scratch: Vec<f64>,
    next_profiles: Vec<Vec<f64>>,
    next_histogram: Histogram,
}

impl Default for RoiState {
    fn default() -> Self {
        RoiState{output: NdFrame::empty(NumericKind::Float64),
                 working: Vec::new(),
                 shape: Vec::new(),
                 background: Background::default(),
                 grab_background: false,
                 background_outcome: None,
                 statistics: RoiStatistics::default(),
                 centroid_window: CentroidWindow::new(1),
                 centroid: (0.0, 0.0),
                 profiles: Vec::new(),
                 histogram: Histogram::default(),
                 next_output: NdFrame::empty(NumericKind::Float64),
                 scratch: Vec::new(),
                 next_profiles: Vec::new(),
                 next_histogram: Histogram::default()}
    }
}

impl RoiState {
    /// Runs the extraction and statistics pipeline of one ROI on `frame`:
    /// geometry resolution, extraction (binning, reversal, kind conversion),
    /// background subtraction, clipping, statistics, profiles and histogram.
    ///
    /// The maximum available size of each dimension is written back to
    /// `definition`.
    ///
    /// # Errors
    /// Unsupported frame rank or data type code, or buffer allocation failure.
    /// Published outputs keep their previous values in that case.
    pub fn process(&mut self, definition: &mut RoiDefinition, frame: &NdFrame)
                   -> Result<()> {
        let process_start = Instant::now();
        let geometry = resolve_geometry(&mut definition.dims, frame.dims())?;
        let kind = definition.target_kind(frame.kind())?;
        let shape = geometry.output_shape();

        extract_roi(frame, &geometry, &mut self.scratch)?;
        if self.next_output.kind() != kind {
            self.next_output = NdFrame::empty(kind);
        }
        self.next_output.assign_from_f64(&shape, &self.scratch)?;
        // Downstream values are those of the target kind, so reduce over
        // the converted values.
        if kind != NumericKind::Float64 {
            self.next_output.widen_into(&mut self.scratch)?;
        }

        let grabbed = if self.grab_background {
            let mut grabbed = Background::default();
            grabbed.capture(&self.scratch, &shape)?;
            Some(grabbed)
        } else {
            None
        };
        let background = grabbed.as_ref().unwrap_or(&self.background);
        let background_outcome =
            background.subtract(&mut self.scratch, &shape, definition.do_background);
        let (low, high) = definition.clip_limits();
        clip(&mut self.scratch, low, high);

        if definition.compute_profiles {
            compute_profiles(&self.scratch, &shape, &mut self.next_profiles)?;
        }
        if definition.compute_histogram {
            self.next_histogram.compute(&self.scratch,
                                        definition.hist_size.max(1) as usize,
                                        definition.hist_min, definition.hist_max)?;
        }

        // Nothing below can fail.
        std::mem::swap(&mut self.output, &mut self.next_output);
        std::mem::swap(&mut self.working, &mut self.scratch);
        self.shape = shape;
        if let Some(grabbed) = grabbed {
            self.background = grabbed;
            self.grab_background = false;
        }
        self.background.check_shape(&self.shape);
        self.background_outcome = Some(background_outcome);

        if definition.compute_statistics {
            self.statistics = compute_statistics(&self.working, &self.shape,
                                                 definition.bgd_width);
            self.centroid_window.set_window(
                definition.centroid_frames.max(1) as usize);
            if let Some((x, y)) = self.statistics.centroid {
                self.centroid_window.push(x, y);
            }
            self.centroid = self.centroid_window.average().unwrap_or((0.0, 0.0));
        } else {
            self.statistics = RoiStatistics::default();
            self.centroid = (0.0, 0.0);
        }
        if definition.compute_profiles {
            std::mem::swap(&mut self.profiles, &mut self.next_profiles);
        } else {
            self.profiles.clear();
        }
        if definition.compute_histogram {
            std::mem::swap(&mut self.histogram, &mut self.next_histogram);
        } else {
            self.histogram.clear();
        }
        debug!("ROI '{}' shape {:?} processed in {:?}",
               definition.name, self.shape, process_start.elapsed());
        Ok(())
    }

    /// Arms a background capture; the next processed frame's extracted ROI
    /// (before subtraction) becomes the background.
    pub fn grab_background(&mut self) {
        self.grab_background = true;
    }

    /// True while a grab armed by [RoiState::grab_background()] waits for
    /// the next frame.
    pub fn background_pending(&self) -> bool {
        self.grab_background
    }

    /// Takes the most recently extracted ROI as background right away.
    pub fn capture_background(&mut self) -> Result<()> {
        let values = self.output.to_f64_vec();
        self.background.capture(&values, &self.shape)
    }

    pub fn clear_background(&mut self) {
        self.grab_background = false;
        self.background.clear();
    }

    pub fn valid_background(&self) -> bool {
        self.background.is_valid()
    }

    /// What background subtraction did on the last processed frame.
    pub fn background_outcome(&self) -> Option<BackgroundOutcome> {
        self.background_outcome
    }

    /// The extracted sub-array of the last processed frame, in the ROI's
    /// target kind. Background subtraction and clipping are not applied.
    pub fn output_frame(&self) -> &NdFrame {
        &self.output
    }

    /// The last frame's ROI values after background subtraction and
    /// clipping, as used for the statistics.
    pub fn processed_values(&self) -> &[f64] {
        &self.working
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn statistics(&self) -> &RoiStatistics {
        &self.statistics
    }

    /// Window-averaged centroid (x, y).
    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }

    /// One profile per ROI dimension; empty unless profiles are enabled.
    pub fn profiles(&self) -> &[Vec<f64>] {
        &self.profiles
    }

    /// Histogram counts; empty unless the histogram is enabled.
    pub fn histogram(&self) -> &[u32] {
        self.histogram.counts()
    }

    pub fn histogram_entropy(&self) -> f64 {
        self.histogram.entropy()
    }
}

// mod tests.
