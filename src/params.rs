// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Named parameter surface of a ROI, for binding to an external parameter
//! database. Per-dimension parameters (DIM0_MIN, DIM1_MIN, ...) address the
//! fixed array of [DimDefinition](crate::geometry::DimDefinition) records
//! by index.

use crate::error::{Result, RoiError};
use crate::frame::MAX_DIMS;
use crate::roi::{RoiDefinition, RoiState};
use crate::statistics::MAX_CENTROID_FRAMES;

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    FloatArray(Vec<f64>),
}

impl ParamValue {
    fn as_int(&self, name: &'static str) -> Result<i64> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(RoiError::ParameterType{name, expected: "integer"}),
        }
    }

    fn as_bool(&self, name: &'static str) -> Result<bool> {
        Ok(self.as_int(name)? != 0)
    }

    fn as_float(&self, name: &'static str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(RoiError::ParameterType{name, expected: "float"}),
        }
    }

    fn as_text(&self, name: &'static str) -> Result<&str> {
        match self {
            ParamValue::Text(v) => Ok(v),
            _ => Err(RoiError::ParameterType{name, expected: "text"}),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Int(value as i64)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DimField {
    Min,
    Size,
    MaxSize,
    Bin,
    Reverse,
}

const DIM_FIELDS: [DimField; 5] =
    [DimField::Min, DimField::Size, DimField::MaxSize, DimField::Bin, DimField::Reverse];

const DIM_NAMES: [[&str; 5]; MAX_DIMS] = [
    ["DIM0_MIN", "DIM0_SIZE", "DIM0_MAX_SIZE", "DIM0_BIN", "DIM0_REVERSE"],
    ["DIM1_MIN", "DIM1_SIZE", "DIM1_MAX_SIZE", "DIM1_BIN", "DIM1_REVERSE"],
    ["DIM2_MIN", "DIM2_SIZE", "DIM2_MAX_SIZE", "DIM2_BIN", "DIM2_REVERSE"],
];

const PROFILE_NAMES: [&str; MAX_DIMS] = ["DIM0_PROFILE", "DIM1_PROFILE", "DIM2_PROFILE"];

/// One named ROI parameter. Engine-wide arrays (TOTAL_ARRAY, NET_ARRAY)
/// are handled by [RoiEngine](crate::engine::RoiEngine) directly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoiParam {
    Name,
    Use,
    Highlight,
    Dim(usize, DimField),
    DataType,
    LowClip,
    DoLowClip,
    HighClip,
    DoHighClip,
    GrabBackground,
    DoBackground,
    ValidBackground,
    ComputeStatistics,
    BgdWidth,
    MinValue,
    MaxValue,
    MeanValue,
    Total,
    Net,
    CentroidFrames,
    CentroidX,
    CentroidY,
    ComputeProfiles,
    Profile(usize),
    ComputeHistogram,
    HistSize,
    HistMin,
    HistMax,
    HistEntropy,
    HistArray,
}

impl RoiParam {
    pub fn from_name(name: &str) -> Result<RoiParam> {
        let param = match name {
            "NAME" => RoiParam::Name,
            "USE" => RoiParam::Use,
            "HIGHLIGHT" => RoiParam::Highlight,
            "ROI_DATA_TYPE" => RoiParam::DataType,
            "LOW_CLIP" => RoiParam::LowClip,
            "DO_LOW_CLIP" => RoiParam::DoLowClip,
            "HIGH_CLIP" => RoiParam::HighClip,
            "DO_HIGH_CLIP" => RoiParam::DoHighClip,
            "GRAB_BACKGROUND" => RoiParam::GrabBackground,
            "DO_BACKGROUND" => RoiParam::DoBackground,
            "VALID_BACKGROUND" => RoiParam::ValidBackground,
            "COMPUTE_STATISTICS" => RoiParam::ComputeStatistics,
            "BGD_WIDTH" => RoiParam::BgdWidth,
            "MIN_VALUE" => RoiParam::MinValue,
            "MAX_VALUE" => RoiParam::MaxValue,
            "MEAN_VALUE" => RoiParam::MeanValue,
            "TOTAL" => RoiParam::Total,
            "NET" => RoiParam::Net,
            "CENTROID_FRAMES" => RoiParam::CentroidFrames,
            "CENTROIDX_VALUE" => RoiParam::CentroidX,
            "CENTROIDY_VALUE" => RoiParam::CentroidY,
            "COMPUTE_PROFILES" => RoiParam::ComputeProfiles,
            "COMPUTE_HISTOGRAM" => RoiParam::ComputeHistogram,
            "HIST_SIZE" => RoiParam::HistSize,
            "HIST_MIN" => RoiParam::HistMin,
            "HIST_MAX" => RoiParam::HistMax,
            "HIST_ENTROPY" => RoiParam::HistEntropy,
            "HIST_ARRAY" => RoiParam::HistArray,
            _ => {
                for dim in 0..MAX_DIMS {
                    if let Some(f) = DIM_NAMES[dim].iter().position(|n| *n == name) {
                        return Ok(RoiParam::Dim(dim, DIM_FIELDS[f]));
                    }
                    if PROFILE_NAMES[dim] == name {
                        return Ok(RoiParam::Profile(dim));
                    }
                }
                return Err(RoiError::UnknownParameter(name.to_string()));
            }
        };
        Ok(param)
    }

    pub fn name(self) -> &'static str {
        match self {
            RoiParam::Name => "NAME",
            RoiParam::Use => "USE",
            RoiParam::Highlight => "HIGHLIGHT",
            RoiParam::Dim(dim, field) => {
                let f = DIM_FIELDS.iter().position(|d| *d == field).unwrap_or(0);
                DIM_NAMES[dim][f]
            }
            RoiParam::DataType => "ROI_DATA_TYPE",
            RoiParam::LowClip => "LOW_CLIP",
            RoiParam::DoLowClip => "DO_LOW_CLIP",
            RoiParam::HighClip => "HIGH_CLIP",
            RoiParam::DoHighClip => "DO_HIGH_CLIP",
            RoiParam::GrabBackground => "GRAB_BACKGROUND",
            RoiParam::DoBackground => "DO_BACKGROUND",
            RoiParam::ValidBackground => "VALID_BACKGROUND",
            RoiParam::ComputeStatistics => "COMPUTE_STATISTICS",
            RoiParam::BgdWidth => "BGD_WIDTH",
            RoiParam::MinValue => "MIN_VALUE",
            RoiParam::MaxValue => "MAX_VALUE",
            RoiParam::MeanValue => "MEAN_VALUE",
            RoiParam::Total => "TOTAL",
            RoiParam::Net => "NET",
            RoiParam::CentroidFrames => "CENTROID_FRAMES",
            RoiParam::CentroidX => "CENTROIDX_VALUE",
            RoiParam::CentroidY => "CENTROIDY_VALUE",
            RoiParam::ComputeProfiles => "COMPUTE_PROFILES",
            RoiParam::Profile(dim) => PROFILE_NAMES[dim],
            RoiParam::ComputeHistogram => "COMPUTE_HISTOGRAM",
            RoiParam::HistSize => "HIST_SIZE",
            RoiParam::HistMin => "HIST_MIN",
            RoiParam::HistMax => "HIST_MAX",
            RoiParam::HistEntropy => "HIST_ENTROPY",
            RoiParam::HistArray => "HIST_ARRAY",
        }
    }

    /// Outputs and derived values; writing them is an error.
    pub fn is_read_only(self) -> bool {
        matches!(self,
                 RoiParam::Dim(_, DimField::MaxSize) | RoiParam::ValidBackground |
                 RoiParam::MinValue | RoiParam::MaxValue | RoiParam::MeanValue |
                 RoiParam::Total | RoiParam::Net |
                 RoiParam::CentroidX | RoiParam::CentroidY |
                 RoiParam::Profile(_) |
                 RoiParam::HistEntropy | RoiParam::HistArray)
    }
}

/// Writes `value` to the configuration of one ROI. GRAB_BACKGROUND arms a
/// capture on the next frame instead of changing the definition.
pub(crate) fn write_param(param: RoiParam, definition: &mut RoiDefinition,
                          state: &mut RoiState, value: &ParamValue) -> Result<()> {
    let name = param.name();
    if param.is_read_only() {
        return Err(RoiError::ReadOnlyParameter(name));
    }
    match param {
        RoiParam::Name => definition.name = value.as_text(name)?.to_string(),
        RoiParam::Use => definition.enabled = value.as_bool(name)?,
        RoiParam::Highlight => definition.highlight = value.as_bool(name)?,
        RoiParam::Dim(dim, field) => {
            let d = &mut definition.dims[dim];
            match field {
                DimField::Min => d.start = value.as_int(name)?,
                DimField::Size => d.size = value.as_int(name)?,
                DimField::Bin => d.bin = value.as_int(name)?,
                DimField::Reverse => d.reverse = value.as_bool(name)?,
                DimField::MaxSize => unreachable!(),  // Read-only.
            }
        }
        RoiParam::DataType => {
            let code = value.as_int(name)?;
            definition.data_type = i32::try_from(code)
                .map_err(|_| RoiError::UnsupportedNumericKind(code))?;
        }
        RoiParam::LowClip => definition.low_clip = value.as_float(name)?,
        RoiParam::DoLowClip => definition.do_low_clip = value.as_bool(name)?,
        RoiParam::HighClip => definition.high_clip = value.as_float(name)?,
        RoiParam::DoHighClip => definition.do_high_clip = value.as_bool(name)?,
        RoiParam::GrabBackground => {
            if value.as_bool(name)? {
                state.grab_background();
            }
        }
        RoiParam::DoBackground => definition.do_background = value.as_bool(name)?,
        RoiParam::ComputeStatistics =>
            definition.compute_statistics = value.as_bool(name)?,
        RoiParam::BgdWidth => definition.bgd_width = value.as_int(name)?,
        RoiParam::CentroidFrames => {
            definition.centroid_frames =
                value.as_int(name)?.clamp(1, MAX_CENTROID_FRAMES as i64);
        }
        RoiParam::ComputeProfiles => definition.compute_profiles = value.as_bool(name)?,
        RoiParam::ComputeHistogram =>
            definition.compute_histogram = value.as_bool(name)?,
        RoiParam::HistSize => definition.hist_size = value.as_int(name)?.max(1),
        RoiParam::HistMin => definition.hist_min = value.as_float(name)?,
        RoiParam::HistMax => definition.hist_max = value.as_float(name)?,
        _ => unreachable!(),  // Remaining parameters are read-only.
    }
    Ok(())
}

/// Reads a configuration value or a published output of one ROI.
pub(crate) fn read_param(param: RoiParam, definition: &RoiDefinition, state: &RoiState)
                         -> ParamValue {
    let stats = state.statistics();
    match param {
        RoiParam::Name => ParamValue::Text(definition.name.clone()),
        RoiParam::Use => definition.enabled.into(),
        RoiParam::Highlight => definition.highlight.into(),
        RoiParam::Dim(dim, field) => {
            let d = &definition.dims[dim];
            match field {
                DimField::Min => ParamValue::Int(d.start),
                DimField::Size => ParamValue::Int(d.size),
                DimField::MaxSize => ParamValue::Int(d.max_size as i64),
                DimField::Bin => ParamValue::Int(d.bin),
                DimField::Reverse => d.reverse.into(),
            }
        }
        RoiParam::DataType => ParamValue::Int(definition.data_type as i64),
        RoiParam::LowClip => ParamValue::Float(definition.low_clip),
        RoiParam::DoLowClip => definition.do_low_clip.into(),
        RoiParam::HighClip => ParamValue::Float(definition.high_clip),
        RoiParam::DoHighClip => definition.do_high_clip.into(),
        RoiParam::GrabBackground => state.background_pending().into(),
        RoiParam::DoBackground => definition.do_background.into(),
        RoiParam::ValidBackground => state.valid_background().into(),
        RoiParam::ComputeStatistics => definition.compute_statistics.into(),
        RoiParam::BgdWidth => ParamValue::Int(definition.bgd_width),
        RoiParam::MinValue => ParamValue::Float(stats.min),
        RoiParam::MaxValue => ParamValue::Float(stats.max),
        RoiParam::MeanValue => ParamValue::Float(stats.mean),
        RoiParam::Total => ParamValue::Float(stats.total),
        RoiParam::Net => ParamValue::Float(stats.net),
        RoiParam::CentroidFrames => ParamValue::Int(definition.centroid_frames),
        RoiParam::CentroidX => ParamValue::Float(state.centroid().0),
        RoiParam::CentroidY => ParamValue::Float(state.centroid().1),
        RoiParam::ComputeProfiles => definition.compute_profiles.into(),
        RoiParam::Profile(dim) => ParamValue::FloatArray(
            state.profiles().get(dim).cloned().unwrap_or_default()),
        RoiParam::ComputeHistogram => definition.compute_histogram.into(),
        RoiParam::HistSize => ParamValue::Int(definition.hist_size),
        RoiParam::HistMin => ParamValue::Float(definition.hist_min),
        RoiParam::HistMax => ParamValue::Float(definition.hist_max),
        RoiParam::HistEntropy => ParamValue::Float(state.histogram_entropy()),
        RoiParam::HistArray => ParamValue::FloatArray(
            state.histogram().iter().map(|&c| c as f64).collect()),
    }
}

// mod tests.
