// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Coordinates a fixed set of ROIs over a stream of frames.
//!
//! The number of ROIs is fixed when the [RoiEngine] is created. Each incoming
//! frame is offered to every ROI; enabled ROIs run their pipeline and
//! publish their outputs, disabled ROIs are skipped. Failure of one ROI is
//! recorded in the [FrameReport] and does not stop the others.
//!
//! Two aggregate arrays, indexed by ROI, collect the total and net
//! intensities of all ROIs for plotting against each other.

use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoiError};
use crate::frame::NdFrame;
use crate::params::{read_param, write_param, ParamValue, RoiParam};
use crate::roi::{RoiDefinition, RoiState};

/// Creation-time settings of a [RoiEngine].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of ROI slots. Fixed for the lifetime of the engine.
    pub max_rois: usize,
    /// Process the ROIs of a frame on the rayon thread pool.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig{max_rois: 8, parallel: false}
    }
}

#[derive(Debug, Default)]
struct RoiSlot {
    definition: RoiDefinition,
    state: RoiState,
}

impl RoiSlot {
    // None when the ROI is disabled.
    fn run(&mut self, frame: &NdFrame) -> Option<Result<()>> {
        if !self.definition.enabled {
            return None;
        }
        Some(self.state.process(&mut self.definition, frame))
    }
}

/// Outcome of [RoiEngine::process_frame()].
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Indices of the ROIs that processed the frame successfully.
    pub processed: Vec<usize>,
    /// ROIs whose pipeline failed, with the reason. Their outputs and
    /// aggregate entries keep the values from the last successful frame.
    pub failures: Vec<(usize, RoiError)>,
}

impl FrameReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RoiEngine {
    slots: Box<[RoiSlot]>,
    total_array: Vec<f64>,
    net_array: Vec<f64>,
    parallel: bool,
    frame_count: u64,
}

impl RoiEngine {
    pub fn new(config: &EngineConfig) -> RoiEngine {
        let slots: Vec<RoiSlot> =
            (0..config.max_rois).map(|_| RoiSlot::default()).collect();
        info!("Created ROI engine with {} ROIs{}", config.max_rois,
              if config.parallel { " (parallel)" } else { "" });
        RoiEngine{slots: slots.into_boxed_slice(),
                  total_array: vec![0.0; config.max_rois],
                  net_array: vec![0.0; config.max_rois],
                  parallel: config.parallel,
                  frame_count: 0}
    }

    pub fn max_rois(&self) -> usize {
        self.slots.len()
    }

    /// Number of frames offered to [RoiEngine::process_frame()] so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn slot(&self, index: usize) -> Result<&RoiSlot> {
        let max_rois = self.slots.len();
        self.slots.get(index).ok_or(RoiError::InvalidRoiIndex{index, max_rois})
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut RoiSlot> {
        let max_rois = self.slots.len();
        self.slots.get_mut(index).ok_or(RoiError::InvalidRoiIndex{index, max_rois})
    }

    pub fn definition(&self, index: usize) -> Result<&RoiDefinition> {
        Ok(&self.slot(index)?.definition)
    }

    pub fn definition_mut(&mut self, index: usize) -> Result<&mut RoiDefinition> {
        Ok(&mut self.slot_mut(index)?.definition)
    }

    /// Replaces the configuration of ROI `index`. Buffers and background of
    /// the ROI are kept.
    pub fn set_definition(&mut self, index: usize, definition: RoiDefinition)
                          -> Result<()> {
        self.slot_mut(index)?.definition = definition;
        Ok(())
    }

    pub fn state(&self, index: usize) -> Result<&RoiState> {
        Ok(&self.slot(index)?.state)
    }

    pub fn state_mut(&mut self, index: usize) -> Result<&mut RoiState> {
        Ok(&mut self.slot_mut(index)?.state)
    }

    /// Arms a background grab on ROI `index` for the next frame.
    pub fn grab_background(&mut self, index: usize) -> Result<()> {
        self.slot_mut(index)?.state.grab_background();
        Ok(())
    }

    /// Iterates over (index, definition, state) of all ROI slots.
    pub fn rois(&self) -> impl Iterator<Item = (usize, &RoiDefinition, &RoiState)> {
        self.slots.iter().enumerate().map(|(i, s)| (i, &s.definition, &s.state))
    }

    /// Total intensity of each ROI, indexed by ROI. Disabled ROIs read 0.
    pub fn total_array(&self) -> &[f64] {
        &self.total_array
    }

    /// Net intensity of each ROI, indexed by ROI. Disabled ROIs read 0.
    pub fn net_array(&self) -> &[f64] {
        &self.net_array
    }

    /// Runs every enabled ROI on `frame` and updates the aggregate arrays.
    pub fn process_frame(&mut self, frame: &NdFrame) -> FrameReport {
        let frame_start = Instant::now();
        self.frame_count += 1;
        let results: Vec<Option<Result<()>>> = if self.parallel {
            self.slots.par_iter_mut().map(|slot| slot.run(frame)).collect()
        } else {
            self.slots.iter_mut().map(|slot| slot.run(frame)).collect()
        };

        let mut report = FrameReport::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                None => {
                    self.total_array[index] = 0.0;
                    self.net_array[index] = 0.0;
                }
                Some(Ok(())) => {
                    let stats = self.slots[index].state.statistics();
                    self.total_array[index] = stats.total;
                    self.net_array[index] = stats.net;
                    report.processed.push(index);
                }
                Some(Err(e)) => {
                    warn!("ROI {} failed on frame {}: {}", index, self.frame_count, e);
                    report.failures.push((index, e));
                }
            }
        }
        debug!("Frame {} dims {:?}: {} ROIs processed, {} failed in {:?}",
               self.frame_count, frame.dims(), report.processed.len(),
               report.failures.len(), frame_start.elapsed());
        report
    }

    /// Sets the named parameter of ROI `index`. See [RoiParam] for the names.
    pub fn set_param(&mut self, index: usize, name: &str, value: &ParamValue)
                     -> Result<()> {
        match name {
            "TOTAL_ARRAY" => return Err(RoiError::ReadOnlyParameter("TOTAL_ARRAY")),
            "NET_ARRAY" => return Err(RoiError::ReadOnlyParameter("NET_ARRAY")),
            _ => (),
        }
        let param = RoiParam::from_name(name)?;
        let slot = self.slot_mut(index)?;
        write_param(param, &mut slot.definition, &mut slot.state, value)
    }

    /// Reads the named parameter of ROI `index`. TOTAL_ARRAY and NET_ARRAY
    /// return the engine-wide aggregates regardless of `index`.
    pub fn get_param(&self, index: usize, name: &str) -> Result<ParamValue> {
        match name {
            "TOTAL_ARRAY" => return Ok(ParamValue::FloatArray(self.total_array.clone())),
            "NET_ARRAY" => return Ok(ParamValue::FloatArray(self.net_array.clone())),
            _ => (),
        }
        let param = RoiParam::from_name(name)?;
        let slot = self.slot(index)?;
        Ok(read_param(param, &slot.definition, &slot.state))
    }
}

#[cfg(test)]
mod tests {
    use crate::frame::{FrameData, NumericKind};
    use crate::geometry::DimDefinition;
    use super::*;

    fn ones_10x10() -> NdFrame {
        NdFrame::new(vec![10, 10], FrameData::UInt16(vec![1; 100])).unwrap()
    }

    fn square(start: i64, size: i64) -> RoiDefinition {
        let mut definition = RoiDefinition{enabled: true, ..Default::default()};
        definition.dims[0] = DimDefinition{start, size, ..Default::default()};
        definition.dims[1] = DimDefinition{start, size, ..Default::default()};
        definition
    }

    #[test]
    fn test_aggregates() {
        let mut engine = RoiEngine::new(&EngineConfig{max_rois: 3, parallel: false});
        engine.set_definition(0, square(2, 4)).unwrap();
        engine.set_definition(2, square(0, 0)).unwrap();
        let report = engine.process_frame(&ones_10x10());
        assert!(report.is_success());
        assert_eq!(report.processed, vec![0, 2]);
        assert_eq!(engine.total_array(), &[16.0, 0.0, 100.0]);
        assert_eq!(engine.net_array(), &[16.0, 0.0, 100.0]);

        // Disabling a ROI zeroes its aggregate entries.
        engine.set_param(2, "USE", &ParamValue::Int(0)).unwrap();
        engine.process_frame(&ones_10x10());
        assert_eq!(engine.total_array(), &[16.0, 0.0, 0.0]);
        assert_eq!(engine.get_param(1, "TOTAL_ARRAY").unwrap(),
                   ParamValue::FloatArray(vec![16.0, 0.0, 0.0]));
        assert_eq!(engine.frame_count(), 2);
    }

    #[test]
    fn test_failure_is_isolated() {
        let mut engine = RoiEngine::new(&EngineConfig{max_rois: 2, parallel: false});
        engine.set_definition(0, square(0, 0)).unwrap();
        engine.set_definition(1, square(0, 5)).unwrap();
        engine.process_frame(&ones_10x10());
        assert_eq!(engine.total_array(), &[100.0, 25.0]);

        engine.definition_mut(0).unwrap().data_type = 99;
        let frame = NdFrame::new(vec![10, 10], FrameData::UInt16(vec![2; 100])).unwrap();
        let report = engine.process_frame(&frame);
        assert_eq!(report.processed, vec![1]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], (0, RoiError::UnsupportedNumericKind(99))));
        // The failed ROI keeps its previous aggregate.
        assert_eq!(engine.total_array(), &[100.0, 50.0]);
    }

    #[test]
    fn test_failed_roi_publishes_nothing() {
        let mut engine = RoiEngine::new(&EngineConfig{max_rois: 1, parallel: false});
        engine.set_definition(0, square(2, 4)).unwrap();
        engine.process_frame(&ones_10x10());

        engine.set_param(0, "COMPUTE_HISTOGRAM", &ParamValue::Int(1)).unwrap();
        engine.set_param(0, "HIST_SIZE", &ParamValue::Int(i64::MAX)).unwrap();
        let twos = NdFrame::new(vec![10, 10], FrameData::UInt16(vec![2; 100])).unwrap();
        let report = engine.process_frame(&twos);
        assert!(matches!(report.failures[..],
                         [(0, RoiError::Allocation{what: "histogram", ..})]));
        assert_eq!(engine.total_array(), &[16.0]);
        assert_eq!(engine.get_param(0, "TOTAL").unwrap(), ParamValue::Float(16.0));
        assert_eq!(engine.get_param(0, "MEAN_VALUE").unwrap(), ParamValue::Float(1.0));
    }

    #[test]
    fn test_unsupported_rank_fails_every_enabled_roi() {
        let mut engine = RoiEngine::new(&EngineConfig{max_rois: 2, parallel: false});
        engine.set_definition(0, square(0, 0)).unwrap();
        let frame = NdFrame::new(vec![2, 2, 2, 2], FrameData::UInt8(vec![1; 16])).unwrap();
        let report = engine.process_frame(&frame);
        assert!(report.processed.is_empty());
        assert!(matches!(report.failures[..],
                         [(0, RoiError::UnsupportedRank{ndims: 4, ..})]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frame = NdFrame::new(
            vec![16, 12], FrameData::Float32((0..192).map(|v| v as f32).collect())).unwrap();
        let mut results = Vec::new();
        for parallel in [false, true] {
            let mut engine = RoiEngine::new(&EngineConfig{max_rois: 6, parallel});
            for i in 0..6 {
                let mut definition = square(i, 3 + i);
                definition.dims[0].bin = 1 + i % 2;
                definition.bgd_width = 1;
                engine.set_definition(i as usize, definition).unwrap();
            }
            assert!(engine.process_frame(&frame).is_success());
            results.push((engine.total_array().to_vec(), engine.net_array().to_vec()));
        }
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_params_and_indexing() {
        let mut engine = RoiEngine::new(&EngineConfig::default());
        assert_eq!(engine.max_rois(), 8);
        assert!(matches!(engine.definition(8),
                         Err(RoiError::InvalidRoiIndex{index: 8, max_rois: 8})));
        assert!(matches!(engine.set_param(0, "NET_ARRAY", &ParamValue::Int(0)),
                         Err(RoiError::ReadOnlyParameter("NET_ARRAY"))));
        assert!(matches!(engine.get_param(0, "BOGUS"),
                         Err(RoiError::UnknownParameter(_))));

        engine.set_param(3, "USE", &ParamValue::Int(1)).unwrap();
        engine.set_param(3, "DIM0_MIN", &ParamValue::Int(1)).unwrap();
        engine.set_param(3, "DIM0_SIZE", &ParamValue::Int(3)).unwrap();
        engine.set_param(3, "ROI_DATA_TYPE",
                         &ParamValue::Int(NumericKind::Float64.code() as i64)).unwrap();
        engine.process_frame(&ones_10x10());
        assert_eq!(engine.get_param(3, "DIM0_MAX_SIZE").unwrap(), ParamValue::Int(9));
        assert_eq!(engine.get_param(3, "TOTAL").unwrap(), ParamValue::Float(30.0));
        assert_eq!(engine.state(3).unwrap().output_frame().kind(), NumericKind::Float64);
        assert_eq!(engine.get_param(3, "CENTROIDX_VALUE").unwrap(), ParamValue::Float(1.0));
        assert_eq!(engine.get_param(3, "CENTROIDY_VALUE").unwrap(), ParamValue::Float(4.5));
    }
}  // mod tests.
