//! Matrix normalization pipeline
//!
//! Turns a raw pressure grid into display intensities:
//! calibration → bilinear resample → min/max + gamma normalization.
//! Color is attached later, at render time, through [`crate::palette::color_of`].

use crate::calibration::CalibrationStore;
use crate::config::{NormalizationConfig, NormalizationUpdate};
use crate::error::SenseError;
use crate::normalizer::Normalizer;
use crate::resample::resample_square;
use crate::types::{IntensityGrid, PressureGrid};

/// Output of one pipeline pass
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    /// Baseline-subtracted grid at sensor resolution (feeds balance and score)
    pub calibrated: PressureGrid,
    /// Display intensities at the configured resolution
    pub intensities: IntensityGrid,
}

/// Run one grid through the pipeline (stateless).
///
/// # Arguments
/// * `grid` - Raw pressure grid
/// * `calibration` - Baseline to subtract (may be empty)
/// * `config` - Target resolution and sensitivity
pub fn process_grid(
    grid: &PressureGrid,
    calibration: &CalibrationStore,
    config: &NormalizationConfig,
) -> ProcessedFrame {
    // Stage 1: Baseline subtraction
    let calibrated = calibration.apply(grid);

    // Stage 2: Resample to the display grid
    let size = config.target_resolution.max(1);
    let resampled = resample_square(&calibrated, size);

    // Stage 3: Normalize with the sensitivity curve
    let intensities = IntensityGrid::from_parts(size, Normalizer::normalize(&resampled, config.sensitivity));

    ProcessedFrame {
        calibrated,
        intensities,
    }
}

/// Stateful pipeline owning the calibration baseline and normalization config
#[derive(Debug, Clone, Default)]
pub struct MatrixPipeline {
    calibration: CalibrationStore,
    config: NormalizationConfig,
}

impl MatrixPipeline {
    pub fn new(config: NormalizationConfig) -> Self {
        Self {
            calibration: CalibrationStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Apply a partial normalization update; affects only later frames
    pub fn set_config(&mut self, update: &NormalizationUpdate) -> Result<(), SenseError> {
        let result = self.config.apply(update);
        log::debug!("normalization now {:?}", self.config);
        result
    }

    /// Restore default resolution and sensitivity
    pub fn reset_config(&mut self) {
        self.config = NormalizationConfig::default();
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    pub fn set_calibration(&mut self, grid: &PressureGrid) {
        self.calibration.set(grid);
    }

    pub fn clear_calibration(&mut self) {
        self.calibration.clear();
    }

    /// Restore a baseline saved with [`MatrixPipeline::save_calibration`]
    pub fn load_calibration(&mut self, json: &str) -> Result<(), SenseError> {
        self.calibration = CalibrationStore::from_json(json)?;
        Ok(())
    }

    pub fn save_calibration(&self) -> Result<String, SenseError> {
        self.calibration.to_json()
    }

    /// Process a grid with the current baseline and config
    pub fn process(&self, grid: &PressureGrid) -> ProcessedFrame {
        process_grid(grid, &self.calibration, &self.config)
    }

    /// Process a grid with the current baseline and an explicit config
    pub fn process_with(&self, grid: &PressureGrid, config: &NormalizationConfig) -> IntensityGrid {
        process_grid(grid, &self.calibration, config).intensities
    }

    /// Validate nested rows and process them
    pub fn process_rows(&self, rows: Vec<Vec<f64>>) -> Result<ProcessedFrame, SenseError> {
        let grid = PressureGrid::from_rows(rows)?;
        Ok(self.process(&grid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{color_of, EMERALD};
    use pretty_assertions::assert_eq;

    fn config(target_resolution: usize, sensitivity: f64) -> NormalizationConfig {
        NormalizationConfig {
            target_resolution,
            sensitivity,
        }
    }

    #[test]
    fn test_checkerboard_scenario() {
        let pipeline = MatrixPipeline::new(config(2, 0.6));
        let frame = pipeline
            .process_rows(vec![vec![10.0, 90.0], vec![90.0, 10.0]])
            .unwrap();

        assert_eq!(frame.intensities.size(), 2);
        assert_eq!(frame.intensities.to_rows(), vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_output_shape_follows_target() {
        let pipeline = MatrixPipeline::new(config(10, 0.6));
        let frame = pipeline
            .process_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .unwrap();
        assert_eq!(frame.intensities.size(), 10);
        assert_eq!(frame.intensities.values().len(), 100);
        // Calibrated grid keeps sensor resolution
        assert_eq!(frame.calibrated.rows(), 2);
        assert_eq!(frame.calibrated.cols(), 3);
    }

    #[test]
    fn test_constant_grid_is_flat_and_finite() {
        let pipeline = MatrixPipeline::default();
        let frame = pipeline.process(&PressureGrid::filled(8, 8, 55.0).unwrap());
        assert!(frame.intensities.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_self_calibration_renders_darkest_everywhere() {
        let grid = PressureGrid::from_rows(vec![
            vec![12.0, 80.0, 33.0],
            vec![45.0, 0.0, 99.0],
            vec![7.0, 61.0, 20.0],
        ])
        .unwrap();

        let mut pipeline = MatrixPipeline::default();
        pipeline.set_calibration(&grid);

        for cfg in [config(2, 0.0), config(8, 0.6), config(33, 1.0)] {
            let intensities = pipeline.process_with(&grid, &cfg);
            assert!(intensities.values().iter().all(|v| color_of(*v) == EMERALD));
        }
    }

    #[test]
    fn test_sensitivity_brightens_midtones() {
        let grid = PressureGrid::from_rows(vec![vec![0.0, 50.0], vec![25.0, 100.0]]).unwrap();
        let pipeline = MatrixPipeline::default();

        let low = pipeline.process_with(&grid, &config(2, 0.1));
        let high = pipeline.process_with(&grid, &config(2, 0.9));

        assert!(high.get(0, 1) > low.get(0, 1));
        assert!(high.get(1, 0) > low.get(1, 0));
        assert_eq!(high.get(0, 0), low.get(0, 0));
        assert_eq!(high.get(1, 1), low.get(1, 1));
    }

    #[test]
    fn test_invalid_rows_rejected() {
        let pipeline = MatrixPipeline::default();
        let result = pipeline.process_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(SenseError::InvalidInput(_))));
    }

    #[test]
    fn test_config_change_only_affects_later_frames() {
        let grid = PressureGrid::from_rows(vec![vec![0.0, 50.0], vec![25.0, 100.0]]).unwrap();
        let mut pipeline = MatrixPipeline::default();
        let before = pipeline.process(&grid).intensities;

        pipeline
            .set_config(&NormalizationUpdate {
                target_resolution: Some(4),
                sensitivity: None,
            })
            .unwrap();
        let after = pipeline.process(&grid).intensities;

        assert_eq!(before.size(), 8);
        assert_eq!(after.size(), 4);
    }

    #[test]
    fn test_reset_config_restores_defaults() {
        let mut pipeline = MatrixPipeline::new(config(32, 0.1));
        pipeline.reset_config();
        assert_eq!(pipeline.config(), &NormalizationConfig::default());

        let frame = pipeline.process(&PressureGrid::filled(2, 2, 1.0).unwrap());
        assert_eq!(frame.intensities.size(), 8);
    }

    #[test]
    fn test_calibration_persistence() {
        let grid = PressureGrid::filled(2, 2, 3.0).unwrap();
        let mut pipeline = MatrixPipeline::default();
        pipeline.set_calibration(&grid);
        let saved = pipeline.save_calibration().unwrap();

        let mut restored = MatrixPipeline::default();
        restored.load_calibration(&saved).unwrap();
        assert_eq!(restored.calibration().baseline(), Some(&grid));
    }
}
