//! Calibration baseline management
//!
//! This module holds the "at rest" reading captured at calibration time and
//! subtracts it from incoming frames to cancel per-cell sensor offset.

use crate::error::SenseError;
use crate::types::PressureGrid;
use serde::{Deserialize, Serialize};

/// Calibration store for the pressure baseline.
///
/// The baseline has no expiry: it persists until the next calibration or an
/// explicit clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStore {
    baseline: Option<PressureGrid>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `grid` as the new baseline
    pub fn set(&mut self, grid: &PressureGrid) {
        log::debug!("calibration baseline set ({}x{})", grid.rows(), grid.cols());
        self.baseline = Some(grid.clone());
    }

    /// Discard the baseline
    pub fn clear(&mut self) {
        if self.baseline.take().is_some() {
            log::debug!("calibration baseline cleared");
        }
    }

    pub fn is_set(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&PressureGrid> {
        self.baseline.as_ref()
    }

    /// Subtract the baseline from `grid`, clamping each cell at zero.
    ///
    /// The baseline is applied position-wise over the overlapping extent only;
    /// cells of `grid` outside the baseline's shape keep their raw value.
    /// Without a baseline the grid is returned unchanged.
    pub fn apply(&self, grid: &PressureGrid) -> PressureGrid {
        let Some(base) = &self.baseline else {
            return grid.clone();
        };

        let mut cells = Vec::with_capacity(grid.rows() * grid.cols());
        for r in 0..grid.rows() {
            for c in 0..grid.cols() {
                let raw = grid.get(r, c);
                let value = match base.try_get(r, c) {
                    Some(b) => (raw - b).max(0.0),
                    None => raw,
                };
                cells.push(value);
            }
        }

        PressureGrid::from_parts(grid.rows(), grid.cols(), cells)
    }

    /// Load calibration store from JSON
    pub fn from_json(json: &str) -> Result<Self, SenseError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize calibration store to JSON
    pub fn to_json(&self) -> Result<String, SenseError> {
        Ok(serde_json::to_string(self)?)
    }
}
