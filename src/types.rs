//! Core types for the SitSense pipeline
//!
//! This module defines the data structures that flow through each stage:
//! raw pressure grids, calibrated grids, display intensities, balance, the
//! posture score, and threshold alert events.

use crate::error::SenseError;
use serde::{Deserialize, Serialize};

/// Smallest accepted extent for either axis of a pressure grid
pub const MIN_GRID_EXTENT: usize = 2;

/// Rectangular grid of pressure readings, stored row-major.
///
/// Rows run front to back over the seat, columns left to right. A grid is
/// always at least 2×2 and every reading is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct PressureGrid {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl PressureGrid {
    /// Build a grid from nested rows, rejecting empty, ragged or non-finite input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SenseError> {
        let row_count = rows.len();
        if row_count == 0 {
            return Err(SenseError::InvalidInput("grid has no rows".to_string()));
        }

        let cols = rows[0].len();
        if row_count < MIN_GRID_EXTENT || cols < MIN_GRID_EXTENT {
            return Err(SenseError::InvalidInput(format!(
                "grid must be at least {MIN_GRID_EXTENT}x{MIN_GRID_EXTENT}, got {row_count}x{cols}"
            )));
        }

        let mut cells = Vec::with_capacity(row_count * cols);
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(SenseError::InvalidInput(format!(
                    "row {r} has {} cells, expected {cols}",
                    row.len()
                )));
            }
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(SenseError::InvalidInput(format!(
                    "non-finite reading at row {r}, column {c}"
                )));
            }
            cells.extend(row);
        }

        Ok(Self {
            rows: row_count,
            cols,
            cells,
        })
    }

    /// Parse a grid from a JSON array of arrays
    pub fn from_json(json: &str) -> Result<Self, SenseError> {
        let rows: Vec<Vec<f64>> = serde_json::from_str(json)?;
        Self::from_rows(rows)
    }

    /// Build a grid of the given shape with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: f64) -> Result<Self, SenseError> {
        Self::from_rows(vec![vec![value; cols]; rows])
    }

    /// Internal constructor for grids derived from an already validated one
    pub(crate) fn from_parts(rows: usize, cols: usize, cells: Vec<f64>) -> Self {
        debug_assert_eq!(rows * cols, cells.len());
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Reading at `(row, col)`; panics when out of bounds like slice indexing
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    /// Reading at `(row, col)`, or `None` outside the grid
    pub fn try_get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.cells
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.cells.chunks(self.cols).map(|r| r.to_vec()).collect()
    }

    /// Mean of the non-negative part of every reading
    pub fn mean_pressure(&self) -> f64 {
        let sum: f64 = self.cells.iter().map(|v| v.max(0.0)).sum();
        sum / self.cells.len() as f64
    }
}

impl TryFrom<Vec<Vec<f64>>> for PressureGrid {
    type Error = SenseError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<PressureGrid> for Vec<Vec<f64>> {
    fn from(grid: PressureGrid) -> Self {
        grid.to_rows()
    }
}

/// Square grid of display intensities in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<Vec<f64>>")]
pub struct IntensityGrid {
    size: usize,
    cells: Vec<f64>,
}

impl IntensityGrid {
    pub(crate) fn from_parts(size: usize, cells: Vec<f64>) -> Self {
        debug_assert_eq!(size * size, cells.len());
        Self { size, cells }
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.size + col]
    }

    pub fn values(&self) -> &[f64] {
        &self.cells
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.cells.chunks(self.size).map(|r| r.to_vec()).collect()
    }
}

impl From<IntensityGrid> for Vec<Vec<f64>> {
    fn from(grid: IntensityGrid) -> Self {
        grid.to_rows()
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation, e.g. `#34d399`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Relative luminance proxy (Rec. 601 weights), 0-255
    pub fn luma(&self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }
}

/// Magnitude of left/right and front/back pressure imbalance.
///
/// Each axis is an absolute deviation fraction in `[0, 1]`:
/// 0 is perfectly balanced, 1 is all pressure on one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceVector {
    pub lr: f64,
    pub fb: f64,
}

/// Share of total pressure on each half of the seat (each 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceShares {
    pub left: f64,
    pub right: f64,
    pub front: f64,
    pub back: f64,
}

impl Default for BalanceShares {
    fn default() -> Self {
        Self {
            left: 0.5,
            right: 0.5,
            front: 0.5,
            back: 0.5,
        }
    }
}

impl BalanceShares {
    /// Right side as a whole percentage of left + right (50 when both are empty)
    pub fn right_pct(&self) -> u8 {
        split_pct(self.left, self.right)
    }

    /// Back half as a whole percentage of front + back (50 when both are empty)
    pub fn back_pct(&self) -> u8 {
        split_pct(self.front, self.back)
    }
}

fn split_pct(a: f64, b: f64) -> u8 {
    let total = a + b;
    if total <= 0.0 {
        return 50;
    }
    ((b / total) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Balance derived from one calibrated frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReading {
    pub vector: BalanceVector,
    pub shares: BalanceShares,
}

/// Qualitative posture label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureLabel {
    Good,
    NeedsCorrection,
    Poor,
}

impl PostureLabel {
    /// Label for an integer score in `[0, 100]`
    pub fn from_score(score: u8) -> Self {
        if score >= 75 {
            PostureLabel::Good
        } else if score >= 50 {
            PostureLabel::NeedsCorrection
        } else {
            PostureLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureLabel::Good => "good",
            PostureLabel::NeedsCorrection => "needs_correction",
            PostureLabel::Poor => "poor",
        }
    }
}

/// Posture quality score with its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureScore {
    /// 0-100, higher is better
    pub value: u8,
    pub label: PostureLabel,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Soft,
    Hard,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Soft => "soft",
            AlertKind::Hard => "hard",
        }
    }
}

/// Threshold alert emitted by the alert state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Elapsed sitting time (seconds) at which the alert fired
    pub elapsed: u64,
}
