//! Intensity normalization
//!
//! This module maps resampled pressure values onto display intensities:
//! - Min/max stretch to 0-1 with a range floor for flat frames
//! - Gamma curve driven by a single sensitivity knob

use crate::resample::lerp;

/// Smallest min/max range used for the stretch
pub const MIN_RANGE: f64 = 1e-6;
/// Gamma at sensitivity 0 (dim midtones)
pub const GAMMA_LOW_SENSITIVITY: f64 = 2.2;
/// Gamma at sensitivity 1 (bright midtones)
pub const GAMMA_HIGH_SENSITIVITY: f64 = 0.8;

/// Normalizer for converting resampled values to display intensities
pub struct Normalizer;

impl Normalizer {
    /// Stretch `values` to 0-1 and apply the sensitivity gamma curve.
    ///
    /// Endpoints are gamma-invariant: the minimum always maps to 0.0 and the
    /// maximum to 1.0. A flat frame maps to 0.0 everywhere.
    pub fn normalize(values: &[f64], sensitivity: f64) -> Vec<f64> {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let range = (max - min).max(MIN_RANGE);
        let gamma = gamma_for(sensitivity);

        values
            .iter()
            .map(|v| clamp01((v - min) / range).powf(gamma))
            .collect()
    }
}

/// Gamma exponent for a sensitivity setting.
///
/// Sensitivity is clamped to 0-1 first; NaN counts as 0.
pub fn gamma_for(sensitivity: f64) -> f64 {
    let s = if sensitivity.is_nan() {
        0.0
    } else {
        clamp01(sensitivity)
    };
    lerp(GAMMA_LOW_SENSITIVITY, GAMMA_HIGH_SENSITIVITY, s)
}

pub(crate) fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
