//! Posture score
//!
//! Starts from 100 and subtracts weighted imbalance, average load, and a
//! per-minute penalty for sitting past the soft threshold.

use crate::config::ScoreWeights;
use crate::normalizer::clamp01;
use crate::types::{BalanceVector, PostureLabel, PostureScore, PressureGrid};

/// Inputs the score depends on besides the weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub balance: BalanceVector,
    /// Average load, 0-1
    pub mean_intensity: f64,
    pub elapsed_sec: u64,
    pub soft_threshold_sec: u64,
}

/// Compute the posture score and its label.
pub fn compute_score(inputs: &ScoreInputs, weights: &ScoreWeights) -> PostureScore {
    let lr = clamp01(inputs.balance.lr);
    let fb = clamp01(inputs.balance.fb);
    let intensity = clamp01(inputs.mean_intensity);

    let minutes_over =
        inputs.elapsed_sec.saturating_sub(inputs.soft_threshold_sec) as f64 / 60.0;
    let long_sit_penalty = minutes_over * weights.penalty_per_minute;

    let raw = 100.0
        - lr * weights.lr_weight
        - fb * weights.fb_weight
        - intensity * weights.intensity_weight
        - long_sit_penalty;

    let value = if raw.is_nan() {
        0
    } else {
        raw.clamp(0.0, 100.0).round() as u8
    };

    PostureScore {
        value,
        label: PostureLabel::from_score(value),
    }
}

/// Average load of a calibrated grid as a 0-1 fraction of `full_scale`
pub fn mean_intensity(grid: &PressureGrid, full_scale: f64) -> f64 {
    if full_scale <= 0.0 {
        return 0.0;
    }
    clamp01(grid.mean_pressure() / full_scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs(lr: f64, fb: f64, intensity: f64, elapsed: u64) -> ScoreInputs {
        ScoreInputs {
            balance: BalanceVector { lr, fb },
            mean_intensity: intensity,
            elapsed_sec: elapsed,
            soft_threshold_sec: 1800,
        }
    }

    #[test]
    fn test_perfect_posture() {
        let score = compute_score(&inputs(0.0, 0.0, 0.0, 0), &ScoreWeights::default());
        assert_eq!(score.value, 100);
        assert_eq!(score.label, PostureLabel::Good);
    }

    #[test]
    fn test_weighted_deductions() {
        // 100 - 0.2*50 - 0.1*30 - 0.5*10 = 82
        let score = compute_score(&inputs(0.2, 0.1, 0.5, 600), &ScoreWeights::default());
        assert_eq!(score.value, 82);
        assert_eq!(score.label, PostureLabel::Good);
    }

    #[test]
    fn test_long_sit_penalty_after_soft() {
        // 30 minutes past soft threshold * 0.6 = 18
        let score = compute_score(&inputs(0.0, 0.0, 0.0, 1800 + 30 * 60), &ScoreWeights::default());
        assert_eq!(score.value, 82);

        // Before the soft threshold there is no penalty
        let score = compute_score(&inputs(0.0, 0.0, 0.0, 1799), &ScoreWeights::default());
        assert_eq!(score.value, 100);
    }

    #[test]
    fn test_clamped_at_zero() {
        let score = compute_score(&inputs(1.0, 1.0, 1.0, 100_000), &ScoreWeights::default());
        assert_eq!(score.value, 0);
        assert_eq!(score.label, PostureLabel::Poor);
    }

    #[test]
    fn test_weights_overridable() {
        let weights = ScoreWeights {
            lr_weight: 100.0,
            ..Default::default()
        };
        let score = compute_score(&inputs(0.3, 0.0, 0.0, 0), &weights);
        assert_eq!(score.value, 70);
        assert_eq!(score.label, PostureLabel::NeedsCorrection);
    }

    #[test]
    fn test_rounding() {
        // 100 - 0.49*50 = 75.5 -> 76
        let score = compute_score(&inputs(0.49, 0.0, 0.0, 0), &ScoreWeights::default());
        assert_eq!(score.value, 76);
    }

    #[test]
    fn test_mean_intensity() {
        let grid = PressureGrid::from_rows(vec![vec![50.0, 50.0], vec![150.0, -10.0]]).unwrap();
        // (50 + 50 + 150 + 0) / 4 = 62.5
        assert!((mean_intensity(&grid, 100.0) - 0.625).abs() < 1e-12);
        assert_eq!(mean_intensity(&grid, 10.0), 1.0);
        assert_eq!(mean_intensity(&grid, 0.0), 0.0);
    }
}
