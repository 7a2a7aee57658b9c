//! Engine configuration
//!
//! Thresholds, normalization and scoring parameters. Every section can be
//! changed at runtime through a partial update; invalid fields are rejected
//! one by one while the valid fields of the same update still apply.

use crate::error::SenseError;
use serde::{Deserialize, Serialize};

/// Default display grid resolution
pub const DEFAULT_TARGET_RESOLUTION: usize = 8;
/// Default sensitivity knob
pub const DEFAULT_SENSITIVITY: f64 = 0.6;
/// Accepted range for the display grid resolution
pub const MIN_TARGET_RESOLUTION: usize = 2;
pub const MAX_TARGET_RESOLUTION: usize = 64;
/// Shortest accepted repeat-suppression window, in seconds
pub const MIN_REPEAT_SEC: u64 = 10;
/// Bounds of the minute-based alert settings
pub const MIN_SETTING_MINUTES: u64 = 1;
pub const MAX_SETTING_MINUTES: u64 = 600;

/// Heatmap normalization parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Output grid is `target_resolution x target_resolution`
    pub target_resolution: usize,
    /// 0 = dim midtones, 1 = bright midtones
    pub sensitivity: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            target_resolution: DEFAULT_TARGET_RESOLUTION,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// Partial update for [`NormalizationConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationUpdate {
    pub target_resolution: Option<usize>,
    pub sensitivity: Option<f64>,
}

impl NormalizationConfig {
    /// Apply a partial update. Out-of-range fields are skipped and reported.
    pub fn apply(&mut self, update: &NormalizationUpdate) -> Result<(), SenseError> {
        let mut rejected = Vec::new();

        if let Some(resolution) = update.target_resolution {
            if (MIN_TARGET_RESOLUTION..=MAX_TARGET_RESOLUTION).contains(&resolution) {
                self.target_resolution = resolution;
            } else {
                rejected.push(format!(
                    "target_resolution {resolution} outside {MIN_TARGET_RESOLUTION}..={MAX_TARGET_RESOLUTION}"
                ));
            }
        }

        if let Some(sensitivity) = update.sensitivity {
            if sensitivity.is_finite() && (0.0..=1.0).contains(&sensitivity) {
                self.sensitivity = sensitivity;
            } else {
                rejected.push(format!("sensitivity {sensitivity} outside 0..=1"));
            }
        }

        rejected_fields(rejected)
    }
}

/// Sit-duration thresholds, all in seconds.
///
/// `hard_sec >= soft_sec` holds after every write, including deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdFields")]
pub struct ThresholdConfig {
    soft_sec: u64,
    hard_sec: u64,
    repeat_soft_sec: u64,
    repeat_hard_sec: u64,
}

/// Unvalidated serialized form of [`ThresholdConfig`]
#[derive(Deserialize)]
#[serde(default)]
struct ThresholdFields {
    soft_sec: u64,
    hard_sec: u64,
    repeat_soft_sec: u64,
    repeat_hard_sec: u64,
}

impl Default for ThresholdFields {
    fn default() -> Self {
        let t = ThresholdConfig::default();
        Self {
            soft_sec: t.soft_sec,
            hard_sec: t.hard_sec,
            repeat_soft_sec: t.repeat_soft_sec,
            repeat_hard_sec: t.repeat_hard_sec,
        }
    }
}

impl TryFrom<ThresholdFields> for ThresholdConfig {
    type Error = SenseError;

    fn try_from(f: ThresholdFields) -> Result<Self, Self::Error> {
        Self::new(f.soft_sec, f.hard_sec, f.repeat_soft_sec, f.repeat_hard_sec)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            soft_sec: 30 * 60,
            hard_sec: 60 * 60,
            repeat_soft_sec: 15 * 60,
            repeat_hard_sec: 30 * 60,
        }
    }
}

/// Partial update for [`ThresholdConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdUpdate {
    pub soft: Option<u64>,
    pub hard: Option<u64>,
    pub repeat_soft: Option<u64>,
    pub repeat_hard: Option<u64>,
}

impl ThresholdConfig {
    /// Build a config, validating every field. `hard` is raised to `soft` if lower.
    pub fn new(
        soft_sec: u64,
        hard_sec: u64,
        repeat_soft_sec: u64,
        repeat_hard_sec: u64,
    ) -> Result<Self, SenseError> {
        let mut config = Self::default();
        config.apply(&ThresholdUpdate {
            soft: Some(soft_sec),
            hard: Some(hard_sec),
            repeat_soft: Some(repeat_soft_sec),
            repeat_hard: Some(repeat_hard_sec),
        })?;
        Ok(config)
    }

    pub fn soft_sec(&self) -> u64 {
        self.soft_sec
    }

    pub fn hard_sec(&self) -> u64 {
        self.hard_sec
    }

    pub fn repeat_soft_sec(&self) -> u64 {
        self.repeat_soft_sec
    }

    pub fn repeat_hard_sec(&self) -> u64 {
        self.repeat_hard_sec
    }

    /// Apply a partial update field by field.
    ///
    /// Zero thresholds and repeat windows under [`MIN_REPEAT_SEC`] are
    /// rejected; the remaining fields still take effect.
    pub fn apply(&mut self, update: &ThresholdUpdate) -> Result<(), SenseError> {
        let mut rejected = Vec::new();

        match update.soft {
            Some(0) => rejected.push("soft threshold must be positive".to_string()),
            Some(soft) => self.soft_sec = soft,
            None => {}
        }
        match update.hard {
            Some(0) => rejected.push("hard threshold must be positive".to_string()),
            Some(hard) => self.hard_sec = hard,
            None => {}
        }
        match update.repeat_soft {
            Some(r) if r < MIN_REPEAT_SEC => {
                rejected.push(format!("repeat_soft {r}s shorter than {MIN_REPEAT_SEC}s"))
            }
            Some(r) => self.repeat_soft_sec = r,
            None => {}
        }
        match update.repeat_hard {
            Some(r) if r < MIN_REPEAT_SEC => {
                rejected.push(format!("repeat_hard {r}s shorter than {MIN_REPEAT_SEC}s"))
            }
            Some(r) => self.repeat_hard_sec = r,
            None => {}
        }

        if self.hard_sec < self.soft_sec {
            log::debug!(
                "hard threshold {}s below soft {}s, raising to match",
                self.hard_sec,
                self.soft_sec
            );
            self.hard_sec = self.soft_sec;
        }

        rejected_fields(rejected)
    }
}

/// Minute-based alert settings as stored by the settings collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    pub soft_min: u64,
    pub hard_min: u64,
    pub repeat_soft_min: u64,
    pub repeat_hard_min: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            soft_min: 30,
            hard_min: 60,
            repeat_soft_min: 15,
            repeat_hard_min: 30,
        }
    }
}

impl AlertSettings {
    /// Clamp each field to 1..=600 minutes and convert to seconds
    pub fn to_thresholds(&self) -> ThresholdConfig {
        let clamp = |m: u64| m.clamp(MIN_SETTING_MINUTES, MAX_SETTING_MINUTES) * 60;
        let mut config = ThresholdConfig {
            soft_sec: clamp(self.soft_min),
            hard_sec: clamp(self.hard_min),
            repeat_soft_sec: clamp(self.repeat_soft_min),
            repeat_hard_sec: clamp(self.repeat_hard_min),
        };
        if config.hard_sec < config.soft_sec {
            config.hard_sec = config.soft_sec;
        }
        config
    }
}

impl From<AlertSettings> for ThresholdUpdate {
    fn from(settings: AlertSettings) -> Self {
        let t = settings.to_thresholds();
        ThresholdUpdate {
            soft: Some(t.soft_sec),
            hard: Some(t.hard_sec),
            repeat_soft: Some(t.repeat_soft_sec),
            repeat_hard: Some(t.repeat_hard_sec),
        }
    }
}

/// Posture score weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub lr_weight: f64,
    pub fb_weight: f64,
    pub intensity_weight: f64,
    /// Points lost per minute sat past the soft threshold
    pub penalty_per_minute: f64,
    /// Raw reading that counts as full intensity (sensor scale)
    pub intensity_full_scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            lr_weight: 50.0,
            fb_weight: 30.0,
            intensity_weight: 10.0,
            penalty_per_minute: 0.6,
            intensity_full_scale: 100.0,
        }
    }
}

impl ScoreWeights {
    /// Reject negative, non-finite, or zero-scale weights
    pub fn validate(&self) -> Result<(), SenseError> {
        let mut rejected = Vec::new();
        for (name, value) in [
            ("lr_weight", self.lr_weight),
            ("fb_weight", self.fb_weight),
            ("intensity_weight", self.intensity_weight),
            ("penalty_per_minute", self.penalty_per_minute),
        ] {
            if !value.is_finite() || value < 0.0 {
                rejected.push(format!("{name} must be a non-negative number"));
            }
        }
        if !self.intensity_full_scale.is_finite() || self.intensity_full_scale <= 0.0 {
            rejected.push("intensity_full_scale must be positive".to_string());
        }
        rejected_fields(rejected)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenseConfig {
    pub thresholds: ThresholdConfig,
    pub normalization: NormalizationConfig,
    pub score: ScoreWeights,
}

impl SenseConfig {
    /// Load configuration from JSON, validating every section.
    ///
    /// A hard threshold below the soft one is raised to match.
    pub fn from_json(json: &str) -> Result<Self, SenseError> {
        let config: SenseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, SenseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SenseError> {
        let t = &self.thresholds;
        ThresholdConfig::new(t.soft_sec, t.hard_sec, t.repeat_soft_sec, t.repeat_hard_sec)?;
        if t.hard_sec < t.soft_sec {
            return Err(SenseError::Configuration(
                "hard threshold below soft threshold".to_string(),
            ));
        }
        NormalizationConfig::default().apply(&NormalizationUpdate {
            target_resolution: Some(self.normalization.target_resolution),
            sensitivity: Some(self.normalization.sensitivity),
        })?;
        self.score.validate()
    }
}

fn rejected_fields(rejected: Vec<String>) -> Result<(), SenseError> {
    if rejected.is_empty() {
        Ok(())
    } else {
        Err(SenseError::Configuration(rejected.join("; ")))
    }
}
