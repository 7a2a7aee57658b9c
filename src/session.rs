//! Sitting session aggregation
//!
//! Accumulates per-session statistics (average pressure and score, time in
//! each posture label, alerts raised) for the history collaborator.

use crate::types::{AlertKind, PostureLabel, PostureScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of one sitting session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at_utc: DateTime<Utc>,
    /// Sitting time in seconds
    pub elapsed_sec: u64,
    /// Frames ingested during the session
    pub frames: u64,
    /// Average raw pressure over all frames (sensor scale)
    pub avg_pressure: Option<f64>,
    /// Average posture score over all frames (0-100)
    pub avg_score: Option<f64>,
    pub good_frames: u64,
    pub needs_correction_frames: u64,
    pub poor_frames: u64,
    pub soft_alerts: u32,
    pub hard_alerts: u32,
}

impl SessionSummary {
    pub fn total_alerts(&self) -> u32 {
        self.soft_alerts + self.hard_alerts
    }
}

/// Running accumulator behind [`SessionSummary`]
#[derive(Debug, Clone)]
pub struct SessionTracker {
    session_id: String,
    started_at: DateTime<Utc>,
    frames: u64,
    pressure_sum: f64,
    score_sum: f64,
    good_frames: u64,
    needs_correction_frames: u64,
    poor_frames: u64,
    soft_alerts: u32,
    hard_alerts: u32,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    /// Begin a new session with a fresh identifier
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(session_id: String) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            frames: 0,
            pressure_sum: 0.0,
            score_sum: 0.0,
            good_frames: 0,
            needs_correction_frames: 0,
            poor_frames: 0,
            soft_alerts: 0,
            hard_alerts: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record_frame(&mut self, mean_pressure: f64, score: &PostureScore) {
        self.frames += 1;
        self.pressure_sum += mean_pressure;
        self.score_sum += score.value as f64;
        match score.label {
            PostureLabel::Good => self.good_frames += 1,
            PostureLabel::NeedsCorrection => self.needs_correction_frames += 1,
            PostureLabel::Poor => self.poor_frames += 1,
        }
    }

    pub fn record_alert(&mut self, kind: AlertKind) {
        match kind {
            AlertKind::Soft => self.soft_alerts += 1,
            AlertKind::Hard => self.hard_alerts += 1,
        }
    }

    pub fn summary(&self, elapsed_sec: u64) -> SessionSummary {
        let average = |sum: f64| {
            if self.frames == 0 {
                None
            } else {
                Some(sum / self.frames as f64)
            }
        };

        SessionSummary {
            session_id: self.session_id.clone(),
            started_at_utc: self.started_at,
            elapsed_sec,
            frames: self.frames,
            avg_pressure: average(self.pressure_sum),
            avg_score: average(self.score_sum),
            good_frames: self.good_frames,
            needs_correction_frames: self.needs_correction_frames,
            poor_frames: self.poor_frames,
            soft_alerts: self.soft_alerts,
            hard_alerts: self.hard_alerts,
        }
    }
}
