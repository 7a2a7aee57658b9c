//! Engine orchestration
//!
//! [`SitSenseEngine`] is the composition root: it owns the matrix pipeline,
//! the sit timer, the threshold alerts and the alert bus, and forwards
//! results to collaborators through [`SenseObserver`] and alert
//! subscriptions. Everything runs on the caller's thread; nothing here blocks
//! or performs I/O.
//!
//! The host drives two loops:
//! - a 1 Hz [`SitSenseEngine::tick`] for timer/alert evaluation
//! - a frame-paced [`SitSenseEngine::render_frame`] that redraws only when a
//!   new grid (or a display setting change) marked the heatmap dirty

use crate::alerts::{AlertBus, SubscriptionId, ThresholdAlerts};
use crate::balance::derive_balance;
use crate::config::{
    AlertSettings, NormalizationUpdate, ScoreWeights, SenseConfig, ThresholdUpdate,
};
use crate::error::SenseError;
use crate::palette::color_of;
use crate::pipeline::MatrixPipeline;
use crate::score::{compute_score, mean_intensity, ScoreInputs};
use crate::session::{SessionSummary, SessionTracker};
use crate::timer::{Clock, SitTimer, SystemClock};
use crate::types::{
    AlertEvent, BalanceReading, BalanceVector, IntensityGrid, PostureScore, PressureGrid, Rgb,
};
use serde::{Deserialize, Serialize};

/// Palette function handed to the rendering collaborator
pub type ColorFn = fn(f64) -> Rgb;

/// Collaborator callbacks. Every method defaults to a no-op.
pub trait SenseObserver {
    /// A new heatmap is ready to draw
    fn on_intensity_grid_ready(&mut self, _grid: &IntensityGrid, _color_of: ColorFn) {}

    fn on_balance_updated(&mut self, _balance: &BalanceReading) {}

    fn on_score_updated(&mut self, _score: &PostureScore) {}
}

/// Result of ingesting one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub balance: BalanceReading,
    pub score: PostureScore,
    /// Average raw pressure of the frame (sensor scale)
    pub mean_pressure: f64,
}

/// Result of one timer/alert evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub elapsed: u64,
    pub alert: Option<AlertEvent>,
}

/// Snapshot handed to the advice collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdviceContext {
    pub score: Option<PostureScore>,
    pub imbalance: BalanceVector,
    pub duration_sec: u64,
    pub last_alert: Option<AlertEvent>,
}

/// Latest outputs for the heatmap and metrics
#[derive(Debug, Clone)]
struct CurrentFrame {
    intensities: IntensityGrid,
    report: FrameReport,
}

/// Composition root for the signal processing and alerting core
pub struct SitSenseEngine {
    pipeline: MatrixPipeline,
    alerts: ThresholdAlerts,
    bus: AlertBus,
    timer: SitTimer,
    weights: ScoreWeights,
    observers: Vec<Box<dyn SenseObserver>>,
    last_raw: Option<PressureGrid>,
    current: Option<CurrentFrame>,
    dirty: bool,
    session: SessionTracker,
    last_alert: Option<AlertEvent>,
}

impl Default for SitSenseEngine {
    fn default() -> Self {
        Self::new(SenseConfig::default())
    }
}

impl SitSenseEngine {
    /// Create an engine on the system clock
    pub fn new(config: SenseConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Create an engine with an explicit time source
    pub fn with_clock(config: SenseConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            pipeline: MatrixPipeline::new(config.normalization),
            alerts: ThresholdAlerts::new(config.thresholds),
            bus: AlertBus::new(),
            timer: SitTimer::with_clock(clock),
            weights: config.score,
            observers: Vec::new(),
            last_raw: None,
            current: None,
            dirty: false,
            session: SessionTracker::new(),
            last_alert: None,
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> SenseConfig {
        SenseConfig {
            thresholds: *self.alerts.config(),
            normalization: *self.pipeline.config(),
            score: self.weights,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SenseObserver>) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------
    // Frame ingestion and rendering
    // ------------------------------------------------------------------

    /// Ingest a raw reading from the transport collaborator.
    ///
    /// An invalid grid is dropped: the previous heatmap, balance and score
    /// stay as they were and the error is returned to the caller.
    pub fn ingest_grid(&mut self, rows: Vec<Vec<f64>>) -> Result<FrameReport, SenseError> {
        match PressureGrid::from_rows(rows) {
            Ok(grid) => Ok(self.ingest(grid)),
            Err(e) => {
                log::warn!("dropping frame: {e}");
                Err(e)
            }
        }
    }

    /// Ingest an already validated grid
    pub fn ingest(&mut self, grid: PressureGrid) -> FrameReport {
        let frame = self.pipeline.process(&grid);

        let balance = derive_balance(&frame.calibrated);
        let score = compute_score(
            &ScoreInputs {
                balance: balance.vector,
                mean_intensity: mean_intensity(&frame.calibrated, self.weights.intensity_full_scale),
                elapsed_sec: self.timer.elapsed_seconds(),
                soft_threshold_sec: self.alerts.config().soft_sec(),
            },
            &self.weights,
        );

        let report = FrameReport {
            balance,
            score,
            mean_pressure: grid.mean_pressure(),
        };

        self.session.record_frame(report.mean_pressure, &score);
        for observer in self.observers.iter_mut() {
            observer.on_balance_updated(&report.balance);
            observer.on_score_updated(&report.score);
        }

        self.current = Some(CurrentFrame {
            intensities: frame.intensities,
            report,
        });
        self.last_raw = Some(grid);
        self.dirty = true;

        report
    }

    /// Draw the heatmap if anything changed since the last draw.
    ///
    /// Returns `true` when observers were handed a grid.
    pub fn render_frame(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let Some(current) = &self.current else {
            return false;
        };

        for observer in self.observers.iter_mut() {
            observer.on_intensity_grid_ready(&current.intensities, color_of);
        }
        self.dirty = false;
        true
    }

    pub fn needs_render(&self) -> bool {
        self.dirty && self.current.is_some()
    }

    pub fn intensities(&self) -> Option<&IntensityGrid> {
        self.current.as_ref().map(|c| &c.intensities)
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.current.as_ref().map(|c| &c.report)
    }

    /// Recompute the heatmap of the last frame after a display setting change
    fn refresh_display(&mut self) {
        let (Some(raw), Some(current)) = (&self.last_raw, &mut self.current) else {
            return;
        };
        current.intensities = self.pipeline.process(raw).intensities;
        self.dirty = true;
    }

    // ------------------------------------------------------------------
    // Timer control
    // ------------------------------------------------------------------

    pub fn start(&mut self) {
        self.timer.start();
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Stop the timer, zero it, clear fire markers and begin a new session
    pub fn reset(&mut self) {
        self.timer.reset();
        self.session = SessionTracker::new();
        self.last_alert = None;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    /// Presence signal from the seat: sitting starts the timer, leaving stops it
    pub fn set_sitting(&mut self, sitting: bool) {
        if sitting {
            self.start();
        } else {
            self.stop();
        }
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    /// One evaluation of the threshold state machine.
    ///
    /// Returns `None` while the timer is stopped: no alert state advances.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.timer.is_running() {
            return None;
        }

        let elapsed = self.timer.elapsed_seconds();
        let alert = self.alerts.evaluate(elapsed, self.timer.state_mut());

        if let Some(event) = alert {
            log::info!("{} alert at {}s", event.kind.as_str(), event.elapsed);
            self.session.record_alert(event.kind);
            self.last_alert = Some(event);
            self.bus.publish(&event);
        }

        Some(TickReport { elapsed, alert })
    }

    /// The host came back to the foreground: run one catch-up evaluation now
    pub fn on_foreground(&mut self) -> Option<TickReport> {
        self.tick()
    }

    pub fn subscribe_alerts<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&AlertEvent) + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe_alerts(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn last_alert(&self) -> Option<AlertEvent> {
        self.last_alert
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_thresholds(&mut self, update: &ThresholdUpdate) -> Result<(), SenseError> {
        self.alerts.set_thresholds(update)
    }

    /// Apply minute-based settings (clamped to 1..=600 minutes)
    pub fn set_alert_settings(&mut self, settings: AlertSettings) -> Result<(), SenseError> {
        self.alerts.set_thresholds(&settings.into())
    }

    pub fn set_normalization_config(
        &mut self,
        update: &NormalizationUpdate,
    ) -> Result<(), SenseError> {
        let result = self.pipeline.set_config(update);
        self.refresh_display();
        result
    }

    pub fn set_score_weights(&mut self, weights: ScoreWeights) -> Result<(), SenseError> {
        weights.validate()?;
        self.weights = weights;
        Ok(())
    }

    pub fn set_calibration(&mut self, grid: &PressureGrid) {
        self.pipeline.set_calibration(grid);
        self.refresh_display();
    }

    /// Use the most recent raw frame as the baseline. `false` if none arrived yet.
    pub fn calibrate_from_last(&mut self) -> bool {
        let Some(raw) = self.last_raw.clone() else {
            return false;
        };
        self.set_calibration(&raw);
        true
    }

    pub fn clear_calibration(&mut self) {
        self.pipeline.clear_calibration();
        self.refresh_display();
    }

    pub fn has_calibration(&self) -> bool {
        self.pipeline.calibration().is_set()
    }

    pub fn save_calibration(&self) -> Result<String, SenseError> {
        self.pipeline.save_calibration()
    }

    pub fn load_calibration(&mut self, json: &str) -> Result<(), SenseError> {
        self.pipeline.load_calibration(json)?;
        self.refresh_display();
        Ok(())
    }

    /// Drop the baseline and restore default resolution and sensitivity
    pub fn reset_view(&mut self) {
        self.pipeline.clear_calibration();
        self.pipeline.reset_config();
        self.refresh_display();
    }

    // ------------------------------------------------------------------
    // Collaborator snapshots
    // ------------------------------------------------------------------

    pub fn advice_context(&self) -> AdviceContext {
        AdviceContext {
            score: self.current.as_ref().map(|c| c.report.score),
            imbalance: self
                .current
                .as_ref()
                .map(|c| c.report.balance.vector)
                .unwrap_or_default(),
            duration_sec: self.timer.elapsed_seconds(),
            last_alert: self.last_alert,
        }
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.session.summary(self.timer.elapsed_seconds())
    }
}
