//! SitSense Core - Signal processing and alerting core for a pressure-sensing seat
//!
//! Raw pressure grids from the seat flow through a deterministic pipeline:
//! calibration → bilinear resample → min/max + gamma normalization → color.
//! The calibrated grid also yields left/right and front/back balance and a
//! 0-100 posture score.
//!
//! ## Modules
//!
//! - **Matrix Pipeline**: raw grid → display intensities, balance and score
//! - **Sit Timer & Alerts**: pause/resume sitting timer driving soft/hard
//!   threshold alerts with repeat suppression
//! - **Engine**: single-threaded composition root wiring both to observers

pub mod alerts;
pub mod balance;
pub mod calibration;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod palette;
pub mod pipeline;
pub mod resample;
pub mod score;
pub mod session;
pub mod timer;
pub mod types;

// C ABI for the cdylib/staticlib builds
pub mod ffi;

pub use alerts::{AlertBus, SubscriptionId, ThresholdAlerts};
pub use config::{
    AlertSettings, NormalizationConfig, NormalizationUpdate, ScoreWeights, SenseConfig,
    ThresholdConfig, ThresholdUpdate,
};
pub use engine::{AdviceContext, FrameReport, SenseObserver, SitSenseEngine, TickReport};
pub use error::SenseError;
pub use pipeline::{process_grid, MatrixPipeline, ProcessedFrame};
pub use session::{SessionSummary, SessionTracker};
pub use timer::{format_clock, format_threshold, Clock, ManualClock, SitTimer, SystemClock};
pub use types::{
    AlertEvent, AlertKind, BalanceReading, BalanceVector, IntensityGrid, PostureLabel,
    PostureScore, PressureGrid, Rgb,
};

/// Library version
pub const SITSENSE_VERSION: &str = env!("CARGO_PKG_VERSION");
