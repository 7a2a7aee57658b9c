//! Error types for SitSense Core

use thiserror::Error;

/// Errors that can occur while processing frames or applying configuration.
///
/// None of these are fatal: an invalid frame is dropped and the previous
/// outputs stay in place, and a rejected configuration field leaves the
/// other fields of the same update applied.
#[derive(Debug, Error)]
pub enum SenseError {
    #[error("Invalid pressure grid: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
