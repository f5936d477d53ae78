//! Simulation errors

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop a run or a single trial.
///
/// Rejected actions are not errors; see [`crate::spell::RejectReason`].
#[derive(Error, Debug)]
pub enum SimError {
    /// Bad input, detected before any trial starts
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Engine state became inconsistent; the trial is abandoned
    #[error("invariant violated in trial seed {seed} at {time:?} ({actor}, {action}): {detail}")]
    Invariant {
        seed: u64,
        time: Duration,
        actor: String,
        action: String,
        detail: String,
    },
    #[error("worker pool error: {0}")]
    ThreadPool(String),
}

impl SimError {
    pub fn is_config(&self) -> bool {
        matches!(self, SimError::Config(_))
    }
}
