//! Tracker error types.

use thiserror::Error;

use crate::state::TrackerState;

/// Errors raised by the tracker lifecycle.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration rejected by validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current state.
    #[error("Invalid tracker state: {0}")]
    InvalidState(TrackerState),
}
