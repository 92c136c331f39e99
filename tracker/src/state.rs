//! Tracker state definitions.

use std::fmt;

/// Tracker operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Constructed, background tasks not yet running.
    Starting,
    /// Ingesting and sweeping.
    Running,
    /// Shutdown signalled, waiting for background tasks.
    ShuttingDown,
    /// All background tasks finished.
    Stopped,
}

impl TrackerState {
    /// Check if background tasks are running.
    pub fn is_operational(&self) -> bool {
        matches!(self, TrackerState::Running)
    }
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackerState::Starting => "starting",
            TrackerState::Running => "running",
            TrackerState::ShuttingDown => "shutting_down",
            TrackerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
