//! Satrate Tracker
//!
//! Owns the recency cache for a process and runs the two timers around it:
//! periodic quote ingestion and periodic cache sweeping. Request handlers
//! read through the [`RateService`](satrate_fx::RateService) it exposes.

pub mod tracker;
pub mod config;
pub mod state;
pub mod error;

pub use tracker::Tracker;
pub use config::{CacheConfig, IngestionConfig, TrackerConfig};
pub use state::TrackerState;
pub use error::TrackerError;
