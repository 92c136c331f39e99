//! Time utilities and constants for satrate.
//!
//! Samples carry millisecond epoch timestamps; these helpers convert between
//! that representation and `chrono` types.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{CommonError, Result};

/// Timing defaults.
pub mod constants {
    use super::Duration;

    /// Recency cache time-to-live (24 hours).
    pub fn cache_ttl() -> Duration {
        Duration::hours(24)
    }

    /// Interval between cache sweeps (1 minute).
    pub fn cleanup_interval() -> Duration {
        Duration::minutes(1)
    }

    /// Interval between ingestion runs (1 minute).
    pub fn ingest_interval() -> Duration {
        Duration::minutes(1)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC datetime.
pub fn millis_to_datetime(millis: i64) -> Result<Timestamp> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(CommonError::TimestampOutOfRange(millis))
}

/// Duration extensions for convenient conversion.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
    fn as_millis_i64(&self) -> i64;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }

    fn as_millis_i64(&self) -> i64 {
        self.num_milliseconds()
    }
}

impl DurationExt for std::time::Duration {
    fn as_std(&self) -> std::time::Duration {
        *self
    }

    fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.as_millis()).unwrap_or(i64::MAX)
    }
}
