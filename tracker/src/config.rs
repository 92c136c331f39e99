//! Tracker configuration.

use std::time::Duration;

use satrate_common::{constants, parse_symbol_list, DurationExt, Symbol};
use tracing::warn;

/// Ingestion configuration.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Currencies quoted on every run. The pivot is implicit.
    pub tracked: Vec<Symbol>,
    /// Interval between runs.
    pub interval: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            tracked: vec![Symbol::usd(), Symbol::eur(), Symbol::eth()],
            interval: constants::ingest_interval().as_std(),
        }
    }
}

/// Recency cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Sample time-to-live.
    pub ttl: Duration,
    /// Interval between sweeps.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::cache_ttl().as_std(),
            cleanup_interval: constants::cleanup_interval().as_std(),
        }
    }
}

/// Main tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Ingestion configuration.
    pub ingestion: IngestionConfig,
    /// Cache configuration.
    pub cache: CacheConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ingestion: IngestionConfig::default(),
            cache: CacheConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a key lookup, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(list) = lookup("SATRATE_TRACKED") {
            match parse_symbol_list(&list) {
                Ok(symbols) => config.ingestion.tracked = symbols,
                Err(e) => warn!(error = %e, "Ignoring SATRATE_TRACKED"),
            }
        }

        if let Some(secs) = parse_secs(&lookup, "SATRATE_INGEST_INTERVAL_SECS") {
            config.ingestion.interval = secs;
        }

        if let Some(secs) = parse_secs(&lookup, "SATRATE_CLEANUP_INTERVAL_SECS") {
            config.cache.cleanup_interval = secs;
        }

        if let Some(secs) = parse_secs(&lookup, "SATRATE_CACHE_TTL_SECS") {
            config.cache.ttl = secs;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.ingestion.tracked.is_empty() {
            return Err("At least one tracked currency is required".to_string());
        }

        if self.ingestion.tracked.contains(&Symbol::btc()) {
            return Err("BTC is the pivot currency and cannot be tracked".to_string());
        }

        if self.ingestion.interval.is_zero() {
            return Err("Ingest interval cannot be 0".to_string());
        }

        if self.cache.cleanup_interval.is_zero() {
            return Err("Cleanup interval cannot be 0".to_string());
        }

        if self.cache.ttl.is_zero() {
            return Err("Cache TTL cannot be 0".to_string());
        }

        if chrono::Duration::from_std(self.cache.ttl).is_err() {
            return Err("Cache TTL is too large".to_string());
        }

        Ok(())
    }

    /// Cache TTL as a `chrono` duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cache.ttl).unwrap_or_else(|_| constants::cache_ttl())
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring unparsable duration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache.cleanup_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("SATRATE_TRACKED", "usd,jpy"),
            ("SATRATE_INGEST_INTERVAL_SECS", "30"),
            ("SATRATE_CACHE_TTL_SECS", "3600"),
            ("LOG_LEVEL", "debug"),
        ]));

        assert_eq!(
            config.ingestion.tracked,
            vec![Symbol::usd(), Symbol::new("JPY").unwrap()]
        );
        assert_eq!(config.ingestion.interval, Duration::from_secs(30));
        assert_eq!(config.cache.ttl, Duration::from_secs(3600));
        assert_eq!(config.cache_ttl(), chrono::Duration::hours(1));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("SATRATE_TRACKED", "usd,$"),
            ("SATRATE_CLEANUP_INTERVAL_SECS", "soon"),
        ]));

        assert_eq!(config.ingestion.tracked, IngestionConfig::default().tracked);
        assert_eq!(config.cache.cleanup_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = TrackerConfig::default();
        config.ingestion.interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.ingestion.tracked.push(Symbol::btc());
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.ingestion.tracked.clear();
        assert!(config.validate().is_err());
    }
}
