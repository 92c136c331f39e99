//! Recency cache of pivot-denominated samples with TTL support.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use satrate_common::{constants, now_millis, BasePriceSample, DurationExt, Symbol};
use tracing::{debug, trace};

/// Configuration for the recency cache.
#[derive(Debug, Clone)]
pub struct RecencyCacheConfig {
    /// Samples older than `now - ttl` are rejected on insert and pruned on
    /// cleanup.
    pub ttl: Duration,
}

impl Default for RecencyCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::cache_ttl(),
        }
    }
}

/// Per-symbol buffer of recent samples.
///
/// Each symbol maps to a series kept strictly ascending by timestamp. A
/// single lock guards all symbols, so readers never observe a series in the
/// middle of an insert or sweep. Reads return copies.
pub struct RecencyCache {
    series: RwLock<HashMap<Symbol, Vec<BasePriceSample>>>,
    config: RecencyCacheConfig,
}

impl RecencyCache {
    /// Create a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RecencyCacheConfig::default())
    }

    /// Create a new cache with custom configuration.
    pub fn with_config(config: RecencyCacheConfig) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Insert a sample. Returns `false` when it was ignored as stale or as a
    /// duplicate timestamp.
    pub fn insert(&self, symbol: &Symbol, sample: BasePriceSample) -> bool {
        self.insert_at(symbol, sample, now_millis())
    }

    /// Insert a sample, measuring staleness against `now_millis`.
    pub fn insert_at(&self, symbol: &Symbol, sample: BasePriceSample, now_millis: i64) -> bool {
        let ttl_millis = self.config.ttl.as_millis_i64();
        if now_millis.saturating_sub(sample.timestamp_millis) > ttl_millis {
            debug!(
                symbol = %symbol,
                timestamp = sample.timestamp_millis,
                "Ignoring stale sample"
            );
            return false;
        }

        let mut series = self.series.write();
        let samples = series.entry(symbol.clone()).or_default();

        match samples.binary_search_by_key(&sample.timestamp_millis, |s| s.timestamp_millis) {
            Ok(_) => {
                debug!(
                    symbol = %symbol,
                    timestamp = sample.timestamp_millis,
                    "Ignoring duplicate sample"
                );
                false
            }
            Err(idx) => {
                samples.insert(idx, sample);
                trace!(symbol = %symbol, timestamp = sample.timestamp_millis, "Cached sample");
                true
            }
        }
    }

    /// Snapshot of a symbol's series, oldest first.
    pub fn get(&self, symbol: &Symbol) -> Option<Vec<BasePriceSample>> {
        self.series.read().get(symbol).cloned()
    }

    /// Snapshot of the samples at or after `since`.
    pub fn get_since(&self, symbol: &Symbol, since: i64) -> Option<Vec<BasePriceSample>> {
        let series = self.series.read();
        let samples = series.get(symbol)?;
        let start = samples.partition_point(|s| s.timestamp_millis < since);
        Some(samples[start..].to_vec())
    }

    /// Snapshot of the samples at or after `since`, taken only when the
    /// oldest cached sample predates `since`.
    ///
    /// The check and the copy happen under one read guard, so a concurrent
    /// sweep cannot prune the covering sample in between.
    pub fn get_covering(&self, symbol: &Symbol, since: i64) -> Option<Vec<BasePriceSample>> {
        let series = self.series.read();
        let samples = series.get(symbol)?;
        if !samples.first().is_some_and(|oldest| oldest.timestamp_millis < since) {
            return None;
        }
        let start = samples.partition_point(|s| s.timestamp_millis < since);
        Some(samples[start..].to_vec())
    }

    /// Timestamp of the oldest cached sample for a symbol.
    pub fn oldest(&self, symbol: &Symbol) -> Option<i64> {
        self.series
            .read()
            .get(symbol)
            .and_then(|s| s.first())
            .map(|s| s.timestamp_millis)
    }

    /// Whether the cache holds data older than `since` for the symbol, in
    /// which case a query bounded below by `since` may be answered from the
    /// cache alone.
    ///
    /// Only the oldest sample is checked. Holes left by missed ingestion runs
    /// are not detected.
    pub fn covers(&self, symbol: &Symbol, since: i64) -> bool {
        self.oldest(symbol).is_some_and(|oldest| oldest < since)
    }

    /// Drop samples past the TTL. Returns the number of samples removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(now_millis())
    }

    /// Drop samples older than `now_millis - ttl`, removing symbols whose
    /// series become empty.
    pub fn cleanup_at(&self, now_millis: i64) -> usize {
        let cutoff = now_millis.saturating_sub(self.config.ttl.as_millis_i64());
        let mut removed = 0;

        let mut series = self.series.write();
        series.retain(|symbol, samples| {
            let stale = samples.partition_point(|s| s.timestamp_millis < cutoff);
            if stale > 0 {
                samples.drain(..stale);
                removed += stale;
                debug!(symbol = %symbol, pruned = stale, "Pruned stale samples");
            }
            !samples.is_empty()
        });

        removed
    }

    /// Symbols with cached data, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.series.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Remove all cached data.
    pub fn clear(&self) {
        self.series.write().clear();
    }

    /// Number of symbols with cached data.
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let series = self.series.read();
        CacheStats {
            symbols: series.len(),
            samples: series.values().map(Vec::len).sum(),
            oldest_timestamp: series
                .values()
                .filter_map(|s| s.first())
                .map(|s| s.timestamp_millis)
                .min(),
            newest_timestamp: series
                .values()
                .filter_map(|s| s.last())
                .map(|s| s.timestamp_millis)
                .max(),
        }
    }
}

impl Default for RecencyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub symbols: usize,
    pub samples: usize,
    pub oldest_timestamp: Option<i64>,
    pub newest_timestamp: Option<i64>,
}

/// Recency cache shared between the ingestion job, the sweeper and readers.
pub type SharedRecencyCache = Arc<RecencyCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HOUR: i64 = 3_600_000;
    const NOW: i64 = 1_700_000_000_000;

    fn s(ts: i64, price: f64) -> BasePriceSample {
        BasePriceSample::new(ts, price)
    }

    fn timestamps(cache: &RecencyCache, symbol: &Symbol) -> Vec<i64> {
        cache
            .get(symbol)
            .unwrap_or_default()
            .iter()
            .map(|s| s.timestamp_millis)
            .collect()
    }

    #[test]
    fn test_insert_and_get() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();

        assert!(cache.insert_at(&usd, s(NOW - HOUR, 2_500.0), NOW));

        let series = cache.get(&usd).unwrap();
        assert_eq!(series, vec![s(NOW - HOUR, 2_500.0)]);
        assert!(cache.get(&Symbol::eur()).is_none());
    }

    #[test]
    fn test_stale_insert_is_noop() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();

        assert!(!cache.insert_at(&usd, s(NOW - 25 * HOUR, 2_500.0), NOW));
        assert!(cache.get(&usd).is_none());
        assert!(cache.is_empty());

        cache.insert_at(&usd, s(NOW, 2_400.0), NOW);
        assert!(!cache.insert_at(&usd, s(NOW - 25 * HOUR, 2_500.0), NOW));
        assert_eq!(timestamps(&cache, &usd), vec![NOW]);
    }

    #[test]
    fn test_sample_exactly_at_ttl_is_kept() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();

        assert!(cache.insert_at(&usd, s(NOW - 24 * HOUR, 1.0), NOW));
        assert_eq!(cache.cleanup_at(NOW), 0);
        assert_eq!(cache.cleanup_at(NOW + 1), 1);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();

        assert!(cache.insert_at(&usd, s(NOW, 1.0), NOW));
        assert!(!cache.insert_at(&usd, s(NOW, 2.0), NOW));

        assert_eq!(cache.get(&usd).unwrap(), vec![s(NOW, 1.0)]);
    }

    #[test]
    fn test_out_of_order_inserts_sorted() {
        let cache = RecencyCache::new();
        let eth = Symbol::eth();

        for ts in [NOW - 2 * HOUR, NOW, NOW - 5 * HOUR, NOW - HOUR] {
            cache.insert_at(&eth, s(ts, 1.0), NOW);
        }

        assert_eq!(
            timestamps(&cache, &eth),
            vec![NOW - 5 * HOUR, NOW - 2 * HOUR, NOW - HOUR, NOW]
        );
    }

    #[test]
    fn test_symbols_independent() {
        let cache = RecencyCache::new();
        cache.insert_at(&Symbol::usd(), s(NOW, 1.0), NOW);
        cache.insert_at(&Symbol::eur(), s(NOW, 2.0), NOW);

        assert_eq!(cache.symbols(), vec![Symbol::eur(), Symbol::usd()]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cleanup_prunes_and_removes_empty() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        let eur = Symbol::eur();

        cache.insert_at(&usd, s(NOW - 20 * HOUR, 1.0), NOW);
        cache.insert_at(&usd, s(NOW - HOUR, 2.0), NOW);
        cache.insert_at(&eur, s(NOW - 23 * HOUR, 3.0), NOW);

        // Six hours later only the newest USD sample is within the TTL.
        let removed = cache.cleanup_at(NOW + 6 * HOUR);

        assert_eq!(removed, 2);
        assert_eq!(timestamps(&cache, &usd), vec![NOW - HOUR]);
        assert!(cache.get(&eur).is_none());
        assert_eq!(cache.symbols(), vec![usd]);
    }

    #[test]
    fn test_cleanup_idempotent() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        for hours in [30, 10, 3, 1] {
            cache.insert_at(&usd, s(NOW - hours * HOUR, hours as f64), NOW - 8 * HOUR);
        }

        cache.cleanup_at(NOW);
        let once = cache.get(&usd);
        let stats_once = cache.stats();

        assert_eq!(cache.cleanup_at(NOW), 0);
        assert_eq!(cache.get(&usd), once);
        assert_eq!(cache.stats(), stats_once);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_inserts() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        cache.insert_at(&usd, s(NOW - HOUR, 1.0), NOW);

        let snapshot = cache.get(&usd).unwrap();
        cache.insert_at(&usd, s(NOW, 2.0), NOW);
        cache.clear();

        assert_eq!(snapshot, vec![s(NOW - HOUR, 1.0)]);
    }

    #[test]
    fn test_covers_checks_oldest_sample() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();

        assert!(!cache.covers(&usd, NOW));

        cache.insert_at(&usd, s(NOW - 2 * HOUR, 1.0), NOW);
        cache.insert_at(&usd, s(NOW, 1.0), NOW);

        assert!(cache.covers(&usd, NOW - HOUR));
        assert!(!cache.covers(&usd, NOW - 2 * HOUR));
        assert!(!cache.covers(&usd, NOW - 3 * HOUR));
    }

    #[test]
    fn test_get_since() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        for h in 0..4 {
            cache.insert_at(&usd, s(NOW - h * HOUR, h as f64), NOW);
        }

        let recent = cache.get_since(&usd, NOW - HOUR).unwrap();
        assert_eq!(recent, vec![s(NOW - HOUR, 1.0), s(NOW, 0.0)]);
        assert!(cache.get_since(&Symbol::eur(), 0).is_none());
    }

    #[test]
    fn test_get_covering_requires_older_sample() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        assert!(cache.get_covering(&usd, NOW).is_none());

        for h in 0..3 {
            cache.insert_at(&usd, s(NOW - h * HOUR, h as f64), NOW);
        }

        let tail = cache.get_covering(&usd, NOW - HOUR).unwrap();
        assert_eq!(tail, vec![s(NOW - HOUR, 1.0), s(NOW, 0.0)]);
        assert!(cache.get_covering(&usd, NOW - 2 * HOUR).is_none());

        // Once the sweep drops the oldest sample the bound is no longer covered.
        cache.cleanup_at(NOW + 22 * HOUR + HOUR / 2);
        assert!(cache.get_covering(&usd, NOW - HOUR).is_none());
    }

    #[test]
    fn test_get_covering_consistent_with_sweeps() {
        let cache = RecencyCache::new();
        let usd = Symbol::usd();
        for h in 0..24 {
            cache.insert_at(&usd, s(NOW - h * HOUR, h as f64), NOW);
        }
        let since = NOW - 10 * HOUR;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for k in 0..24 {
                    cache.cleanup_at(NOW + k * HOUR);
                }
            });
            scope.spawn(|| {
                for _ in 0..1_000 {
                    if let Some(tail) = cache.get_covering(&usd, since) {
                        assert_eq!(tail.len(), 11);
                        assert_eq!(tail[0].timestamp_millis, since);
                    }
                }
            });
        });
    }

    #[test]
    fn test_custom_ttl() {
        let cache = RecencyCache::with_config(RecencyCacheConfig {
            ttl: Duration::minutes(5),
        });
        let usd = Symbol::usd();

        assert!(!cache.insert_at(&usd, s(NOW - 6 * 60_000, 1.0), NOW));
        assert!(cache.insert_at(&usd, s(NOW - 4 * 60_000, 1.0), NOW));
        assert_eq!(cache.ttl(), Duration::minutes(5));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(RecencyCache::new());
        let usd = Symbol::usd();

        std::thread::scope(|scope| {
            for worker in 0..4i64 {
                let cache = cache.clone();
                let usd = usd.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        cache.insert_at(&usd, s(NOW - (i * 4 + worker) * 1_000, 1.0), NOW);
                    }
                });
            }
        });

        let ts = timestamps(&cache, &usd);
        assert_eq!(ts.len(), 200);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    proptest! {
        #[test]
        fn prop_series_strictly_ascending(
            offsets in proptest::collection::vec(-30 * HOUR..HOUR, 0..60),
        ) {
            let cache = RecencyCache::new();
            let usd = Symbol::usd();
            for (i, offset) in offsets.iter().enumerate() {
                cache.insert_at(&usd, s(NOW + offset, i as f64), NOW);
            }

            let ts = timestamps(&cache, &usd);
            prop_assert!(ts.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(ts.iter().all(|t| NOW - t <= 24 * HOUR));
        }
    }
}
