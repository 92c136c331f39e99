//! Metrics collection for ingestion and cache monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Rate engine metrics.
pub struct Metrics {
    /// Ingestion runs started.
    pub ingest_runs: AtomicU64,
    /// Samples accepted by the store.
    pub samples_ingested: AtomicU64,
    /// Per-symbol ingestion failures.
    pub ingest_failures: AtomicU64,
    /// Samples the cache ignored as stale or duplicate.
    pub samples_rejected: AtomicU64,
    /// Series served from the recency cache.
    pub cache_hits: AtomicU64,
    /// Series that fell back to the store.
    pub cache_misses: AtomicU64,
    /// Cache sweeps performed.
    pub cleanup_runs: AtomicU64,
    /// Samples removed by cache sweeps.
    pub samples_pruned: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            ingest_runs: AtomicU64::new(0),
            samples_ingested: AtomicU64::new(0),
            ingest_failures: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cleanup_runs: AtomicU64::new(0),
            samples_pruned: AtomicU64::new(0),
        }
    }

    pub fn ingest_run(&self) {
        self.ingest_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_ingested(&self) {
        self.samples_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ingest_failed(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sweep and how many samples it removed.
    pub fn cleanup(&self, pruned: usize) {
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
        self.samples_pruned.fetch_add(pruned as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ingest_runs: self.ingest_runs.load(Ordering::Relaxed),
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cleanup_runs: self.cleanup_runs.load(Ordering::Relaxed),
            samples_pruned: self.samples_pruned.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters = [
            ("ingest_runs", "Ingestion runs started", snapshot.ingest_runs),
            ("samples_ingested", "Samples written to the store", snapshot.samples_ingested),
            ("ingest_failures", "Per-symbol ingestion failures", snapshot.ingest_failures),
            ("samples_rejected", "Samples ignored by the cache", snapshot.samples_rejected),
            ("cache_hits", "Series served from the cache", snapshot.cache_hits),
            ("cache_misses", "Series read from the store", snapshot.cache_misses),
            ("cleanup_runs", "Cache sweeps performed", snapshot.cleanup_runs),
            ("samples_pruned", "Samples removed by cache sweeps", snapshot.samples_pruned),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP satrate_{name} {help}\n# TYPE satrate_{name} counter\nsatrate_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub ingest_runs: u64,
    pub samples_ingested: u64,
    pub ingest_failures: u64,
    pub samples_rejected: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cleanup_runs: u64,
    pub samples_pruned: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
