//! Simulation controller.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use satrate_common::{CrossRateSample, Symbol};
use satrate_fx::{CacheStats, CrossRateQuery, InMemoryStore, MetricsSnapshot};
use satrate_tracker::{Tracker, TrackerConfig};
use tracing::{info, warn};

use crate::feed::RandomWalkProvider;

/// Parameters of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub tracked: Vec<Symbol>,
    pub ticks: u64,
    pub interval: Duration,
    pub seed: Option<u64>,
    pub volatility_bps: u32,
    pub failure_rate: f64,
    pub priced: Symbol,
    pub comparison: Symbol,
    pub limit: Option<usize>,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub priced: Symbol,
    pub comparison: Symbol,
    pub rates: Vec<CrossRateSample>,
    pub cached_samples: usize,
    pub metrics: MetricsSnapshot,
}

/// Controls the simulation.
pub struct SimulationController {
    settings: SimulationSettings,
    tracker: Tracker,
}

impl SimulationController {
    /// Build a tracker over a synthetic feed. Environment configuration
    /// applies, with the CLI settings taking precedence.
    pub fn new(settings: SimulationSettings) -> anyhow::Result<Self> {
        let mut config = TrackerConfig::from_env();
        config.ingestion.tracked = settings.tracked.clone();
        config.ingestion.interval = settings.interval;

        let feed = RandomWalkProvider::new(settings.seed, settings.volatility_bps)
            .with_symbols(&settings.tracked)
            .with_failure_rate(settings.failure_rate);
        let store = Arc::new(InMemoryStore::new());

        let tracker = Tracker::new(config, Arc::new(feed), store)?;
        Ok(Self { settings, tracker })
    }

    /// Run the configured number of ingestion ticks and collect the
    /// cross-rate series.
    pub async fn run(&self) -> anyhow::Result<SimulationReport> {
        info!(
            ticks = self.settings.ticks,
            interval_ms = self.settings.interval.as_millis() as u64,
            "Running simulation"
        );

        self.tracker.start()?;

        let metrics = self.tracker.metrics();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, stopping early");
                    break;
                }
            }
            if metrics.snapshot().ingest_runs >= self.settings.ticks {
                break;
            }
        }

        self.tracker.stop().await?;

        let mut query =
            CrossRateQuery::new(self.settings.priced.clone(), self.settings.comparison.clone());
        if let Some(limit) = self.settings.limit {
            query = query.limit(limit);
        }
        let rates = self.tracker.service().cross_rate(&query).await?;
        let stats: CacheStats = self.tracker.cache().stats();

        Ok(SimulationReport {
            priced: self.settings.priced.clone(),
            comparison: self.settings.comparison.clone(),
            rates,
            cached_samples: stats.samples,
            metrics: metrics.snapshot(),
        })
    }
}
