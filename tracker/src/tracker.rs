//! Tracker service implementation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use satrate_fx::{
    Ingestor, Metrics, PriceStore, QuoteProvider, RateService, RecencyCache, RecencyCacheConfig,
    SharedMetrics, SharedRecencyCache,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::state::TrackerState;

/// Owns the recency cache and drives ingestion and cleanup.
pub struct Tracker {
    /// Configuration.
    config: TrackerConfig,
    /// Current tracker state.
    state: Arc<RwLock<TrackerState>>,
    /// Recency cache shared with the ingestor and the rate service.
    cache: SharedRecencyCache,
    /// Metrics shared with the ingestor and the rate service.
    metrics: SharedMetrics,
    /// Quote ingestion job.
    ingestor: Arc<Ingestor>,
    /// Read-through request helper.
    service: Arc<RateService>,
    /// Shutdown signal for background tasks.
    shutdown_tx: watch::Sender<bool>,
    /// Running background tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
    /// Create a tracker. Configuration is validated here.
    pub fn new(
        config: TrackerConfig,
        provider: Arc<dyn QuoteProvider>,
        store: Arc<dyn PriceStore>,
    ) -> Result<Self, TrackerError> {
        config.validate().map_err(TrackerError::Config)?;

        let cache = Arc::new(RecencyCache::with_config(RecencyCacheConfig {
            ttl: config.cache_ttl(),
        }));
        let metrics = Arc::new(Metrics::new());
        let tracked = config.ingestion.tracked.clone();

        let ingestor = Arc::new(Ingestor::new(
            provider,
            store.clone(),
            cache.clone(),
            metrics.clone(),
            tracked.clone(),
        ));
        let service = Arc::new(RateService::new(
            store,
            cache.clone(),
            metrics.clone(),
            tracked,
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(TrackerState::Starting)),
            cache,
            metrics,
            ingestor,
            service,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start the ingestion and cleanup loops.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<(), TrackerError> {
        {
            let mut state = self.state.write();
            if *state != TrackerState::Starting {
                return Err(TrackerError::InvalidState(*state));
            }
            *state = TrackerState::Running;
        }

        info!(
            tracked = self.ingestor.symbols().len(),
            ingest_interval_ms = self.config.ingestion.interval.as_millis() as u64,
            cleanup_interval_ms = self.config.cache.cleanup_interval.as_millis() as u64,
            "Starting tracker"
        );

        let ingestion = tokio::spawn(run_ingestion_loop(
            self.ingestor.clone(),
            self.config.ingestion.interval,
            self.shutdown_tx.subscribe(),
        ));
        let cleanup = tokio::spawn(run_cleanup_loop(
            self.cache.clone(),
            self.metrics.clone(),
            self.config.cache.cleanup_interval,
            self.shutdown_tx.subscribe(),
        ));

        self.tasks.lock().extend([ingestion, cleanup]);
        Ok(())
    }

    /// Stop the background loops and wait for them to finish.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), TrackerError> {
        {
            let mut state = self.state.write();
            if *state != TrackerState::Running {
                return Err(TrackerError::InvalidState(*state));
            }
            *state = TrackerState::ShuttingDown;
        }
        info!("Stopping tracker");

        // Receivers are held by the tasks, so send cannot fail while any run.
        let _ = self.shutdown_tx.send(true);

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Background task ended abnormally");
            }
        }

        *self.state.write() = TrackerState::Stopped;
        info!("Tracker stopped");
        Ok(())
    }

    /// Get the current tracker state.
    pub fn state(&self) -> TrackerState {
        *self.state.read()
    }

    /// Check if the background loops are running.
    pub fn is_running(&self) -> bool {
        self.state().is_operational()
    }

    /// Read-through rate service.
    pub fn service(&self) -> Arc<RateService> {
        self.service.clone()
    }

    /// Recency cache owned by this tracker.
    pub fn cache(&self) -> SharedRecencyCache {
        self.cache.clone()
    }

    /// Metrics shared by ingestion and reads.
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Ingestion job, for running a pass on demand.
    pub fn ingestor(&self) -> Arc<Ingestor> {
        self.ingestor.clone()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

async fn run_ingestion_loop(
    ingestor: Arc<Ingestor>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ingestor.run_once().await;
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Ingestion loop exited");
}

async fn run_cleanup_loop(
    cache: SharedRecencyCache,
    metrics: SharedMetrics,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pruned = cache.cleanup();
                metrics.cleanup(pruned);
                if pruned > 0 {
                    info!(pruned, symbols = cache.len(), "Cache sweep removed stale samples");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("Cleanup loop exited");
}
