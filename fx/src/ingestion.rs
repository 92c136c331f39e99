//! Periodic ingestion of fresh quotes into the store and recency cache.

use std::sync::Arc;

use futures::future::join_all;
use satrate_common::{now, BasePriceSample, Symbol, Timestamp};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::SharedRecencyCache;
use crate::error::RateResult;
use crate::metrics::SharedMetrics;
use crate::provider::QuoteProvider;
use crate::store::PriceStore;

/// What happened to one symbol during an ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// Sample written to the store. `cached` is false when the cache ignored
    /// it as stale or duplicate.
    Stored {
        symbol: Symbol,
        sample: BasePriceSample,
        cached: bool,
    },
    /// The store already held a sample at this timestamp.
    Duplicate { symbol: Symbol, timestamp_millis: i64 },
    /// Fetching or storing failed; other symbols are unaffected.
    Failed { symbol: Symbol, error: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &Symbol {
        match self {
            SymbolOutcome::Stored { symbol, .. }
            | SymbolOutcome::Duplicate { symbol, .. }
            | SymbolOutcome::Failed { symbol, .. } => symbol,
        }
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub started_at: Timestamp,
    pub outcomes: Vec<SymbolOutcome>,
}

impl IngestReport {
    /// Number of samples written to the store.
    pub fn stored_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SymbolOutcome::Stored { .. }))
            .count()
    }

    /// Number of symbols that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SymbolOutcome::Failed { .. }))
            .count()
    }
}

/// Fetches one quote per tracked symbol and records it.
pub struct Ingestor {
    provider: Arc<dyn QuoteProvider>,
    store: Arc<dyn PriceStore>,
    cache: SharedRecencyCache,
    metrics: SharedMetrics,
    symbols: Vec<Symbol>,
}

impl Ingestor {
    /// Create a new ingestor for the given symbols.
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        store: Arc<dyn PriceStore>,
        cache: SharedRecencyCache,
        metrics: SharedMetrics,
        symbols: Vec<Symbol>,
    ) -> Self {
        Self {
            provider,
            store,
            cache,
            metrics,
            symbols,
        }
    }

    /// Tracked symbols.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Ingest every tracked symbol once.
    ///
    /// Symbols are fetched concurrently. A failure is logged and reported
    /// for that symbol only.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn run_once(&self) -> IngestReport {
        let run_id = Uuid::now_v7();
        let started_at = now();
        self.metrics.ingest_run();

        let outcomes = join_all(self.symbols.iter().map(|symbol| async move {
            match self.ingest_symbol(symbol).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.metrics.ingest_failed();
                    warn!(
                        run_id = %run_id,
                        symbol = %symbol,
                        error = %e,
                        code = e.error_code(),
                        retryable = e.is_retryable(),
                        "Ingestion failed for symbol"
                    );
                    SymbolOutcome::Failed {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                    }
                }
            }
        }))
        .await;

        let report = IngestReport {
            run_id,
            started_at,
            outcomes,
        };

        info!(
            run_id = %run_id,
            stored = report.stored_count(),
            failed = report.failed_count(),
            "Ingestion run complete"
        );

        report
    }

    async fn ingest_symbol(&self, symbol: &Symbol) -> RateResult<SymbolOutcome> {
        let quote = self.provider.quote(symbol).await?;
        let sample = quote.to_sample()?;

        if !self.store.insert(symbol, sample).await? {
            debug!(symbol = %symbol, timestamp = sample.timestamp_millis, "Duplicate quote");
            return Ok(SymbolOutcome::Duplicate {
                symbol: symbol.clone(),
                timestamp_millis: sample.timestamp_millis,
            });
        }
        self.metrics.sample_ingested();

        let cached = self.cache.insert(symbol, sample);
        if !cached {
            self.metrics.sample_rejected();
        }

        Ok(SymbolOutcome::Stored {
            symbol: symbol.clone(),
            sample,
            cached,
        })
    }
}
