//! Persistent sample store boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use satrate_common::{BasePriceSample, SortOrder, Symbol};
use tracing::debug;

use crate::error::{RateError, RateResult};

/// Range query over one symbol's samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Symbol to read.
    pub symbol: Symbol,
    /// Inclusive lower timestamp bound.
    pub since: Option<i64>,
    /// Result order.
    pub order: SortOrder,
    /// Maximum number of samples to return.
    pub limit: Option<usize>,
    /// Samples to skip after ordering.
    pub offset: usize,
}

impl RangeQuery {
    /// Query every sample of a symbol, oldest first.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            since: None,
            order: SortOrder::Ascending,
            limit: None,
            offset: 0,
        }
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Reject queries that can never return anything useful.
    pub fn validate(&self) -> RateResult<()> {
        if self.limit == Some(0) {
            return Err(RateError::InvalidQuery("limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Apply bound, order and pagination to an ascending sample list.
    pub fn apply(&self, ascending: Vec<BasePriceSample>) -> Vec<BasePriceSample> {
        let mut samples: Vec<BasePriceSample> = match self.since {
            Some(since) => ascending
                .into_iter()
                .filter(|s| s.timestamp_millis >= since)
                .collect(),
            None => ascending,
        };
        self.order.apply(&mut samples);
        paginate(samples, self.offset, self.limit)
    }
}

/// Skip `offset` items then take at most `limit`.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// Time-series storage for pivot-denominated samples.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Persist a sample. Returns `false` if the timestamp was already stored
    /// for the symbol, in which case the stored sample is kept.
    async fn insert(&self, symbol: &Symbol, sample: BasePriceSample) -> RateResult<bool>;

    /// Read samples matching a range query.
    async fn query(&self, query: &RangeQuery) -> RateResult<Vec<BasePriceSample>>;
}

/// Store that keeps every sample in memory, ordered per symbol.
#[derive(Default)]
pub struct InMemoryStore {
    series: DashMap<Symbol, BTreeMap<i64, f64>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples across all symbols.
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|s| s.len()).sum()
    }
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn insert(&self, symbol: &Symbol, sample: BasePriceSample) -> RateResult<bool> {
        let mut series = self.series.entry(symbol.clone()).or_default();
        if series.contains_key(&sample.timestamp_millis) {
            debug!(symbol = %symbol, timestamp = sample.timestamp_millis, "Sample already stored");
            return Ok(false);
        }
        series.insert(sample.timestamp_millis, sample.price_in_base_units);
        Ok(true)
    }

    async fn query(&self, query: &RangeQuery) -> RateResult<Vec<BasePriceSample>> {
        query.validate()?;

        let ascending: Vec<BasePriceSample> = match self.series.get(&query.symbol) {
            Some(series) => {
                let lower = query.since.unwrap_or(i64::MIN);
                series
                    .range(lower..)
                    .map(|(ts, price)| BasePriceSample::new(*ts, *price))
                    .collect()
            }
            None => Vec::new(),
        };

        Ok(query.apply(ascending))
    }
}
