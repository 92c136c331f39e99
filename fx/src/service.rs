//! Read-through rate service used by request handlers.

use std::sync::Arc;

use satrate_common::{BasePriceSample, CrossRateSample, SortOrder, Symbol, SATOSHIS_PER_BITCOIN};
use tracing::{debug, instrument};

use crate::cache::SharedRecencyCache;
use crate::cross_rate::{compute_series_cross_rate, ratio_at};
use crate::error::{RateError, RateResult};
use crate::interpolation::Series;
use crate::metrics::SharedMetrics;
use crate::store::{paginate, PriceStore, RangeQuery};

/// Request for a cross-rate history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRateQuery {
    /// Currency being priced.
    pub priced: Symbol,
    /// Currency the price is expressed in.
    pub comparison: Symbol,
    /// Inclusive lower timestamp bound.
    pub since: Option<i64>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl CrossRateQuery {
    pub fn new(priced: Symbol, comparison: Symbol) -> Self {
        Self {
            priced,
            comparison,
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
}

/// Serves pivot-denominated series and cross-rates, preferring the recency
/// cache over the store when the cache reaches back far enough.
pub struct RateService {
    store: Arc<dyn PriceStore>,
    cache: SharedRecencyCache,
    metrics: SharedMetrics,
    pivot: Symbol,
    tracked: Vec<Symbol>,
}

impl RateService {
    /// Create a service over the given tracked symbols. The pivot (BTC) is
    /// always accepted.
    pub fn new(
        store: Arc<dyn PriceStore>,
        cache: SharedRecencyCache,
        metrics: SharedMetrics,
        tracked: Vec<Symbol>,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            pivot: Symbol::btc(),
            tracked,
        }
    }

    /// The pivot currency.
    pub fn pivot(&self) -> &Symbol {
        &self.pivot
    }

    /// Check if a symbol can be queried.
    pub fn is_tracked(&self, symbol: &Symbol) -> bool {
        *symbol == self.pivot || self.tracked.contains(symbol)
    }

    fn ensure_tracked(&self, symbol: &Symbol) -> RateResult<()> {
        if self.is_tracked(symbol) {
            Ok(())
        } else {
            Err(RateError::UnknownCurrency(symbol.clone()))
        }
    }

    /// Samples of a tracked non-pivot currency at or after `since`, oldest
    /// first.
    ///
    /// Served from the cache when its oldest sample predates `since`,
    /// otherwise from the store.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn base_series(
        &self,
        symbol: &Symbol,
        since: Option<i64>,
    ) -> RateResult<Vec<BasePriceSample>> {
        self.ensure_tracked(symbol)?;
        if *symbol == self.pivot {
            return Err(RateError::InvalidQuery(format!(
                "{symbol} is the pivot currency and has no series"
            )));
        }

        if let Some(since) = since {
            if let Some(samples) = self.cache.get_covering(symbol, since) {
                self.metrics.cache_hit();
                debug!(samples = samples.len(), "Serving series from cache");
                return Ok(samples);
            }
        }

        self.metrics.cache_miss();
        let mut query = RangeQuery::new(symbol.clone());
        if let Some(since) = since {
            query = query.since(since);
        }
        let samples = self.store.query(&query).await?;
        debug!(samples = samples.len(), "Serving series from store");
        Ok(samples)
    }

    /// Cross-rate history of `priced` in units of `comparison`.
    ///
    /// One timestamp per sample of either currency; points that cannot be
    /// computed are omitted. Pivot-to-pivot has no samples and is empty.
    #[instrument(skip(self), fields(priced = %query.priced, comparison = %query.comparison))]
    pub async fn cross_rate(&self, query: &CrossRateQuery) -> RateResult<Vec<CrossRateSample>> {
        if query.limit == Some(0) {
            return Err(RateError::InvalidQuery("limit must be positive".to_string()));
        }

        let pair = self
            .pair_series(&query.priced, &query.comparison, query.since)
            .await?;
        let mut rates = match pair {
            Some((priced, comparison)) => compute_series_cross_rate(&priced, &comparison),
            None => Vec::new(),
        };

        query.order.apply(&mut rates);
        Ok(paginate(rates, query.offset, query.limit))
    }

    /// Interpolated ratio of `priced` to `comparison` at one timestamp.
    ///
    /// `None` when either currency has no samples at all.
    #[instrument(skip(self))]
    pub async fn rate_at(
        &self,
        priced: &Symbol,
        comparison: &Symbol,
        timestamp_millis: i64,
    ) -> RateResult<Option<f64>> {
        match self.pair_series(priced, comparison, None).await? {
            Some((p, c)) => Ok(ratio_at(&p, &c, timestamp_millis)),
            None => Ok(Some(1.0)),
        }
    }

    /// Load both sides of a pair. The pivot side is a constant series at the
    /// other side's timestamps; `None` for pivot against pivot.
    async fn pair_series(
        &self,
        priced: &Symbol,
        comparison: &Symbol,
        since: Option<i64>,
    ) -> RateResult<Option<(Series, Series)>> {
        self.ensure_tracked(priced)?;
        self.ensure_tracked(comparison)?;

        let priced = self.resolve(priced, since).await?;
        let comparison = self.resolve(comparison, since).await?;

        Ok(match (priced, comparison) {
            (Some(p), Some(c)) => Some((p, c)),
            (Some(p), None) => {
                let c = pivot_like(&p);
                Some((p, c))
            }
            (None, Some(c)) => Some((pivot_like(&c), c)),
            (None, None) => None,
        })
    }

    async fn resolve(&self, symbol: &Symbol, since: Option<i64>) -> RateResult<Option<Series>> {
        if *symbol == self.pivot {
            return Ok(None);
        }
        let samples = self.base_series(symbol, since).await?;
        Ok(Some(Series::from_samples(samples)))
    }
}

/// The pivot's own price, one bitcoin in satoshis, at every timestamp of
/// `series`.
fn pivot_like(series: &Series) -> Series {
    series
        .timestamps()
        .map(|ts| BasePriceSample::new(ts, SATOSHIS_PER_BITCOIN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RecencyCache;
    use crate::metrics::Metrics;
    use crate::store::InMemoryStore;
    use satrate_common::now_millis;

    const HOUR: i64 = 3_600_000;

    struct Fixture {
        store: Arc<InMemoryStore>,
        cache: SharedRecencyCache,
        metrics: SharedMetrics,
        service: RateService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(RecencyCache::new());
        let metrics = Arc::new(Metrics::new());
        let service = RateService::new(
            store.clone(),
            cache.clone(),
            metrics.clone(),
            vec![Symbol::usd(), Symbol::eur(), Symbol::eth()],
        );
        Fixture {
            store,
            cache,
            metrics,
            service,
        }
    }

    async fn record(f: &Fixture, symbol: &Symbol, ts: i64, price: f64) {
        let sample = BasePriceSample::new(ts, price);
        f.store.insert(symbol, sample).await.unwrap();
        f.cache.insert(symbol, sample);
    }

    #[tokio::test]
    async fn test_series_from_cache_when_covered() {
        let f = fixture();
        let now = now_millis();
        let usd = Symbol::usd();
        for h in 0..3 {
            record(&f, &usd, now - h * HOUR, 2_500.0).await;
        }

        let samples = f.service.base_series(&usd, Some(now - HOUR - 1)).await.unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(f.metrics.snapshot().cache_hits, 1);
        assert_eq!(f.metrics.snapshot().cache_misses, 0);
    }

    #[tokio::test]
    async fn test_series_from_store_when_not_covered() {
        let f = fixture();
        let now = now_millis();
        let usd = Symbol::usd();
        // Older than the cache TTL: only the store has it.
        f.store
            .insert(&usd, BasePriceSample::new(now - 48 * HOUR, 2_600.0))
            .await
            .unwrap();
        record(&f, &usd, now, 2_500.0).await;

        let samples = f.service.base_series(&usd, Some(now - 72 * HOUR)).await.unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(f.metrics.snapshot().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_unbounded_series_uses_store() {
        let f = fixture();
        record(&f, &Symbol::usd(), now_millis(), 2_500.0).await;

        f.service.base_series(&Symbol::usd(), None).await.unwrap();
        assert_eq!(f.metrics.snapshot().cache_misses, 1);
    }

    #[tokio::test]
    async fn test_unknown_currency() {
        let f = fixture();
        let xyz = Symbol::new("XYZ").unwrap();

        let result = f.service.base_series(&xyz, None).await;
        assert!(matches!(result, Err(RateError::UnknownCurrency(_))));

        let result = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::usd(), xyz))
            .await;
        assert!(matches!(result, Err(RateError::UnknownCurrency(_))));
    }

    #[tokio::test]
    async fn test_pivot_has_no_series() {
        let f = fixture();
        let result = f.service.base_series(&Symbol::btc(), None).await;
        assert!(matches!(result, Err(RateError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_cross_rate_between_tracked() {
        let f = fixture();
        record(&f, &Symbol::eth(), 0, 5_000_000.0).await;
        record(&f, &Symbol::eth(), 20, 7_000_000.0).await;
        record(&f, &Symbol::usd(), 10, 2_500.0).await;

        let rates = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::eth(), Symbol::usd()))
            .await
            .unwrap();

        assert_eq!(
            rates,
            vec![
                CrossRateSample::new(0, 2_000.0),
                CrossRateSample::new(10, 2_400.0),
                CrossRateSample::new(20, 2_800.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_cross_rate_against_pivot() {
        let f = fixture();
        record(&f, &Symbol::eth(), 0, 5_000_000.0).await;
        record(&f, &Symbol::eth(), 10, 6_000_000.0).await;

        let in_btc = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::eth(), Symbol::btc()))
            .await
            .unwrap();
        assert_eq!(
            in_btc,
            vec![CrossRateSample::new(0, 0.05), CrossRateSample::new(10, 0.06)]
        );

        let btc_in_eth = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::btc(), Symbol::eth()))
            .await
            .unwrap();
        assert_eq!(btc_in_eth[0], CrossRateSample::new(0, 20.0));

        let pivot = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::btc(), Symbol::btc()))
            .await
            .unwrap();
        assert!(pivot.is_empty());
    }

    #[tokio::test]
    async fn test_cross_rate_order_and_pagination() {
        let f = fixture();
        for ts in 0..5 {
            record(&f, &Symbol::eth(), ts * 10, 1_000.0 * (ts + 1) as f64).await;
        }
        record(&f, &Symbol::usd(), 0, 1_000.0).await;

        let query = CrossRateQuery::new(Symbol::eth(), Symbol::usd())
            .order(SortOrder::Descending)
            .offset(1)
            .limit(2);
        let rates = f.service.cross_rate(&query).await.unwrap();

        assert_eq!(
            rates,
            vec![CrossRateSample::new(30, 4.0), CrossRateSample::new(20, 3.0)]
        );

        let bad = CrossRateQuery::new(Symbol::eth(), Symbol::usd()).limit(0);
        assert!(f.service.cross_rate(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_cross_rate_missing_side_empty() {
        let f = fixture();
        record(&f, &Symbol::eth(), 0, 1_000.0).await;

        let rates = f
            .service
            .cross_rate(&CrossRateQuery::new(Symbol::eth(), Symbol::eur()))
            .await
            .unwrap();
        assert!(rates.is_empty());
    }

    #[tokio::test]
    async fn test_rate_at() {
        let f = fixture();
        record(&f, &Symbol::eth(), 0, 4_000.0).await;
        record(&f, &Symbol::eth(), 10, 6_000.0).await;
        record(&f, &Symbol::usd(), 0, 1_000.0).await;

        let rate = f
            .service
            .rate_at(&Symbol::eth(), &Symbol::usd(), 5)
            .await
            .unwrap();
        assert_eq!(rate, Some(5.0));

        let none = f
            .service
            .rate_at(&Symbol::eth(), &Symbol::eur(), 5)
            .await
            .unwrap();
        assert_eq!(none, None);

        let pivot = f
            .service
            .rate_at(&Symbol::btc(), &Symbol::btc(), 5)
            .await
            .unwrap();
        assert_eq!(pivot, Some(1.0));
    }
}
