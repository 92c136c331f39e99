//! Satrate Rate Engine
//!
//! Bitcoin-pivoted rate history: every tracked currency is sampled as a price
//! in satoshis, and the rate between any two currencies is derived from
//! their two series.
//!
//! # Features
//!
//! - Linear interpolation with flat edge extrapolation
//! - Cross-rates over the union of both series' timestamps
//! - TTL-bounded recency cache in front of the store
//! - Periodic ingestion with per-currency failure isolation
//!
//! # Example
//!
//! ```rust,ignore
//! use satrate_fx::{compute_cross_rate, estimate_at};
//! use satrate_common::BasePriceSample;
//!
//! let eth = vec![BasePriceSample::new(0, 5_000_000.0), BasePriceSample::new(20, 7_000_000.0)];
//! let usd = vec![BasePriceSample::new(10, 2_500.0)];
//!
//! assert_eq!(estimate_at(&eth, 10), Some(6_000_000.0));
//! let eth_in_usd = compute_cross_rate(&eth, &usd);
//! ```

pub mod interpolation;
pub mod cross_rate;
pub mod cache;
pub mod store;
pub mod provider;
pub mod ingestion;
pub mod service;
pub mod metrics;
pub mod error;

pub use interpolation::{estimate_at, Series};
pub use cross_rate::{compute_cross_rate, compute_series_cross_rate, ratio_at};
pub use cache::{CacheStats, RecencyCache, RecencyCacheConfig, SharedRecencyCache};
pub use store::{InMemoryStore, PriceStore, RangeQuery};
pub use provider::{MedianQuoteProvider, Quote, QuoteProvider};
#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockQuoteProvider;
pub use ingestion::{IngestReport, Ingestor, SymbolOutcome};
pub use service::{CrossRateQuery, RateService};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use error::{RateError, RateResult};
