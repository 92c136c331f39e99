//! Quote provider traits and implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use satrate_common::{BasePriceSample, Symbol, SATOSHIS_PER_BITCOIN};
use tracing::{debug, warn};

use crate::error::{RateError, RateResult};

/// A price quote for one unit of a currency, in bitcoin.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Quoted currency.
    pub symbol: Symbol,
    /// Price of one unit in BTC.
    pub price_in_btc: Decimal,
    /// When the price was observed.
    pub at: DateTime<Utc>,
    /// Provider that produced the quote.
    pub source: String,
}

impl Quote {
    /// Create a new quote.
    pub fn new(
        symbol: Symbol,
        price_in_btc: Decimal,
        at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol,
            price_in_btc,
            at,
            source: source.into(),
        }
    }

    /// Convert to a satoshi-denominated sample.
    pub fn to_sample(&self) -> RateResult<BasePriceSample> {
        if self.price_in_btc <= Decimal::ZERO {
            return Err(RateError::QuoteRejected {
                symbol: self.symbol.clone(),
                reason: format!("non-positive price {}", self.price_in_btc),
            });
        }

        let sats = self
            .price_in_btc
            .to_f64()
            .map(|btc| btc * SATOSHIS_PER_BITCOIN)
            .ok_or_else(|| RateError::QuoteRejected {
                symbol: self.symbol.clone(),
                reason: format!("price {} not representable", self.price_in_btc),
            })?;

        Ok(BasePriceSample::checked(self.at.timestamp_millis(), sats)?)
    }
}

/// Trait for external price quote sources.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the current price of one unit of `symbol` in BTC.
    async fn quote(&self, symbol: &Symbol) -> RateResult<Quote>;
}

/// Queries several providers and returns the median price.
pub struct MedianQuoteProvider {
    providers: Vec<Arc<dyn QuoteProvider>>,
    min_providers: usize,
}

impl MedianQuoteProvider {
    /// Create a new median provider.
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self {
            providers,
            min_providers: 1,
        }
    }

    /// Set minimum number of successful providers required for a quote.
    pub fn with_min_providers(mut self, min: usize) -> Self {
        self.min_providers = min;
        self
    }

    fn median(symbol: &Symbol, quotes: &mut [Quote]) -> Quote {
        quotes.sort_by(|a, b| a.price_in_btc.cmp(&b.price_in_btc));
        let mid = quotes.len() / 2;

        let price = if quotes.len() % 2 == 0 {
            (quotes[mid - 1].price_in_btc + quotes[mid].price_in_btc) / Decimal::TWO
        } else {
            quotes[mid].price_in_btc
        };
        let at = quotes.iter().map(|q| q.at).max().unwrap_or_else(Utc::now);

        Quote::new(symbol.clone(), price, at, "MEDIAN")
    }
}

#[async_trait]
impl QuoteProvider for MedianQuoteProvider {
    fn name(&self) -> &str {
        "MEDIAN"
    }

    async fn quote(&self, symbol: &Symbol) -> RateResult<Quote> {
        let mut quotes = Vec::new();

        for provider in &self.providers {
            match provider.quote(symbol).await {
                Ok(quote) => {
                    debug!(
                        provider = provider.name(),
                        symbol = %symbol,
                        price = %quote.price_in_btc,
                        "Got quote from provider"
                    );
                    quotes.push(quote);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        symbol = %symbol,
                        error = %e,
                        "Provider failed to return quote"
                    );
                }
            }
        }

        if quotes.is_empty() || quotes.len() < self.min_providers {
            return Err(RateError::Provider {
                provider: self.name().to_string(),
                symbol: symbol.clone(),
                message: format!(
                    "{} of {} providers answered, {} required",
                    quotes.len(),
                    self.providers.len(),
                    self.min_providers.max(1)
                ),
            });
        }

        Ok(Self::median(symbol, &mut quotes))
    }
}

/// Mock quote provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockQuoteProvider {
    name: String,
    prices: dashmap::DashMap<Symbol, Decimal>,
    failing: dashmap::DashSet<Symbol>,
    quote_time: parking_lot::Mutex<Option<DateTime<Utc>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockQuoteProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: dashmap::DashMap::new(),
            failing: dashmap::DashSet::new(),
            quote_time: parking_lot::Mutex::new(None),
        }
    }

    /// Set the BTC price of a currency.
    pub fn set_price(&self, symbol: Symbol, price_in_btc: Decimal) {
        self.failing.remove(&symbol);
        self.prices.insert(symbol, price_in_btc);
    }

    /// Make quotes for a currency fail.
    pub fn fail(&self, symbol: Symbol) {
        self.failing.insert(symbol);
    }

    /// Stamp quotes with a fixed time instead of the wall clock.
    pub fn set_quote_time(&self, at: Option<DateTime<Utc>>) {
        *self.quote_time.lock() = at;
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, symbol: &Symbol) -> RateResult<Quote> {
        let unavailable = || RateError::Provider {
            provider: self.name.clone(),
            symbol: symbol.clone(),
            message: "quote unavailable".to_string(),
        };

        if self.failing.contains(symbol) {
            return Err(unavailable());
        }

        let price = self.prices.get(symbol).map(|p| *p).ok_or_else(unavailable)?;
        let at = (*self.quote_time.lock()).unwrap_or_else(Utc::now);
        Ok(Quote::new(symbol.clone(), price, at, self.name.clone()))
    }
}
