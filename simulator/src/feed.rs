//! Synthetic quote feed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use satrate_common::Symbol;
use satrate_fx::{Quote, QuoteProvider, RateError, RateResult};

/// Starting BTC price for well-known symbols.
pub fn starting_price(symbol: &Symbol) -> Decimal {
    match symbol.code() {
        "USD" => Decimal::new(16, 6),
        "EUR" => Decimal::new(18, 6),
        "GBP" => Decimal::new(21, 6),
        "JPY" => Decimal::new(11, 8),
        "ETH" => Decimal::new(5, 2),
        _ => Decimal::new(1, 3),
    }
}

/// Random-walk quote provider.
///
/// Every quote moves the symbol's price by a uniformly drawn step of at most
/// `volatility_bps` basis points.
pub struct RandomWalkProvider {
    rng: Mutex<StdRng>,
    prices: Mutex<HashMap<Symbol, Decimal>>,
    volatility_bps: u32,
    failure_rate: f64,
}

impl RandomWalkProvider {
    /// Create a new feed. A seed makes runs reproducible.
    pub fn new(seed: Option<u64>, volatility_bps: u32) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            rng: Mutex::new(rng),
            prices: Mutex::new(HashMap::new()),
            volatility_bps,
            failure_rate: 0.0,
        }
    }

    /// Fail this fraction of quotes, to exercise failure isolation.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Seed a symbol's price.
    pub fn with_price(self, symbol: Symbol, price_in_btc: Decimal) -> Self {
        self.prices.lock().insert(symbol, price_in_btc);
        self
    }

    /// Seed every symbol with its starting price.
    pub fn with_symbols(self, symbols: &[Symbol]) -> Self {
        symbols
            .iter()
            .fold(self, |feed, s| feed.with_price(s.clone(), starting_price(s)))
    }

    fn step(&self, current: Decimal) -> Option<Decimal> {
        let mut rng = self.rng.lock();
        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            return None;
        }

        let bound = self.volatility_bps as i64;
        let bps = if bound == 0 { 0 } else { rng.gen_range(-bound..=bound) };
        let factor = Decimal::ONE + Decimal::new(bps, 4);
        let next = (current * factor).round_dp(12);
        Some(if next > Decimal::ZERO { next } else { current })
    }
}

#[async_trait]
impl QuoteProvider for RandomWalkProvider {
    fn name(&self) -> &str {
        "random-walk"
    }

    async fn quote(&self, symbol: &Symbol) -> RateResult<Quote> {
        let failure = |message: &str| RateError::Provider {
            provider: self.name().to_string(),
            symbol: symbol.clone(),
            message: message.to_string(),
        };

        let current = self
            .prices
            .lock()
            .get(symbol)
            .copied()
            .ok_or_else(|| failure("symbol not simulated"))?;
        let next = self.step(current).ok_or_else(|| failure("injected failure"))?;
        self.prices.lock().insert(symbol.clone(), next);

        Ok(Quote::new(symbol.clone(), next, Utc::now(), self.name()))
    }
}
