//! Currency symbols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, Result};

/// Longest accepted currency symbol.
pub const MAX_SYMBOL_LEN: usize = 10;

/// Ticker of a tracked currency, crypto or fiat (`BTC`, `USD`, `ETH`).
///
/// Always stored upper-cased so `usd` and `USD` name the same series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol.
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref().trim();
        if code.is_empty()
            || code.len() > MAX_SYMBOL_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(CommonError::InvalidSymbol(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the symbol code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The pivot currency.
    pub fn btc() -> Self {
        Self("BTC".to_string())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn eth() -> Self {
        Self("ETH".to_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = CommonError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// Parse a comma separated symbol list such as `"usd, eur,ETH"`.
///
/// Duplicates are dropped, first occurrence order is kept.
pub fn parse_symbol_list(list: &str) -> Result<Vec<Symbol>> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for part in list.split(',').filter(|p| !p.trim().is_empty()) {
        let symbol = Symbol::new(part)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}
