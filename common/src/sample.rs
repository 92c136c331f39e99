//! Price samples denominated in the pivot currency.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

/// Satoshis in one bitcoin. Prices are stored in this unit.
pub const SATOSHIS_PER_BITCOIN: f64 = 100_000_000.0;

/// Price of one unit of a tracked currency in the pivot's smallest unit
/// (satoshis) at a point in time.
///
/// Timestamps are unique within a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasePriceSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    /// Price in satoshis.
    pub price_in_base_units: f64,
}

impl BasePriceSample {
    /// Create a sample without validation.
    pub fn new(timestamp_millis: i64, price_in_base_units: f64) -> Self {
        Self {
            timestamp_millis,
            price_in_base_units,
        }
    }

    /// Create a sample, rejecting negative or non-finite prices.
    pub fn checked(timestamp_millis: i64, price_in_base_units: f64) -> Result<Self> {
        if !price_in_base_units.is_finite() || price_in_base_units < 0.0 {
            return Err(CommonError::InvalidPrice {
                timestamp_millis,
                price: price_in_base_units,
            });
        }
        Ok(Self::new(timestamp_millis, price_in_base_units))
    }
}

/// Ratio of a priced currency to a comparison currency at a timestamp.
///
/// Derived from two [`BasePriceSample`] series, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossRateSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    /// Units of the comparison currency per unit of the priced currency.
    pub ratio: f64,
}

impl CrossRateSample {
    pub fn new(timestamp_millis: i64, ratio: f64) -> Self {
        Self {
            timestamp_millis,
            ratio,
        }
    }
}

/// Sort direction for sample listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Reorder an ascending sequence in place.
    pub fn apply<T>(&self, ascending: &mut [T]) {
        if *self == SortOrder::Descending {
            ascending.reverse();
        }
    }
}
