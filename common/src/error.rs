//! Error types for shared satrate types.

use thiserror::Error;

/// Errors raised while constructing common types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    /// Symbol is empty, too long, or contains non-alphanumeric characters.
    #[error("Invalid currency symbol: {0:?}")]
    InvalidSymbol(String),

    /// Sample price is negative or not a finite number.
    #[error("Invalid price {price} at {timestamp_millis}")]
    InvalidPrice { timestamp_millis: i64, price: f64 },

    /// Timestamp outside the range chrono can represent.
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

impl CommonError {
    /// Get error code for log fields and upstream responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommonError::InvalidSymbol(_) => "INVALID_SYMBOL",
            CommonError::InvalidPrice { .. } => "INVALID_PRICE",
            CommonError::TimestampOutOfRange(_) => "TIMESTAMP_OUT_OF_RANGE",
        }
    }
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;
