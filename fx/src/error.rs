//! Rate engine error types.

use satrate_common::{CommonError, Symbol};
use thiserror::Error;

/// Errors raised by the collaborators around the pure rate core.
///
/// Interpolation and cross-rate computation never fail; an unavailable
/// estimate is `None` and a point that cannot be computed is omitted.
#[derive(Debug, Error)]
pub enum RateError {
    /// Symbol is not tracked by this service.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(Symbol),

    /// The store failed to answer a query or accept a sample.
    #[error("Price store error: {0}")]
    Store(String),

    /// The quote provider failed to return a price.
    #[error("Quote provider {provider} failed for {symbol}: {message}")]
    Provider {
        provider: String,
        symbol: Symbol,
        message: String,
    },

    /// The quote was returned but cannot be turned into a sample.
    #[error("Quote rejected for {symbol}: {reason}")]
    QuoteRejected { symbol: Symbol, reason: String },

    /// Query parameters are inconsistent.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Shared type construction failed.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl RateError {
    /// Check if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RateError::Store(_) | RateError::Provider { .. })
    }

    /// Get error code for log fields and upstream responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            RateError::Store(_) => "STORE_ERROR",
            RateError::Provider { .. } => "PROVIDER_ERROR",
            RateError::QuoteRejected { .. } => "QUOTE_REJECTED",
            RateError::InvalidQuery(_) => "INVALID_QUERY",
            RateError::Common(e) => e.error_code(),
        }
    }
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;
