/// Domain-specific error types for the pricing service.
/// No component swallows a lower-layer failure into a generic one; every
/// variant carries the context (ticker, date window, field) needed to
/// diagnose a failed request without re-running it.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("market data unavailable for {ticker} [{window}]: {reason}")]
    DataUnavailable {
        ticker: String,
        window: String,
        reason: String,
    },

    #[error("snapshot corrupt at {key}: {reason}")]
    DataCorrupt { key: String, reason: String },

    #[error("insufficient data for {ticker}: {observed} return observations, need at least {required}")]
    InsufficientData {
        ticker: String,
        observed: usize,
        required: usize,
    },

    #[error("risk-free rate unavailable for {symbol} [{window}]: {reason}")]
    RateUnavailable {
        symbol: String,
        window: String,
        reason: String,
    },

    #[error("invalid parameter {field}: {reason}")]
    InvalidParameters { field: &'static str, reason: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type PricingResult<T> = Result<T, PricingError>;
