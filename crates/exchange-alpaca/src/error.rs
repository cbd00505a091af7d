//! Error types for the Alpaca adapter.

use notional_deploy_core::ServiceError;
use thiserror::Error;

/// Errors that can occur when talking to Alpaca.
#[derive(Debug, Error)]
pub enum AlpacaError {
    /// Credentials missing or rejected.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Resource does not exist (unknown order, no position, unknown symbol).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request refused by validation (HTTP 422) or a business rule (HTTP 403 on orders).
    #[error("order rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the API.
        message: String,
    },

    /// The client order id was already used for an accepted order.
    #[error("duplicate client order id: {0}")]
    DuplicateClientOrderId(String),

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Symbol or identifier unfit for a URL path.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AlpacaError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the request may succeed when repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AlpacaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AlpacaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<AlpacaError> for ServiceError {
    fn from(err: AlpacaError) -> Self {
        match err {
            AlpacaError::Authentication(msg) => Self::Unauthorized(msg),
            AlpacaError::NotFound(msg) => Self::NotFound(msg),
            AlpacaError::Rejected { status, message } => Self::Rejected { status, message },
            AlpacaError::DuplicateClientOrderId(id) => Self::DuplicateClientOrderId(id),
            AlpacaError::Api {
                status_code,
                message,
            } => Self::Api {
                status_code,
                message,
            },
            AlpacaError::RateLimit { retry_after_secs } => Self::RateLimit { retry_after_secs },
            AlpacaError::Network(msg) => Self::Network(msg),
            AlpacaError::Timeout(msg) => Self::Timeout(msg),
            AlpacaError::InvalidIdentifier(msg) => Self::rejected(400, msg),
            AlpacaError::Serialization(msg) => Self::Serialization(msg),
            AlpacaError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}

/// Result type alias for Alpaca operations.
pub type Result<T> = std::result::Result<T, AlpacaError>;
