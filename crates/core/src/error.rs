//! Error taxonomy shared by every external collaborator.
//!
//! Adapters (broker, price service, list source) map their transport
//! errors into [`ServiceError`] so the engine can classify failures
//! without knowing which client produced them.

use thiserror::Error;

/// Errors surfaced by broker, price and list-source collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Credentials were rejected (HTTP 401/403) or are missing.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was understood but refused (HTTP 422 and friends).
    #[error("rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the service.
        message: String,
    },

    /// An order with the same client order id was already accepted.
    #[error("duplicate client order id: {0}")]
    DuplicateClientOrderId(String),

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

    /// Any other non-success HTTP response.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from API.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration or credential error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rejection error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the same request may succeed when repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Returns true for credential and authentication failures.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result type alias for collaborator calls.
pub type Result<T> = std::result::Result<T, ServiceError>;
