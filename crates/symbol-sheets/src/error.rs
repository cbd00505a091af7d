//! Error types for the list sources.

use notional_deploy_core::ServiceError;
use thiserror::Error;

/// Errors raised by the Sheets and file sources.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Service-account JSON missing or unusable.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Token exchange refused or access denied (HTTP 401/403).
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Spreadsheet, worksheet or file not found.
    #[error("not found: {0}")]
    NotFound(String),

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

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Local file error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetsError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SheetsError {
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

impl From<serde_json::Error> for SheetsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for SheetsError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::Serialization(message),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for SheetsError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Credentials(format!("failed to sign token request: {err}"))
    }
}

impl From<SheetsError> for ServiceError {
    fn from(err: SheetsError) -> Self {
        match err {
            SheetsError::Credentials(msg) => Self::Configuration(msg),
            SheetsError::Authentication(msg) => Self::Unauthorized(msg),
            SheetsError::NotFound(msg) => Self::NotFound(msg),
            SheetsError::Api {
                status_code,
                message,
            } => Self::Api {
                status_code,
                message,
            },
            SheetsError::RateLimit { retry_after_secs } => Self::RateLimit { retry_after_secs },
            SheetsError::Network(msg) => Self::Network(msg),
            SheetsError::Timeout(msg) => Self::Timeout(msg),
            SheetsError::Serialization(msg) => Self::Serialization(msg),
            SheetsError::Configuration(msg) => Self::Configuration(msg),
            SheetsError::Io(err) => Self::Io(err.to_string()),
        }
    }
}

/// Result type alias for list-source operations.
pub type Result<T> = std::result::Result<T, SheetsError>;
