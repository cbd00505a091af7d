//! Alpaca REST client with rate limiting.
//!
//! One client serves both the trading API (account, orders, positions) and
//! the market data API (snapshots). Every request waits on a shared
//! `governor` limiter before it is sent.

use crate::auth::{AlpacaAuthConfig, AlpacaCredentials};
use crate::error::{AlpacaError, Result};
use crate::types::{RawApiError, RawOrder};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use notional_deploy_core::{BrokerConfig, ALPACA_DATA_URL, ALPACA_PAPER_URL};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Alpaca client.
#[derive(Debug, Clone)]
pub struct AlpacaClientConfig {
    /// Trading API base URL.
    pub base_url: String,

    /// Market data API base URL.
    pub data_url: String,

    /// Market data feed passed as `feed=` on snapshot requests.
    pub data_feed: Option<String>,

    /// Requests per minute limit, shared by both APIs.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AlpacaClientConfig {
    fn default() -> Self {
        Self {
            base_url: ALPACA_PAPER_URL.to_string(),
            data_url: ALPACA_DATA_URL.to_string(),
            data_feed: Some("iex".to_string()),
            requests_per_minute: nonzero!(200u32),
            timeout_secs: 30,
        }
    }
}

impl AlpacaClientConfig {
    /// Builds the client configuration from the deployer's broker section.
    #[must_use]
    pub fn from_broker_config(broker: &BrokerConfig) -> Self {
        Self {
            base_url: broker.base_url.clone(),
            data_url: broker.data_url.clone(),
            requests_per_minute: NonZeroU32::new(broker.requests_per_minute)
                .unwrap_or(nonzero!(200u32)),
            timeout_secs: broker.timeout_secs,
            ..Self::default()
        }
    }

    /// Points both APIs at one URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.clone();
        self.data_url = url;
        self
    }

    /// Sets the market data feed.
    #[must_use]
    pub fn with_data_feed(mut self, feed: Option<String>) -> Self {
        self.data_feed = feed;
        self
    }

}

// =============================================================================
// AlpacaClient
// =============================================================================

/// Alpaca REST API client.
pub struct AlpacaClient {
    config: AlpacaClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
    credentials: AlpacaCredentials,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("base_url", &self.config.base_url)
            .field("data_url", &self.config.data_url)
            .field("key", &self.credentials.masked_key())
            .finish_non_exhaustive()
    }
}

impl AlpacaClient {
    /// Creates a client with explicit credentials.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: AlpacaClientConfig, credentials: AlpacaCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AlpacaError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
            credentials,
        })
    }

    /// Creates a client with credentials read from the environment.
    ///
    /// Refuses non-https trading URLs and warns on key/environment mismatch.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the base URL is not https.
    pub fn from_env(config: AlpacaClientConfig) -> Result<Self> {
        if !config.base_url.starts_with("https://") {
            return Err(AlpacaError::Configuration(format!(
                "ALPACA_BASE_URL looks wrong: '{}'",
                config.base_url
            )));
        }
        let credentials = AlpacaCredentials::from_env(&AlpacaAuthConfig::default())?;
        credentials.check_key_prefix(&config.base_url);
        Self::new(config, credentials)
    }

    /// Returns the trading API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Key id suffix, safe for logs.
    #[must_use]
    pub fn masked_key(&self) -> String {
        self.credentials.masked_key()
    }

    /// Validates a symbol before it is placed in a URL path.
    ///
    /// Accepts ASCII letters, digits, `.`, `-` and `/` (share classes and
    /// crypto pairs), at most 16 characters.
    pub(crate) fn validate_symbol(symbol: &str) -> Result<&str> {
        if symbol.is_empty() || symbol.len() > 16 || symbol.contains("..") {
            return Err(AlpacaError::InvalidIdentifier(format!("symbol: {symbol:?}")));
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/'))
        {
            return Err(AlpacaError::InvalidIdentifier(format!("symbol: {symbol:?}")));
        }
        Ok(symbol)
    }

    /// Validates an order id or client order id.
    pub(crate) fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty() || id.len() > 128 || id.contains("..") {
            return Err(AlpacaError::InvalidIdentifier(format!("id: {id:?}")));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(AlpacaError::InvalidIdentifier(format!("id: {id:?}")));
        }
        Ok(id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let [(key_header, key), (secret_header, secret)] = self.credentials.headers();
        request
            .header("Accept", "application/json")
            .header(key_header, key)
            .header(secret_header, secret)
    }

    /// Waits for the rate limiter and makes a GET request on the trading API.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        self.get_url(&url).await
    }

    /// GET on the trading API with percent-encoded query parameters.
    pub(crate) async fn get_with_query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("GET {} query={:?}", url, query);

        let response = self
            .authorize(self.http.get(&url).query(query))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Waits for the rate limiter and makes a GET request on the data API.
    pub(crate) async fn get_data<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut url = format!("{}{}", self.config.data_url, path);
        if let Some(feed) = &self.config.data_feed {
            url.push_str(if url.contains('?') { "&" } else { "?" });
            url.push_str("feed=");
            url.push_str(feed);
        }
        self.get_url(&url).await
    }

    async fn get_url<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;
        tracing::debug!("GET {}", url);

        let response = self.authorize(self.http.get(url)).send().await?;
        Self::handle_response(response).await
    }

    /// Waits for the rate limiter and makes a POST request on the trading API.
    pub(crate) async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        let body_json = serde_json::to_string(body)?;

        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .authorize(self.http.post(&url))
            .header("Content-Type", "application/json")
            .body(body_json)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Converts non-success responses into typed errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AlpacaError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(status, &text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    fn classify_error(status: StatusCode, body: &str) -> AlpacaError {
        let message = serde_json::from_str::<RawApiError>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.to_string());

        match status {
            StatusCode::UNAUTHORIZED => AlpacaError::Authentication(message),
            // Alpaca answers 403 both for bad keys and for refused orders
            // (e.g. insufficient buying power); only the former mentions the request itself.
            StatusCode::FORBIDDEN if message.to_lowercase().contains("forbidden") => {
                AlpacaError::Authentication(message)
            }
            StatusCode::FORBIDDEN => AlpacaError::Rejected {
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => AlpacaError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY
                if message.to_lowercase().contains("client_order_id must be unique") =>
            {
                AlpacaError::DuplicateClientOrderId(message)
            }
            StatusCode::UNPROCESSABLE_ENTITY => AlpacaError::Rejected {
                status: status.as_u16(),
                message,
            },
            _ => AlpacaError::api(status.as_u16(), message),
        }
    }

    /// Fetches one order by broker id.
    pub(crate) async fn get_order(&self, order_id: &str) -> Result<RawOrder> {
        let order_id = Self::validate_identifier(order_id)?;
        self.get(&format!("/v2/orders/{order_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn config_default_is_paper() {
        let config = AlpacaClientConfig::default();
        assert_eq!(config.base_url, ALPACA_PAPER_URL);
        assert_eq!(config.requests_per_minute.get(), 200);
        assert_eq!(config.data_feed.as_deref(), Some("iex"));
    }

    #[test]
    fn config_from_broker_section() {
        let broker = BrokerConfig {
            base_url: "https://api.alpaca.markets".to_string(),
            requests_per_minute: 0,
            ..BrokerConfig::default()
        };
        let config = AlpacaClientConfig::from_broker_config(&broker);
        assert_eq!(config.base_url, "https://api.alpaca.markets");
        assert_eq!(config.data_url, ALPACA_DATA_URL);
        // Zero falls back to the default quota.
        assert_eq!(config.requests_per_minute.get(), 200);
    }

    #[test]
    fn from_env_refuses_plain_http() {
        let config = AlpacaClientConfig::default().with_base_url("http://paper-api.alpaca.markets");
        let err = AlpacaClient::from_env(config).unwrap_err();
        assert!(matches!(err, AlpacaError::Configuration(_)));
    }

    #[test]
    fn debug_hides_secret() {
        let creds =
            AlpacaCredentials::new("PKDEBUG1234", SecretString::from("topsecret".to_string()))
                .unwrap();
        let client = AlpacaClient::new(AlpacaClientConfig::default(), creds).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("…1234"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn validate_symbol_accepts_share_classes_and_pairs() {
        assert!(AlpacaClient::validate_symbol("AAPL").is_ok());
        assert!(AlpacaClient::validate_symbol("BRK.B").is_ok());
        assert!(AlpacaClient::validate_symbol("BTC/USD").is_ok());
    }

    #[test]
    fn validate_symbol_rejects_path_tricks() {
        assert!(AlpacaClient::validate_symbol("").is_err());
        assert!(AlpacaClient::validate_symbol("../v2/account").is_err());
        assert!(AlpacaClient::validate_symbol("AAPL?x=1").is_err());
        assert!(AlpacaClient::validate_symbol("A B").is_err());
        assert!(AlpacaClient::validate_symbol(&"A".repeat(17)).is_err());
    }

    #[test]
    fn validate_identifier_rules() {
        assert!(AlpacaClient::validate_identifier("61e69015-8549-4bfd-b9c3-01e75843f47d").is_ok());
        assert!(AlpacaClient::validate_identifier("AAPL-1760900000000").is_ok());
        assert!(AlpacaClient::validate_identifier("a/b").is_err());
        assert!(AlpacaClient::validate_identifier("").is_err());
    }

    #[test]
    fn classify_error_cases() {
        let err = AlpacaClient::classify_error(StatusCode::UNAUTHORIZED, r#"{"message":"unauthorized."}"#);
        assert!(matches!(err, AlpacaError::Authentication(_)));

        let err = AlpacaClient::classify_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"code":40010001,"message":"client_order_id must be unique"}"#,
        );
        assert!(matches!(err, AlpacaError::DuplicateClientOrderId(_)));

        let err = AlpacaClient::classify_error(
            StatusCode::FORBIDDEN,
            r#"{"code":40310000,"message":"insufficient buying power"}"#,
        );
        assert!(matches!(err, AlpacaError::Rejected { status: 403, .. }));

        let err = AlpacaClient::classify_error(StatusCode::FORBIDDEN, "Forbidden");
        assert!(matches!(err, AlpacaError::Authentication(_)));

        let err = AlpacaClient::classify_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.is_transient());
    }
}
