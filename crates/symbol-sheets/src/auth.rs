//! Google service-account authentication.
//!
//! A signed RS256 assertion is exchanged at the account's token URI for a
//! short-lived bearer token, which is cached until shortly before expiry.

use crate::error::{Result, SheetsError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Environment variable holding the service-account JSON document.
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDS_JSON";

/// OAuth scopes requested for the sheet adapter.
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    #[serde(default)]
    private_key_id: Option<String>,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// The fields of a service-account key file the adapter needs.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key_id: Option<String>,
    private_key: SecretString,
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parses a service-account JSON document.
    ///
    /// # Errors
    /// Returns `Credentials` if the document is not valid service-account JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawServiceAccountKey = serde_json::from_str(json).map_err(|e| {
            SheetsError::Credentials(format!("{CREDENTIALS_ENV} is not valid JSON: {e}"))
        })?;
        Ok(Self {
            client_email: raw.client_email,
            private_key_id: raw.private_key_id,
            private_key: SecretString::from(raw.private_key),
            token_uri: raw.token_uri,
        })
    }

    /// Reads the key from `GOOGLE_CREDS_JSON`.
    ///
    /// # Errors
    /// Returns `Credentials` if the variable is missing or unparsable.
    pub fn from_env() -> Result<Self> {
        let json = std::env::var(CREDENTIALS_ENV).map_err(|_| {
            SheetsError::Credentials(format!(
                "missing {CREDENTIALS_ENV} env var containing service account JSON"
            ))
        })?;
        Self::from_json(&json)
    }

    /// Overrides the token endpoint (useful for testing).
    #[must_use]
    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }

    /// Builds the signed assertion for the token exchange.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private_key is not an RSA PEM: {e}")))?;

        Ok(encode(&header, &claims, &key)?)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Hands out bearer tokens for a service account, refreshing as needed.
pub struct TokenProvider {
    key: ServiceAccountKey,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    #[must_use]
    pub fn new(key: ServiceAccountKey, http: Client) -> Self {
        Self {
            key,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, exchanging a fresh assertion when the
    /// cached one is missing or about to expire.
    ///
    /// # Errors
    /// Returns `Authentication` if the token endpoint refuses the assertion.
    pub async fn token(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(entry) = cached.as_ref() {
            if entry.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(entry.token.clone());
            }
        }

        debug!(account = %self.key.client_email, "Requesting service account token");
        let assertion = self.key.assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() {
                SheetsError::Authentication(format!("token exchange failed ({status}): {text}"))
            } else {
                SheetsError::api(status.as_u16(), text)
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = SecretString::from(body.access_token);
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: now + Duration::seconds(body.expires_in),
        });
        Ok(token)
    }
}
