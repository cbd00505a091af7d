//! API key credentials for Alpaca.
//!
//! Alpaca authenticates every request with two headers carrying the key id
//! and the secret key. Both are read from the environment; the secret is
//! held in a [`SecretString`] and never logged.

use crate::error::{AlpacaError, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// Header carrying the API key id.
pub const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";

/// Header carrying the API secret key.
pub const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

/// Environment variable names for the credentials.
#[derive(Debug, Clone)]
pub struct AlpacaAuthConfig {
    pub api_key_env: String,
    pub secret_key_env: String,
}

impl Default for AlpacaAuthConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ALPACA_API_KEY".to_string(),
            secret_key_env: "ALPACA_SECRET_KEY".to_string(),
        }
    }
}

impl AlpacaAuthConfig {
    /// Sets custom environment variable names.
    #[must_use]
    pub fn with_env_vars(
        mut self,
        api_key_env: impl Into<String>,
        secret_key_env: impl Into<String>,
    ) -> Self {
        self.api_key_env = api_key_env.into();
        self.secret_key_env = secret_key_env.into();
        self
    }
}

/// Alpaca key pair.
pub struct AlpacaCredentials {
    key_id: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for AlpacaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaCredentials")
            .field("key_id", &self.masked_key())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl AlpacaCredentials {
    /// Creates credentials from already-loaded values.
    ///
    /// # Errors
    /// Returns error if either value is blank after trimming.
    pub fn new(key_id: impl Into<String>, secret_key: SecretString) -> Result<Self> {
        let key_id = key_id.into().trim().to_string();
        let secret = secret_key.expose_secret().trim().to_string();
        if key_id.is_empty() || secret.is_empty() {
            return Err(AlpacaError::Configuration(
                "missing Alpaca API key or secret key".to_string(),
            ));
        }
        Ok(Self {
            key_id,
            secret_key: SecretString::from(secret),
        })
    }

    /// Loads credentials from the environment.
    ///
    /// # Errors
    /// Returns error if either variable is unset or blank.
    pub fn from_env(config: &AlpacaAuthConfig) -> Result<Self> {
        let key_id = std::env::var(&config.api_key_env).unwrap_or_default();
        let secret = std::env::var(&config.secret_key_env).unwrap_or_default();
        if key_id.trim().is_empty() || secret.trim().is_empty() {
            return Err(AlpacaError::Configuration(format!(
                "missing {} or {}",
                config.api_key_env, config.secret_key_env
            )));
        }
        Self::new(key_id, SecretString::from(secret))
    }

    /// Key id reduced to its last four characters, safe for logs.
    #[must_use]
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.key_id.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("…{tail}")
    }

    /// Warns when the key prefix does not match the environment the base URL points at.
    ///
    /// Paper keys start with `PK`, live keys with `AK`. A mismatch is not fatal;
    /// the account call will reject bad keys anyway.
    pub fn check_key_prefix(&self, base_url: &str) -> Option<String> {
        let prefix: String = self.key_id.chars().take(2).collect::<String>().to_uppercase();
        let message = if base_url.contains("paper-api.alpaca.markets") {
            (prefix != "PK").then(|| format!("key prefix '{prefix}' may not match paper API"))
        } else if base_url.contains("api.alpaca.markets") {
            (prefix != "AK").then(|| format!("key prefix '{prefix}' may not match live API"))
        } else {
            None
        };
        if let Some(msg) = &message {
            warn!(base_url, "{msg}");
        }
        message
    }

    pub(crate) fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (KEY_ID_HEADER, self.key_id.as_str()),
            (SECRET_KEY_HEADER, self.secret_key.expose_secret()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(key: &str) -> AlpacaCredentials {
        AlpacaCredentials::new(key, SecretString::from("s3cr3t".to_string())).unwrap()
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", creds("PKTEST1234"));
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("PKTEST"));
    }

    #[test]
    fn masked_key_shows_last_four() {
        assert_eq!(creds("PKABCDWXYZ").masked_key(), "…WXYZ");
        assert_eq!(creds("AB").masked_key(), "…AB");
    }

    #[test]
    fn blank_values_are_rejected() {
        let result = AlpacaCredentials::new("  ", SecretString::from("x".to_string()));
        assert!(result.is_err());
        let result = AlpacaCredentials::new("PK1", SecretString::from("  ".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn values_are_trimmed() {
        let creds = AlpacaCredentials::new(" PK1234 ", SecretString::from(" abc \n".to_string()))
            .unwrap();
        let headers = creds.headers();
        assert_eq!(headers[0], (KEY_ID_HEADER, "PK1234"));
        assert_eq!(headers[1], (SECRET_KEY_HEADER, "abc"));
    }

    #[test]
    fn from_env_missing_key() {
        let config = AlpacaAuthConfig::default()
            .with_env_vars("TEST_ALPACA_MISSING_KEY", "TEST_ALPACA_MISSING_SECRET");
        std::env::remove_var("TEST_ALPACA_MISSING_KEY");
        let err = AlpacaCredentials::from_env(&config).unwrap_err();
        assert!(err.to_string().contains("TEST_ALPACA_MISSING_KEY"));
    }

    #[test]
    fn from_env_reads_both_values() {
        let config = AlpacaAuthConfig::default()
            .with_env_vars("TEST_ALPACA_PRESENT_KEY", "TEST_ALPACA_PRESENT_SECRET");
        std::env::set_var("TEST_ALPACA_PRESENT_KEY", "PKPRESENT99");
        std::env::set_var("TEST_ALPACA_PRESENT_SECRET", "hidden");
        let creds = AlpacaCredentials::from_env(&config).unwrap();
        assert_eq!(creds.masked_key(), "…NT99");
    }

    #[test]
    fn key_prefix_warnings() {
        assert!(creds("PK123")
            .check_key_prefix("https://paper-api.alpaca.markets")
            .is_none());
        assert!(creds("AK123")
            .check_key_prefix("https://paper-api.alpaca.markets")
            .is_some());
        assert!(creds("AK123")
            .check_key_prefix("https://api.alpaca.markets")
            .is_none());
        assert!(creds("PK123")
            .check_key_prefix("https://api.alpaca.markets")
            .is_some());
        assert!(creds("XX123").check_key_prefix("http://127.0.0.1:9000").is_none());
    }
}
