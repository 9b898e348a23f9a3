//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PAWMART_API_URL` - Base URL of the pet-store backend API
//!
//! ## Optional
//! - `PAWMART_DATA_DIR` - Directory for the durable cart slot, session flag,
//!   and stored auth token (default: `.pawmart`)
//! - `PAWMART_AUTH_POLL_SECS` - Session flag poll interval in seconds (default: 2)
//! - `PAWMART_HTTP_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 30)

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API (trailing slash significant for joins).
    pub api_url: Url,
    /// Directory holding the client's durable state.
    pub data_dir: PathBuf,
    /// Interval for the session flag polling safety net, consumed by
    /// long-lived processes that call
    /// [`SessionProvider::spawn_flag_poll`](crate::session::SessionProvider::spawn_flag_poll).
    pub auth_poll_interval: Duration,
    /// HTTP request timeout (the cart manager itself enforces no timeouts).
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("PAWMART_API_URL")?)?;
        let data_dir = PathBuf::from(get_env_or_default("PAWMART_DATA_DIR", ".pawmart"));
        let auth_poll_interval =
            Duration::from_secs(get_env_seconds("PAWMART_AUTH_POLL_SECS", 2)?);
        let http_timeout = Duration::from_secs(get_env_seconds("PAWMART_HTTP_TIMEOUT_SECS", 30)?);

        Ok(Self {
            api_url,
            data_dir,
            auth_poll_interval,
            http_timeout,
        })
    }

    /// Path of the durable cart slot (the single keyed storage slot).
    #[must_use]
    pub fn cart_store_path(&self) -> PathBuf {
        self.data_dir.join("cart_items.json")
    }

    /// Path of the shared "is authenticated" flag slot.
    #[must_use]
    pub fn session_flag_path(&self) -> PathBuf {
        self.data_dir.join("is_authenticated")
    }

    /// Path of the stored auth token.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token")
    }
}

/// Parse and normalize the API base URL.
///
/// A trailing slash is appended if missing so that `Url::join` keeps the
/// final path segment.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar("PAWMART_API_URL".to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed as a number of seconds.
fn get_env_seconds(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl ClientConfig {
    /// Build a configuration directly, for tests and embedding.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not a valid URL.
    pub fn new(api_url: &str, data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            data_dir: data_dir.as_ref().to_path_buf(),
            auth_poll_interval: Duration::from_secs(2),
            http_timeout: Duration::from_secs(30),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_gains_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/api", "/tmp/pawmart").unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/api/");

        // Joins keep the api path segment
        let joined = config.api_url.join("cart/").unwrap();
        assert_eq!(joined.as_str(), "http://localhost:8000/api/cart/");
    }

    #[test]
    fn test_api_url_trailing_slash_untouched() {
        let config = ClientConfig::new("http://localhost:8000/api/", "/tmp/pawmart").unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(ClientConfig::new("not a url", "/tmp/pawmart").is_err());
    }

    #[test]
    fn test_data_dir_paths() {
        let config = ClientConfig::new("http://localhost:8000/api", "/tmp/pawmart").unwrap();
        assert_eq!(
            config.cart_store_path(),
            PathBuf::from("/tmp/pawmart/cart_items.json")
        );
        assert_eq!(
            config.session_flag_path(),
            PathBuf::from("/tmp/pawmart/is_authenticated")
        );
        assert_eq!(config.token_path(), PathBuf::from("/tmp/pawmart/token"));
    }
}
