//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PIZZAPP_HASHING_SECRET` - keyed-digest secret for stored passwords
//!
//! ## Optional
//! - `PIZZAPP_HOST` - bind address (default: 127.0.0.1)
//! - `PIZZAPP_PORT` - listen port (default: 3000)
//! - `PIZZAPP_DATA_DIR` - record store root (default: .data)
//!
//! ## Payment provider (section present iff `PAYMENT_API_KEY` is set)
//! - `PAYMENT_API_KEY` - provider secret key
//! - `PAYMENT_BASE_URL` - API root (default: https://api.stripe.com)
//! - `PAYMENT_SOURCE_TOKEN` - card source token (default: tok_visa)
//!
//! ## Email provider (section present iff `EMAIL_API_KEY` is set)
//! - `EMAIL_API_KEY` - provider API key
//! - `EMAIL_DOMAIN` - sending domain (required with the key)
//! - `EMAIL_FROM` / `EMAIL_TO` - receipt addresses (required with the key)
//! - `EMAIL_SUBJECT` - receipt subject (default: Your PizzApp receipt)
//! - `EMAIL_BASE_URL` - API root (default: https://api.mailgun.net)
//!
//! When a provider section is absent, order creation cannot opt into the
//! corresponding side effect and persists placeholder payment fields only.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Root directory of the record store.
    pub data_dir: PathBuf,
    /// Secret keying stored password digests.
    pub hashing_secret: SecretString,
    /// Payment provider, when configured.
    pub payment: Option<PaymentConfig>,
    /// Email provider, when configured.
    pub email: Option<EmailConfig>,
}

/// Payment provider configuration (Stripe-shaped REST API).
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub api_key: SecretString,
    /// Card source token attached to new customers.
    pub source_token: String,
}

/// Email provider configuration (Mailgun-shaped REST API).
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub domain: String,
    pub from: String,
    pub to: String,
    pub subject: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if required variables are missing or
    /// unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("PIZZAPP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PIZZAPP_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("PIZZAPP_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PIZZAPP_PORT".to_owned(), e.to_string()))?;
        let data_dir = PathBuf::from(get_env_or_default("PIZZAPP_DATA_DIR", ".data"));
        let hashing_secret = get_required_secret("PIZZAPP_HASHING_SECRET")?;

        Ok(Self {
            host,
            port,
            data_dir,
            hashing_secret,
            payment: PaymentConfig::from_env()?,
            email: EmailConfig::from_env()?,
        })
    }

    /// A fixed configuration for tests: given data dir, no providers.
    #[must_use]
    pub fn for_tests(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            data_dir: data_dir.into(),
            hashing_secret: SecretString::from("test-hashing-secret"),
            payment: None,
            email: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("PAYMENT_API_KEY") else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_env_or_default("PAYMENT_BASE_URL", "https://api.stripe.com"),
            api_key: SecretString::from(api_key),
            source_token: get_env_or_default("PAYMENT_SOURCE_TOKEN", "tok_visa"),
        }))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("EMAIL_API_KEY") else {
            return Ok(None);
        };
        Ok(Some(Self {
            base_url: get_env_or_default("EMAIL_BASE_URL", "https://api.mailgun.net"),
            api_key: SecretString::from(api_key),
            domain: get_required_env("EMAIL_DOMAIN")?,
            from: get_required_env("EMAIL_FROM")?,
            to: get_required_env("EMAIL_TO")?,
            subject: get_env_or_default("EMAIL_SUBJECT", "Your PizzApp receipt"),
        }))
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    Ok(SecretString::from(get_required_env(key)?))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
