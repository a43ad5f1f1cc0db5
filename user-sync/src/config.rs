//! Configuration module for environment variable parsing.
//!
//! Everything has a default except the webhook signing secret, which must be
//! present at startup.

use std::env;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::warn;

/// Prefix carried by Svix signing secrets.
const SECRET_PREFIX: &str = "whsec_";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SIGNING_SECRET is not set")]
    MissingSigningSecret,

    #[error("SIGNING_SECRET is not valid base64")]
    InvalidSigningSecret,
}

/// Decoded webhook signing key.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Parse a `whsec_`-prefixed (or bare) base64 secret.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingSigningSecret);
        }

        let encoded = raw.strip_prefix(SECRET_PREFIX).unwrap_or(raw);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| ConfigError::InvalidSigningSecret)?;

        if key.is_empty() {
            return Err(ConfigError::InvalidSigningSecret);
        }

        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key used to verify inbound webhook signatures
    pub signing_secret: SigningSecret,

    /// Accepted clock skew for the `svix-timestamp` header, in seconds
    pub signature_tolerance_secs: u64,

    /// SQLite connection string for the user store
    pub database_url: String,

    /// Upper bound on pooled database connections
    pub database_max_connections: u32,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails if `SIGNING_SECRET` is missing or cannot be decoded.
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = env::var("SIGNING_SECRET")
            .map_err(|_| ConfigError::MissingSigningSecret)
            .and_then(|raw| SigningSecret::parse(&raw))?;

        Ok(Config {
            signing_secret,

            signature_tolerance_secs: parse_or("SIGNATURE_TOLERANCE_SECS", 300),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:users.db".to_string()),

            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),

            port: parse_or("PORT", 3000),
        })
    }
}

/// Parse a numeric variable, falling back to `default` when absent or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}
