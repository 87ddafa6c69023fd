//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_RESEARCH_API_BASE: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub gemini_api_key: String,
    pub research_api_base: String,
    pub research_model: String,
    pub research_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL");

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Auth Settings ---
        let jwt_secret = required("JWT_SECRET")?;
        let ttl_minutes = parse_number(var("ACCESS_TOKEN_EXPIRE_MINUTES"), "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        // Token expiry is an i64 unix timestamp.
        let ttl_secs = ttl_minutes
            .checked_mul(60)
            .filter(|secs| i64::try_from(*secs).is_ok())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                    format!("'{}' minutes is too large", ttl_minutes),
                )
            })?;

        // --- Load Research Adapter Settings ---
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let research_api_base =
            var("RESEARCH_API_BASE").unwrap_or_else(|| DEFAULT_RESEARCH_API_BASE.to_string());
        let research_model =
            var("RESEARCH_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string());
        let timeout_secs = parse_number(var("RESEARCH_TIMEOUT_SECS"), "RESEARCH_TIMEOUT_SECS", 300)?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            access_token_ttl: Duration::from_secs(ttl_secs),
            gemini_api_key,
            research_api_base,
            research_model,
            research_timeout: Duration::from_secs(timeout_secs),
            cors_origins,
        })
    }
}

fn parse_number(value: Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("'{}' is not a positive integer", raw),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("JWT_SECRET", "s3cret"), ("GEMINI_API_KEY", "key")];

    #[test]
    fn applies_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.access_token_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.research_api_base, DEFAULT_RESEARCH_API_BASE);
        assert_eq!(config.research_model, "gemini-2.0-flash");
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
    }

    #[test]
    fn reads_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("DATABASE_URL", "postgres://localhost/research"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "720"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("RUST_LOG", "debug"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/research"));
        assert_eq!(config.access_token_ttl, Duration::from_secs(720 * 60));
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = load(&[("GEMINI_API_KEY", "key")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "JWT_SECRET"));
    }

    #[test]
    fn rejects_bad_numbers_and_addresses() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_EXPIRE_MINUTES", "0"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BIND_ADDRESS", "not-an-address"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));
    }

    #[test]
    fn rejects_token_lifetime_that_overflows() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_EXPIRE_MINUTES", "18446744073709551615"));
        assert!(matches!(
            load(&pairs),
            Err(ConfigError::InvalidValue(ref key, _)) if key == "ACCESS_TOKEN_EXPIRE_MINUTES"
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_EXPIRE_MINUTES", "153722867280912931"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidValue(..))));
    }
}
