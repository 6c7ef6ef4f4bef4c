//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use book_scanner_core::GateConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

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
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub open_library_url: String,
    pub google_books_url: String,
    pub gate: GateConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address: SocketAddr = parse_or(&var, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Load Catalog Endpoints ---
        let open_library_url = var("OPEN_LIBRARY_URL")
            .unwrap_or_else(|| "https://openlibrary.org".to_string())
            .trim_end_matches('/')
            .to_string();
        let google_books_url = var("GOOGLE_BOOKS_URL")
            .unwrap_or_else(|| "https://www.googleapis.com".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Load Scan Gate Timings ---
        let defaults = GateConfig::default();
        let gate = GateConfig {
            global_rate: millis_or(&var, "SCAN_GLOBAL_RATE_MS", defaults.global_rate)?,
            dedup_window: millis_or(&var, "SCAN_DEDUP_WINDOW_MS", defaults.dedup_window)?,
            post_accept_lock: millis_or(&var, "SCAN_POST_ACCEPT_LOCK_MS", defaults.post_accept_lock)?,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            open_library_url,
            google_books_url,
            gate,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn millis_or<F>(var: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: u64 = parse_or(var, key, &default.as_millis().to_string())?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/books")]).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.open_library_url, "https://openlibrary.org");
        assert_eq!(config.google_books_url, "https://www.googleapis.com");
        assert_eq!(config.gate, GateConfig::default());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn gate_timings_are_read_in_milliseconds() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("SCAN_GLOBAL_RATE_MS", "400"),
            ("SCAN_DEDUP_WINDOW_MS", "6000"),
            ("SCAN_POST_ACCEPT_LOCK_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.gate.global_rate, Duration::from_millis(400));
        assert_eq!(config.gate.dedup_window, Duration::from_millis(6000));
        assert_eq!(config.gate.post_accept_lock, Duration::ZERO);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("SCAN_DEDUP_WINDOW_MS", "eight seconds"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "SCAN_DEDUP_WINDOW_MS"));

        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("BIND_ADDRESS", "localhost"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BIND_ADDRESS"));
    }

    #[test]
    fn catalog_urls_lose_trailing_slashes() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("OPEN_LIBRARY_URL", "http://127.0.0.1:9000/"),
        ])
        .unwrap();
        assert_eq!(config.open_library_url, "http://127.0.0.1:9000");
    }
}
