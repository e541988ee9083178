//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables once at startup and then
//! handed to the components that need it. The `.env` file is used for local
//! development.

use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials and endpoint of the outbound mail relay.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service in mock mode against an in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    /// Base URL embedded in clock-in links.
    pub base_url: String,
    /// `None` logs notifications instead of sending them.
    pub mail: Option<MailConfig>,
    pub default_share_percent: Decimal,
}

const DEFAULT_MAIL_FROM: &str = "PAS Tutors <no-reply@pastutors.local>";

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

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server and Store Settings ---
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

        // --- Link Generation ---
        let base_url = var("BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "BASE_URL".to_string(),
                format!("'{}' must start with http:// or https://", base_url),
            ));
        }

        // --- Mail Relay (optional) ---
        let mail = var("MAIL_API_URL").map(|api_url| MailConfig {
            api_url,
            api_key: var("MAIL_API_KEY"),
            from: var("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
        });

        // --- Payroll ---
        let share_str = var("TEACHER_SHARE_PERCENT").unwrap_or_else(|| "70".to_string());
        let default_share_percent = Decimal::from_str(share_str.trim())
            .ok()
            .filter(|share| *share >= Decimal::ZERO && *share <= Decimal::ONE_HUNDRED)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TEACHER_SHARE_PERCENT".to_string(),
                    format!("'{}' is not a percentage between 0 and 100", share_str),
                )
            })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            base_url,
            mail,
            default_share_percent,
        })
    }
}
