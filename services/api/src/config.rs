//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use study_planner_core::form::FeasibilityPolicy;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Optional at load time; its absence fails each generation request
    /// instead of startup, so the rest of the portal stays reachable.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    /// Deadline applied to each outbound call of a generation attempt.
    pub upstream_timeout: Duration,
    pub feasibility_policy: FeasibilityPolicy,
    pub cors_origin: String,
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

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Generation Backend Settings ---
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());

        let timeout_str =
            std::env::var("UPSTREAM_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let upstream_timeout = timeout_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "UPSTREAM_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a number of seconds", timeout_str),
                )
            })?;

        let feasibility_policy = match std::env::var("FEASIBILITY_POLICY") {
            Ok(raw) => raw.parse::<FeasibilityPolicy>().map_err(|e| {
                ConfigError::InvalidValue("FEASIBILITY_POLICY".to_string(), e.to_string())
            })?,
            Err(_) => FeasibilityPolicy::default(),
        };

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            log_level,
            gemini_api_key,
            gemini_base_url,
            upstream_timeout,
            feasibility_policy,
            cors_origin,
        })
    }
}
