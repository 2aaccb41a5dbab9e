//! services/mock_api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use quiz_pipeline_core::generator::DEFAULT_QUESTIONS_PER_TOPIC;
use quiz_pipeline_core::SequenceKind;
use tracing::Level;

pub const DEFAULT_PORT: u16 = 3001;

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
    /// Base used to build `uploadUrl` and the session `url`.
    pub public_url: String,
    pub state_sequence: SequenceKind,
    pub questions_per_topic: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            log_level: Level::INFO,
            public_url: format!("http://localhost:{DEFAULT_PORT}"),
            state_sequence: SequenceKind::Simple,
            questions_per_topic: DEFAULT_QUESTIONS_PER_TOPIC,
        }
    }
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

        // --- Server Settings ---
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| {
                ConfigError::InvalidValue("PORT".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_PORT,
        };
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let ip = host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue("HOST".to_string(), e.to_string()))?;
        let bind_address = SocketAddr::new(ip, port);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let public_url = std::env::var("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        // --- Simulation Settings ---
        let state_sequence = match std::env::var("STATE_SEQUENCE") {
            Ok(raw) => raw.parse::<SequenceKind>().map_err(|e| {
                ConfigError::InvalidValue("STATE_SEQUENCE".to_string(), e.to_string())
            })?,
            Err(_) => SequenceKind::default(),
        };

        let questions_per_topic = match std::env::var("QUESTIONS_PER_TOPIC") {
            Ok(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("QUESTIONS_PER_TOPIC".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_QUESTIONS_PER_TOPIC,
        };

        Ok(Self {
            bind_address,
            log_level,
            public_url,
            state_sequence,
            questions_per_topic,
        })
    }
}
