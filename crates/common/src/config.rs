//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// How the message write pipeline couples the message insert with the
/// conversation summary update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Message insert and summary update share one transaction.
    #[default]
    Atomic,
    /// Message insert and summary update commit separately; a failed
    /// summary update leaves the committed message in place.
    Independent,
}

impl FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(WriteMode::Atomic),
            "independent" => Ok(WriteMode::Independent),
            other => Err(anyhow::anyhow!(
                "Unknown MESSAGE_WRITE_MODE: {}. Supported modes: atomic, independent",
                other
            )),
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Atomic => write!(f, "atomic"),
            WriteMode::Independent => write!(f, "independent"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,
    pub database_max_connections: u32,

    /// Identity collaborator
    pub identity_provider: String,
    pub identity_url: Option<String>,
    pub identity_app_id: i32,
    pub identity_timeout_secs: u64,

    /// Message pipeline
    pub message_write_mode: WriteMode,

    /// HTTP server
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: String,

    /// Runtime configuration
    pub log_format: String,
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identity_provider = lookup("IDENTITY_PROVIDER").unwrap_or_else(|| "http".to_string());
        let identity_url = lookup("IDENTITY_URL");

        if identity_provider == "http" && identity_url.is_none() {
            return Err(anyhow::anyhow!(
                "IDENTITY_URL is required for the http identity provider"
            ));
        }

        let message_write_mode = match lookup("MESSAGE_WRITE_MODE") {
            Some(mode) => mode.parse()?,
            None => WriteMode::default(),
        };

        let config = Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            identity_provider,
            identity_url,
            identity_app_id: lookup("IDENTITY_APP_ID")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            identity_timeout_secs: lookup("IDENTITY_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),

            message_write_mode,

            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),

            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "parley=debug".to_string()),
        };

        Ok(config)
    }
}
