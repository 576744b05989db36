//! Configuration module for salespulse
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`SALESPULSE_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use salespulse::config::PulseConfig;
//!
//! let config = PulseConfig::default();
//! assert_eq!(config.server.port, 3001);
//! assert!(!config.gateway.is_configured());
//!
//! let toml = r#"
//! [gateway]
//! base_url = "http://localhost:8080"
//! "#;
//! let config: PulseConfig = toml::from_str(toml).unwrap();
//! assert!(config.gateway.is_configured());
//! ```

pub mod cache;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod server;

pub use cache::CacheConfig;
pub use error::ConfigError;
pub use gateway::GatewayConfig;
pub use logging::{Component, LogFormat, LoggingConfig};
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration: read API server, gateway connection, cache tiers and logging.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PulseConfig {
    /// HTTP read API configuration
    pub server: ServerConfig,
    /// Remote data gateway connection
    pub gateway: GatewayConfig,
    /// Cache coordinator tiers and timeouts
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl PulseConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports SALESPULSE_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("SALESPULSE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("SALESPULSE_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("SALESPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SALESPULSE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(url) = std::env::var("SALESPULSE_GATEWAY_URL") {
            let url = url.trim().to_string();
            self.gateway.base_url = (!url.is_empty()).then_some(url);
        }

        self
    }

    /// Validate configuration
    ///
    /// A missing gateway URL is not an error: it selects demo mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }

        if let Some(url) = self.gateway.base_url.as_deref().map(str::trim) {
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "gateway.base_url",
                    "URL must start with http:// or https://",
                ));
            }
        }
        if self.gateway.page_size == 0 {
            return Err(ConfigError::invalid("gateway.page_size", "must be non-zero"));
        }
        if self.gateway.max_pages == 0 {
            return Err(ConfigError::invalid("gateway.max_pages", "must be non-zero"));
        }

        if self.cache.fresh_seconds > self.cache.max_age_seconds {
            return Err(ConfigError::invalid(
                "cache.fresh_seconds",
                "must not exceed cache.max_age_seconds",
            ));
        }
        if self.cache.collection_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "cache.collection_timeout_ms",
                "must be non-zero",
            ));
        }
        if let Some(minutes) = self.cache.utc_offset_minutes {
            if minutes.unsigned_abs() >= 24 * 60 {
                return Err(ConfigError::invalid(
                    "cache.utc_offset_minutes",
                    "offset must be within ±23:59",
                ));
            }
        }

        self.logging.validate()
    }
}
