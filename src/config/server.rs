//! Server configuration

use serde::{Deserialize, Serialize};

/// HTTP server configuration for the read API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single API request, including any fetch cycle it waits on
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            request_timeout_seconds: 120,
        }
    }
}
