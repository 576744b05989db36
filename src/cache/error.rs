//! Error types for the cache coordinator.

use crate::gateway::GatewayError;
use thiserror::Error;

/// Message fragments that identify a connectivity failure.
const NETWORK_MARKERS: [&str; 10] = [
    "network",
    "timeout",
    "timed_out",
    "err_internet_disconnected",
    "err_connection",
    "connection",
    "disconnected",
    "failed to fetch",
    "networkerror",
    "abort",
];

/// Why a fetch cycle failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("timeout: {scope} took longer than {ms}ms")]
    Timeout { scope: String, ms: u64 },

    #[error("{0}")]
    Other(String),
}

impl CacheError {
    pub(crate) fn timeout(scope: impl Into<String>, limit: std::time::Duration) -> Self {
        CacheError::Timeout {
            scope: scope.into(),
            ms: limit.as_millis() as u64,
        }
    }

    /// Connectivity problems get a retry affordance; rejections do not.
    pub fn is_network(&self) -> bool {
        match self {
            CacheError::Gateway(e) => e.is_network(),
            CacheError::Timeout { .. } => true,
            CacheError::Other(message) => classify_message(message),
        }
    }
}

/// Whether an error message reads like a connectivity failure.
pub fn classify_message(message: &str) -> bool {
    let message = message.to_lowercase();
    NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
}
