//! Error types for the gateway client.

use thiserror::Error;

/// Errors that escape a collection fetch.
///
/// HTTP status and decode failures are normally absorbed by pagination (partial
/// results are returned); they surface only when the first page of a collection
/// cannot be read at all through [`GatewayClient::fetch_page`](super::GatewayClient::fetch_page).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Request timeout
    #[error("request timeout after {0}ms")]
    Timeout(u64),

    /// Connection refused/reset, DNS failure, aborted request
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status} fetching {collection}")]
    Http { status: u16, collection: String },

    /// Body was not a valid page
    #[error("invalid response: {0}")]
    Decode(String),

    /// No gateway URL configured
    #[error("gateway not configured")]
    NotConfigured,
}

impl GatewayError {
    /// Whether this is a connectivity problem rather than a rejection by the gateway.
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Timeout(_) | GatewayError::Network(_))
    }

    /// Whether the gateway signalled overload, so the same page may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Http { status: 429 | 500 | 502 | 503, .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Network(_) => "network",
            GatewayError::Http { .. } => "http",
            GatewayError::Decode(_) => "decode",
            GatewayError::NotConfigured => "not_configured",
        }
    }
}
