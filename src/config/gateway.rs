//! Remote data gateway configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the collection gateway.
///
/// An absent or blank `base_url` means demo mode: the cache produces empty
/// demo snapshots and never touches the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g., "http://localhost:3001")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Path prefix before the collection name
    pub path_prefix: String,
    /// Name of the environment variable holding the API token, if the gateway wants one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    /// Header the token is sent in
    pub token_header: String,
    /// Records requested per page (the gateway may cap this lower)
    pub page_size: u32,
    /// Hard stop for pagination against a misbehaving gateway
    pub max_pages: u32,
    /// Transport-level timeout for a single page request
    pub request_timeout_seconds: u64,
    /// Ask the gateway to sort dated collections newest first
    pub sort_by_date: bool,
    /// Extra attempts for a page answered with 429, 500, 502 or 503
    pub max_retries: u32,
    /// Wait before the first retry; doubles on each following one
    pub retry_base_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            path_prefix: "/collections".to_string(),
            token_env: None,
            token_header: "xc-token".to_string(),
            page_size: 1000,
            max_pages: 500,
            request_timeout_seconds: 10,
            sort_by_date: false,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl GatewayConfig {
    /// Whether a gateway URL is configured (otherwise demo mode).
    pub fn is_configured(&self) -> bool {
        self.base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Wait before retry number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }

    /// Read the API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        let var = self.token_env.as_deref()?;
        std::env::var(var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults_are_demo_mode() {
        let config = GatewayConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.max_pages, 500);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let config = GatewayConfig::default();
        assert_eq!(config.retry_delay(0), Duration::from_millis(500));
        assert_eq!(config.retry_delay(1), Duration::from_millis(1000));
        assert_eq!(config.retry_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_retry_delay_saturates() {
        let config = GatewayConfig {
            retry_base_delay_ms: u64::MAX / 2,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(40), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_blank_url_is_not_configured() {
        let config = GatewayConfig {
            base_url: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn test_token_read_from_env() {
        std::env::set_var("SALESPULSE_TEST_GATEWAY_TOKEN", "  secret ");
        let config = GatewayConfig {
            token_env: Some("SALESPULSE_TEST_GATEWAY_TOKEN".to_string()),
            ..Default::default()
        };
        let token = config.token();
        std::env::remove_var("SALESPULSE_TEST_GATEWAY_TOKEN");

        assert_eq!(token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_token_missing_env_is_none() {
        let config = GatewayConfig {
            token_env: Some("SALESPULSE_TEST_TOKEN_NEVER_SET".to_string()),
            ..Default::default()
        };
        assert!(config.token().is_none());
    }
}
