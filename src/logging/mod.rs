//! Structured logging helpers
//!
//! Filter construction for `tracing-subscriber` and the request span used by
//! the HTTP trace layer.

pub mod middleware;

pub use middleware::request_span;

/// Build filter directives string from LoggingConfig
///
/// Component levels are appended as `salespulse::<component>=<level>` in
/// component order, so the result is stable.
///
/// # Examples
///
/// ```
/// use salespulse::config::{Component, LoggingConfig};
/// use salespulse::logging::build_filter_directives;
///
/// let mut config = LoggingConfig::for_command("info");
/// config.components.insert(Component::Cache, "trace".to_string());
/// config.components.insert(Component::Gateway, "debug".to_string());
///
/// assert_eq!(
///     build_filter_directives(&config),
///     "info,salespulse::gateway=debug,salespulse::cache=trace"
/// );
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.trim().to_string();
    for (component, level) in &config.components {
        filter_str.push_str(&format!(",{}={}", component.target(), level.trim()));
    }
    filter_str
}
