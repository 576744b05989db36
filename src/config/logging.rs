//! `[logging]` section
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [logging.components]
//! gateway = "debug"
//! cache = "trace"
//! ```

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

/// How events are rendered on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.trim().eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("unknown log format '{}', expected pretty or json", s))
        }
    }
}

/// Crate modules that can be given their own level.
///
/// Keys outside this list are rejected when the config is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Gateway,
    Cache,
    Dashboard,
    Records,
    Api,
    Cli,
}

impl Component {
    /// Key used in `[logging.components]`.
    pub fn name(self) -> &'static str {
        self.target().trim_start_matches("salespulse::")
    }

    /// Tracing target prefix of the module.
    pub fn target(self) -> &'static str {
        match self {
            Component::Gateway => "salespulse::gateway",
            Component::Cache => "salespulse::cache",
            Component::Dashboard => "salespulse::dashboard",
            Component::Records => "salespulse::records",
            Component::Api => "salespulse::api",
            Component::Cli => "salespulse::cli",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for everything without a component override
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels, ordered by component
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<Component, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            components: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Quiet logging at `level` for one-shot commands whose stdout is the result.
    pub fn for_command(level: &str) -> Self {
        Self {
            level: level.to_string(),
            ..Default::default()
        }
    }

    /// Every configured level must be a tracing level name or `off`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.level).map_err(|m| ConfigError::invalid("logging.level", m))?;
        for (component, level) in &self.components {
            parse_level(level).map_err(|m| {
                ConfigError::invalid(&format!("logging.components.{}", component.name()), m)
            })?;
        }
        Ok(())
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(level.trim()).map_err(|_| format!("unknown level '{}'", level))
}
