//! CLI module for salespulse
//!
//! # Commands
//!
//! - `serve` - Start the read API server
//! - `fetch` - Run one fetch cycle and print a summary
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! salespulse serve
//!
//! # Summarize the last week
//! salespulse fetch --preset last_7_days
//!
//! # Generate shell completions
//! salespulse completions bash > ~/.bash_completion.d/salespulse
//! ```

pub mod completions;
pub mod config;
pub mod fetch;
pub mod output;
pub mod serve;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// salespulse - cached sales analytics over a no-code database gateway
#[derive(Parser, Debug)]
#[command(
    name = "salespulse",
    version,
    about = "Cached, date-filtered access to CRM collections"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the read API server
    Serve(ServeArgs),
    /// Run one fetch cycle and print a summary
    Fetch(FetchArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "salespulse.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "SALESPULSE_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "SALESPULSE_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SALESPULSE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "salespulse.toml")]
    pub config: PathBuf,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with = "preset")]
    pub start: Option<String>,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long, requires = "start", conflicts_with = "preset")]
    pub end: Option<String>,

    /// Named range (today, yesterday, last_7_days, last_30_days, this_month, last_month, last_6_months)
    #[arg(long)]
    pub preset: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Set log level (logs go to stderr)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "salespulse.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
