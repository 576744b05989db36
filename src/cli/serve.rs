//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cache::CacheCoordinator;
use crate::cli::ServeArgs;
use crate::config::{LogFormat, PulseConfig};
use crate::gateway::GatewayClient;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load the config file when present, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<PulseConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        PulseConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        PulseConfig::default()
    };

    Ok(config.with_env_overrides())
}

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<PulseConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    // CLI flags have the highest priority
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Initialize tracing based on configuration
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Build the coordinator over the configured gateway.
pub fn build_cache(config: &PulseConfig) -> Result<CacheCoordinator, Box<dyn std::error::Error>> {
    let source = Arc::new(GatewayClient::new(config.gateway.clone())?);
    if config.gateway.is_configured() {
        tracing::info!(
            base_url = config.gateway.base_url.as_deref().unwrap_or_default(),
            "Using remote data gateway"
        );
    } else {
        tracing::warn!("No gateway configured, serving demo data");
    }
    Ok(CacheCoordinator::new(source, config.cache.clone()))
}

/// Build API router with all endpoints
fn build_api_router(
    config: Arc<PulseConfig>,
    cache: CacheCoordinator,
) -> (axum::Router, Arc<AppState>) {
    let app_state = Arc::new(AppState::new(
        config,
        cache,
        crate::metrics::handle_or_detached(),
    ));
    let router = create_router(Arc::clone(&app_state));
    (router, app_state)
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging)?;

    tracing::info!("Starting salespulse server");
    tracing::debug!(?config, "Loaded configuration");

    let cache = build_cache(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let (app, _state) = build_api_router(Arc::new(config), cache);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "salespulse API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("salespulse server stopped");
    Ok(())
}
