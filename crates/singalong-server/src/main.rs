//! Sing-Along server binary.
//!
//! Wires the hub, its demo event handlers, the poll sweeper and the HTTP
//! listener together and serves until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `singalong-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the hub and register event handlers
//! 4. Spawn the poll sweeper
//! 5. Serve HTTP until Ctrl-C, then stop the sweeper

mod error;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use singalong_core::config::{LogFormat, LoggingConfig, SingAlongConfig};
use singalong_core::{spawn_sweeper, Hub};
use singalong_http::{start_server, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "singalong-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging setup or the HTTP server
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report the source after.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        from_file,
        host = %config.server.host,
        port = config.server.port,
        base_path = %config.server.base_path,
        poll_timeout_ms = config.long_poll.poll_timeout_ms,
        sweep_interval_ms = config.long_poll.sweep_interval_ms,
        "Configuration loaded"
    );

    // 3. Build the hub.
    let hub = Arc::new(
        handlers::register(Hub::builder())
            .poll_timeout(config.long_poll.poll_timeout())
            .build(),
    );

    // 4. Spawn the sweeper.
    let sweeper = spawn_sweeper(&hub, config.long_poll.sweep_interval());

    // 5. Serve.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        base_path: config.server.base_path.clone(),
    };
    let state = Arc::new(AppState::new(Arc::clone(&hub)));
    let served = start_server(&server_config, state, shutdown_signal()).await;

    sweeper.abort();
    served.map_err(AppError::from)?;

    let stats = hub.stats();
    info!(
        connections = stats.connections,
        messages = stats.messages,
        "singalong-server shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_PATH`], falling back to defaults.
///
/// Returns the configuration and whether it came from the file.
fn load_config() -> Result<(SingAlongConfig, bool), AppError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((SingAlongConfig::from_file(config_path)?, true))
    } else {
        Ok((SingAlongConfig::from_env()?, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| AppError::Logging {
        message: format!("{e}"),
    })
}

/// Resolve when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
        return;
    }
    info!("Ctrl-C received, shutting down");
}
