//! Counterfact server binary.
//!
//! Loads `counterfact-config.yaml` (or the path given as the first
//! argument), initialises logging, assembles the session store and the
//! collaborator, and serves the session API until `Ctrl-C`.

use std::path::PathBuf;
use std::sync::Arc;

use counterfact_core::config::{AppConfig, LogFormat, LoggingConfig};
use counterfact_server::server::start_server;
use counterfact_server::startup::build_state;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file read when no path is given.
const DEFAULT_CONFIG_PATH: &str = "counterfact-config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. A missing default file means defaults.
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if path.exists() {
        AppConfig::from_file(&path)?
    } else {
        AppConfig::parse("")?
    };

    // 2. Initialize tracing.
    init_tracing(&config.logging);
    info!(config = %path.display(), "Counterfact starting");

    // 3. Scenario, content cache, collaborator.
    let state = Arc::new(build_state(&config)?);

    // 4. Serve.
    start_server(&config.server, state).await?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
