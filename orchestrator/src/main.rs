// File: orchestrator/src/main.rs
use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use orchestrator::config::ConfigManager;
use orchestrator::constants::{defaults, env};
use orchestrator::web::{start_web_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("orchestrator=info".parse()?)
        .add_directive("domain_agent=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting Tenant Backup Orchestrator");

    // Load configuration
    let config_dir = std::env::var(env::CONFIG_DIR).unwrap_or_else(|_| defaults::CONFIG_DIR.to_string());
    let config_manager = ConfigManager::new(config_dir.clone())
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_dir))?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded: topology {}, {} domain services",
        config.topology.as_str(),
        config.services.len()
    );

    if config.blob_root.is_none() {
        warn!("No blob_root configured: backup operations will report blob storage as unavailable");
    }

    let state = AppState::from_config(&config_manager).await?;
    info!("Backup service initialized");

    start_web_server(state).await
}
