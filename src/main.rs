use std::path::PathBuf;
use std::sync::Arc;

use canopy::{
    api::{start_api_server, ApiState},
    config::AppConfig,
    observability::{init_logging, install_prometheus_recorder, log_config_info},
    services::{ActionHandler, MaintenanceMode},
    storage::{create_pool, LocalLockFactory},
    Result, APP_NAME, VERSION,
};
use clap::Parser;
use tracing::info;

/// Canopy configuration store server
#[derive(Debug, Parser)]
#[command(name = "canopy", version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON). Environment variables
    /// prefixed with CANOPY_ override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start with maintenance mode enabled
    #[arg(long)]
    maintenance: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    init_logging(&config.observability)?;
    let metrics = install_prometheus_recorder(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Canopy configuration store");
    log_config_info(&config);

    let pool = create_pool(&config.database).await?;

    let maintenance = Arc::new(MaintenanceMode::new(
        args.maintenance || config.server.start_in_maintenance,
    ));
    if maintenance.is_enabled()? {
        info!("Starting in maintenance mode; mutations are rejected");
    }

    let locks = Arc::new(LocalLockFactory::new(config.locks.acquire_timeout()));
    let handler = ActionHandler::new(pool.clone(), locks, maintenance);
    let state = ApiState::new(handler).with_metrics(metrics);

    start_api_server(&config.server, state).await?;

    pool.close().await;
    info!("Canopy stopped");
    Ok(())
}
