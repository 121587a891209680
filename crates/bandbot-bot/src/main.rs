//! Adaptive band trader - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Adaptive band trader
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BANDBOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    bandbot_telemetry::init_logging()?;

    info!("Starting bandbot v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > BANDBOT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("BANDBOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = bandbot::AppConfig::load_or_default(&config_path)?;
    info!(?config.mode, instrument = %config.instrument, "Configuration loaded");

    let app = bandbot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
