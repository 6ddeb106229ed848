//! Market-making worker entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Perpetual-futures market-making worker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PERPMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; environment always wins over the config file.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = perpmm_worker::WorkerConfig::load(args.config.as_deref())?;

    perpmm_telemetry::init_logging(&config.log_level)?;
    info!("Starting perpmm worker v{}", env!("CARGO_PKG_VERSION"));

    let app = perpmm_worker::Application::new(config)?;
    app.run().await?;

    Ok(())
}
