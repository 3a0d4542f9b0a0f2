//! Disaster severity prediction service

use anyhow::{Context, Result};
use clap::Parser;
use disaster_severity_service::{start_server, AppState, DEFAULT_PORT};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "severity-service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP prediction endpoint for the disaster severity model", long_about = None)]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Model artifact produced by severity-train
    #[arg(short, long, default_value = "disaster_model.json")]
    model: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let state = AppState::load(&cli.model).context("Failed to initialise prediction service")?;
    info!(
        "Loaded model {} ({} trees, hash {})",
        cli.model.display(),
        state.model.trees.len(),
        state.model_hash
    );

    let addr = format!("{}:{}", cli.host, cli.port);
    start_server(state, &addr)
        .await
        .context("Prediction service terminated unexpectedly")?;

    info!("Prediction service stopped");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
