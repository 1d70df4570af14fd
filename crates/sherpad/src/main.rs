//! Sherpa Daemon - travel assistant orchestration service.
//!
//! Serves the conversation engine over HTTP and keeps every external
//! dependency (models, weather, geocoding, routing) behind fallbacks.

use anyhow::Result;
use clap::Parser;
use sherpa_common::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sherpad", version, about = "Sherpa travel assistant daemon")]
struct Args {
    /// Config file path, overriding the standard search locations
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bind address override, e.g. 0.0.0.0:7878
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("[*]  sherpad v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let bind_address = config.server.bind_address.clone();
    let state = sherpad::server::AppState::new(config).await?;

    tokio::select! {
        result = sherpad::server::run(state, &bind_address) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("[*]  Shutting down gracefully");
        }
    }

    Ok(())
}
