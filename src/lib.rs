pub mod cli;
pub mod detection;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod recording;
pub mod reporting;
pub mod settings;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;

use cli::args::Cli;

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            log::warn!("ignoring .env: {err}");
        }
    }

    let cli = Cli::parse();
    log::info!("fallwatch starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(cli::run::run_monitor(cli))?;
    Ok(())
}
