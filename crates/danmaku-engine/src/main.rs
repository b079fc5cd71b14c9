//! # Danmaku Simulator
//!
//! Runs a scripted bullet scene headlessly and logs pool and event counters.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use danmaku_engine::config::{SimConfig, CONFIG_FILE};
use danmaku_engine::sim;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let config = match &path {
        Some(path) => SimConfig::load_from(path),
        None => SimConfig::load(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(config.log_filter.parse()?))
        .init();

    info!("Danmaku simulator starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", path.as_deref().unwrap_or(CONFIG_FILE));

    let summary = sim::run(&config)?;
    info!(
        "Summons {}, phase changes {}, finished {}, pool grew {} times",
        summary.summons, summary.phase_changes, summary.finished, summary.pool.grown
    );

    info!("Danmaku simulator shutdown complete");
    Ok(())
}
