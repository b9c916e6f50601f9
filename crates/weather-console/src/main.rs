//! Weather Access - Main Entry Point

use anyhow::Context;
use weather_console::{init_logging, run, ConsoleConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::load().context("loading configuration")?;
    init_logging(config.level(), config.log_json)?;

    info!("=== Weather Access v{} ===", env!("CARGO_PKG_VERSION"));

    let steps = run(&config)?;
    info!("Walkthrough finished: {} steps", steps.len());

    Ok(())
}
