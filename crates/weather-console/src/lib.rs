//! Weather Access Console
//!
//! Seeds an in-memory store and walks one user through the access-checked
//! operations, logging each outcome.

mod settings;
pub mod scenario;
pub mod seed;

pub use settings::{ConsoleConfig, CONFIG_PATH_VAR, ENV_PREFIX};
pub use scenario::{Outcome, Step};

use anyhow::{Context, Result};
use seed::Fixture;
use std::sync::Arc;
use storage::SharedGateway;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: Level, json: bool) -> Result<(), SetGlobalDefaultError> {
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Seed a fresh store and run the walkthrough
pub fn run(config: &ConsoleConfig) -> Result<Vec<Step>> {
    let fixture = match &config.seed_path {
        Some(path) => Fixture::from_path(path)?,
        None => Fixture::bundled()?,
    };

    let gateway: SharedGateway = Arc::new(seed::indexed_gateway()?);
    seed::apply(&gateway, fixture)?;

    info!("Running walkthrough as {}", config.username);
    scenario::run(gateway, config).context("walkthrough aborted")
}
