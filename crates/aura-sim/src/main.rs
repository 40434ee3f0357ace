//! # Aura Sim
//!
//! Runs a scripted fight against the Aura combat core and prints a summary.
//!
//! Usage: `aura-sim [config.toml]`. Without an argument `aura-sim.toml` in
//! the working directory is used, falling back to defaults.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use aura_common::AuraError;
use aura_sim::{Scenario, SimConfig, CONFIG_FILE};
use tracing::info;

/// Main entry point.
fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = SimConfig::load_from(&path);

    // Logs on stderr, report on stdout
    aura_sim::logging::init(config.log_json)?;

    info!("Aura Sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {path}");

    let mut scenario = Scenario::new(config);
    let report = scenario.run().map_err(AuraError::from)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Aura Sim shutdown complete");
    Ok(())
}
