//! Aura Sim - headless combat scenario runner.
//!
//! Loads `aura-sim.toml`, builds a combat world and plays a scripted fight
//! on a fixed timestep, logging the event stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod logging;
pub mod scenario;

pub use config::{SimConfig, CONFIG_FILE};
pub use scenario::{Scenario, ScenarioReport};
