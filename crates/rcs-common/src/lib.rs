//! ---
//! rcs_section: "01-core-functionality"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Shared primitives and utilities for the simulator runtime."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Shared primitives for the RCS workspace.
//! This crate exposes configuration loading, tracing setup, and the
//! tick-period arithmetic consumed by the engine and the runtime.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, FleetConfig, LoadedAppConfig, LoggingConfig, OptimizerConfig, SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use time::{clamp_speed, tick_interval, MAX_SPEED_MULTIPLIER, MIN_SPEED_MULTIPLIER};
