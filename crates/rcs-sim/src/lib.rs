//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Discrete-time model of a double-track corridor.
//!
//! [`SimulationEngine`] owns the [`World`] and is the only thing that mutates
//! it. Everything else works on [`WorldSnapshot`] copies; conflict detection in
//! [`conflicts`] is a pure function over one.

pub mod conflicts;
pub mod engine;
pub mod errors;
pub mod kpi;
pub mod layout;
pub mod model;
pub mod random;

pub use conflicts::{detect_conflicts, ConflictAnalysis, ConflictKind, ResolutionOption};
pub use engine::SimulationEngine;
pub use errors::{Result, SimError};
pub use kpi::calculate_kpis;
pub use model::{
    Disruption, DisruptionKind, DisruptionSpec, Junction, Kpis, Severity, Signal, SignalAspect,
    Station, Train, TrainClass, TrainStatus, WeatherCondition, WeatherKind, World, WorldSnapshot,
};
pub use random::{RandomSource, SequenceSource};
