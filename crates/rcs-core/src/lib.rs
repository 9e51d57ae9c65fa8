//! ---
//! rcs_section: "06-runtime"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Timer-driven corridor runtime and operator controls."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Corridor runtime: a tokio ticker driving the simulation engine, with the
//! optimizer and operator actions serialised through the same engine lock.

pub mod runtime;

pub use runtime::{ActionOutcome, CorridorRuntime, CORRIDOR_ID};
