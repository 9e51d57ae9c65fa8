//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("signal {0} not found on the corridor")]
    UnknownSignal(String),
    #[error("disruption {0} not found")]
    UnknownDisruption(String),
}
