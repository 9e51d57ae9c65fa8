//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}
