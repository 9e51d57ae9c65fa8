//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Conflict-driven recommendation engine for the rail corridor simulator.
//!
//! [`Optimizer`] turns a [`WorldSnapshot`](rcs_sim::WorldSnapshot) into a
//! ranked, bounded list of [`Recommendation`]s. The heuristics behind it live
//! in [`strategies`] and can be replaced one family at a time.

pub mod comparison;
pub mod errors;
pub mod io;
pub mod optimizer;
pub mod recommendation;
pub mod reports;
pub mod strategies;

pub use comparison::{compare_performance, KpiSummary, PerformanceComparison, PerformanceImprovement};
pub use errors::{OptimizerError, Result};
pub use io::{load_kpi_samples, write_kpi_samples};
pub use optimizer::Optimizer;
pub use recommendation::{
    ActionDirective, ImplementationStep, OptimizationMetrics, OptimizationResult, Priority,
    Recommendation, RecommendationKind,
};
pub use reports::{export_comparison, ReportExporter};
pub use strategies::{
    Conditions, ConflictDetection, DelayPredictor, EnergyStrategy, PassengerImpactModel,
    StrategySet,
};
