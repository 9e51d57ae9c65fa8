//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use rcs_sim::Kpis;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

pub const COMPARISON_SCENARIO: &str = "AI vs Manual Comparison";

/// Mean indicators over a batch of KPI samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub samples: usize,
    pub average_delay: f64,
    pub system_efficiency: f64,
    pub energy_usage: f64,
    pub conflicts: f64,
}

impl KpiSummary {
    /// An empty batch summarises to zeros.
    pub fn from_samples(samples: &[Kpis]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mean_of = |field: fn(&Kpis) -> f64| samples.iter().map(field).mean();
        Self {
            samples: samples.len(),
            average_delay: mean_of(|k| k.average_delay),
            system_efficiency: mean_of(|k| k.system_efficiency),
            energy_usage: mean_of(|k| k.energy_usage),
            conflicts: mean_of(|k| k.conflicts),
        }
    }
}

/// Positive values favour the optimised run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceImprovement {
    pub delay_reduction: f64,
    pub efficiency_gain: f64,
    pub energy_saved: f64,
    pub conflict_reduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceComparison {
    pub scenario: String,
    pub ai_mode: KpiSummary,
    pub manual_mode: KpiSummary,
    pub improvement: PerformanceImprovement,
}

/// Compare optimised (`ai`) against manually dispatched KPI samples.
pub fn compare_performance(ai: &[Kpis], manual: &[Kpis]) -> PerformanceComparison {
    let ai_mode = KpiSummary::from_samples(ai);
    let manual_mode = KpiSummary::from_samples(manual);
    PerformanceComparison {
        scenario: COMPARISON_SCENARIO.to_string(),
        improvement: PerformanceImprovement {
            delay_reduction: manual_mode.average_delay - ai_mode.average_delay,
            efficiency_gain: ai_mode.system_efficiency - manual_mode.system_efficiency,
            energy_saved: manual_mode.energy_usage - ai_mode.energy_usage,
            conflict_reduction: manual_mode.conflicts - ai_mode.conflicts,
        },
        ai_mode,
        manual_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(delay: f64, efficiency: f64, energy: f64, conflicts: f64) -> Kpis {
        Kpis {
            average_delay: delay,
            system_efficiency: efficiency,
            energy_usage: energy,
            conflicts,
            ..Kpis::default()
        }
    }

    #[test]
    fn deltas_favour_the_better_batch() {
        let ai = [sample(2.0, 80.0, 100.0, 1.0), sample(4.0, 60.0, 120.0, 3.0)];
        let manual = [sample(6.0, 40.0, 150.0, 4.0)];
        let comparison = compare_performance(&ai, &manual);
        assert_eq!(comparison.scenario, COMPARISON_SCENARIO);
        assert_eq!(comparison.ai_mode.samples, 2);
        assert!((comparison.ai_mode.average_delay - 3.0).abs() < 1e-12);
        assert!((comparison.improvement.delay_reduction - 3.0).abs() < 1e-12);
        assert!((comparison.improvement.efficiency_gain - 30.0).abs() < 1e-12);
        assert!((comparison.improvement.energy_saved - 40.0).abs() < 1e-12);
        assert!((comparison.improvement.conflict_reduction - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_batches_summarise_to_zero() {
        let comparison = compare_performance(&[], &[sample(5.0, 50.0, 10.0, 2.0)]);
        assert_eq!(comparison.ai_mode, KpiSummary::default());
        assert_eq!(comparison.improvement.delay_reduction, 5.0);
        assert_eq!(compare_performance(&[], &[]).improvement, PerformanceImprovement::default());
    }
}
