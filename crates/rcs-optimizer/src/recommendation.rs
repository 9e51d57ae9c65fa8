//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use rcs_sim::ConflictAnalysis;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationKind {
    Reroute,
    PriorityChange,
    SpeedAdjustment,
    PlatformReallocation,
    SignalRepair,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn weight(&self) -> f64 {
        match self {
            Priority::Low => 1.0,
            Priority::Medium => 2.0,
            Priority::High => 3.0,
        }
    }
}

/// Structured form of the action a recommendation proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDirective {
    Reroute {
        trains: Vec<String>,
    },
    PriorityChange {
        favoured: Vec<String>,
        /// Hold every other train until the favoured ones have passed.
        hold_others: bool,
    },
    SpeedAdjustment {
        train: String,
        target_kmh: f64,
    },
    /// Line-wide speed cap over the given km posts.
    SpeedRestriction {
        sections: Vec<u32>,
        speed_factor: f64,
    },
    PlatformReallocation {
        station: String,
    },
    SignalRepair {
        signals: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub impact: String,
    /// Confidence in `[0, 100]`.
    pub confidence: f64,
    pub action: String,
    pub directive: ActionDirective,
    pub estimated_savings: f64,
    pub affected_trains: Vec<String>,
    pub affected_sections: Vec<String>,
    /// Minutes needed to put the action in place.
    pub implementation_time: f64,
}

impl Recommendation {
    /// Ranking score; higher ranks first.
    ///
    /// Weighs priority and confidence at 0.3 each, savings (saturating at
    /// 1000) and implementation speed (over a 30 minute horizon) at 0.2 each.
    pub fn score(&self) -> f64 {
        let confidence = self.confidence / 100.0;
        let savings = (self.estimated_savings / 1000.0).min(1.0);
        let feasibility = 1.0 - self.implementation_time / 30.0;
        self.priority.weight() * 0.3 + confidence * 0.3 + savings * 0.2 + feasibility * 0.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationStep {
    pub step: usize,
    pub action: String,
    pub target: String,
    pub duration: f64,
    pub dependencies: Vec<String>,
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    /// Minutes.
    pub delay_reduction: f64,
    pub energy_saved: f64,
    pub throughput_improvement: f64,
    pub passenger_impact: f64,
    pub system_efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub success: bool,
    pub recommendations: Vec<Recommendation>,
    pub conflicts: Vec<ConflictAnalysis>,
    pub metrics: OptimizationMetrics,
    pub confidence: f64,
    pub implementation_plan: Vec<ImplementationStep>,
    /// Simulated minute of the analysed snapshot.
    pub snapshot_time: u64,
    pub generated_at: DateTime<Utc>,
}

impl OptimizationResult {
    /// Well-formed result carrying no recommendations.
    pub fn unsuccessful(snapshot_time: u64) -> Self {
        Self {
            success: false,
            recommendations: Vec::new(),
            conflicts: Vec::new(),
            metrics: OptimizationMetrics::default(),
            confidence: 0.0,
            implementation_plan: Vec::new(),
            snapshot_time,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(priority: Priority, confidence: f64, savings: f64, minutes: f64) -> Recommendation {
        Recommendation {
            id: "r".into(),
            kind: RecommendationKind::Reroute,
            priority,
            title: String::new(),
            description: String::new(),
            impact: String::new(),
            confidence,
            action: String::new(),
            directive: ActionDirective::Reroute { trains: Vec::new() },
            estimated_savings: savings,
            affected_trains: Vec::new(),
            affected_sections: Vec::new(),
            implementation_time: minutes,
        }
    }

    #[test]
    fn score_combines_weighted_terms() {
        let score = candidate(Priority::High, 90.0, 600.0, 5.0).score();
        let expected = 0.9 + 0.27 + 0.12 + 0.2 * (1.0 - 5.0 / 30.0);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn savings_term_saturates() {
        let capped = candidate(Priority::Low, 80.0, 5000.0, 0.0).score();
        let at_limit = candidate(Priority::Low, 80.0, 1000.0, 0.0).score();
        assert!((capped - at_limit).abs() < 1e-12);
    }

    #[test]
    fn directives_are_tagged_by_type() {
        let value = serde_json::to_value(ActionDirective::SignalRepair {
            signals: vec!["S30".into()],
        })
        .expect("serialize");
        assert_eq!(value["type"], "signal_repair");
        assert_eq!(value["signals"][0], "S30");
    }
}
