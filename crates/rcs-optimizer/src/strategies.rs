//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Swappable heuristics, one trait per recommendation family.

use std::fmt;

use rcs_sim::{detect_conflicts, ConflictAnalysis, Train, WorldSnapshot};

use crate::recommendation::{ActionDirective, Priority, Recommendation, RecommendationKind};

/// Radius used to count neighbouring trains when estimating congestion.
pub const CONGESTION_RADIUS_KM: f64 = 10.0;

/// Line conditions around a train at prediction time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conditions {
    pub weather_severity: f64,
    pub congestion: f64,
}

impl Conditions {
    /// Conditions around `train`: weather severity and the number of trains
    /// within [`CONGESTION_RADIUS_KM`] (itself included) divided by five.
    pub fn around(train: &Train, snapshot: &WorldSnapshot) -> Self {
        let nearby = snapshot
            .trains
            .iter()
            .filter(|other| (other.position_km - train.position_km).abs() < CONGESTION_RADIUS_KM)
            .count();
        Self {
            weather_severity: snapshot.weather.severity,
            congestion: nearby as f64 / 5.0,
        }
    }
}

pub trait DelayPredictor: Send + Sync {
    fn name(&self) -> &'static str;
    /// Expected delay in minutes given current conditions.
    fn predict(&self, train: &Train, conditions: &Conditions) -> f64;
}

pub trait ConflictDetection: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, snapshot: &WorldSnapshot) -> Vec<ConflictAnalysis>;
}

pub trait EnergyStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn recommend(&self, trains: &[Train]) -> Vec<Recommendation>;
}

pub trait PassengerImpactModel: Send + Sync {
    fn name(&self) -> &'static str;
    /// Passenger-minutes of delay carried by the train set.
    fn impact(&self, trains: &[Train]) -> f64;
}

/// Scales the current delay by weather, congestion and train priority.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDelayPredictor;

impl DelayPredictor for HeuristicDelayPredictor {
    fn name(&self) -> &'static str {
        "delay_prediction"
    }

    fn predict(&self, train: &Train, conditions: &Conditions) -> f64 {
        let priority_factor = match train.priority {
            1 => 0.8,
            2 => 0.9,
            _ => 1.0,
        };
        train.delay_min
            * (1.0 + conditions.weather_severity * 0.3 + conditions.congestion * 0.2)
            * priority_factor
    }
}

/// Rule-based detector shared with the engine's KPI conflict count.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedConflictDetection;

impl ConflictDetection for RuleBasedConflictDetection {
    fn name(&self) -> &'static str {
        "conflict_detection"
    }

    fn detect(&self, snapshot: &WorldSnapshot) -> Vec<ConflictAnalysis> {
        detect_conflicts(snapshot)
    }
}

/// Suggests easing off trains whose consumption passed a speed-relative threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEnergyStrategy {
    /// Fraction of max speed used both as the threshold and the target.
    pub ratio: f64,
}

impl Default for ThresholdEnergyStrategy {
    fn default() -> Self {
        Self { ratio: 0.8 }
    }
}

impl EnergyStrategy for ThresholdEnergyStrategy {
    fn name(&self) -> &'static str {
        "energy_optimization"
    }

    fn recommend(&self, trains: &[Train]) -> Vec<Recommendation> {
        trains
            .iter()
            .filter(|train| train.energy_consumption > train.max_speed_kmh * self.ratio)
            .map(|train| {
                let target = train.max_speed_kmh * self.ratio;
                Recommendation {
                    id: format!("energy_opt_{}", train.id),
                    kind: RecommendationKind::SpeedAdjustment,
                    priority: Priority::Medium,
                    title: "Energy Optimization".to_string(),
                    description: format!(
                        "Optimize speed profile for {} to reduce energy consumption",
                        train.name
                    ),
                    impact: "Reduce energy consumption by 15-20%".to_string(),
                    confidence: 85.0,
                    action: format!("Adjust speed to {target} km/h"),
                    directive: ActionDirective::SpeedAdjustment {
                        train: train.id.clone(),
                        target_kmh: target,
                    },
                    estimated_savings: 150.0,
                    affected_trains: vec![train.id.clone()],
                    affected_sections: vec![train.current_station.clone().unwrap_or_default()],
                    implementation_time: 2.0,
                }
            })
            .collect()
    }
}

/// Passenger count times delay over passenger-carrying classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedPassengerImpact;

impl PassengerImpactModel for WeightedPassengerImpact {
    fn name(&self) -> &'static str {
        "passenger_impact"
    }

    fn impact(&self, trains: &[Train]) -> f64 {
        trains
            .iter()
            .filter(|train| train.class.carries_passengers())
            .map(|train| f64::from(train.passenger_count) * train.delay_min)
            .sum()
    }
}

/// The four strategy families used by the optimizer.
pub struct StrategySet {
    pub delay: Box<dyn DelayPredictor>,
    pub conflicts: Box<dyn ConflictDetection>,
    pub energy: Box<dyn EnergyStrategy>,
    pub passenger: Box<dyn PassengerImpactModel>,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self {
            delay: Box::new(HeuristicDelayPredictor),
            conflicts: Box::new(RuleBasedConflictDetection),
            energy: Box::new(ThresholdEnergyStrategy::default()),
            passenger: Box::new(WeightedPassengerImpact),
        }
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl StrategySet {
    pub fn with_delay(mut self, strategy: impl DelayPredictor + 'static) -> Self {
        self.delay = Box::new(strategy);
        self
    }

    pub fn with_conflicts(mut self, strategy: impl ConflictDetection + 'static) -> Self {
        self.conflicts = Box::new(strategy);
        self
    }

    pub fn with_energy(mut self, strategy: impl EnergyStrategy + 'static) -> Self {
        self.energy = Box::new(strategy);
        self
    }

    pub fn with_passenger(mut self, strategy: impl PassengerImpactModel + 'static) -> Self {
        self.passenger = Box::new(strategy);
        self
    }

    pub fn names(&self) -> [&'static str; 4] {
        [
            self.delay.name(),
            self.conflicts.name(),
            self.energy.name(),
            self.passenger.name(),
        ]
    }
}
