//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::collections::VecDeque;

use indexmap::IndexMap;
use rcs_messaging::Event;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Service class of a train; fixes its priority and top speed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrainClass {
    Express,
    Freight,
    Suburban,
}

impl TrainClass {
    /// Dispatch priority, 1 being the highest.
    pub fn priority(&self) -> u8 {
        match self {
            TrainClass::Express => 1,
            TrainClass::Suburban => 2,
            TrainClass::Freight => 3,
        }
    }

    pub fn max_speed_kmh(&self) -> f64 {
        match self {
            TrainClass::Express => 120.0,
            TrainClass::Freight => 80.0,
            TrainClass::Suburban => 60.0,
        }
    }

    pub fn carries_passengers(&self) -> bool {
        matches!(self, TrainClass::Express | TrainClass::Suburban)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrainClass::Express => "Express",
            TrainClass::Freight => "Freight",
            TrainClass::Suburban => "Local",
        }
    }

    pub fn id_prefix(&self) -> char {
        match self {
            TrainClass::Express => 'E',
            TrainClass::Freight => 'F',
            TrainClass::Suburban => 'L',
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrainStatus {
    Running,
    Stopped,
    Delayed,
    Early,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub id: String,
    pub name: String,
    pub class: TrainClass,
    pub priority: u8,
    /// Distance from the corridor origin in km.
    pub position_km: f64,
    pub speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub status: TrainStatus,
    /// Minutes behind timetable; negative when early.
    pub delay_min: f64,
    pub passenger_count: u32,
    pub energy_consumption: f64,
    pub route: Vec<String>,
    pub current_station: Option<String>,
    pub next_station: Option<String>,
    /// Simulated minute of the last departure.
    pub departed_at: u64,
    /// Position of the last departure, used for the timetable.
    pub departed_from_km: f64,
    /// Minutes left at the platform; `None` when not dwelling.
    #[serde(default)]
    pub dwell_remaining: Option<u32>,
}

impl Train {
    /// A running train of `class` at `position_km` with class defaults.
    pub fn new(id: impl Into<String>, class: TrainClass, position_km: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            class,
            priority: class.priority(),
            position_km,
            speed_kmh: 0.0,
            max_speed_kmh: class.max_speed_kmh(),
            status: TrainStatus::Running,
            delay_min: 0.0,
            passenger_count: 0,
            energy_consumption: 0.0,
            route: Vec::new(),
            current_station: None,
            next_station: None,
            departed_at: 0,
            departed_from_km: position_km,
            dwell_remaining: None,
        }
    }

    pub fn with_passengers(mut self, passengers: u32) -> Self {
        self.passenger_count = passengers;
        self
    }

    pub fn with_delay(mut self, delay_min: f64) -> Self {
        self.delay_min = delay_min;
        self
    }

    pub fn with_status(mut self, status: TrainStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_route(mut self, route: Vec<String>) -> Self {
        self.route = route;
        self
    }

    /// Station that follows `station_id` on this train's route.
    pub fn station_after(&self, station_id: &str) -> Option<&str> {
        let index = self.route.iter().position(|id| id == station_id)?;
        self.route.get(index + 1).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub position_km: f64,
    pub platforms: u32,
    /// Maximum number of simultaneous occupants before trains are held.
    pub capacity: usize,
    pub current_trains: Vec<String>,
    pub waiting_trains: VecDeque<String>,
    /// Platform label to occupying train.
    pub platform_occupancy: IndexMap<String, Option<String>>,
}

impl Station {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        position_km: f64,
        platforms: u32,
        capacity: usize,
    ) -> Self {
        let platform_occupancy = (1..=platforms)
            .map(|n| (format!("P{n}"), None))
            .collect::<IndexMap<_, _>>();
        Self {
            id: id.into(),
            name: name.into(),
            position_km,
            platforms,
            capacity,
            current_trains: Vec::new(),
            waiting_trains: VecDeque::new(),
            platform_occupancy,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_trains.len() >= self.capacity
    }

    /// Put `train_id` on the first free platform, returning its label.
    pub fn assign_platform(&mut self, train_id: &str) -> Option<String> {
        let (label, slot) = self
            .platform_occupancy
            .iter_mut()
            .find(|(_, slot)| slot.is_none())?;
        *slot = Some(train_id.to_string());
        Some(label.clone())
    }

    /// Remove `train_id` from the occupant list and any platform it holds.
    pub fn release(&mut self, train_id: &str) {
        self.current_trains.retain(|id| id != train_id);
        for slot in self.platform_occupancy.values_mut() {
            if slot.as_deref() == Some(train_id) {
                *slot = None;
            }
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignalAspect {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub position_km: f64,
    pub state: SignalAspect,
    /// A failed signal shows red until repaired.
    pub failure: bool,
    /// Simulated minute of the last aspect change.
    pub last_change: u64,
    pub controlled_by: String,
}

impl Signal {
    /// Signal named after its km post, e.g. `S30`.
    pub fn at(position_km: u32) -> Self {
        Self {
            id: format!("S{position_km}"),
            position_km: f64::from(position_km),
            state: SignalAspect::Green,
            failure: false,
            last_change: 0,
            controlled_by: "system".to_string(),
        }
    }

    pub fn covers_section(&self, section_km: u32) -> bool {
        (self.position_km - f64::from(section_km)).abs() < f64::EPSILON
    }
}

/// Junctions are carried in the world but not simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: String,
    pub name: String,
    pub position_km: f64,
    pub connections: Vec<String>,
    pub current_trains: Vec<String>,
    pub queue: Vec<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherKind {
    #[default]
    Clear,
    Fog,
    Rain,
    Storm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub kind: WeatherKind,
    pub severity: f64,
    pub speed_reduction: f64,
    pub visibility_reduction: f64,
    pub start_time: u64,
    pub end_time: Option<u64>,
}

impl Default for WeatherCondition {
    fn default() -> Self {
        Self::clear(0)
    }
}

impl WeatherCondition {
    pub fn clear(start_time: u64) -> Self {
        Self::for_kind(WeatherKind::Clear, start_time, None)
    }

    /// Fixed (severity, speed reduction, visibility reduction) per kind.
    pub fn for_kind(kind: WeatherKind, start_time: u64, end_time: Option<u64>) -> Self {
        let (severity, speed_reduction, visibility_reduction) = match kind {
            WeatherKind::Clear => (0.0, 0.0, 0.0),
            WeatherKind::Fog => (0.7, 0.5, 0.8),
            WeatherKind::Rain => (0.4, 0.25, 0.3),
            WeatherKind::Storm => (0.9, 0.6, 0.6),
        };
        Self {
            kind,
            severity,
            speed_reduction,
            visibility_reduction,
            start_time,
            end_time,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.kind == WeatherKind::Clear
    }
}

/// Severity shared by disruptions and detected conflicts.
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
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn score(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisruptionKind {
    SignalFailure,
    TrackBlockage,
    Weather { condition: WeatherKind },
    EmergencyTrain,
}

impl DisruptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisruptionKind::SignalFailure => "signal_failure",
            DisruptionKind::TrackBlockage => "track_blockage",
            DisruptionKind::Weather { .. } => "weather",
            DisruptionKind::EmergencyTrain => "emergency_train",
        }
    }
}

impl std::fmt::Display for DisruptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disruption as requested by an operator, before it gets an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisruptionSpec {
    pub kind: DisruptionKind,
    pub severity: Severity,
    /// Affected km posts.
    #[serde(default)]
    pub affected_sections: Vec<u32>,
    #[serde(default)]
    pub start_time: u64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    pub id: String,
    pub kind: DisruptionKind,
    pub severity: Severity,
    pub affected_sections: Vec<u32>,
    pub start_time: u64,
    pub duration: u64,
    pub resolved: bool,
    /// Set once the tick has put the disruption into effect.
    pub applied: bool,
    pub description: String,
}

impl Disruption {
    pub fn from_spec(id: impl Into<String>, spec: DisruptionSpec) -> Self {
        Self {
            id: id.into(),
            kind: spec.kind,
            severity: spec.severity,
            affected_sections: spec.affected_sections,
            start_time: spec.start_time,
            duration: spec.duration,
            resolved: false,
            applied: false,
            description: spec.description,
        }
    }

    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }
}

/// Aggregate indicators recomputed every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub trains_cleared_per_hour: f64,
    pub average_delay: f64,
    pub passenger_impact: f64,
    pub energy_usage: f64,
    pub system_efficiency: f64,
    pub conflicts: f64,
    pub total_delay: f64,
    pub throughput: f64,
}

/// Mutable corridor state owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub corridor_length_km: f64,
    /// Simulated minutes since start or reset.
    pub current_time: u64,
    pub weather: WeatherCondition,
    pub trains: Vec<Train>,
    pub stations: Vec<Station>,
    pub signals: Vec<Signal>,
    pub junctions: Vec<Junction>,
    pub disruptions: Vec<Disruption>,
}

impl World {
    /// An empty corridor of the given length, without trains or infrastructure.
    pub fn empty(corridor_length_km: f64) -> Self {
        Self {
            corridor_length_km,
            current_time: 0,
            weather: WeatherCondition::default(),
            trains: Vec::new(),
            stations: Vec::new(),
            signals: Vec::new(),
            junctions: Vec::new(),
            disruptions: Vec::new(),
        }
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|station| station.id == id)
    }

    pub fn station_index(&self, id: &str) -> Option<usize> {
        self.stations.iter().position(|station| station.id == id)
    }

    pub fn train_index(&self, id: &str) -> Option<usize> {
        self.trains.iter().position(|train| train.id == id)
    }
}

/// Read-only copy of everything the engine exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub current_time: u64,
    pub is_running: bool,
    pub speed: f64,
    pub corridor_length_km: f64,
    pub weather: WeatherCondition,
    pub trains: Vec<Train>,
    pub stations: Vec<Station>,
    pub signals: Vec<Signal>,
    pub junctions: Vec<Junction>,
    pub disruptions: Vec<Disruption>,
    pub kpis: Kpis,
    pub events: Vec<Event>,
}

impl WorldSnapshot {
    /// Snapshot of a world that has never been run.
    pub fn from_world(world: &World) -> Self {
        Self {
            current_time: world.current_time,
            is_running: false,
            speed: 1.0,
            corridor_length_km: world.corridor_length_km,
            weather: world.weather.clone(),
            trains: world.trains.clone(),
            stations: world.stations.clone(),
            signals: world.signals.clone(),
            junctions: world.junctions.clone(),
            disruptions: world.disruptions.clone(),
            kpis: Kpis::default(),
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_defaults_follow_service_rules() {
        let express = Train::new("E1", TrainClass::Express, 12.0);
        assert_eq!(express.priority, 1);
        assert_eq!(express.max_speed_kmh, 120.0);
        assert_eq!(Train::new("F1", TrainClass::Freight, 0.0).priority, 3);
        assert_eq!(Train::new("L1", TrainClass::Suburban, 0.0).max_speed_kmh, 60.0);
        assert!(!TrainClass::Freight.carries_passengers());
    }

    #[test]
    fn platforms_are_assigned_in_label_order_and_released() {
        let mut station = Station::new("B", "Junction B", 30.0, 2, 4);
        assert_eq!(station.assign_platform("E1").as_deref(), Some("P1"));
        assert_eq!(station.assign_platform("E2").as_deref(), Some("P2"));
        assert_eq!(station.assign_platform("E3"), None);

        station.current_trains.push("E1".into());
        station.release("E1");
        assert!(station.current_trains.is_empty());
        assert_eq!(station.assign_platform("E3").as_deref(), Some("P1"));
    }

    #[test]
    fn weather_profiles_match_kind() {
        let fog = WeatherCondition::for_kind(WeatherKind::Fog, 5, Some(35));
        assert_eq!(fog.speed_reduction, 0.5);
        assert_eq!(fog.visibility_reduction, 0.8);
        let storm = WeatherCondition::for_kind(WeatherKind::Storm, 0, None);
        assert_eq!(storm.severity, 0.9);
        assert!(WeatherCondition::default().is_clear());
    }

    #[test]
    fn disruption_kind_is_internally_tagged() {
        let kind = DisruptionKind::Weather {
            condition: WeatherKind::Rain,
        };
        let value = serde_json::to_value(&kind).expect("serialize");
        assert_eq!(value["type"], "weather");
        assert_eq!(value["condition"], "rain");
        assert_eq!(DisruptionKind::EmergencyTrain.to_string(), "emergency_train");
    }

    #[test]
    fn route_lookup_finds_following_station() {
        let train = Train::new("E1", TrainClass::Express, 0.0)
            .with_route(vec!["A".into(), "B".into(), "C".into()]);
        assert_eq!(train.station_after("A"), Some("B"));
        assert_eq!(train.station_after("C"), None);
        assert_eq!(train.station_after("Z"), None);
    }
}
