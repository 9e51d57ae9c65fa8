//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Conflict detection over corridor snapshots."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Stateless conflict analysis.
//!
//! Stations are scanned first, then signals, then train pairs. Every rule
//! reports independently, so one train can appear in several conflicts.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::model::{Severity, Signal, Station, Train, WorldSnapshot};

/// Trains closer than this are reported as a track conflict.
pub const TRACK_CONFLICT_DISTANCE_KM: f64 = 2.0;
/// Trains closer than this to a failed signal are affected by it.
pub const SIGNAL_FAILURE_RADIUS_KM: f64 = 10.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictKind {
    TrackConflict,
    StationCongestion,
    SignalFailure,
    PriorityConflict,
}

/// Candidate remedy attached to a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOption {
    pub id: String,
    pub kind: String,
    pub description: String,
    pub estimated_delay_reduction: f64,
    pub implementation_cost: f64,
    /// Likelihood the remedy can be carried out, in `[0, 1]`.
    pub feasibility: f64,
    pub side_effects: Vec<String>,
}

impl ResolutionOption {
    fn new(
        kind: &str,
        subject: &str,
        description: &str,
        (estimated_delay_reduction, implementation_cost, feasibility): (f64, f64, f64),
        side_effects: &[&str],
    ) -> Self {
        Self {
            id: format!("{kind}_{subject}"),
            kind: kind.to_string(),
            description: description.to_string(),
            estimated_delay_reduction,
            implementation_cost,
            feasibility,
            side_effects: side_effects.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    pub conflict_id: String,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub affected_trains: Vec<String>,
    pub affected_sections: Vec<String>,
    /// Estimated cost in minutes-equivalent.
    pub current_impact: f64,
    pub resolution_options: Vec<ResolutionOption>,
}

/// Detect every conflict visible in `snapshot`.
pub fn detect_conflicts(snapshot: &WorldSnapshot) -> Vec<ConflictAnalysis> {
    scan(&snapshot.trains, &snapshot.stations, &snapshot.signals)
}

/// Same as [`detect_conflicts`] over borrowed world parts.
pub fn scan(trains: &[Train], stations: &[Station], signals: &[Signal]) -> Vec<ConflictAnalysis> {
    let mut conflicts: Vec<ConflictAnalysis> =
        stations.iter().filter_map(station_congestion).collect();
    conflicts.extend(
        signals
            .iter()
            .filter(|signal| signal.failure)
            .map(|signal| signal_failure(signal, trains)),
    );
    conflicts.extend(track_conflicts(trains));
    conflicts
}

fn station_congestion(station: &Station) -> Option<ConflictAnalysis> {
    let occupants = station.current_trains.len();
    if occupants <= station.capacity {
        return None;
    }
    let severity = if occupants as f64 > station.capacity as f64 * 1.5 {
        Severity::Critical
    } else {
        Severity::High
    };
    Some(ConflictAnalysis {
        conflict_id: format!("station_congestion_{}", station.id),
        kind: ConflictKind::StationCongestion,
        severity,
        affected_trains: station.current_trains.clone(),
        affected_sections: vec![station.id.clone()],
        current_impact: (occupants - station.capacity) as f64 * 5.0,
        resolution_options: vec![
            ResolutionOption::new(
                "platform_reallocation",
                &station.id,
                "Reallocate platforms to reduce congestion",
                (10.0, 2.0, 0.9),
                &["May affect other trains"],
            ),
            ResolutionOption::new(
                "hold_trains",
                &station.id,
                "Hold incoming trains until congestion clears",
                (5.0, 1.0, 0.8),
                &["Delays for held trains"],
            ),
        ],
    })
}

fn signal_failure(signal: &Signal, trains: &[Train]) -> ConflictAnalysis {
    let affected_trains: Vec<String> = trains
        .iter()
        .filter(|train| (train.position_km - signal.position_km).abs() < SIGNAL_FAILURE_RADIUS_KM)
        .map(|train| train.id.clone())
        .collect();
    ConflictAnalysis {
        conflict_id: format!("signal_failure_{}", signal.id),
        kind: ConflictKind::SignalFailure,
        severity: Severity::Critical,
        current_impact: affected_trains.len() as f64 * 10.0,
        affected_trains,
        affected_sections: vec![signal.id.clone()],
        resolution_options: vec![
            ResolutionOption::new(
                "emergency_repair",
                &signal.id,
                "Dispatch emergency repair team",
                (20.0, 5.0, 0.7),
                &["High cost", "Temporary service disruption"],
            ),
            ResolutionOption::new(
                "temporary_measures",
                &signal.id,
                "Implement temporary manual control",
                (10.0, 2.0, 0.9),
                &["Reduced efficiency"],
            ),
        ],
    }
}

fn track_conflicts(trains: &[Train]) -> Vec<ConflictAnalysis> {
    let mut conflicts = Vec::new();
    for (i, first) in trains.iter().enumerate() {
        for second in &trains[i + 1..] {
            let distance = (first.position_km - second.position_km).abs();
            if distance < TRACK_CONFLICT_DISTANCE_KM
                && first.position_km > 0.0
                && second.position_km > 0.0
            {
                let section = (first.position_km / 10.0).floor() * 10.0;
                conflicts.push(ConflictAnalysis {
                    conflict_id: format!("track_conflict_{}_{}", first.id, second.id),
                    kind: ConflictKind::TrackConflict,
                    severity: Severity::High,
                    affected_trains: vec![first.id.clone(), second.id.clone()],
                    affected_sections: vec![format!("{section}")],
                    current_impact: 15.0,
                    resolution_options: Vec::new(),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrainClass;

    fn crowded(capacity: usize, occupants: usize) -> Station {
        let mut station = Station::new("C", "Station C", 60.0, 3, capacity);
        station.current_trains = (1..=occupants).map(|n| format!("T{n}")).collect();
        station
    }

    #[test]
    fn congestion_severity_scales_with_overload() {
        let critical = station_congestion(&crowded(4, 8)).expect("conflict");
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(critical.current_impact, 20.0);

        let high = station_congestion(&crowded(5, 6)).expect("conflict");
        assert_eq!(high.severity, Severity::High);
        assert_eq!(high.resolution_options.len(), 2);
        assert_eq!(high.resolution_options[0].id, "platform_reallocation_C");

        assert!(station_congestion(&crowded(4, 4)).is_none());
    }

    #[test]
    fn signal_failure_counts_trains_strictly_inside_radius() {
        let mut signal = Signal::at(30);
        signal.failure = true;
        let trains = vec![
            Train::new("E1", TrainClass::Express, 21.0),
            Train::new("E2", TrainClass::Express, 39.5),
            Train::new("F1", TrainClass::Freight, 40.0),
        ];
        let conflict = signal_failure(&signal, &trains);
        assert_eq!(conflict.affected_trains, ["E1", "E2"]);
        assert_eq!(conflict.current_impact, 20.0);
        assert_eq!(conflict.affected_sections, ["S30"]);
    }

    #[test]
    fn track_conflicts_ignore_trains_at_origin() {
        let trains = vec![
            Train::new("E1", TrainClass::Express, 0.0),
            Train::new("E2", TrainClass::Express, 1.0),
            Train::new("F1", TrainClass::Freight, 45.5),
            Train::new("L1", TrainClass::Suburban, 46.9),
        ];
        let conflicts = track_conflicts(&trains);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_id, "track_conflict_F1_L1");
        assert_eq!(conflicts[0].affected_sections, ["40"]);
    }

    #[test]
    fn rules_report_in_station_signal_train_order() {
        let mut signal = Signal::at(60);
        signal.failure = true;
        let trains = vec![
            Train::new("T1", TrainClass::Express, 60.0),
            Train::new("T2", TrainClass::Express, 60.5),
        ];
        let conflicts = scan(&trains, &[crowded(1, 3)], &[signal]);
        let kinds: Vec<ConflictKind> = conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                ConflictKind::StationCongestion,
                ConflictKind::SignalFailure,
                ConflictKind::TrackConflict
            ]
        );
    }
}
