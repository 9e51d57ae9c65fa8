//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Fixed corridor layout and the randomised initial train set.

use rcs_common::{FleetConfig, SimulationConfig};

use crate::model::{Junction, Signal, Station, Train, TrainClass, World};
use crate::random::RandomSource;

/// Spacing between automatic block signals.
pub const SIGNAL_SPACING_KM: u32 = 10;

/// The five stations of the corridor, origin first.
pub fn default_stations() -> Vec<Station> {
    vec![
        Station::new("A", "Station A", 0.0, 4, 8),
        Station::new("B", "Junction B", 30.0, 6, 12),
        Station::new("C", "Station C", 60.0, 3, 6),
        Station::new("D", "Station D", 90.0, 4, 8),
        Station::new("E", "Junction E", 120.0, 5, 10),
    ]
}

/// One signal every [`SIGNAL_SPACING_KM`], both corridor ends included.
pub fn default_signals(corridor_length_km: f64) -> Vec<Signal> {
    let last = corridor_length_km.max(0.0).floor() as u32;
    (0..=last)
        .step_by(SIGNAL_SPACING_KM as usize)
        .map(Signal::at)
        .collect()
}

pub fn default_junctions() -> Vec<Junction> {
    let junction = |id: &str, name: &str, position_km: f64, connections: [&str; 2]| Junction {
        id: id.to_string(),
        name: name.to_string(),
        position_km,
        connections: connections.iter().map(|c| c.to_string()).collect(),
        current_trains: Vec::new(),
        queue: Vec::new(),
    };
    vec![
        junction("J1", "Junction B", 30.0, ["A", "C"]),
        junction("J2", "Junction E", 120.0, ["D", "F"]),
    ]
}

/// Draw the initial fleet: express, then freight, then suburban.
///
/// Each train takes one draw for its position and, for passenger classes, one
/// for its load. Current and next station follow from the drawn position.
pub fn seed_trains(
    fleet: &FleetConfig,
    stations: &[Station],
    corridor_length_km: f64,
    source: &mut dyn RandomSource,
) -> Vec<Train> {
    let route: Vec<String> = stations.iter().map(|station| station.id.clone()).collect();
    let classes = [
        (TrainClass::Express, fleet.express),
        (TrainClass::Freight, fleet.freight),
        (TrainClass::Suburban, fleet.suburban),
    ];

    let mut trains = Vec::with_capacity(fleet.total() as usize);
    for (class, count) in classes {
        for n in 1..=count {
            let position = source.uniform(0.0, corridor_length_km);
            let passengers = match class {
                TrainClass::Express => source.uniform(800.0, 1200.0).round() as u32,
                TrainClass::Suburban => source.uniform(200.0, 300.0).round() as u32,
                TrainClass::Freight => 0,
            };
            let mut train = Train::new(format!("{}{n}", class.id_prefix()), class, position)
                .with_passengers(passengers)
                .with_route(route.clone());
            train.name = format!("{} {n}", class.label());
            place_on_route(&mut train, stations);
            trains.push(train);
        }
    }
    trains
}

/// Set current/next station from the train's position along its route.
pub fn place_on_route(train: &mut Train, stations: &[Station]) {
    let current = train
        .route
        .iter()
        .filter_map(|id| stations.iter().find(|station| &station.id == id))
        .filter(|station| station.position_km <= train.position_km)
        .last()
        .map(|station| station.id.clone());
    train.next_station = match &current {
        Some(id) => train.station_after(id).map(str::to_string),
        None => train.route.first().cloned(),
    };
    train.current_station = current;
}

/// Full default world for `config`, drawing trains from `source`.
pub fn build_world(config: &SimulationConfig, source: &mut dyn RandomSource) -> World {
    let stations = default_stations();
    let trains = seed_trains(
        &config.fleet,
        &stations,
        config.corridor_length_km,
        source,
    );
    World {
        signals: default_signals(config.corridor_length_km),
        junctions: default_junctions(),
        trains,
        stations,
        ..World::empty(config.corridor_length_km)
    }
}
