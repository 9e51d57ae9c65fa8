//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use crate::model::{Kpis, Train, TrainStatus};

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Aggregate indicators for the current train set.
///
/// An empty train set yields all-zero KPIs, as does throughput at minute 0.
pub fn calculate_kpis(trains: &[Train], current_time: u64, conflicts: usize) -> Kpis {
    if trains.is_empty() {
        return Kpis::default();
    }

    let total_delay: f64 = trains.iter().map(|t| t.delay_min).sum();
    let average_delay = total_delay / trains.len() as f64;
    let running = trains
        .iter()
        .filter(|t| t.status == TrainStatus::Running)
        .count() as f64;
    let passenger_impact: f64 = trains
        .iter()
        .filter(|t| t.class.carries_passengers())
        .map(|t| f64::from(t.passenger_count) * t.delay_min)
        .sum();
    let energy_usage: f64 = trains.iter().map(|t| t.energy_consumption).sum();
    let throughput = if current_time == 0 {
        0.0
    } else {
        running / (current_time as f64 / 60.0)
    };
    let system_efficiency = (100.0 - (average_delay / 10.0) * 100.0).max(0.0);

    Kpis {
        trains_cleared_per_hour: round_to(throughput, 2),
        average_delay: round_to(average_delay, 2),
        passenger_impact: passenger_impact.round(),
        energy_usage: round_to(energy_usage, 2),
        system_efficiency: round_to(system_efficiency, 2),
        conflicts: conflicts as f64,
        total_delay: total_delay.round(),
        throughput: round_to(throughput, 2),
    }
}
