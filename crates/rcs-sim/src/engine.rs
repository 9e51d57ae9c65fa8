//! ---
//! rcs_section: "04-simulation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Corridor world model and tick engine."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use rcs_common::{clamp_speed, tick_interval, SimulationConfig};
use rcs_logging::{log_system_event, rcs_info, rcs_warn, LogContext, SystemEventOutcome};
use rcs_messaging::{Event, EventBus, EventKind, EventReceiver, ListenerId};
use serde_json::json;
use tracing::{debug, Level};
use uuid::Uuid;

use crate::conflicts;
use crate::errors::{Result, SimError};
use crate::kpi::calculate_kpis;
use crate::layout;
use crate::model::{
    Disruption, DisruptionKind, DisruptionSpec, Kpis, Signal, SignalAspect, Station, Train,
    TrainStatus, WeatherCondition, World, WorldSnapshot,
};
use crate::random::{self, RandomSource};

const CORRIDOR: &str = "A-E";
const ACCELERATION_STEP_KMH: f64 = 5.0;
const SIGNAL_LOOKAHEAD_KM: f64 = 10.0;
const BLOCK_LENGTH_KM: f64 = 5.0;
const ARRIVAL_WINDOW_KM: f64 = 1.0;
const HOLD_PENALTY_MIN: f64 = 5.0;
const ENERGY_PER_KMH: f64 = 0.1;
/// Timetable running time is padded by this factor.
const RECOVERY_ALLOWANCE: f64 = 1.1;

/// Owns the corridor world and advances it one simulated minute per tick.
///
/// The engine is synchronous and timer-free. A driver (the runtime, the CLI,
/// or a test) calls [`SimulationEngine::tick`]; `start`/`pause` only flip the
/// running flag the driver consults.
pub struct SimulationEngine {
    config: SimulationConfig,
    world: World,
    running: bool,
    speed: f64,
    kpis: Kpis,
    bus: EventBus,
    source: Box<dyn RandomSource>,
}

impl fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("current_time", &self.world.current_time)
            .field("running", &self.running)
            .field("speed", &self.speed)
            .field("trains", &self.world.trains.len())
            .field("bus", &self.bus)
            .finish()
    }
}

impl SimulationEngine {
    /// Default corridor with a train set drawn from `source`.
    pub fn new(config: &SimulationConfig, mut source: Box<dyn RandomSource>) -> Self {
        let world = layout::build_world(config, source.as_mut());
        Self::with_world(config, world, source)
    }

    /// Default corridor seeded from `config.seed`.
    pub fn seeded(config: &SimulationConfig) -> Self {
        Self::new(config, random::seeded(config.seed))
    }

    /// Engine over a hand-built world. `reset` still rebuilds the default layout.
    pub fn with_world(
        config: &SimulationConfig,
        world: World,
        source: Box<dyn RandomSource>,
    ) -> Self {
        let mut engine = Self {
            config: config.clone(),
            world,
            running: false,
            speed: clamp_speed(config.initial_speed),
            kpis: Kpis::default(),
            bus: EventBus::new(),
            source,
        };
        engine.refresh_kpis();
        engine
    }

    /// Mark the simulation running. Returns `false` if it already was.
    pub fn start(&mut self) -> bool {
        if self.running {
            log_system_event(
                Some(&self.log_context()),
                "simulation.start",
                "simulation already running",
                SystemEventOutcome::Degraded,
            );
            return false;
        }
        self.running = true;
        self.publish(Event::new(
            EventKind::SimulationStarted,
            self.world.current_time,
            "Simulation started",
        ));
        log_system_event(
            Some(&self.log_context()),
            "simulation.start",
            "simulation started",
            SystemEventOutcome::Success,
        );
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
        self.publish(Event::new(
            EventKind::SimulationPaused,
            self.world.current_time,
            "Simulation paused",
        ));
        log_system_event(
            Some(&self.log_context()),
            "simulation.pause",
            "simulation paused",
            SystemEventOutcome::Success,
        );
    }

    /// Pause, rebuild the default corridor with a fresh train set, and restart
    /// the event log. Listeners and subscribers stay attached.
    pub fn reset(&mut self) {
        self.pause();
        self.world = layout::build_world(&self.config, self.source.as_mut());
        self.speed = clamp_speed(self.config.initial_speed);
        self.bus.clear();
        self.refresh_kpis();
        self.publish(Event::new(
            EventKind::SimulationReset,
            self.world.current_time,
            "Simulation reset",
        ));
        log_system_event(
            Some(&self.log_context()),
            "simulation.reset",
            "simulation reset",
            SystemEventOutcome::Success,
        );
    }

    /// Clamp and apply a speed multiplier, returning the effective value.
    pub fn set_speed(&mut self, multiplier: f64) -> f64 {
        let effective = clamp_speed(multiplier);
        self.speed = effective;
        self.publish(
            Event::new(
                EventKind::SpeedChanged,
                self.world.current_time,
                format!("Simulation speed set to {effective}x"),
            )
            .with_payload(json!({ "requested": multiplier, "effective": effective })),
        );
        let outcome = if effective == multiplier {
            SystemEventOutcome::Success
        } else {
            SystemEventOutcome::Degraded
        };
        log_system_event(
            Some(&self.log_context()),
            "simulation.speed",
            &format!("speed multiplier {effective} (requested {multiplier})"),
            outcome,
        );
        effective
    }

    /// Wall-clock period between ticks at the current speed.
    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.config.base_tick_period, self.speed)
    }

    /// Advance the world by one simulated minute.
    pub fn tick(&mut self) {
        self.world.current_time += 1;
        self.update_trains();
        self.admit_held_trains();
        self.update_signals();
        self.update_disruptions();
        self.refresh_kpis();
        self.log_state();
    }

    /// Queue a disruption; it takes effect on the first tick at or after its
    /// start time.
    pub fn inject_disruption(&mut self, spec: DisruptionSpec) -> String {
        let id = format!("disruption_{}", Uuid::new_v4().simple());
        let disruption = Disruption::from_spec(id.clone(), spec);
        let now = self.world.current_time;
        rcs_info!(
            context = self.log_context(),
            "disruption {} ({}) queued for minute {}",
            id,
            disruption.kind,
            disruption.start_time
        );
        let event = Event::new(
            EventKind::DisruptionInjected,
            now,
            format!("Disruption injected: {}", disruption.kind),
        )
        .with_payload(json!({
            "disruption_id": id,
            "type": disruption.kind.as_str(),
            "severity": disruption.severity,
            "affected_sections": disruption.affected_sections,
            "start_time": disruption.start_time,
            "duration": disruption.duration,
        }));
        self.world.disruptions.push(disruption);
        self.publish(event);
        id
    }

    /// Clear a signal's failure flag.
    pub fn repair_signal(&mut self, signal_id: &str) -> Result<()> {
        let index = self
            .world
            .signals
            .iter()
            .position(|signal| signal.id == signal_id)
            .ok_or_else(|| SimError::UnknownSignal(signal_id.to_string()))?;
        self.restore_signal(index);
        rcs_info!(context = self.log_context(), "signal {} repaired", signal_id);
        self.publish(
            Event::new(
                EventKind::SignalRepaired,
                self.world.current_time,
                format!("Signal {signal_id} repaired"),
            )
            .with_payload(json!({ "signal_id": signal_id })),
        );
        Ok(())
    }

    /// Mark a disruption resolved and undo its effect on the world.
    /// Resolving an already resolved disruption is a no-op.
    pub fn resolve_disruption(&mut self, disruption_id: &str) -> Result<()> {
        let index = self
            .world
            .disruptions
            .iter()
            .position(|d| d.id == disruption_id)
            .ok_or_else(|| SimError::UnknownDisruption(disruption_id.to_string()))?;
        if self.world.disruptions[index].resolved {
            return Ok(());
        }
        self.world.disruptions[index].resolved = true;
        let disruption = self.world.disruptions[index].clone();
        if disruption.applied {
            match disruption.kind {
                DisruptionKind::SignalFailure => {
                    for signal_index in self.signals_in(&disruption.affected_sections) {
                        if !self.failure_still_active(signal_index) {
                            self.restore_signal(signal_index);
                        }
                    }
                }
                DisruptionKind::Weather { .. } => self.refresh_weather(),
                DisruptionKind::TrackBlockage | DisruptionKind::EmergencyTrain => {}
            }
        }
        self.publish_resolved(&disruption, "resolved by operator");
        Ok(())
    }

    pub fn add_event_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.add_listener(listener)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            current_time: self.world.current_time,
            is_running: self.running,
            speed: self.speed,
            corridor_length_km: self.world.corridor_length_km,
            weather: self.world.weather.clone(),
            trains: self.world.trains.clone(),
            stations: self.world.stations.clone(),
            signals: self.world.signals.clone(),
            junctions: self.world.junctions.clone(),
            disruptions: self.world.disruptions.clone(),
            kpis: self.kpis.clone(),
            events: self.bus.events().to_vec(),
        }
    }

    pub fn trains(&self) -> Vec<Train> {
        self.world.trains.clone()
    }

    pub fn stations(&self) -> Vec<Station> {
        self.world.stations.clone()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.world.signals.clone()
    }

    pub fn disruptions(&self) -> Vec<Disruption> {
        self.world.disruptions.clone()
    }

    pub fn kpis(&self) -> Kpis {
        self.kpis.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.bus.events().to_vec()
    }

    pub fn weather(&self) -> &WeatherCondition {
        &self.world.weather
    }

    pub fn current_time(&self) -> u64 {
        self.world.current_time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn log_context<'a>(&self) -> LogContext<'a> {
        LogContext::new()
            .with_corridor(CORRIDOR)
            .with_tick(self.world.current_time)
    }

    fn publish(&mut self, event: Event) {
        self.bus.publish(event);
    }

    fn update_trains(&mut self) {
        for index in 0..self.world.trains.len() {
            if self.world.trains[index].status == TrainStatus::Stopped {
                self.advance_dwell(index);
            }
            if self.world.trains[index].status == TrainStatus::Running {
                self.move_train(index);
            }
        }
    }

    fn move_train(&mut self, index: usize) {
        let weather_factor = if self.world.weather.is_clear() {
            1.0
        } else {
            1.0 - self.world.weather.speed_reduction
        };
        let aspect = self
            .signal_ahead(self.world.trains[index].position_km)
            .map(|signal| signal.state);
        let corridor_length = self.world.corridor_length_km;

        let train = &mut self.world.trains[index];
        let mut target = train.max_speed_kmh * weather_factor;
        match aspect {
            Some(SignalAspect::Red) => target = 0.0,
            Some(SignalAspect::Yellow) => target *= 0.5,
            Some(SignalAspect::Green) | None => {}
        }
        train.speed_kmh = (train.speed_kmh + ACCELERATION_STEP_KMH).min(target);
        train.position_km = (train.position_km + train.speed_kmh / 60.0).min(corridor_length);
        train.energy_consumption += train.speed_kmh * ENERGY_PER_KMH;

        let position = train.position_km;
        let next_id = train.next_station.clone();
        let next = next_id
            .as_deref()
            .and_then(|id| self.world.station_index(id));
        if let Some(station_index) = next {
            if position >= self.world.stations[station_index].position_km - ARRIVAL_WINDOW_KM {
                self.arrive(index, station_index);
            }
        }
    }

    fn signal_ahead(&self, position_km: f64) -> Option<&Signal> {
        self.world.signals.iter().find(|signal| {
            signal.position_km > position_km && signal.position_km < position_km + SIGNAL_LOOKAHEAD_KM
        })
    }

    fn arrive(&mut self, train_index: usize, station_index: usize) {
        if self.world.stations[station_index].is_full() {
            self.hold(train_index, station_index);
        } else {
            self.admit(train_index, station_index);
        }
    }

    fn hold(&mut self, train_index: usize, station_index: usize) {
        let now = self.world.current_time;
        let station = &mut self.world.stations[station_index];
        let train = &mut self.world.trains[train_index];
        train.status = TrainStatus::Delayed;
        train.speed_kmh = 0.0;
        train.delay_min += HOLD_PENALTY_MIN;
        if !station.waiting_trains.contains(&train.id) {
            station.waiting_trains.push_back(train.id.clone());
        }

        let train_id = train.id.clone();
        let delay = train.delay_min;
        let station_id = station.id.clone();
        let station_name = station.name.clone();
        let queue_position = station.waiting_trains.len();
        rcs_warn!(
            context = self
                .log_context()
                .with_train(&train_id)
                .with_station(&station_id),
            "train {} held at {}: station at capacity",
            train_id,
            station_name
        );
        self.publish(
            Event::new(
                EventKind::TrainDelayed,
                now,
                format!("Train {train_id} delayed at {station_name}"),
            )
            .with_train(&train_id)
            .with_station(&station_id)
            .with_payload(json!({ "delay": delay, "queue_position": queue_position })),
        );
    }

    fn admit(&mut self, train_index: usize, station_index: usize) {
        let now = self.world.current_time;
        let corridor_length = self.world.corridor_length_km;
        let dwell = self.config.dwell_minutes;
        let station = &mut self.world.stations[station_index];
        let train = &mut self.world.trains[train_index];

        station.waiting_trains.retain(|id| id != &train.id);
        station.current_trains.push(train.id.clone());
        let platform = station.assign_platform(&train.id);

        train.status = TrainStatus::Stopped;
        train.speed_kmh = 0.0;
        train.position_km = train.position_km.max(station.position_km).min(corridor_length);
        let expected = expected_arrival(train, station.position_km);
        train.delay_min = (now as f64 - expected).max(0.0);
        train.current_station = Some(station.id.clone());
        train.next_station = train.station_after(&station.id).map(str::to_string);
        train.dwell_remaining = Some(dwell);

        let train_id = train.id.clone();
        let delay = train.delay_min;
        let station_id = station.id.clone();
        let station_name = station.name.clone();
        rcs_info!(
            context = self
                .log_context()
                .with_train(&train_id)
                .with_station(&station_id),
            "train {} arrived at {} ({:.1} min late)",
            train_id,
            station_name,
            delay
        );
        self.publish(
            Event::new(
                EventKind::TrainArrived,
                now,
                format!("Train {train_id} arrived at {station_name}"),
            )
            .with_train(&train_id)
            .with_station(&station_id)
            .with_payload(json!({ "delay": delay, "platform": platform })),
        );
    }

    fn advance_dwell(&mut self, train_index: usize) {
        let Some(left) = self.world.trains[train_index].dwell_remaining else {
            return;
        };
        if left > 1 {
            self.world.trains[train_index].dwell_remaining = Some(left - 1);
            return;
        }

        let now = self.world.current_time;
        let station_index = self.world.trains[train_index]
            .current_station
            .as_deref()
            .and_then(|id| self.world.station_index(id));
        let train = &mut self.world.trains[train_index];
        train.dwell_remaining = None;
        let train_id = train.id.clone();
        let station_id = train.current_station.clone().unwrap_or_default();
        if let Some(station_index) = station_index {
            self.world.stations[station_index].release(&train_id);
        }

        let train = &mut self.world.trains[train_index];
        if train.next_station.is_none() {
            rcs_info!(
                context = self
                    .log_context()
                    .with_train(&train_id)
                    .with_station(&station_id),
                "train {} reached the end of its route",
                train_id
            );
            return;
        }
        train.status = TrainStatus::Running;
        train.speed_kmh = 0.0;
        train.departed_at = now;
        train.departed_from_km = train.position_km;
        let next = train.next_station.clone();
        self.publish(
            Event::new(
                EventKind::TrainDeparted,
                now,
                format!("Train {train_id} departed {station_id}"),
            )
            .with_train(&train_id)
            .with_station(&station_id)
            .with_payload(json!({ "next_station": next })),
        );
    }

    /// Serve waiting queues first-in first-out while capacity allows.
    fn admit_held_trains(&mut self) {
        for station_index in 0..self.world.stations.len() {
            while !self.world.stations[station_index].is_full() {
                let Some(train_id) = self.world.stations[station_index].waiting_trains.pop_front()
                else {
                    break;
                };
                if let Some(train_index) = self.world.train_index(&train_id) {
                    if self.world.trains[train_index].status == TrainStatus::Delayed {
                        self.admit(train_index, station_index);
                    }
                }
            }
        }
    }

    fn update_signals(&mut self) {
        let now = self.world.current_time;
        let trains = &self.world.trains;
        for signal in self.world.signals.iter_mut() {
            let occupied = trains.iter().any(|train| {
                train.position_km > signal.position_km
                    && train.position_km < signal.position_km + BLOCK_LENGTH_KM
            });
            let aspect = if signal.failure || occupied {
                SignalAspect::Red
            } else {
                SignalAspect::Green
            };
            if aspect != signal.state {
                signal.state = aspect;
                signal.last_change = now;
            }
        }
    }

    fn update_disruptions(&mut self) {
        let now = self.world.current_time;
        for index in 0..self.world.disruptions.len() {
            let disruption = &self.world.disruptions[index];
            if !disruption.resolved && !disruption.applied && now >= disruption.start_time {
                self.activate(index);
            }
        }
        let mut weather_expired = false;
        for index in 0..self.world.disruptions.len() {
            let disruption = &self.world.disruptions[index];
            let expired = disruption.applied
                && !disruption.resolved
                && matches!(disruption.kind, DisruptionKind::Weather { .. })
                && now >= disruption.end_time();
            if expired {
                self.world.disruptions[index].resolved = true;
                weather_expired = true;
                let disruption = self.world.disruptions[index].clone();
                self.publish_resolved(&disruption, "weather cleared");
            }
        }
        if weather_expired {
            self.refresh_weather();
        }
    }

    /// Install the profile of the most recently started weather disruption
    /// still in force, or clear skies when none is left.
    fn refresh_weather(&mut self) {
        let now = self.world.current_time;
        let active = self
            .world
            .disruptions
            .iter()
            .filter(|d| d.applied && !d.resolved && now < d.end_time())
            .filter_map(|d| match d.kind {
                DisruptionKind::Weather { condition } => Some((d, condition)),
                _ => None,
            })
            .max_by_key(|(d, _)| d.start_time);
        self.world.weather = match active {
            Some((d, condition)) => {
                WeatherCondition::for_kind(condition, d.start_time, Some(d.end_time()))
            }
            None => WeatherCondition::clear(now),
        };
    }

    /// Whether another live signal-failure disruption still covers the signal.
    fn failure_still_active(&self, signal_index: usize) -> bool {
        let signal = &self.world.signals[signal_index];
        self.world.disruptions.iter().any(|d| {
            d.applied
                && !d.resolved
                && d.kind == DisruptionKind::SignalFailure
                && d.affected_sections.iter().any(|&km| signal.covers_section(km))
        })
    }

    fn activate(&mut self, index: usize) {
        let now = self.world.current_time;
        self.world.disruptions[index].applied = true;
        let disruption = self.world.disruptions[index].clone();
        match disruption.kind {
            DisruptionKind::SignalFailure => {
                for signal_index in self.signals_in(&disruption.affected_sections) {
                    let signal = &mut self.world.signals[signal_index];
                    signal.failure = true;
                    if signal.state != SignalAspect::Red {
                        signal.state = SignalAspect::Red;
                        signal.last_change = now;
                    }
                }
            }
            DisruptionKind::Weather { condition } => {
                self.world.weather = WeatherCondition::for_kind(
                    condition,
                    disruption.start_time,
                    Some(disruption.end_time()),
                );
            }
            // Consumed by the optimizer; no engine-side effect.
            DisruptionKind::TrackBlockage | DisruptionKind::EmergencyTrain => {}
        }
        rcs_warn!(
            context = self.log_context(),
            "disruption {} ({}) active on sections {:?}",
            disruption.id,
            disruption.kind,
            disruption.affected_sections
        );
        self.publish(
            Event::new(
                EventKind::DisruptionActivated,
                now,
                format!("Disruption active: {}", disruption.kind),
            )
            .with_payload(json!({
                "disruption_id": disruption.id,
                "type": disruption.kind.as_str(),
                "severity": disruption.severity,
                "affected_sections": disruption.affected_sections,
            })),
        );
    }

    fn publish_resolved(&mut self, disruption: &Disruption, reason: &str) {
        rcs_info!(
            context = self.log_context(),
            "disruption {} {}",
            disruption.id,
            reason
        );
        self.publish(
            Event::new(
                EventKind::DisruptionResolved,
                self.world.current_time,
                format!("Disruption resolved: {}", disruption.kind),
            )
            .with_payload(json!({
                "disruption_id": disruption.id,
                "type": disruption.kind.as_str(),
                "reason": reason,
            })),
        );
    }

    fn signals_in(&self, sections: &[u32]) -> Vec<usize> {
        self.world
            .signals
            .iter()
            .enumerate()
            .filter(|(_, signal)| sections.iter().any(|&km| signal.covers_section(km)))
            .map(|(index, _)| index)
            .collect()
    }

    fn restore_signal(&mut self, index: usize) {
        let now = self.world.current_time;
        let signal = &mut self.world.signals[index];
        signal.failure = false;
        if signal.state != SignalAspect::Green {
            signal.state = SignalAspect::Green;
            signal.last_change = now;
        }
    }

    fn refresh_kpis(&mut self) {
        let conflicts =
            conflicts::scan(&self.world.trains, &self.world.stations, &self.world.signals).len();
        self.kpis = calculate_kpis(&self.world.trains, self.world.current_time, conflicts);
    }

    fn log_state(&self) {
        let every = self.config.state_log_every;
        let now = self.world.current_time;
        if every == 0 || now % every != 0 || !tracing::enabled!(Level::DEBUG) {
            return;
        }
        let trains: Vec<_> = self
            .world
            .trains
            .iter()
            .map(|t| json!({ "id": t.id, "position": t.position_km, "delay": t.delay_min, "status": t.status }))
            .collect();
        let signals: Vec<_> = self
            .world
            .signals
            .iter()
            .map(|s| json!({ "id": s.id, "state": s.state, "failure": s.failure }))
            .collect();
        debug!(
            minute = now,
            trains = %serde_json::Value::from(trains),
            signals = %serde_json::Value::from(signals),
            average_delay = self.kpis.average_delay,
            conflicts = self.kpis.conflicts,
            "corridor state"
        );
    }
}

/// Timetabled arrival: departure minute plus running time at line speed,
/// padded by the recovery allowance.
fn expected_arrival(train: &Train, station_km: f64) -> f64 {
    let distance = (station_km - train.departed_from_km).max(0.0);
    if train.max_speed_kmh <= 0.0 {
        return train.departed_at as f64;
    }
    train.departed_at as f64 + distance / train.max_speed_kmh * 60.0 * RECOVERY_ALLOWANCE
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::layout::{default_signals, place_on_route};
    use crate::model::{Severity, TrainClass, WeatherKind};
    use crate::random::SequenceSource;

    fn engine_with(world: World, dwell_minutes: u32) -> SimulationEngine {
        let config = SimulationConfig {
            dwell_minutes,
            ..SimulationConfig::default()
        };
        SimulationEngine::with_world(&config, world, Box::new(SequenceSource::new(vec![0.5])))
    }

    fn line(stations: Vec<Station>, trains: Vec<Train>) -> World {
        let route: Vec<String> = stations.iter().map(|s| s.id.clone()).collect();
        let trains = trains
            .into_iter()
            .map(|train| {
                let mut train = train.with_route(route.clone());
                place_on_route(&mut train, &stations);
                train
            })
            .collect();
        World {
            stations,
            trains,
            ..World::empty(120.0)
        }
    }

    fn kinds(engine: &SimulationEngine) -> Vec<EventKind> {
        engine.events().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn start_is_idempotent_and_pause_keeps_state() {
        let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
        assert!(engine.start());
        assert!(!engine.start());
        engine.tick();
        engine.pause();
        assert!(!engine.is_running());
        assert_eq!(engine.current_time(), 1);
        let kinds = kinds(&engine);
        assert_eq!(kinds.first(), Some(&EventKind::SimulationStarted));
        assert_eq!(kinds.last(), Some(&EventKind::SimulationPaused));
        let starts = kinds
            .iter()
            .filter(|k| **k == EventKind::SimulationStarted)
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn speed_is_clamped_and_drives_the_tick_interval() {
        let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
        assert_eq!(engine.set_speed(25.0), 10.0);
        assert_eq!(engine.tick_interval(), Duration::from_millis(100));
        assert_eq!(engine.set_speed(0.01), 0.1);
        assert!(engine.tick_interval() > Duration::from_secs(9));
    }

    #[test]
    fn reset_restarts_the_log_but_keeps_listeners() {
        let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.add_event_listener(move |event| sink.lock().unwrap().push(event.kind));

        engine.start();
        for _ in 0..5 {
            engine.tick();
        }
        engine.reset();

        assert_eq!(engine.current_time(), 0);
        assert!(!engine.is_running());
        assert_eq!(kinds(&engine), [EventKind::SimulationReset]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&EventKind::SimulationStarted));
        assert_eq!(seen.last(), Some(&EventKind::SimulationReset));
    }

    #[test]
    fn occupied_block_turns_its_signal_red() {
        let world = World {
            signals: default_signals(20.0),
            trains: vec![Train::new("F1", TrainClass::Freight, 12.0)],
            ..World::empty(120.0)
        };
        let mut engine = engine_with(world, 2);
        engine.tick();

        let aspects: Vec<SignalAspect> = engine.signals().iter().map(|s| s.state).collect();
        assert_eq!(
            aspects,
            [SignalAspect::Green, SignalAspect::Red, SignalAspect::Green]
        );
        assert_eq!(engine.signals()[1].last_change, 1);
    }

    #[test]
    fn red_signal_ahead_stops_the_train() {
        let mut blocked = Signal::at(20);
        blocked.failure = true;
        blocked.state = SignalAspect::Red;
        let mut train = Train::new("E1", TrainClass::Express, 15.0);
        train.speed_kmh = 60.0;
        let world = World {
            signals: vec![blocked],
            trains: vec![train],
            ..World::empty(120.0)
        };
        let mut engine = engine_with(world, 2);
        engine.tick();
        let train = &engine.trains()[0];
        assert_eq!(train.speed_kmh, 0.0);
        assert_eq!(train.position_km, 15.0);
    }

    #[test]
    fn arrival_takes_a_platform_and_departs_after_dwell() {
        let stations = vec![
            Station::new("A", "Station A", 0.0, 2, 2),
            Station::new("B", "Junction B", 10.0, 2, 2),
            Station::new("C", "Station C", 20.0, 2, 2),
        ];
        let world = line(stations, vec![Train::new("E1", TrainClass::Express, 8.95)]);
        let mut engine = engine_with(world, 2);

        engine.tick();
        let train = &engine.trains()[0];
        assert_eq!(train.status, TrainStatus::Stopped);
        assert_eq!(train.position_km, 10.0);
        assert_eq!(train.current_station.as_deref(), Some("B"));
        assert_eq!(train.next_station.as_deref(), Some("C"));
        assert!(train.delay_min > 0.0 && train.delay_min < 1.0);
        let station = &engine.stations()[1];
        assert_eq!(station.current_trains, ["E1"]);
        assert_eq!(station.platform_occupancy["P1"].as_deref(), Some("E1"));

        engine.tick();
        assert_eq!(engine.trains()[0].status, TrainStatus::Stopped);
        engine.tick();
        let train = &engine.trains()[0];
        assert_eq!(train.status, TrainStatus::Running);
        assert_eq!(train.departed_at, 3);
        assert!(train.position_km > 10.0);
        assert!(engine.stations()[1].current_trains.is_empty());
        assert_eq!(
            kinds(&engine),
            [EventKind::TrainArrived, EventKind::TrainDeparted]
        );
    }

    #[test]
    fn full_station_holds_then_admits_in_order() {
        let stations = vec![
            Station::new("A", "Station A", 0.0, 1, 1),
            Station::new("B", "Junction B", 10.0, 1, 1),
            Station::new("C", "Station C", 20.0, 1, 1),
        ];
        let world = line(
            stations,
            vec![
                Train::new("E1", TrainClass::Express, 8.95),
                Train::new("E2", TrainClass::Express, 8.96),
            ],
        );
        let mut engine = engine_with(world, 1);

        engine.tick();
        let trains = engine.trains();
        assert_eq!(trains[0].status, TrainStatus::Stopped);
        assert_eq!(trains[1].status, TrainStatus::Delayed);
        assert_eq!(trains[1].delay_min, 5.0);
        assert_eq!(engine.stations()[1].waiting_trains, ["E2"]);

        engine.tick();
        let trains = engine.trains();
        assert_eq!(trains[0].status, TrainStatus::Running);
        assert_eq!(trains[1].status, TrainStatus::Stopped);
        let station = &engine.stations()[1];
        assert_eq!(station.current_trains, ["E2"]);
        assert!(station.waiting_trains.is_empty());
        assert!(kinds(&engine).contains(&EventKind::TrainDelayed));
    }

    #[test]
    fn terminus_retires_the_train() {
        let stations = vec![
            Station::new("A", "Station A", 0.0, 1, 1),
            Station::new("B", "Junction B", 10.0, 1, 1),
        ];
        let world = line(stations, vec![Train::new("L1", TrainClass::Suburban, 9.5)]);
        let mut engine = engine_with(world, 1);

        engine.tick();
        assert_eq!(engine.trains()[0].next_station, None);
        engine.tick();
        engine.tick();
        let train = &engine.trains()[0];
        assert_eq!(train.status, TrainStatus::Stopped);
        assert_eq!(train.dwell_remaining, None);
        assert_eq!(train.position_km, 10.0);
        assert!(engine.stations()[1].current_trains.is_empty());
        assert!(!kinds(&engine).contains(&EventKind::TrainDeparted));
    }

    #[test]
    fn weather_caps_speed_and_expires() {
        let mut train = Train::new("E1", TrainClass::Express, 40.0);
        train.speed_kmh = 100.0;
        let world = World {
            trains: vec![train],
            ..World::empty(120.0)
        };
        let mut engine = engine_with(world, 2);
        engine.inject_disruption(DisruptionSpec {
            kind: DisruptionKind::Weather {
                condition: WeatherKind::Fog,
            },
            severity: Severity::Medium,
            affected_sections: vec![40, 50],
            start_time: 1,
            duration: 2,
            description: "fog bank".into(),
        });

        engine.tick();
        assert_eq!(engine.weather().kind, WeatherKind::Fog);
        assert_eq!(engine.trains()[0].speed_kmh, 105.0);
        engine.tick();
        assert_eq!(engine.trains()[0].speed_kmh, 60.0);
        engine.tick();
        assert!(engine.weather().is_clear());
        assert!(engine.disruptions()[0].resolved);
        assert_eq!(
            kinds(&engine),
            [
                EventKind::DisruptionInjected,
                EventKind::DisruptionActivated,
                EventKind::DisruptionResolved
            ]
        );
    }

    #[test]
    fn signal_failure_freezes_red_until_repaired() {
        let world = World {
            signals: default_signals(30.0),
            ..World::empty(120.0)
        };
        let mut engine = engine_with(world, 2);
        let id = engine.inject_disruption(DisruptionSpec {
            kind: DisruptionKind::SignalFailure,
            severity: Severity::High,
            affected_sections: vec![20],
            start_time: 0,
            duration: 30,
            description: String::new(),
        });

        engine.tick();
        engine.tick();
        let failed = &engine.signals()[2];
        assert!(failed.failure);
        assert_eq!(failed.state, SignalAspect::Red);

        engine.repair_signal("S20").expect("known signal");
        assert!(!engine.signals()[2].failure);
        assert_eq!(
            engine.repair_signal("S99"),
            Err(SimError::UnknownSignal("S99".into()))
        );
        assert_eq!(
            engine.resolve_disruption("nope"),
            Err(SimError::UnknownDisruption("nope".into()))
        );
        engine.resolve_disruption(&id).expect("known disruption");
        assert!(engine.disruptions()[0].resolved);
    }

    #[test]
    fn expiring_weather_falls_back_to_the_longer_disruption() {
        let mut engine = engine_with(World::empty(120.0), 2);
        let fog = engine.inject_disruption(DisruptionSpec {
            kind: DisruptionKind::Weather {
                condition: WeatherKind::Fog,
            },
            severity: Severity::Medium,
            affected_sections: vec![60],
            start_time: 1,
            duration: 30,
            description: "valley fog".into(),
        });
        engine.inject_disruption(DisruptionSpec {
            kind: DisruptionKind::Weather {
                condition: WeatherKind::Rain,
            },
            severity: Severity::Low,
            affected_sections: vec![60],
            start_time: 5,
            duration: 5,
            description: "shower".into(),
        });

        for _ in 0..6 {
            engine.tick();
        }
        assert_eq!(engine.weather().kind, WeatherKind::Rain);
        for _ in 0..6 {
            engine.tick();
        }
        assert_eq!(engine.current_time(), 12);
        assert_eq!(engine.weather().kind, WeatherKind::Fog);
        assert!(!engine.disruptions()[0].resolved);
        assert!(engine.disruptions()[1].resolved);

        engine.resolve_disruption(&fog).expect("known disruption");
        assert!(engine.weather().is_clear());
    }

    #[test]
    fn overlapping_signal_failures_keep_the_signal_failed() {
        let world = World {
            signals: default_signals(40.0),
            ..World::empty(120.0)
        };
        let mut engine = engine_with(world, 2);
        let spec = DisruptionSpec {
            kind: DisruptionKind::SignalFailure,
            severity: Severity::Critical,
            affected_sections: vec![30],
            start_time: 0,
            duration: 60,
            description: String::new(),
        };
        let first = engine.inject_disruption(spec.clone());
        let second = engine.inject_disruption(spec);
        engine.tick();

        engine.resolve_disruption(&first).expect("known disruption");
        let s30 = &engine.signals()[3];
        assert!(s30.failure);
        assert_eq!(s30.state, SignalAspect::Red);

        engine.resolve_disruption(&second).expect("known disruption");
        assert!(!engine.signals()[3].failure);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let id = engine.add_event_listener(move |_| *counter.lock().unwrap() += 1);
        engine.start();
        assert!(engine.remove_event_listener(id));
        engine.pause();
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
