//! ---
//! rcs_section: "06-runtime"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Timer-driven corridor runtime and operator controls."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use rcs_common::config::AppConfig;
use rcs_logging::{log_system_event, LogContext, SystemEventOutcome};
use rcs_messaging::{Event, EventReceiver, ListenerId};
use rcs_optimizer::{ActionDirective, OptimizationResult, Optimizer, Recommendation};
use rcs_sim::{
    Disruption, DisruptionSpec, Kpis, SimError, SimulationEngine, Train, WorldSnapshot,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub const CORRIDOR_ID: &str = "main-line";

/// What happened to a directive passed to [`CorridorRuntime::apply_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The engine state was changed.
    Applied,
    /// Logged for the dispatcher; the engine has no actuator for it.
    Advisory,
}

#[derive(Debug)]
struct TickerHandle {
    period: Duration,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    async fn stop(self) {
        // the task may already have exited after an engine-side pause
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            error!(corridor = CORRIDOR_ID, error = %err, "ticker task join error");
        }
    }
}

/// Shared corridor runtime.
///
/// The engine sits behind one lock taken by both the ticker task and every
/// operator call, so a tick never interleaves with an applied action.
/// Methods that spawn the ticker must run inside a tokio runtime.
#[derive(Debug)]
pub struct CorridorRuntime {
    engine: Arc<Mutex<SimulationEngine>>,
    optimizer: Mutex<Optimizer>,
    ticker: Mutex<Option<TickerHandle>>,
}

impl CorridorRuntime {
    pub fn new(engine: SimulationEngine, optimizer: Optimizer) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            optimizer: Mutex::new(optimizer),
            ticker: Mutex::new(None),
        }
    }

    /// Validated config, seeded engine, default strategies.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let engine = SimulationEngine::seeded(&config.simulation);
        let optimizer = Optimizer::new(config.optimizer.clone());
        info!(
            corridor = CORRIDOR_ID,
            seed = config.simulation.seed,
            trains = engine.trains().len(),
            "corridor runtime initialised"
        );
        Ok(Self::new(engine, optimizer))
    }

    /// Handle to the locked engine for callers needing several reads at once.
    pub fn engine(&self) -> Arc<Mutex<SimulationEngine>> {
        Arc::clone(&self.engine)
    }

    /// Start ticking. Returns `false` when the simulation was already running.
    pub fn start(&self) -> bool {
        let started = self.engine.lock().start();
        let ticking = {
            let mut ticker = self.ticker.lock();
            // the task exits on its own once it sees a paused engine
            if ticker.as_ref().is_some_and(|t| t.task.is_finished()) {
                ticker.take();
            }
            ticker.is_some()
        };
        if !ticking {
            self.spawn_ticker();
        }
        started
    }

    /// Stop the ticker and wait for it to finish before pausing the engine.
    pub async fn pause(&self) {
        self.stop_ticker().await;
        self.engine.lock().pause();
    }

    /// Stop ticking and rebuild the corridor. Listeners stay attached.
    pub async fn reset(&self) {
        self.stop_ticker().await;
        self.engine.lock().reset();
    }

    /// Apply a speed multiplier; a running ticker restarts at the new period.
    pub async fn set_speed(&self, multiplier: f64) -> f64 {
        let effective = self.engine.lock().set_speed(multiplier);
        let was_ticking = self.stop_ticker().await;
        if was_ticking && self.engine.lock().is_running() {
            self.spawn_ticker();
        }
        effective
    }

    /// Period of the live ticker, if any.
    pub fn tick_period(&self) -> Option<Duration> {
        self.ticker.lock().as_ref().map(|ticker| ticker.period)
    }

    /// Advance one simulated minute outside the timer.
    pub fn step(&self) {
        self.engine.lock().tick();
    }

    pub fn inject_disruption(&self, spec: DisruptionSpec) -> String {
        self.engine.lock().inject_disruption(spec)
    }

    pub fn repair_signal(&self, signal_id: &str) -> rcs_sim::Result<()> {
        self.engine.lock().repair_signal(signal_id)
    }

    pub fn resolve_disruption(&self, disruption_id: &str) -> rcs_sim::Result<()> {
        self.engine.lock().resolve_disruption(disruption_id)
    }

    /// Snapshot under the engine lock, then score without holding it.
    pub fn optimize(&self) -> OptimizationResult {
        let snapshot = self.engine.lock().snapshot();
        self.optimizer.lock().optimize(&snapshot)
    }

    /// Immediate response to a known disruption.
    pub fn handle_disruption(&self, disruption_id: &str) -> rcs_sim::Result<Vec<Recommendation>> {
        let (disruption, snapshot) = {
            let engine = self.engine.lock();
            let disruption = engine
                .disruptions()
                .into_iter()
                .find(|d| d.id == disruption_id)
                .ok_or_else(|| SimError::UnknownDisruption(disruption_id.to_string()))?;
            (disruption, engine.snapshot())
        };
        Ok(self.optimizer.lock().handle_disruption(&disruption, &snapshot))
    }

    /// Carry out a recommendation directive.
    ///
    /// Signal repairs act on the engine; every other directive is advisory.
    /// A repair naming an unknown signal fails before any signal is touched.
    pub fn apply_action(&self, directive: &ActionDirective) -> rcs_sim::Result<ActionOutcome> {
        match directive {
            ActionDirective::SignalRepair { signals } => {
                let mut engine = self.engine.lock();
                let known: Vec<String> = engine.signals().into_iter().map(|s| s.id).collect();
                if let Some(unknown) = signals.iter().find(|id| !known.contains(id)) {
                    return Err(SimError::UnknownSignal(unknown.clone()));
                }
                for signal in signals {
                    engine.repair_signal(signal)?;
                }
                info!(corridor = CORRIDOR_ID, signals = ?signals, "signal repair applied");
                Ok(ActionOutcome::Applied)
            }
            other => {
                info!(corridor = CORRIDOR_ID, directive = ?other, "advisory directive logged");
                Ok(ActionOutcome::Advisory)
            }
        }
    }

    pub fn optimization_history(&self) -> Vec<OptimizationResult> {
        self.optimizer.lock().history().cloned().collect()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.engine.lock().snapshot()
    }

    pub fn trains(&self) -> Vec<Train> {
        self.engine.lock().trains()
    }

    pub fn disruptions(&self) -> Vec<Disruption> {
        self.engine.lock().disruptions()
    }

    pub fn kpis(&self) -> Kpis {
        self.engine.lock().kpis()
    }

    pub fn events(&self) -> Vec<Event> {
        self.engine.lock().events()
    }

    pub fn current_time(&self) -> u64 {
        self.engine.lock().current_time()
    }

    pub fn is_running(&self) -> bool {
        self.engine.lock().is_running()
    }

    pub fn speed(&self) -> f64 {
        self.engine.lock().speed()
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.engine.lock().subscribe()
    }

    pub fn add_event_listener<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.engine.lock().add_event_listener(listener)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.engine.lock().remove_event_listener(id)
    }

    fn spawn_ticker(&self) {
        let period = self.engine.lock().tick_interval();
        let engine = Arc::clone(&self.engine);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(corridor = CORRIDOR_ID, "ticker shutdown signal received");
                        break;
                    }
                    _ = interval.tick() => {
                        if !advance(&engine) {
                            debug!(corridor = CORRIDOR_ID, "engine paused, ticker exiting");
                            break;
                        }
                    }
                }
            }
        });
        log_system_event(
            Some(&LogContext::new().with_corridor(CORRIDOR_ID)),
            "runtime.ticker",
            &format!("ticker started with period {period:?}"),
            SystemEventOutcome::Success,
        );
        *self.ticker.lock() = Some(TickerHandle {
            period,
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Returns whether a ticker was running.
    async fn stop_ticker(&self) -> bool {
        let ticker = self.ticker.lock().take();
        match ticker {
            Some(ticker) => {
                ticker.stop().await;
                true
            }
            None => false,
        }
    }
}

impl Drop for CorridorRuntime {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.task.abort();
        }
    }
}

/// One tick under the lock. Returns `false` once the engine is paused.
fn advance(engine: &Mutex<SimulationEngine>) -> bool {
    let mut engine = engine.lock();
    if !engine.is_running() {
        return false;
    }
    engine.tick();
    true
}
