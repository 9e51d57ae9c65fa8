//! ---
//! rcs_section: "03-logging"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Structured logging context and lifecycle event helpers."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging context shared by the simulator crates.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline tracing subscriber suitable for tests and development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Corridor identifier associated with the log event.
    pub corridor: Option<&'a str>,
    /// Train identifier, when the event concerns a single train.
    pub train: Option<&'a str>,
    /// Station identifier, when the event concerns a station.
    pub station: Option<&'a str>,
    /// Simulated minute at which the event happened.
    pub tick: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a corridor identifier.
    pub fn with_corridor(mut self, corridor: &'a str) -> Self {
        self.corridor = Some(corridor);
        self
    }

    /// Attach a train identifier.
    pub fn with_train(mut self, train: &'a str) -> Self {
        self.train = Some(train);
        self
    }

    /// Attach a station identifier.
    pub fn with_station(mut self, station: &'a str) -> Self {
        self.station = Some(station);
        self
    }

    /// Attach a simulated minute.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The transition completed normally.
    Success,
    /// The transition was ignored or degraded to a neutral state.
    Degraded,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Degraded => "degraded",
        }
    }
}

/// Emit a standardized lifecycle event (start, pause, reset, speed change).
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level, so dispatch per level.
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                corridor = ctx.corridor.unwrap_or(""),
                tick = ctx.tick.unwrap_or_default(),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Degraded => emit!(Level::WARN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_corridor("main-line")
            .with_train("E1")
            .with_tick(12);
        rcs_info!(context = ctx.clone(), "train arrived");
        rcs_debug!("debug message");
        rcs_warn!(context = ctx, "train held: {}", 5);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_corridor("main-line").with_tick(3);
        log_system_event(
            Some(&ctx),
            "simulation.started",
            "simulation started",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "simulation.started",
            "already running",
            SystemEventOutcome::Degraded,
        );
    }
}
