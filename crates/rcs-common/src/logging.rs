//! ---
//! rcs_section: "01-core-functionality"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Shared primitives and utilities for the simulator runtime."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "RCS_LOG";

/// Target of the engine's periodic corridor state lines.
pub const STATE_LOG_TARGET: &str = "rcs_sim::engine";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for the simulator binaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Filter used when neither `RCS_LOG` nor `RUST_LOG` is set. The engine's
/// state lines are emitted at debug level, so they get their own directive
/// unless `state_log` is off.
pub fn default_directive(config: &LoggingConfig) -> String {
    let mut directive = config.level.clone();
    if config.state_log {
        directive.push_str(&format!(",{STATE_LOG_TARGET}=debug"));
    }
    directive
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let fallback = default_directive(config);
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive {directive:?} ({err}); using {fallback}");
            EnvFilter::new(&fallback)
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&fallback)),
    }
}

fn stdout_layer<S>(
    format: LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .boxed(),
    }
}

/// Install the process-wide subscriber for a simulator binary.
///
/// The filter comes from `RCS_LOG`, then `RUST_LOG`, then
/// [`default_directive`]. Stdout gets JSON or pretty output per
/// [`LogFormat`]; every event is also appended as JSON to a daily file
/// `<prefix>-<service>.log` under the configured directory.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let file_appender = daily(&config.directory, format!("{prefix}-{service_name}.log"));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = FILE_GUARD.set(file_guard);
    let _ = STDOUT_GUARD.set(stdout_guard);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer);

    // a second call keeps the first subscriber
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stdout_layer(config.format, stdout_writer))
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        state_log = config.state_log,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_enables_state_lines() {
        let config = LoggingConfig::default();
        assert_eq!(default_directive(&config), "info,rcs_sim::engine=debug");
        assert!(EnvFilter::try_new(default_directive(&config)).is_ok());
    }

    #[test]
    fn state_lines_can_be_silenced() {
        let config = LoggingConfig {
            level: "warn".into(),
            state_log: false,
            ..LoggingConfig::default()
        };
        assert_eq!(default_directive(&config), "warn");
    }
}
