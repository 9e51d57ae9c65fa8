//! ---
//! rcs_section: "01-core-functionality"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Shared primitives and utilities for the simulator runtime."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;
use crate::time::{MAX_SPEED_MULTIPLIER, MIN_SPEED_MULTIPLIER};

fn default_simulation_seed() -> u64 {
    0xA11CEu64
}

fn default_initial_speed() -> f64 {
    1.0
}

fn default_base_tick_period() -> Duration {
    Duration::from_millis(1000)
}

fn default_dwell_minutes() -> u32 {
    2
}

fn default_state_log_every() -> u64 {
    1
}

fn default_corridor_length() -> f64 {
    120.0
}

fn default_express_count() -> u32 {
    8
}

fn default_freight_count() -> u32 {
    4
}

fn default_suburban_count() -> u32 {
    2
}

fn default_confidence_threshold() -> f64 {
    70.0
}

fn default_max_recommendations() -> usize {
    5
}

fn default_history_window() -> usize {
    10
}

fn default_confidence_cap() -> f64 {
    95.0
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_state_log() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the simulator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "RCS_CONFIG";

    /// Load configuration from disk, respecting the `RCS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Falls back to built-in defaults when no candidate exists; the corridor
    /// layout is fixed, so a missing file is not an error.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.optimizer.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_seed")]
    pub seed: u64,
    #[serde(default = "default_initial_speed")]
    pub initial_speed: f64,
    #[serde(default = "default_base_tick_period")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base_tick_period: Duration,
    #[serde(default = "default_dwell_minutes")]
    pub dwell_minutes: u32,
    #[serde(default = "default_state_log_every")]
    pub state_log_every: u64,
    #[serde(default = "default_corridor_length")]
    pub corridor_length_km: f64,
    #[serde(default)]
    pub fleet: FleetConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_simulation_seed(),
            initial_speed: default_initial_speed(),
            base_tick_period: default_base_tick_period(),
            dwell_minutes: default_dwell_minutes(),
            state_log_every: default_state_log_every(),
            corridor_length_km: default_corridor_length(),
            fleet: FleetConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.corridor_length_km.is_finite() && self.corridor_length_km > 0.0) {
            return Err(anyhow!(
                "corridor_length_km must be positive, got {}",
                self.corridor_length_km
            ));
        }
        if !(MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER).contains(&self.initial_speed) {
            return Err(anyhow!(
                "initial_speed {} outside [{}, {}]",
                self.initial_speed,
                MIN_SPEED_MULTIPLIER,
                MAX_SPEED_MULTIPLIER
            ));
        }
        if self.base_tick_period.is_zero() {
            return Err(anyhow!("base_tick_period must be non-zero"));
        }
        if self.fleet.total() == 0 {
            return Err(anyhow!("fleet must contain at least one train"));
        }
        Ok(())
    }
}

/// Number of trains seeded per class on start and reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FleetConfig {
    #[serde(default = "default_express_count")]
    pub express: u32,
    #[serde(default = "default_freight_count")]
    pub freight: u32,
    #[serde(default = "default_suburban_count")]
    pub suburban: u32,
}

impl FleetConfig {
    pub fn total(&self) -> u32 {
        self.express + self.freight + self.suburban
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            express: default_express_count(),
            freight: default_freight_count(),
            suburban: default_suburban_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Candidates must score strictly above this confidence to survive.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_confidence_cap")]
    pub confidence_cap: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_recommendations: default_max_recommendations(),
            history_window: default_history_window(),
            confidence_cap: default_confidence_cap(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_recommendations == 0 {
            return Err(anyhow!("max_recommendations must be at least 1"));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence_threshold {} outside [0, 100]",
                self.confidence_threshold
            ));
        }
        if !(0.0..=100.0).contains(&self.confidence_cap) {
            return Err(anyhow!(
                "confidence_cap {} outside [0, 100]",
                self.confidence_cap
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Base filter directive when no env override is present.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show the engine's periodic state lines (debug level) by default.
    #[serde(default = "default_state_log")]
    pub state_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            level: default_log_level(),
            state_log: default_state_log(),
        }
    }
}
