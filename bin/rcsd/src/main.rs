//! ---
//! rcs_section: "07-binaries"
//! rcs_subsection: "binary"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Binary entrypoint for the rail corridor simulator."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rcs_common::config::AppConfig;
use rcs_common::logging::init_tracing;
use rcs_core::CorridorRuntime;
use rcs_optimizer::{
    compare_performance, export_comparison, load_kpi_samples, write_kpi_samples,
    OptimizationResult, Optimizer, ReportExporter,
};
use rcs_sim::{DisruptionSpec, SimulationEngine};
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Rail corridor simulator", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the simulation seed")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run a headless simulation and print a JSON summary")]
    Simulate {
        #[arg(long, default_value_t = 240, help = "Simulated minutes to run")]
        ticks: u64,
        #[arg(long, value_name = "N", help = "Run the optimizer every N ticks")]
        optimize_every: Option<u64>,
        #[arg(long, value_name = "FILE", help = "JSON array of disruptions to inject")]
        disruptions: Option<PathBuf>,
        #[arg(long, value_name = "FILE", help = "Write per-tick KPI samples (.csv or .json)")]
        kpi_out: Option<PathBuf>,
        #[arg(long, value_name = "DIR", help = "Export the last optimization report")]
        report_dir: Option<PathBuf>,
    },
    #[command(about = "Drive the corridor in real time until ctrl-c")]
    Run {
        #[arg(long, help = "Initial speed multiplier")]
        speed: Option<f64>,
        #[arg(long, value_name = "SECS", help = "Run the optimizer every SECS seconds")]
        optimize_every: Option<u64>,
    },
    #[command(about = "Compare optimised against manual KPI samples")]
    Compare {
        #[arg(long, value_name = "FILE")]
        ai: PathBuf,
        #[arg(long, value_name = "FILE")]
        manual: PathBuf,
        #[arg(long, value_name = "DIR", help = "Also write comparison.json into DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct OptimizationDigest {
    time: u64,
    success: bool,
    confidence: f64,
    recommendations: Vec<String>,
}

impl From<&OptimizationResult> for OptimizationDigest {
    fn from(result: &OptimizationResult) -> Self {
        Self {
            time: result.snapshot_time,
            success: result.success,
            confidence: result.confidence,
            recommendations: result.recommendations.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    seed: u64,
    minutes: u64,
    trains: usize,
    events: usize,
    disruptions: usize,
    kpis: rcs_sim::Kpis,
    optimizations: Vec<OptimizationDigest>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/rcs.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    config.validate()?;
    init_tracing("rcsd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using defaults"),
    }

    match cli.command {
        Commands::Simulate {
            ticks,
            optimize_every,
            disruptions,
            kpi_out,
            report_dir,
        } => simulate(
            &config,
            ticks,
            optimize_every,
            disruptions.as_deref(),
            kpi_out.as_deref(),
            report_dir.as_deref(),
        )?,
        Commands::Run {
            speed,
            optimize_every,
        } => run(&config, speed, optimize_every).await?,
        Commands::Compare { ai, manual, out } => compare(&ai, &manual, out.as_deref())?,
    }

    Ok(())
}

fn load_disruptions(path: &Path) -> Result<Vec<DisruptionSpec>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read disruptions file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid disruptions JSON {}", path.display()))
}

fn simulate(
    config: &AppConfig,
    ticks: u64,
    optimize_every: Option<u64>,
    disruptions: Option<&Path>,
    kpi_out: Option<&Path>,
    report_dir: Option<&Path>,
) -> Result<()> {
    let mut engine = SimulationEngine::seeded(&config.simulation);
    let mut optimizer = Optimizer::new(config.optimizer.clone());

    if let Some(path) = disruptions {
        for spec in load_disruptions(path)? {
            engine.inject_disruption(spec);
        }
    }

    engine.start();
    let mut samples = Vec::with_capacity(ticks as usize);
    let mut optimizations = Vec::new();
    let mut last_result = None;
    for minute in 1..=ticks {
        engine.tick();
        samples.push(engine.kpis());
        if let Some(every) = optimize_every.filter(|every| *every > 0) {
            if minute % every == 0 {
                let result = optimizer.optimize(&engine.snapshot());
                optimizations.push(OptimizationDigest::from(&result));
                last_result = Some(result);
            }
        }
    }
    engine.pause();

    if let Some(path) = kpi_out {
        write_kpi_samples(path, &samples)
            .with_context(|| format!("unable to write KPI samples to {}", path.display()))?;
        info!(samples = samples.len(), path = %path.display(), "KPI samples written");
    }
    if let Some(dir) = report_dir {
        let result = match last_result {
            Some(result) => result,
            None => optimizer.optimize(&engine.snapshot()),
        };
        ReportExporter::new(&result)
            .export(dir)
            .with_context(|| format!("unable to export reports to {}", dir.display()))?;
    }

    let summary = SimulationSummary {
        seed: config.simulation.seed,
        minutes: engine.current_time(),
        trains: engine.trains().len(),
        events: engine.events().len(),
        disruptions: engine.disruptions().len(),
        kpis: engine.kpis(),
        optimizations,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run(config: &AppConfig, speed: Option<f64>, optimize_every: Option<u64>) -> Result<()> {
    let runtime = CorridorRuntime::from_config(config)?;
    runtime.start();
    if let Some(multiplier) = speed {
        let effective = runtime.set_speed(multiplier).await;
        if effective != multiplier {
            warn!(requested = multiplier, effective, "speed multiplier clamped");
        }
    }

    let period = Duration::from_secs(optimize_every.unwrap_or(0).max(1));
    let mut optimize_timer = tokio::time::interval(period);
    optimize_timer.tick().await;

    info!("corridor running; waiting for termination signal");
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("ctrl-c received; shutting down");
                break;
            }
            _ = optimize_timer.tick(), if optimize_every.is_some() => {
                let result = runtime.optimize();
                info!(
                    time = result.snapshot_time,
                    success = result.success,
                    confidence = result.confidence,
                    recommendations = result.recommendations.len(),
                    "periodic optimization"
                );
            }
        }
    }

    runtime.pause().await;
    let kpis = runtime.kpis();
    info!(
        minutes = runtime.current_time(),
        average_delay = kpis.average_delay,
        system_efficiency = kpis.system_efficiency,
        "corridor stopped"
    );
    Ok(())
}

fn compare(ai: &Path, manual: &Path, out: Option<&Path>) -> Result<()> {
    let ai_samples = load_kpi_samples(ai)
        .with_context(|| format!("unable to load AI samples {}", ai.display()))?;
    let manual_samples = load_kpi_samples(manual)
        .with_context(|| format!("unable to load manual samples {}", manual.display()))?;
    let comparison = compare_performance(&ai_samples, &manual_samples);

    if let Some(dir) = out {
        let path = export_comparison(dir, &comparison)
            .with_context(|| format!("unable to write comparison to {}", dir.display()))?;
        info!(path = %path.display(), "comparison written");
    }
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}
