use std::fs;

use rcs_common::{OptimizerConfig, SimulationConfig};
use rcs_optimizer::{
    compare_performance, export_comparison, load_kpi_samples, write_kpi_samples,
    ActionDirective, Optimizer, RecommendationKind, ReportExporter,
};
use rcs_sim::{
    DisruptionKind, DisruptionSpec, Severity, SimulationEngine, Station, World, WorldSnapshot,
};
use tempfile::tempdir;

fn signal_failure_at(km: u32) -> DisruptionSpec {
    DisruptionSpec {
        kind: DisruptionKind::SignalFailure,
        severity: Severity::Critical,
        affected_sections: vec![km],
        start_time: 0,
        duration: 60,
        description: "interlocking fault".into(),
    }
}

#[test]
fn failed_signal_on_live_corridor_ranks_a_repair() {
    let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
    engine.inject_disruption(signal_failure_at(30));
    engine.tick();

    let mut optimizer = Optimizer::new(OptimizerConfig::default());
    let result = optimizer.optimize(&engine.snapshot());

    assert!(result.success);
    assert!(result.recommendations.len() <= 5);
    assert!(result.confidence <= 95.0);
    let repair = result
        .recommendations
        .iter()
        .find(|r| r.kind == RecommendationKind::SignalRepair)
        .expect("signal repair recommended");
    assert_eq!(repair.id, "signal_signal_failure_S30");
    assert_eq!(
        repair.directive,
        ActionDirective::SignalRepair {
            signals: vec!["S30".into()]
        }
    );
    let scores: Vec<f64> = result.recommendations.iter().map(|r| r.score()).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn disruption_response_matches_live_disruption() {
    let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
    engine.inject_disruption(signal_failure_at(60));
    let disruption = engine.disruptions().remove(0);

    let optimizer = Optimizer::default();
    let response = optimizer.handle_disruption(&disruption, &engine.snapshot());
    assert_eq!(response.len(), 1);
    assert_eq!(response[0].kind, RecommendationKind::SignalRepair);
    assert_eq!(response[0].confidence, 90.0);
    assert_eq!(response[0].estimated_savings, 1200.0);
    assert_eq!(response[0].id, format!("signal_failure_{}", disruption.id));
}

#[test]
fn capacity_one_station_holding_three_trains_is_critical() {
    let mut world = World::empty(120.0);
    let mut station = Station::new("B", "Junction B", 30.0, 1, 1);
    station.current_trains = vec!["E1".into(), "F1".into(), "L1".into()];
    world.stations.push(station);

    let mut optimizer = Optimizer::default();
    let result = optimizer.optimize(&WorldSnapshot::from_world(&world));
    assert_eq!(result.conflicts.len(), 1);
    let congestion = &result.conflicts[0];
    assert_eq!(congestion.conflict_id, "station_congestion_B");
    assert_eq!(congestion.severity, Severity::Critical);
    assert_eq!(congestion.current_impact, 10.0);
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(
        result.recommendations[0].kind,
        RecommendationKind::PlatformReallocation
    );
}

#[test]
fn exports_reports_and_round_trips_kpi_samples() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let mut engine = SimulationEngine::seeded(&SimulationConfig::default());
    engine.inject_disruption(signal_failure_at(30));

    let mut samples = Vec::new();
    for _ in 0..30 {
        engine.tick();
        samples.push(engine.kpis());
    }
    let samples_path = dir.path().join("ai.csv");
    write_kpi_samples(&samples_path, &samples)?;
    let loaded = load_kpi_samples(&samples_path)?;
    assert_eq!(loaded.len(), 30);

    let comparison = compare_performance(&loaded, &samples);
    assert!(comparison.improvement.delay_reduction.abs() < 1e-9);

    let mut optimizer = Optimizer::default();
    let result = optimizer.optimize(&engine.snapshot());
    ReportExporter::new(&result)
        .with_comparison(&comparison)
        .export(&dir.path().join("reports"))?;

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("reports/optimization.json"))?)?;
    assert_eq!(report["model_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(report["data"]["success"], result.success);
    assert!(dir.path().join("reports/recommendations.csv").exists());
    assert!(dir.path().join("reports/comparison.json").exists());

    let standalone = export_comparison(&dir.path().join("compare"), &comparison)?;
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&standalone)?)?;
    let attached: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("reports/comparison.json"))?)?;
    assert_eq!(written["schema"], attached["schema"]);
    assert_eq!(written["data"], attached["data"]);
    assert_eq!(written["data"]["scenario"], "AI vs Manual Comparison");
    Ok(())
}
