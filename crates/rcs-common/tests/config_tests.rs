//! ---
//! rcs_section: "01-core-functionality"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Shared primitives and utilities for the simulator runtime."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use rcs_common::config::AppConfig;
use rcs_common::logging::LogFormat;
use tempfile::NamedTempFile;

#[test]
fn empty_document_yields_defaults() {
    let config = AppConfig::from_str("").expect("defaults parse");
    assert_eq!(config.simulation.seed, 0xA11CE);
    assert_eq!(config.simulation.base_tick_period, Duration::from_millis(1000));
    assert_eq!(config.simulation.fleet.total(), 14);
    assert_eq!(config.optimizer.max_recommendations, 5);
    assert_eq!(config.optimizer.confidence_threshold, 70.0);
    assert_eq!(config.logging.format, LogFormat::StructuredJson);
}

#[test]
fn overrides_are_read_from_toml() {
    let config = AppConfig::from_str(
        r#"
        [simulation]
        seed = 7
        initial_speed = 4.0
        base_tick_period = 250
        dwell_minutes = 3

        [simulation.fleet]
        express = 2
        freight = 1
        suburban = 0

        [optimizer]
        max_recommendations = 3

        [logging]
        format = "pretty"
        "#,
    )
    .expect("valid config");
    assert_eq!(config.simulation.seed, 7);
    assert_eq!(config.simulation.initial_speed, 4.0);
    assert_eq!(config.simulation.base_tick_period, Duration::from_millis(250));
    assert_eq!(config.simulation.fleet.total(), 3);
    assert_eq!(config.optimizer.max_recommendations, 3);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn validation_rejects_empty_fleet_and_bad_speed() {
    let empty_fleet = AppConfig::from_str(
        r#"
        [simulation.fleet]
        express = 0
        freight = 0
        suburban = 0
        "#,
    );
    assert!(empty_fleet.is_err());

    let bad_speed = AppConfig::from_str(
        r#"
        [simulation]
        initial_speed = 25.0
        "#,
    );
    assert!(bad_speed.is_err());

    let no_recommendations = AppConfig::from_str(
        r#"
        [optimizer]
        max_recommendations = 0
        "#,
    );
    assert!(no_recommendations.is_err());
}

#[test]
fn load_prefers_first_existing_candidate() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "[simulation]\nseed = 99")?;
    file.flush()?;

    let missing = std::path::PathBuf::from("does/not/exist.toml");
    let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
    assert_eq!(loaded.config.simulation.seed, 99);
    assert_eq!(loaded.source.as_deref(), Some(file.path()));
    Ok(())
}

#[test]
fn load_falls_back_to_defaults_without_candidates() -> anyhow::Result<()> {
    let loaded = AppConfig::load_with_source(&["does/not/exist.toml"])?;
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.simulation.corridor_length_km, 120.0);
    Ok(())
}
