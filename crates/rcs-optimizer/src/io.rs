//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! KPI sample files consumed by [`compare_performance`](crate::compare_performance).
//!
//! Both CSV (header row required) and JSON arrays are accepted; missing
//! columns default to zero so dashboards exporting a subset still load.

use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use rcs_sim::Kpis;
use serde::{Deserialize, Serialize};

use crate::errors::{OptimizerError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiSample {
    #[serde(alias = "trainsClearedPerHour")]
    pub trains_cleared_per_hour: f64,
    #[serde(alias = "averageDelay")]
    pub average_delay: f64,
    #[serde(alias = "passengerImpact")]
    pub passenger_impact: f64,
    #[serde(alias = "energyUsage")]
    pub energy_usage: f64,
    #[serde(alias = "systemEfficiency")]
    pub system_efficiency: f64,
    pub conflicts: f64,
    #[serde(alias = "totalDelay")]
    pub total_delay: f64,
    pub throughput: f64,
}

impl From<KpiSample> for Kpis {
    fn from(sample: KpiSample) -> Self {
        Kpis {
            trains_cleared_per_hour: sample.trains_cleared_per_hour,
            average_delay: sample.average_delay,
            passenger_impact: sample.passenger_impact,
            energy_usage: sample.energy_usage,
            system_efficiency: sample.system_efficiency,
            conflicts: sample.conflicts,
            total_delay: sample.total_delay,
            throughput: sample.throughput,
        }
    }
}

impl From<&Kpis> for KpiSample {
    fn from(kpis: &Kpis) -> Self {
        KpiSample {
            trains_cleared_per_hour: kpis.trains_cleared_per_hour,
            average_delay: kpis.average_delay,
            passenger_impact: kpis.passenger_impact,
            energy_usage: kpis.energy_usage,
            system_efficiency: kpis.system_efficiency,
            conflicts: kpis.conflicts,
            total_delay: kpis.total_delay,
            throughput: kpis.throughput,
        }
    }
}

/// Load KPI samples, dispatching on the file extension.
pub fn load_kpi_samples(path: &Path) -> Result<Vec<Kpis>> {
    let samples: Vec<KpiSample> = match extension(path).as_deref() {
        Some("json") => serde_json::from_str(&fs::read_to_string(path)?)?,
        Some("csv") => {
            let mut reader = ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(path)?;
            reader
                .deserialize::<KpiSample>()
                .collect::<std::result::Result<_, _>>()?
        }
        _ => return Err(OptimizerError::UnsupportedFormat(path.display().to_string())),
    };
    Ok(samples.into_iter().map(Kpis::from).collect())
}

/// Write KPI samples in the format implied by the file extension.
pub fn write_kpi_samples(path: &Path, samples: &[Kpis]) -> Result<()> {
    let rows: Vec<KpiSample> = samples.iter().map(KpiSample::from).collect();
    match extension(path).as_deref() {
        Some("json") => fs::write(path, serde_json::to_string_pretty(&rows)?)?,
        Some("csv") => {
            let mut writer = csv::Writer::from_path(path)?;
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        _ => return Err(OptimizerError::UnsupportedFormat(path.display().to_string())),
    }
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn loads_partial_csv_columns() -> Result<()> {
        let mut file = Builder::new().suffix(".csv").tempfile()?;
        writeln!(file, "averageDelay,system_efficiency,conflicts")?;
        writeln!(file, "4.5, 55.0, 2")?;
        writeln!(file, "1.5,85.0,0")?;
        file.flush()?;

        let samples = load_kpi_samples(file.path())?;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].average_delay, 4.5);
        assert_eq!(samples[0].conflicts, 2.0);
        assert_eq!(samples[1].energy_usage, 0.0);
        Ok(())
    }

    #[test]
    fn loads_json_arrays() -> Result<()> {
        let mut file = Builder::new().suffix(".json").tempfile()?;
        write!(file, r#"[{{"energy_usage": 120.5, "totalDelay": 30}}]"#)?;
        file.flush()?;

        let samples = load_kpi_samples(file.path())?;
        assert_eq!(samples[0].energy_usage, 120.5);
        assert_eq!(samples[0].total_delay, 30.0);
        Ok(())
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = load_kpi_samples(Path::new("samples.parquet")).unwrap_err();
        assert!(matches!(err, OptimizerError::UnsupportedFormat(_)));
    }
}
