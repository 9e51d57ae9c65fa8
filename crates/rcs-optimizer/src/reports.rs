//! ---
//! rcs_section: "05-optimisation"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Recommendation synthesis, scoring, and reporting."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::comparison::PerformanceComparison;
use crate::errors::Result;
use crate::recommendation::{OptimizationResult, Recommendation};

pub const REPORT_MODEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Writes optimization results (and optionally a mode comparison) to disk.
#[derive(Debug)]
pub struct ReportExporter<'a> {
    result: &'a OptimizationResult,
    comparison: Option<&'a PerformanceComparison>,
}

impl<'a> ReportExporter<'a> {
    pub fn new(result: &'a OptimizationResult) -> Self {
        Self {
            result,
            comparison: None,
        }
    }

    pub fn with_comparison(mut self, comparison: &'a PerformanceComparison) -> Self {
        self.comparison = Some(comparison);
        self
    }

    /// Writes `optimization.json`, `recommendations.csv` and, when a
    /// comparison is attached, `comparison.json` into `output_dir`.
    pub fn export(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.result.generated_at.to_rfc3339();
        let optimization = ReportEnvelope::new(
            &timestamp,
            REPORT_MODEL_VERSION,
            optimization_schema(),
            self.result,
        );
        write_json(output_dir.join("optimization.json"), &optimization)?;
        write_recommendations(
            output_dir.join("recommendations.csv"),
            &self.result.recommendations,
        )?;

        if let Some(comparison) = self.comparison {
            write_comparison(output_dir, &timestamp, comparison)?;
        }

        info!(
            recommendations = self.result.recommendations.len(),
            "reports exported to {}",
            output_dir.display()
        );
        Ok(())
    }
}

/// Writes a standalone `comparison.json` into `output_dir` and returns its path.
pub fn export_comparison(output_dir: &Path, comparison: &PerformanceComparison) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let timestamp = Utc::now().to_rfc3339();
    write_comparison(output_dir, &timestamp, comparison)
}

fn write_comparison(
    output_dir: &Path,
    timestamp: &str,
    comparison: &PerformanceComparison,
) -> Result<PathBuf> {
    let envelope = ReportEnvelope::new(
        timestamp,
        REPORT_MODEL_VERSION,
        comparison_schema(),
        comparison,
    );
    let path = output_dir.join("comparison.json");
    write_json(&path, &envelope)?;
    Ok(path)
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    model_version: &'a str,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(timestamp: &'a str, model_version: &'a str, schema: serde_json::Value, data: &'a T) -> Self {
        Self {
            timestamp,
            model_version,
            schema,
            data,
        }
    }
}

/// Flat projection of a recommendation for spreadsheet use.
#[derive(Debug, Serialize)]
struct RecommendationRow<'a> {
    rank: usize,
    id: &'a str,
    kind: &'a str,
    priority: &'a str,
    confidence: f64,
    score: f64,
    estimated_savings: f64,
    implementation_time: f64,
    affected_trains: String,
    affected_sections: String,
    action: &'a str,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn write_recommendations(path: impl AsRef<Path>, recommendations: &[Recommendation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (index, rec) in recommendations.iter().enumerate() {
        writer.serialize(RecommendationRow {
            rank: index + 1,
            id: &rec.id,
            kind: rec.kind.as_ref(),
            priority: rec.priority.as_ref(),
            confidence: rec.confidence,
            score: rec.score(),
            estimated_savings: rec.estimated_savings,
            implementation_time: rec.implementation_time,
            affected_trains: rec.affected_trains.join(";"),
            affected_sections: rec.affected_sections.join(";"),
            action: &rec.action,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn optimization_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "OptimizationReport",
        "type": "object",
        "properties": {
            "success": {"type": "boolean"},
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "kind": {"type": "string"},
                        "priority": {"enum": ["low", "medium", "high"]},
                        "confidence": {"type": "number"},
                        "estimated_savings": {"type": "number"},
                        "implementation_time": {"type": "number"}
                    },
                    "required": ["id", "kind", "priority", "confidence"]
                }
            },
            "conflicts": {"type": "array"},
            "metrics": {"type": "object"},
            "confidence": {"type": "number"},
            "implementation_plan": {"type": "array"},
            "snapshot_time": {"type": "integer"}
        },
        "required": ["success", "recommendations", "confidence"]
    })
}

fn comparison_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "PerformanceComparison",
        "type": "object",
        "properties": {
            "scenario": {"type": "string"},
            "ai_mode": {"type": "object"},
            "manual_mode": {"type": "object"},
            "improvement": {
                "type": "object",
                "properties": {
                    "delay_reduction": {"type": "number"},
                    "efficiency_gain": {"type": "number"},
                    "energy_saved": {"type": "number"},
                    "conflict_reduction": {"type": "number"}
                }
            }
        },
        "required": ["scenario", "ai_mode", "manual_mode", "improvement"]
    })
}
