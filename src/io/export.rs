//! Exports: per-country cluster CSV and a fit summary JSON.
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.
//! Nothing in the pipeline reads them back.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FittedModel, ScaleRecord, UncertaintyEnvelope};
use crate::error::AppError;
use crate::plot::ScatterPoint;

/// One country's cluster membership, in original units.
#[derive(Debug, Clone, Serialize)]
struct ClusterRow<'a> {
    country: &'a str,
    renewable: f64,
    access: f64,
    cluster: usize,
}

/// Write `country,renewable,access,cluster` rows.
pub fn write_clusters_csv(path: &Path, countries: &[String], points: &[ScatterPoint]) -> Result<(), AppError> {
    if countries.len() != points.len() {
        return Err(AppError::DimensionMismatch {
            context: "cluster export",
            expected: points.len(),
            found: countries.len(),
        });
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::Export(format!("failed to create '{}': {e}", path.display())))?;

    for (country, p) in countries.iter().zip(points) {
        writer
            .serialize(ClusterRow {
                country,
                renewable: p.x,
                access: p.y,
                cluster: p.label,
            })
            .map_err(|e| AppError::Export(format!("failed to write cluster row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::Export(format!("failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

/// JSON layout of the fit summary.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub year: &'a str,
    pub scale: &'a ScaleRecord,
    /// Cluster centres in original units, one `[renewable, access]` per cluster.
    pub centres: Vec<Vec<f64>>,
    pub fits: Vec<FitEntry<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitEntry<'a> {
    pub fit: &'a FittedModel,
    pub band_sigma: &'a [f64],
    pub band: &'a UncertaintyEnvelope,
}

/// Write the fit summary as pretty-printed JSON.
pub fn write_fit_json(path: &Path, report: &FitReport<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::Export(format!("failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::Export(format!("failed to write fit JSON: {e}")))?;
    Ok(())
}
