//! Plot inputs, computed without touching any rendering backend.

use serde::Serialize;

use crate::domain::{ClusterAssignment, FittedModel, ModelKind, UncertaintyEnvelope};
use crate::error::AppError;
use crate::models::predict_all;

/// One observation coloured by cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: usize,
}

/// A fitted curve with its confidence envelope, sampled on a shared x grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSeries {
    pub model: ModelKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Zip x, y and cluster labels into scatter triples.
pub fn scatter_points(x: &[f64], y: &[f64], clusters: &ClusterAssignment) -> Result<Vec<ScatterPoint>, AppError> {
    if x.len() != y.len() || x.len() != clusters.labels.len() {
        return Err(AppError::DimensionMismatch {
            context: "scatter points",
            expected: x.len(),
            found: y.len().min(clusters.labels.len()),
        });
    }
    Ok(x.iter()
        .zip(y)
        .zip(&clusters.labels)
        .map(|((&x, &y), &label)| ScatterPoint { x, y, label })
        .collect())
}

/// Sample a fitted model on the envelope's grid.
pub fn fit_series(fit: &FittedModel, band: &UncertaintyEnvelope) -> FitSeries {
    FitSeries {
        model: fit.model,
        x: band.x.clone(),
        y: predict_all(fit.model, &band.x, &fit.params),
        lower: band.lower.clone(),
        upper: band.upper.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn scatter_points_carry_labels() {
        let clusters = ClusterAssignment {
            labels: vec![1, 0],
            centroids: DMatrix::zeros(2, 2),
            inertia: 0.0,
            iterations: 1,
            converged: true,
        };
        let pts = scatter_points(&[1.0, 2.0], &[3.0, 4.0], &clusters).unwrap();
        assert_eq!(pts[0], ScatterPoint { x: 1.0, y: 3.0, label: 1 });
        assert!(scatter_points(&[1.0], &[3.0, 4.0], &clusters).is_err());
    }
}
