//! Shared domain types.
//!
//! These are plain value objects: each pipeline stage produces one and the
//! next stage consumes it. Types that leave the process (exports) derive
//! `Serialize`.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cell storage for a single column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render a cell as a join/reconcile key.
    ///
    /// Numeric keys use their shortest round-trip representation so `1.0`
    /// and `1` from two sources compare equal.
    pub fn key_at(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Text(v) => v.get(row)?.clone(),
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(|x| format!("{x}")),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// An ordered collection of equally long, named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that every column has the same row count.
    pub fn new(columns: Vec<Column>) -> Result<Self, AppError> {
        if let Some(first) = columns.first() {
            let expected = first.data.len();
            for c in &columns[1..] {
                if c.data.len() != expected {
                    return Err(AppError::DimensionMismatch {
                        context: "table rows",
                        expected,
                        found: c.data.len(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Result<&Column, AppError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| AppError::column_not_found(name))
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Result<&mut Column, AppError> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| AppError::column_not_found(name))
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Numeric cells of a column (fails on text columns).
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], AppError> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            ColumnData::Text(_) => Err(AppError::InvalidInput(format!(
                "column `{name}` is not numeric"
            ))),
        }
    }

    /// Numeric column with every cell present and finite.
    pub fn dense(&self, name: &str) -> Result<Vec<f64>, AppError> {
        self.numeric(name)?
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(x) if x.is_finite() => Ok(*x),
                _ => Err(AppError::InvalidInput(format!(
                    "column `{name}` has a missing or non-finite value at row {row}"
                ))),
            })
            .collect()
    }

    /// Dense row-major matrix over the named numeric columns.
    pub fn to_matrix(&self, names: &[&str]) -> Result<DMatrix<f64>, AppError> {
        let cols: Vec<Vec<f64>> = names
            .iter()
            .map(|n| self.dense(n))
            .collect::<Result<_, _>>()?;
        let n_rows = self.n_rows();
        Ok(DMatrix::from_fn(n_rows, names.len(), |r, c| cols[c][r]))
    }
}

/// Per-column minimum and maximum recorded by normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleRecord {
    pub columns: Vec<String>,
    pub minima: Vec<f64>,
    pub maxima: Vec<f64>,
}

impl ScaleRecord {
    pub fn len(&self) -> usize {
        self.minima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minima.is_empty()
    }
}

/// Numeric columns scaled into `[0, 1]`, plus the record needed to invert it.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    /// Rows × columns, same column order as `scale.columns`.
    pub values: DMatrix<f64>,
    pub scale: ScaleRecord,
}

/// What to do with a column whose minimum equals its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroRangePolicy {
    /// Normalize every cell of the column to `0.0`.
    Zero,
    /// Fail with `DegenerateColumn`.
    Reject,
}

/// Output of clustering.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// One id in `[0, k)` per input row.
    pub labels: Vec<usize>,
    /// `k × d` centroids in normalized space.
    pub centroids: DMatrix<f64>,
    /// Sum of squared distances of points to their centroid.
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Number of rows assigned to each cluster.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

/// Parametric growth models fitted to `(renewable, access)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `a · x^b`
    Power,
    /// `a / (1 + e^{-b·x})`
    Sigmoid,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Power, ModelKind::Sigmoid];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Power => "power",
            ModelKind::Sigmoid => "sigmoid",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            ModelKind::Power => "a * x^b",
            ModelKind::Sigmoid => "a / (1 + exp(-b * x))",
        }
    }

    pub fn param_count(self) -> usize {
        2
    }
}

/// A model with fitted parameters and their uncertainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub model: ModelKind,
    pub params: Vec<f64>,
    /// One standard deviation per parameter (sqrt of the covariance diagonal).
    pub sigma: Vec<f64>,
    /// Row-major `p × p` parameter covariance.
    pub covariance: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    pub iterations: usize,
}

/// Pointwise confidence envelope over a set of query x-values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyEnvelope {
    pub x: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Keys present in exactly one of two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Symmetric difference, sorted lexicographically.
    pub mismatches: Vec<String>,
    /// Distinct keys across both tables.
    pub total: usize,
    /// Distinct keys present in both tables.
    pub common: usize,
}

/// Pearson correlation over named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: DMatrix<f64>,
}
