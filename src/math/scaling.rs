//! Min–max normalization and its inverse.
//!
//! `normalize` maps each column to `[0, 1]` using that column's observed
//! range and records the range in a `ScaleRecord`; `backscale` maps any
//! array in the same coordinate system (typically cluster centroids) back
//! to original units:
//!
//! ```text
//! normalized = (value - min) / (max - min)
//! original   = normalized * (max - min) + min
//! ```
//!
//! Constant columns (`max == min`) follow `ZeroRangePolicy`: either every
//! cell becomes `0.0` (backscaling then returns `min` for the whole column)
//! or the call fails with `DegenerateColumn`.

use nalgebra::DMatrix;
use tracing::warn;

use crate::domain::{NormalizedTable, ScaleRecord, Table, ZeroRangePolicy};
use crate::error::AppError;

/// Normalize the named numeric columns of `table`.
pub fn normalize(
    table: &Table,
    columns: &[&str],
    policy: ZeroRangePolicy,
) -> Result<NormalizedTable, AppError> {
    let raw = table.to_matrix(columns)?;
    let names = columns.iter().map(|s| s.to_string()).collect();
    normalize_matrix(raw, names, policy)
}

/// Normalize every column of a dense matrix.
pub fn normalize_matrix(
    mut values: DMatrix<f64>,
    names: Vec<String>,
    policy: ZeroRangePolicy,
) -> Result<NormalizedTable, AppError> {
    if names.len() != values.ncols() {
        return Err(AppError::DimensionMismatch {
            context: "normalize column names",
            expected: values.ncols(),
            found: names.len(),
        });
    }
    if values.nrows() == 0 {
        return Err(AppError::InvalidInput("cannot normalize an empty table".into()));
    }

    let mut minima = Vec::with_capacity(values.ncols());
    let mut maxima = Vec::with_capacity(values.ncols());

    for (j, name) in names.iter().enumerate() {
        let mut col = values.column_mut(j);
        if col.iter().any(|v| !v.is_finite()) {
            return Err(AppError::InvalidInput(format!(
                "column `{name}` contains non-finite values; fill missing values first"
            )));
        }

        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        if range == 0.0 {
            match policy {
                ZeroRangePolicy::Reject => {
                    return Err(AppError::DegenerateColumn {
                        column: name.clone(),
                    });
                }
                ZeroRangePolicy::Zero => {
                    warn!(column = %name, value = min, "zero-range column normalized to 0");
                    col.fill(0.0);
                }
            }
        } else {
            for v in col.iter_mut() {
                *v = (*v - min) / range;
            }
        }

        minima.push(min);
        maxima.push(max);
    }

    Ok(NormalizedTable {
        values,
        scale: ScaleRecord {
            columns: names,
            minima,
            maxima,
        },
    })
}

/// Map normalized values back to original units.
///
/// Returns a new matrix; the input is left untouched.
pub fn backscale(values: &DMatrix<f64>, scale: &ScaleRecord) -> Result<DMatrix<f64>, AppError> {
    if values.ncols() != scale.len() || scale.maxima.len() != scale.minima.len() {
        return Err(AppError::DimensionMismatch {
            context: "backscale",
            expected: scale.len(),
            found: values.ncols(),
        });
    }

    let mut out = values.clone();
    for (j, mut col) in out.column_iter_mut().enumerate() {
        let min = scale.minima[j];
        let span = scale.maxima[j] - min;
        for v in col.iter_mut() {
            *v = *v * span + min;
        }
    }
    Ok(out)
}
