//! Small descriptive statistics helpers.

use nalgebra::DMatrix;

use crate::domain::{CorrelationMatrix, Table};
use crate::error::AppError;

/// Mean of the finite values, `None` if there are none.
pub fn finite_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    (n > 0).then(|| sum / n as f64)
}

/// `n` evenly spaced points over `[start, end]` (both inclusive).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Pearson correlation between two equally long samples.
///
/// Returns `NaN` when either sample has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let ma = a[..n].iter().sum::<f64>() / n as f64;
    let mb = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for i in 0..n {
        let da = a[i] - ma;
        let db = b[i] - mb;
        cov += da * db;
        va += da * da;
        vb += db * db;
    }
    if va <= 0.0 || vb <= 0.0 {
        return f64::NAN;
    }
    cov / (va.sqrt() * vb.sqrt())
}

/// Pairwise Pearson correlation over named numeric columns.
pub fn correlation_matrix(table: &Table, names: &[&str]) -> Result<CorrelationMatrix, AppError> {
    let cols: Vec<Vec<f64>> = names
        .iter()
        .map(|n| table.dense(n))
        .collect::<Result<_, _>>()?;

    let k = cols.len();
    let values = DMatrix::from_fn(k, k, |i, j| if i == j { 1.0 } else { pearson(&cols[i], &cols[j]) });

    Ok(CorrelationMatrix {
        names: names.iter().map(|s| s.to_string()).collect(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.5, 2.5, 5);
        assert_eq!(v.len(), 5);
        assert_eq!(v[0], 0.5);
        assert_eq!(v[4], 2.5);
        assert!((v[2] - 1.5).abs() < 1e-12);
        assert!(linspace(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn finite_mean_skips_nan() {
        assert_eq!(finite_mean([1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(finite_mean([f64::NAN]), None);
    }

    #[test]
    fn correlation_of_linear_columns_is_one() {
        let t = Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("y", vec![Some(2.0), Some(4.0), Some(6.0)]),
            Column::numeric("z", vec![Some(3.0), Some(2.0), Some(1.0)]),
        ])
        .unwrap();
        let c = correlation_matrix(&t, &["x", "y", "z"]).unwrap();
        assert!((c.values[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((c.values[(0, 2)] + 1.0).abs() < 1e-12);
        assert_eq!(c.values[(2, 2)], 1.0);
    }

    #[test]
    fn constant_column_correlation_is_nan() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }
}
