//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (snapshot-friendly)

use nalgebra::DMatrix;

use crate::domain::{ClusterAssignment, FittedModel, Reconciliation, ScaleRecord, UncertaintyEnvelope};

/// Entry counts and the mismatching keys of a reconciliation.
pub fn format_reconciliation(rec: &Reconciliation) -> String {
    let mut out = String::new();
    out.push_str(&format!("total entries {}\n", rec.total));
    out.push_str(&format!("entries in common {}\n", rec.common));
    out.push_str(&format!("Mismatching Entries ({}):\n", rec.mismatches.len()));
    for key in &rec.mismatches {
        out.push_str(&format!("  {key}\n"));
    }
    out
}

/// Cluster centres in original units, one row per cluster with its size.
pub fn format_centres(centres: &DMatrix<f64>, scale: &ScaleRecord, clusters: &ClusterAssignment) -> String {
    let mut out = String::new();
    out.push_str("Cluster Centers (Original Scale):\n");

    let name_w = scale.columns.iter().map(|c| c.len()).max().unwrap_or(0).max(12);
    out.push_str(&format!("{:<8} {:>6}", "cluster", "size"));
    for name in &scale.columns {
        out.push_str(&format!(" {:>name_w$}", truncate(name, name_w)));
    }
    out.push('\n');

    let sizes = clusters.sizes();
    for (i, row) in centres.row_iter().enumerate() {
        out.push_str(&format!("{:<8} {:>6}", i, sizes.get(i).copied().unwrap_or(0)));
        for v in row.iter() {
            out.push_str(&format!(" {v:>name_w$.3}"));
        }
        out.push('\n');
    }
    out
}

/// Fit diagnostics and the band sigma used for each model.
pub fn format_fits(fits: &[(&FittedModel, &[f64], &UncertaintyEnvelope)]) -> String {
    let mut out = String::new();
    out.push_str("Model fits:\n");
    for &(fit, sigma, band) in fits {
        out.push_str(&format!(
            "- {:<8} {}  n={} SSE={:.3} RMSE={:.3} iters={}\n",
            fit.model.display_name(),
            fit.model.formula(),
            fit.n,
            fit.sse,
            fit.rmse,
            fit.iterations
        ));
        out.push_str(&format!("  params     : {}\n", fmt_vec(&fit.params)));
        out.push_str(&format!("  sigma (fit): {}\n", fmt_vec(&fit.sigma)));
        out.push_str(&format!("  sigma(band): {}\n", fmt_vec(sigma)));
        if let (Some(lo), Some(hi)) = (band.lower.first(), band.upper.last()) {
            out.push_str(&format!(
                "  band       : {} points, lower[0]={lo:.3} upper[last]={hi:.3}\n",
                band.x.len()
            ));
        }
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
