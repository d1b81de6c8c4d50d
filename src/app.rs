//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - reads configuration from the environment
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports

use chrono::Utc;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::AppError;
use crate::io::export::{FitEntry, FitReport, write_clusters_csv, write_fit_json};
use crate::plot::{AsciiRenderer, Renderer};

pub mod pipeline;

use pipeline::RunOutput;

/// Entry point for the `wdi` binary.
pub fn run() -> Result<(), AppError> {
    crate::logging::init();

    let config = AnalysisConfig::from_env()?;
    info!(
        renewable = %config.renewable_csv.display(),
        access = %config.access_csv.display(),
        year = %config.year,
        "starting analysis"
    );

    let run = pipeline::run_analysis(&config)?;
    println!("{}", render_report(&run, &config));
    write_exports(&run, &config)
}

/// Everything printed to stdout for a run.
pub fn render_report(run: &RunOutput, config: &AnalysisConfig) -> String {
    let mut out = String::new();

    out.push_str(&crate::report::format_reconciliation(&run.reconciliation));
    out.push('\n');
    out.push_str(&crate::report::format_centres(
        &run.centres,
        &run.normalized.scale,
        &run.clusters,
    ));
    out.push('\n');

    let fits: Vec<_> = run
        .fits
        .iter()
        .map(|f| (&f.fit, f.band_sigma.as_slice(), &f.band))
        .collect();
    out.push_str(&crate::report::format_fits(&fits));

    if config.plot {
        let renderer = AsciiRenderer {
            width: config.plot_width,
            height: config.plot_height,
        };
        out.push('\n');
        out.push_str(&renderer.heatmap(&run.correlation));
        out.push('\n');
        out.push_str(&renderer.scatter("Clustering of Countries", &run.scatter));
        for f in &run.fits {
            out.push('\n');
            let title = format!("Fit: {} ({})", f.fit.model.display_name(), f.fit.model.formula());
            out.push_str(&renderer.fit(&title, &run.scatter, &f.series));
        }
    }

    out
}

/// Write the optional cluster CSV and fit JSON named in `config`.
pub fn write_exports(run: &RunOutput, config: &AnalysisConfig) -> Result<(), AppError> {
    if let Some(path) = &config.export_clusters {
        write_clusters_csv(path, &run.countries, &run.scatter)?;
        info!(path = %path.display(), "wrote cluster export");
    }
    if let Some(path) = &config.export_fits {
        let report = FitReport {
            tool: env!("CARGO_PKG_NAME"),
            generated_at: Utc::now(),
            year: &config.year,
            scale: &run.normalized.scale,
            centres: run.centres.row_iter().map(|r| r.iter().copied().collect()).collect(),
            fits: run
                .fits
                .iter()
                .map(|f| FitEntry {
                    fit: &f.fit,
                    band_sigma: &f.band_sigma,
                    band: &f.band,
                })
                .collect(),
        };
        write_fit_json(path, &report)?;
        info!(path = %path.display(), "wrote fit export");
    }
    Ok(())
}
