//! Shared analysis pipeline.
//!
//! Keeping this in one place avoids tangling the workflow with presentation:
//! load -> reconcile -> join -> fill -> normalize -> cluster -> backscale,
//! and in parallel x,y -> fit -> band.
//!
//! `app::run` only prints what this returns.

use nalgebra::DMatrix;
use tracing::info;

use crate::cluster::{KMeansOptions, fit_kmeans};
use crate::config::AnalysisConfig;
use crate::domain::{
    ClusterAssignment, CorrelationMatrix, FittedModel, ModelKind, NormalizedTable, Reconciliation, Table,
    UncertaintyEnvelope,
};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_curve, model_band};
use crate::io::ingest::{KEY, load_indicator};
use crate::math::{backscale, correlation_matrix, linspace, normalize};
use crate::plot::{FitSeries, ScatterPoint, fit_series, scatter_points};
use crate::table::{diff_entries, fill_missing, inner_join, select};

pub const SUFFIXES: (&str, &str) = ("_renewable", "_access");

/// One fitted model with the envelope drawn around it.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub fit: FittedModel,
    /// Sigma actually used for the envelope.
    pub band_sigma: Vec<f64>,
    pub band: UncertaintyEnvelope,
    pub series: FitSeries,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reconciliation: Reconciliation,
    /// Inner-joined, filled table: `Country`, `<year>_renewable`, `<year>_access`.
    pub merged: Table,
    pub countries: Vec<String>,
    /// Renewable electricity output share, per country.
    pub x: Vec<f64>,
    /// Access to electricity share, per country.
    pub y: Vec<f64>,
    pub normalized: NormalizedTable,
    pub clusters: ClusterAssignment,
    /// Cluster centres in original units (`k × 2`).
    pub centres: DMatrix<f64>,
    pub correlation: CorrelationMatrix,
    pub scatter: Vec<ScatterPoint>,
    pub fits: Vec<FitOutcome>,
}

/// Load both CSVs named by `config` and run the analysis.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let renewable = load_indicator(&config.renewable_csv, &config.year)?;
    let access = load_indicator(&config.access_csv, &config.year)?;
    run_with_tables(&renewable.table, &access.table, config)
}

/// Run the analysis on already-loaded indicator tables.
pub fn run_with_tables(renewable: &Table, access: &Table, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    // Diagnostic only: which countries appear in one table but not the other.
    let reconciliation = diff_entries(renewable, access, KEY)?;

    let year = config.year.as_str();
    let left = select(renewable, &[KEY, year])?;
    let right = select(access, &[KEY, year])?;
    let mut merged = inner_join(&left, &right, KEY, SUFFIXES)?;
    let filled = fill_missing(&mut merged);

    let x_col = format!("{year}{}", SUFFIXES.0);
    let y_col = format!("{year}{}", SUFFIXES.1);
    let x = merged.dense(&x_col)?;
    let y = merged.dense(&y_col)?;
    let countries = country_names(&merged)?;
    info!(rows = merged.n_rows(), filled, "merged indicator tables");

    let columns = [x_col.as_str(), y_col.as_str()];
    let normalized = normalize(&merged, &columns, config.zero_range)?;
    let clusters = fit_kmeans(
        &normalized.values,
        &KMeansOptions {
            k: config.clusters,
            seed: config.seed,
            require_convergence: config.require_convergence,
            ..KMeansOptions::default()
        },
    )?;
    let centres = backscale(&clusters.centroids, &normalized.scale)?;
    info!(
        k = clusters.k(),
        inertia = clusters.inertia,
        iterations = clusters.iterations,
        "clustered countries"
    );

    let correlation = correlation_matrix(&merged, &columns)?;
    let scatter = scatter_points(&x, &y, &clusters)?;

    let mut fits = Vec::with_capacity(ModelKind::ALL.len());
    for model in ModelKind::ALL {
        fits.push(fit_one(model, &x, &y, config)?);
    }

    Ok(RunOutput {
        reconciliation,
        merged,
        countries,
        x,
        y,
        normalized,
        clusters,
        centres,
        correlation,
        scatter,
        fits,
    })
}

fn fit_one(
    model: ModelKind,
    x: &[f64],
    y: &[f64],
    config: &AnalysisConfig,
) -> Result<FitOutcome, AppError> {
    // The power law is only defined for x > 0; countries with no renewable
    // output are left out of that fit and of its band grid.
    let (fx, fy): (Vec<f64>, Vec<f64>) = match model {
        ModelKind::Power => x.iter().zip(y).filter(|(xi, _)| **xi > 0.0).map(|(a, b)| (*a, *b)).unzip(),
        ModelKind::Sigmoid => (x.to_vec(), y.to_vec()),
    };
    if fx.len() < x.len() {
        info!(
            model = model.display_name(),
            dropped = x.len() - fx.len(),
            "excluded rows outside the model domain"
        );
    }

    let fit = fit_curve(model, &fx, &fy, &FitOptions::default())?;
    let band_sigma = config.sigma.resolve(&fit.sigma);
    let grid = grid_over(&fx, config.grid_points)?;
    let band = model_band(&fit, &grid, &band_sigma)?;
    let series = fit_series(&fit, &band);
    info!(
        model = model.display_name(),
        a = fit.params[0],
        b = fit.params[1],
        rmse = fit.rmse,
        "fitted model"
    );

    Ok(FitOutcome {
        fit,
        band_sigma,
        band,
        series,
    })
}

fn grid_over(x: &[f64], points: usize) -> Result<Vec<f64>, AppError> {
    let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return Err(AppError::InvalidInput("no observations to build a band grid".into()));
    }
    Ok(linspace(lo, hi, points))
}

fn country_names(table: &Table) -> Result<Vec<String>, AppError> {
    let col = table.column(KEY)?;
    Ok((0..col.data.len())
        .map(|row| col.data.key_at(row).unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigmaSource;
    use crate::domain::Column;

    fn indicator(countries: &[&str], values: &[Option<f64>]) -> Table {
        Table::new(vec![
            Column::text(KEY, countries.iter().map(|c| Some(c.to_string())).collect()),
            Column::text("Country Code", countries.iter().map(|c| Some(c.to_uppercase())).collect()),
            Column::numeric("2018", values.to_vec()),
        ])
        .unwrap()
    }

    fn blobs() -> (Table, Table) {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "only_renewable"];
        let renewable = [1.0, 2.0, 3.0, 40.0, 42.0, 44.0, 80.0, 82.0, 84.0, 50.0];
        let r = indicator(&names, &renewable.map(Some));

        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "only_access"];
        let access = [20.0, 30.0, 35.0, 90.0, 92.0, 94.0, 99.0, 99.5, 100.0, 10.0];
        let a = indicator(&names, &access.map(Some));
        (r, a)
    }

    #[test]
    fn pipeline_clusters_fits_and_reconciles() {
        let (r, a) = blobs();
        let out = run_with_tables(&r, &a, &AnalysisConfig::default()).unwrap();

        assert_eq!(out.reconciliation.mismatches, vec!["only_access", "only_renewable"]);
        assert_eq!(out.reconciliation.common, 9);
        assert_eq!(out.countries.len(), 9);
        assert_eq!(out.clusters.k(), 3);
        assert_eq!(out.centres.shape(), (3, 2));
        assert_eq!(out.fits.len(), 2);
        for f in &out.fits {
            assert_eq!(f.band.x.len(), 100);
            assert_eq!(f.band_sigma, vec![0.1, 0.2]);
        }
    }

    #[test]
    fn centres_are_in_original_units() {
        let (r, a) = blobs();
        let out = run_with_tables(&r, &a, &AnalysisConfig::default()).unwrap();
        for row in out.centres.row_iter() {
            assert!(row[0] >= 1.0 && row[0] <= 84.0);
            assert!(row[1] >= 20.0 && row[1] <= 100.0);
        }
    }

    #[test]
    fn missing_values_are_zero_filled_and_power_skips_them() {
        let names = ["a", "b", "c", "d", "e"];
        let r = indicator(&names, &[None, Some(1.0), Some(2.0), Some(4.0), Some(8.0)]);
        // access = 30 / (1 + e^{-x/2}) at the filled renewable values 0, 1, 2, 4, 8
        let a = indicator(&names, &[Some(15.0), Some(18.674), Some(21.932), Some(26.424), Some(29.460)]);
        let config = AnalysisConfig {
            clusters: 2,
            sigma: SigmaSource::Covariance,
            ..AnalysisConfig::default()
        };

        let out = run_with_tables(&r, &a, &config).unwrap();
        assert_eq!(out.x[0], 0.0);
        let power = &out.fits[0];
        assert_eq!(power.fit.model, ModelKind::Power);
        assert_eq!(power.fit.n, 4);
        assert_eq!(power.band_sigma, power.fit.sigma);
        assert_eq!(power.band.x[0], 1.0);
        assert!(power.band.upper.iter().chain(&power.band.lower).all(|v| v.is_finite()));
        assert_eq!(out.fits[1].band.x[0], 0.0);
    }

    #[test]
    fn missing_year_column_is_reported() {
        let (r, a) = blobs();
        let config = AnalysisConfig {
            year: "1999".into(),
            ..AnalysisConfig::default()
        };
        let err = run_with_tables(&r, &a, &config).unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound { .. }));
    }
}
