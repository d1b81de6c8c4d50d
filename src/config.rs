//! Run configuration, read from the environment (and `.env` if present).
//!
//! Every variable is optional; unset means the default below. A variable that
//! is set but malformed is a `Config` error naming it.

use std::path::PathBuf;

use crate::domain::{ModelKind, ZeroRangePolicy};
use crate::error::AppError;

pub const DEFAULT_RENEWABLE_CSV: &str = "API_EG.ELC.RNEW.ZS_DS2_en_csv_v2_5359597.csv";
pub const DEFAULT_ACCESS_CSV: &str = "API_EG.ELC.ACCS.ZS_DS2_en_csv_v2_5358776.csv";

/// Where the band's parameter sigmas come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SigmaSource {
    /// Fixed per-parameter sigmas, used for every model.
    Fixed(Vec<f64>),
    /// Square root of each fit's covariance diagonal.
    Covariance,
}

impl SigmaSource {
    /// Resolve the sigma vector for a fit with `fit_sigma` as its own estimate.
    pub fn resolve(&self, fit_sigma: &[f64]) -> Vec<f64> {
        match self {
            SigmaSource::Fixed(s) => s.clone(),
            SigmaSource::Covariance => fit_sigma.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub renewable_csv: PathBuf,
    pub access_csv: PathBuf,
    pub year: String,
    pub clusters: usize,
    pub seed: u64,
    pub sigma: SigmaSource,
    pub zero_range: ZeroRangePolicy,
    pub require_convergence: bool,
    pub grid_points: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_clusters: Option<PathBuf>,
    pub export_fits: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            renewable_csv: PathBuf::from(DEFAULT_RENEWABLE_CSV),
            access_csv: PathBuf::from(DEFAULT_ACCESS_CSV),
            year: "2018".to_string(),
            clusters: 3,
            seed: 42,
            sigma: SigmaSource::Fixed(vec![0.1, 0.2]),
            zero_range: ZeroRangePolicy::Zero,
            require_convergence: false,
            grid_points: 100,
            plot: true,
            plot_width: 80,
            plot_height: 20,
            export_clusters: None,
            export_fits: None,
        }
    }
}

impl AnalysisConfig {
    /// Load `.env` (if any) and read `WDI_*` variables from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("WDI_RENEWABLE_CSV") {
            cfg.renewable_csv = PathBuf::from(v);
        }
        if let Some(v) = get("WDI_ACCESS_CSV") {
            cfg.access_csv = PathBuf::from(v);
        }
        if let Some(v) = get("WDI_YEAR") {
            cfg.year = v;
        }
        if let Some(v) = get("WDI_CLUSTERS") {
            cfg.clusters = parse_num("WDI_CLUSTERS", &v)?;
            if cfg.clusters == 0 {
                return Err(AppError::config("WDI_CLUSTERS must be > 0"));
            }
        }
        if let Some(v) = get("WDI_SEED") {
            cfg.seed = parse_num("WDI_SEED", &v)?;
        }
        if let Some(v) = get("WDI_SIGMA") {
            cfg.sigma = parse_sigma(&v)?;
        }
        if let Some(v) = get("WDI_ZERO_RANGE") {
            cfg.zero_range = match v.to_ascii_lowercase().as_str() {
                "zero" => ZeroRangePolicy::Zero,
                "reject" => ZeroRangePolicy::Reject,
                _ => {
                    return Err(AppError::config(format!(
                        "WDI_ZERO_RANGE must be 'zero' or 'reject', got '{v}'"
                    )));
                }
            };
        }
        if let Some(v) = get("WDI_REQUIRE_CONVERGENCE") {
            cfg.require_convergence = parse_bool("WDI_REQUIRE_CONVERGENCE", &v)?;
        }
        if let Some(v) = get("WDI_GRID_POINTS") {
            cfg.grid_points = parse_num("WDI_GRID_POINTS", &v)?;
            if cfg.grid_points < 2 {
                return Err(AppError::config("WDI_GRID_POINTS must be >= 2"));
            }
        }
        if let Some(v) = get("WDI_PLOT") {
            cfg.plot = parse_bool("WDI_PLOT", &v)?;
        }
        if let Some(v) = get("WDI_PLOT_WIDTH") {
            cfg.plot_width = parse_num("WDI_PLOT_WIDTH", &v)?;
        }
        if let Some(v) = get("WDI_PLOT_HEIGHT") {
            cfg.plot_height = parse_num("WDI_PLOT_HEIGHT", &v)?;
        }
        cfg.export_clusters = get("WDI_EXPORT_CLUSTERS").map(PathBuf::from);
        cfg.export_fits = get("WDI_EXPORT_FITS").map(PathBuf::from);

        Ok(cfg)
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::config(format!("{key} is not a valid number: '{raw}'")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::config(format!("{key} is not a boolean: '{raw}'"))),
    }
}

/// `covariance` or `fixed:a,b,...`.
fn parse_sigma(raw: &str) -> Result<SigmaSource, AppError> {
    if raw.eq_ignore_ascii_case("covariance") {
        return Ok(SigmaSource::Covariance);
    }
    let Some(list) = raw.strip_prefix("fixed:") else {
        return Err(AppError::config(format!(
            "WDI_SIGMA must be 'covariance' or 'fixed:a,b', got '{raw}'"
        )));
    };

    let mut sigma = Vec::new();
    for part in list.split(',') {
        let s: f64 = parse_num("WDI_SIGMA", part.trim())?;
        if !s.is_finite() || s < 0.0 {
            return Err(AppError::config(format!("WDI_SIGMA entries must be finite and >= 0, got {s}")));
        }
        sigma.push(s);
    }
    // One fixed list is applied to every model, so it must fit all of them.
    if let Some(model) = ModelKind::ALL.iter().find(|m| m.param_count() != sigma.len()) {
        return Err(AppError::config(format!(
            "WDI_SIGMA needs {} entries for the {} model, got {}",
            model.param_count(),
            model.display_name(),
            sigma.len()
        )));
    }
    Ok(SigmaSource::Fixed(sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AnalysisConfig, AppError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AnalysisConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.year, "2018");
        assert_eq!(cfg.clusters, 3);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.sigma, SigmaSource::Fixed(vec![0.1, 0.2]));
        assert_eq!(cfg.zero_range, ZeroRangePolicy::Zero);
        assert_eq!(cfg.grid_points, 100);
        assert!(cfg.plot);
        assert!(cfg.export_fits.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_pairs(&[
            ("WDI_YEAR", "2015"),
            ("WDI_CLUSTERS", "4"),
            ("WDI_SIGMA", "covariance"),
            ("WDI_ZERO_RANGE", "Reject"),
            ("WDI_PLOT", "off"),
            ("WDI_EXPORT_FITS", "fits.json"),
        ])
        .unwrap();
        assert_eq!(cfg.year, "2015");
        assert_eq!(cfg.clusters, 4);
        assert_eq!(cfg.sigma, SigmaSource::Covariance);
        assert_eq!(cfg.zero_range, ZeroRangePolicy::Reject);
        assert!(!cfg.plot);
        assert_eq!(cfg.export_fits, Some(PathBuf::from("fits.json")));
    }

    #[test]
    fn fixed_sigma_list_parses() {
        let cfg = from_pairs(&[("WDI_SIGMA", "fixed:0.5, 1.5")]).unwrap();
        assert_eq!(cfg.sigma, SigmaSource::Fixed(vec![0.5, 1.5]));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        for (key, val) in [
            ("WDI_CLUSTERS", "three"),
            ("WDI_SIGMA", "fixed:a"),
            ("WDI_SIGMA", "fixed:0.1"),
            ("WDI_SIGMA", "fixed:0.1,0.2,0.3"),
            ("WDI_ZERO_RANGE", "drop"),
            ("WDI_REQUIRE_CONVERGENCE", "maybe"),
        ] {
            let err = from_pairs(&[(key, val)]).unwrap_err();
            assert!(matches!(err, AppError::Config { .. }));
            assert!(err.to_string().contains(key), "{err}");
        }
    }

    #[test]
    fn sigma_source_resolution() {
        assert_eq!(SigmaSource::Covariance.resolve(&[0.3, 0.4]), vec![0.3, 0.4]);
        assert_eq!(SigmaSource::Fixed(vec![0.1]).resolve(&[0.3, 0.4]), vec![0.1]);
    }
}
