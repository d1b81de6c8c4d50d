//! Confidence envelopes by parameter perturbation.
//!
//! For parameters `p_1..p_n` with uncertainties `s_1..s_n`, every parameter is
//! moved to either end of `[p_i - s_i, p_i + s_i]`. The model is evaluated at
//! all `2^n` resulting corners, and the envelope is the pointwise min/max over
//! those curves and the unperturbed one.
//!
//! For a non-linear model the extremes need not sit at the "all minus" or "all
//! plus" corner, which is why every combination is visited.
//!
//! Cost: `2^n + 1` model evaluations per query point. That is fine for the
//! two-parameter models here and becomes impractical quickly as `n` grows.

use crate::domain::{FittedModel, ModelKind, UncertaintyEnvelope};
use crate::error::AppError;
use crate::models::predict;

/// Largest parameter count accepted by the corner enumeration.
pub const MAX_BAND_PARAMS: usize = 20;

/// Iterator over all `2^n` sign patterns for `n` parameters.
///
/// Pattern `m` uses the plus sign for parameter `i` when bit `i` of `m` is set,
/// so pattern `0` is "all minus" and pattern `2^n - 1` is "all plus".
#[derive(Debug, Clone)]
pub struct SignCombinations {
    n: usize,
    next: u64,
    end: u64,
}

impl SignCombinations {
    /// Fails with `InvalidInput` when `n > MAX_BAND_PARAMS`.
    pub fn new(n: usize) -> Result<Self, AppError> {
        if n > MAX_BAND_PARAMS {
            return Err(AppError::InvalidInput(format!(
                "{n} parameters would need 2^{n} band evaluations (limit {MAX_BAND_PARAMS})"
            )));
        }
        Ok(Self {
            n,
            next: 0,
            end: 1u64 << n,
        })
    }
}

impl Iterator for SignCombinations {
    /// `true` means `+sigma`, `false` means `-sigma`.
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let mask = self.next;
        self.next += 1;
        Some((0..self.n).map(|i| mask & (1 << i) != 0).collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.end - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SignCombinations {}

/// Parameter vectors at every corner of the `±sigma` box.
pub fn perturbed_params(params: &[f64], sigma: &[f64]) -> Result<Vec<Vec<f64>>, AppError> {
    if params.len() != sigma.len() {
        return Err(AppError::DimensionMismatch {
            context: "band sigma",
            expected: params.len(),
            found: sigma.len(),
        });
    }

    Ok(SignCombinations::new(params.len())?
        .map(|signs| {
            params
                .iter()
                .zip(sigma)
                .zip(signs)
                .map(|((&p, &s), plus)| if plus { p + s } else { p - s })
                .collect()
        })
        .collect())
}

/// Lower and upper envelope of `func` over all `±sigma` parameter corners.
///
/// `func(x, params)` evaluates the model at a single point.
pub fn err_ranges<F>(x: &[f64], func: F, params: &[f64], sigma: &[f64]) -> Result<UncertaintyEnvelope, AppError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let corners = perturbed_params(params, sigma)?;

    let mut lower: Vec<f64> = x.iter().map(|&xi| func(xi, params)).collect();
    let mut upper = lower.clone();

    for corner in &corners {
        for (j, &xj) in x.iter().enumerate() {
            let y = func(xj, corner);
            lower[j] = lower[j].min(y);
            upper[j] = upper[j].max(y);
        }
    }

    Ok(UncertaintyEnvelope {
        x: x.to_vec(),
        lower,
        upper,
    })
}

/// Envelope for a fitted model using the given sigma.
pub fn model_band(fit: &FittedModel, x: &[f64], sigma: &[f64]) -> Result<UncertaintyEnvelope, AppError> {
    let kind: ModelKind = fit.model;
    err_ranges(x, |xi, p| predict(kind, xi, p), &fit.params, sigma)
}
