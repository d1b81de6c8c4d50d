//! Nonlinear least-squares fitting for a single model kind.
//!
//! Given paired observations `(x_i, y_i)` and a model `f(x; a, b)`, we minimize
//!
//! ```text
//! SSE(a, b) = Σ (y_i - f(x_i; a, b))²
//! ```
//!
//! with Levenberg–Marquardt:
//! - start from `(1, 1)` unless the caller supplies a guess
//! - at each iteration solve the damped linear step (see `math::ols::damped_step`)
//! - accept the step if SSE decreases (and relax damping), otherwise reject and
//!   increase damping
//! - stop on a relative SSE or step-size tolerance, or fail once the iteration
//!   budget is spent
//!
//! After convergence the parameter covariance is `s² (JᵀJ)⁻¹` with
//! `s² = SSE / (n - p)`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FittedModel, ModelKind};
use crate::error::AppError;
use crate::math::damped_step;
use crate::models::{check_domain, fill_jacobian_row, predict};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;

/// Optimizer budget and starting point.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Starting parameters `[a, b]`.
    pub initial: Vec<f64>,
    /// Maximum number of LM iterations (accepted or rejected steps).
    pub max_iterations: usize,
    /// Relative tolerance on SSE reduction and on step size.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            initial: vec![1.0, 1.0],
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// Fit `model` to `(x, y)`.
///
/// Fails with `FitDidNotConverge` on out-of-domain or non-finite input, on a
/// non-finite model evaluation at the start point, when the budget runs out,
/// or when the final Jacobian is singular.
pub fn fit_curve(
    model: ModelKind,
    x: &[f64],
    y: &[f64],
    opts: &FitOptions,
) -> Result<FittedModel, AppError> {
    let fail = |reason: String| AppError::FitDidNotConverge {
        model: model.display_name(),
        reason,
    };

    let p = model.param_count();
    let n = x.len();

    if y.len() != n {
        return Err(AppError::DimensionMismatch {
            context: "curve fit samples",
            expected: n,
            found: y.len(),
        });
    }
    if opts.initial.len() != p {
        return Err(AppError::DimensionMismatch {
            context: "curve fit initial guess",
            expected: p,
            found: opts.initial.len(),
        });
    }
    if n < p {
        return Err(fail(format!("need at least {p} observations, got {n}")));
    }
    check_domain(model, x).map_err(fail)?;
    if let Some((i, v)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(fail(format!("non-finite y={v} at index {i}")));
    }

    let mut params = DVector::from_column_slice(&opts.initial);
    let mut residuals =
        residuals_at(model, x, y, params.as_slice()).ok_or_else(|| fail("model is not finite at the initial guess".into()))?;
    let mut sse = residuals.norm_squared();
    let mut lambda = LAMBDA_INIT;
    let tol = opts.tolerance.max(f64::EPSILON);

    let mut converged = sse == 0.0;
    let mut iterations = 0usize;

    while !converged && iterations < opts.max_iterations {
        iterations += 1;

        let jac = jacobian(model, x, params.as_slice());
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(fail(format!(
                "non-finite Jacobian at iteration {iterations} (params={:?})",
                params.as_slice()
            )));
        }
        let Some(step) = damped_step(&jac, &residuals, lambda) else {
            lambda = (lambda * 10.0).min(LAMBDA_MAX);
            continue;
        };

        let candidate = &params + &step;
        let step_small = step.norm() <= tol * (params.norm() + tol);

        match residuals_at(model, x, y, candidate.as_slice()) {
            Some(r_new) if r_new.norm_squared() < sse => {
                let sse_new = r_new.norm_squared();
                let rel_drop = (sse - sse_new) / sse;
                debug!(
                    model = model.display_name(),
                    iteration = iterations,
                    sse = sse_new,
                    lambda,
                    "accepted step"
                );

                params = candidate;
                residuals = r_new;
                sse = sse_new;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                converged = rel_drop <= tol || step_small || sse == 0.0;
            }
            _ => {
                // A rejected step that is already negligible means no nearby
                // point improves on the current one.
                converged = step_small;
                lambda *= 10.0;
                if lambda > LAMBDA_MAX && !converged {
                    return Err(fail(format!(
                        "damping diverged after {iterations} iterations (SSE={sse:.6e})"
                    )));
                }
            }
        }
    }

    if !converged {
        return Err(fail(format!(
            "iteration budget of {} exhausted (SSE={sse:.6e})",
            opts.max_iterations
        )));
    }

    let covariance = covariance(model, x, params.as_slice(), sse, n, p)
        .ok_or_else(|| fail("singular Jacobian at the solution; parameters are not identifiable".into()))?;

    let sigma: Vec<f64> = (0..p).map(|i| covariance[(i, i)].abs().sqrt()).collect();

    Ok(FittedModel {
        model,
        params: params.iter().copied().collect(),
        sigma,
        covariance: covariance.transpose().iter().copied().collect(),
        sse,
        rmse: (sse / n as f64).sqrt(),
        n,
        iterations,
    })
}

fn residuals_at(model: ModelKind, x: &[f64], y: &[f64], params: &[f64]) -> Option<DVector<f64>> {
    let mut out = DVector::zeros(x.len());
    for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        let f = predict(model, xi, params);
        if !f.is_finite() {
            return None;
        }
        out[i] = yi - f;
    }
    Some(out)
}

fn jacobian(model: ModelKind, x: &[f64], params: &[f64]) -> DMatrix<f64> {
    let p = params.len();
    let mut jac = DMatrix::zeros(x.len(), p);
    let mut row = vec![0.0; p];
    for (i, &xi) in x.iter().enumerate() {
        fill_jacobian_row(model, xi, params, &mut row);
        for (j, v) in row.iter().enumerate() {
            jac[(i, j)] = *v;
        }
    }
    jac
}

fn covariance(model: ModelKind, x: &[f64], params: &[f64], sse: f64, n: usize, p: usize) -> Option<DMatrix<f64>> {
    let jac = jacobian(model, x, params);
    if jac.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let jtj_inv = (jac.transpose() * &jac).try_inverse()?;
    if jtj_inv.iter().any(|v| !v.is_finite()) {
        return None;
    }

    // With no residual degrees of freedom the variance estimate is undefined.
    if n <= p {
        return Some(DMatrix::from_element(p, p, f64::INFINITY));
    }
    let s2 = sse / (n - p) as f64;
    Some(jtj_inv * s2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;
    use crate::models::predict_all;

    #[test]
    fn power_recovers_exact_parameters() {
        let x = [1.0, 4.0, 9.0];
        let y = predict_all(ModelKind::Power, &x, &[2.0, 0.5]);
        let fit = fit_curve(ModelKind::Power, &x, &y, &FitOptions::default()).unwrap();

        assert!((fit.params[0] - 2.0).abs() < 1e-6, "a={}", fit.params[0]);
        assert!((fit.params[1] - 0.5).abs() < 1e-6, "b={}", fit.params[1]);
        assert!(fit.sse < 1e-10);
        assert_eq!(fit.sigma.len(), 2);
        assert_eq!(fit.covariance.len(), 4);
    }

    #[test]
    fn sigmoid_recovers_exact_parameters() {
        let x = linspace(-3.0, 3.0, 13);
        let y = predict_all(ModelKind::Sigmoid, &x, &[5.0, 1.5]);
        let fit = fit_curve(ModelKind::Sigmoid, &x, &y, &FitOptions::default()).unwrap();

        assert!((fit.params[0] - 5.0).abs() < 1e-6, "a={}", fit.params[0]);
        assert!((fit.params[1] - 1.5).abs() < 1e-6, "b={}", fit.params[1]);
    }

    #[test]
    fn noisy_fit_reports_finite_positive_sigma() {
        let x = linspace(1.0, 20.0, 25);
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &xi)| 3.0 * xi.powf(0.7) + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        let fit = fit_curve(ModelKind::Power, &x, &y, &FitOptions::default()).unwrap();
        assert!((fit.params[1] - 0.7).abs() < 0.05);
        for s in &fit.sigma {
            assert!(s.is_finite() && *s > 0.0);
        }
    }

    #[test]
    fn power_rejects_nonpositive_x() {
        let err = fit_curve(ModelKind::Power, &[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::FitDidNotConverge { model: "power", .. }));
    }

    #[test]
    fn non_finite_y_is_rejected() {
        let err = fit_curve(ModelKind::Sigmoid, &[0.0, 1.0, 2.0], &[0.0, f64::NAN, 2.0], &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::FitDidNotConverge { .. }));
    }

    #[test]
    fn exhausted_budget_fails() {
        let x = [1.0, 4.0, 9.0];
        let y = predict_all(ModelKind::Power, &x, &[2.0, 0.5]);
        let opts = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let err = fit_curve(ModelKind::Power, &x, &y, &opts).unwrap_err();
        assert!(matches!(err, AppError::FitDidNotConverge { .. }));
        assert!(err.to_string().contains("budget"));
    }

    /// Scattered, zero-filled data shaped like the renewable/access indicators.
    fn indicator_like_sample(n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let xi = 100.0 * next().powf(1.5);
            let yi = 40.0 + 60.0 * next();
            x.push(if i % 7 == 0 { 0.0 } else { xi });
            y.push(if i % 11 == 0 { 0.0 } else { yi });
        }
        (x, y)
    }

    #[test]
    fn sigmoid_on_scattered_zero_filled_data_does_not_panic() {
        let (x, y) = indicator_like_sample(250);
        let outcome = std::panic::catch_unwind(|| fit_curve(ModelKind::Sigmoid, &x, &y, &FitOptions::default()));
        match outcome.expect("sigmoid fit panicked") {
            Ok(fit) => {
                assert!(fit.params.iter().all(|p| p.is_finite()));
                assert!(fit.sse.is_finite());
            }
            Err(err) => assert!(matches!(err, AppError::FitDidNotConverge { .. }), "{err}"),
        }
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = fit_curve(ModelKind::Sigmoid, &[1.0, 2.0], &[1.0], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));
    }
}
