//! Model evaluation for the power law and sigmoid.
//!
//! The fitter relies on three primitive operations:
//! - predict `y(x)` for a parameter vector
//! - the analytic Jacobian row `∂y/∂(a, b)` at `x`
//! - a domain check on the sample's x-values
//!
//! Parameter vectors are `[a, b]` for both models.

use crate::domain::ModelKind;

/// Predict `y(x)` for the given model kind.
///
/// # Panics
/// Panics if `params` has fewer than two entries.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    let (a, b) = (params[0], params[1]);
    match model {
        ModelKind::Power => a * x.powf(b),
        ModelKind::Sigmoid => a * logistic(b * x),
    }
}

/// `1 / (1 + e^{-t})`, written so neither tail overflows to `inf / inf`.
fn logistic(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

/// Evaluate the model over a slice of x-values.
pub fn predict_all(model: ModelKind, xs: &[f64], params: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| predict(model, x, params)).collect()
}

/// Fill the Jacobian row `[∂y/∂a, ∂y/∂b]` at `x`.
pub fn fill_jacobian_row(model: ModelKind, x: f64, params: &[f64], out: &mut [f64]) {
    let (a, b) = (params[0], params[1]);
    match model {
        ModelKind::Power => {
            let xb = x.powf(b);
            out[0] = xb;
            out[1] = a * xb * x.ln();
        }
        ModelKind::Sigmoid => {
            // ∂/∂b of a·s(bx) is a·x·s·(1 - s); stays finite when e^{-bx} overflows.
            let s = logistic(b * x);
            out[0] = s;
            out[1] = a * x * s * (1.0 - s);
        }
    }
}

/// Check that every x lies in the model's domain.
///
/// The power model raises `x` to a non-integer exponent, so it needs `x > 0`.
pub fn check_domain(model: ModelKind, xs: &[f64]) -> Result<(), String> {
    if let Some((i, x)) = xs.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(format!("non-finite x={x} at index {i}"));
    }
    match model {
        ModelKind::Power => match xs.iter().enumerate().find(|(_, x)| **x <= 0.0) {
            Some((i, x)) => Err(format!(
                "power model needs x > 0, found x={x} at index {i}"
            )),
            None => Ok(()),
        },
        ModelKind::Sigmoid => Ok(()),
    }
}
