//! Linear least squares solver.
//!
//! Each Levenberg–Marquardt step solves a small linear problem:
//!
//! ```text
//! minimize ‖J δ - r‖² + λ ‖D δ‖²
//! ```
//!
//! which we express as one tall least-squares system by stacking `J` on top of
//! `sqrt(λ) D`. The parameter dimension is tiny (2 columns), so SVD is cheap
//! and robust for the near-singular Jacobians the power model produces when
//! `b` drifts towards zero.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly or
/// holds a non-finite entry (the SVD cannot take NaN/inf).
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `(JᵀJ + λ diag(JᵀJ)) δ = Jᵀ r` in least-squares form.
pub fn damped_step(jac: &DMatrix<f64>, residuals: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let n = jac.nrows();
    let p = jac.ncols();

    let mut stacked = DMatrix::<f64>::zeros(n + p, p);
    stacked.view_mut((0, 0), (n, p)).copy_from(jac);

    let mut rhs = DVector::<f64>::zeros(n + p);
    rhs.rows_mut(0, n).copy_from(residuals);

    for j in 0..p {
        // Marquardt scaling: damp each direction by its own curvature.
        let scale = jac.column(j).norm_squared().max(1e-12);
        stacked[(n + j, j)] = (lambda * scale).sqrt();
    }

    solve_least_squares(&stacked, &rhs)
}
