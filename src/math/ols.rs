//! Penalized least squares solver.
//!
//! Every fit in this crate reduces to problems of the form:
//!
//! ```text
//! minimize ||y - X β||² + Σ_j λ_j β_j²
//! ```
//!
//! The ridge terms are the Gaussian priors on trend rate changes and seasonal
//! coefficients. We fold them into the design by appending one row per
//! penalized column (`sqrt(λ_j)` on the diagonal, 0 on the right-hand side) and
//! solve the augmented ordinary least squares problem with SVD.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `min ||y - Xβ||² + Σ λ_j β_j²` with per-column penalties.
///
/// `penalties` must have one entry per column of `x`; zero means unpenalized.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    let n = x.nrows();
    let p = x.ncols();
    debug_assert_eq!(penalties.len(), p);

    let penalized: Vec<(usize, f64)> = penalties
        .iter()
        .enumerate()
        .filter(|(_, l)| **l > 0.0 && l.is_finite())
        .map(|(j, &l)| (j, l.sqrt()))
        .collect();

    if penalized.is_empty() {
        return solve_least_squares(x, y);
    }

    let rows = n + penalized.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    xa.rows_mut(0, n).copy_from(x);
    let mut ya = DVector::<f64>::zeros(rows);
    ya.rows_mut(0, n).copy_from(y);

    for (r, &(j, sl)) in penalized.iter().enumerate() {
        xa[(n + r, j)] = sl;
    }

    solve_least_squares(&xa, &ya)
}
