//! Small dense linear solves.
//!
//! Logistic regression repeatedly solves the Newton system
//!
//! ```text
//! (Xᵀ W X + Λ) δ = g
//! ```
//!
//! where the matrix is symmetric positive definite whenever the L2 penalty is
//! positive. We try Cholesky first and fall back to SVD with progressively
//! looser tolerances for nearly singular systems.

use nalgebra::{DMatrix, DVector};

/// Solve a symmetric positive (semi-)definite system `a x = b`.
///
/// Returns `None` if no finite solution could be found.
pub fn solve_spd(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }

    let svd = a.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_spd_system() {
        // [[4, 1], [1, 3]] x = [1, 2]  =>  x = [1/11, 7/11]
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_row_slice(&[1.0, 2.0]);
        let x = solve_spd(&a, &b).unwrap();
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-12);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn singular_system_falls_back_to_svd() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_row_slice(&[2.0, 2.0]);
        let x = solve_spd(&a, &b).unwrap();
        assert!((x[0] + x[1] - 2.0).abs() < 1e-9);
    }
}
