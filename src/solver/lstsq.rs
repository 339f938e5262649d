//! Unregularized least squares, i.e., the direct inverse and the pseudo-inverse of the forward matrix.
//!
//! In the absence of noise, both recover the spike sequence exactly.
//! With noise, the estimate is typically not sparse: the inverse amplifies the high-frequency content of the noise
//! and every time step ends up with a small spurious value.
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::DeconvError;
use crate::SINGULAR_VALUE_EPSILON;

/// Compute `A^-1 x` for a square matrix by LU decomposition.
/// Returns a `SingularMatrix` error if the matrix is not invertible.
pub fn solve_direct(a: &DMatrix<f64>, x: &[f64]) -> Result<DVector<f64>, DeconvError> {
    check_dims(a, x)?;
    if !a.is_square() {
        return Err(DeconvError::InvalidParameter(format!(
            "Direct inversion requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }

    let s = a
        .clone()
        .lu()
        .solve(&DVector::from_column_slice(x))
        .ok_or_else(|| DeconvError::SingularMatrix("LU decomposition has a zero pivot".to_string()))?;

    if s.iter().any(|v| !v.is_finite()) {
        return Err(DeconvError::SingularMatrix(
            "The direct solution is not finite".to_string(),
        ));
    }

    Ok(s)
}

/// Compute `pinv(A) x`, the minimum-norm least squares solution, by singular value decomposition.
/// Singular values below [`SINGULAR_VALUE_EPSILON`] are treated as zero.
pub fn solve_pseudo_inverse(a: &DMatrix<f64>, x: &[f64]) -> Result<DVector<f64>, DeconvError> {
    check_dims(a, x)?;
    let s = a
        .clone()
        .svd(true, true)
        .solve(&DVector::from_column_slice(x), SINGULAR_VALUE_EPSILON)
        .map_err(|e| DeconvError::SingularMatrix(e.to_string()))?;

    if s.iter().any(|v| !v.is_finite()) {
        return Err(DeconvError::SingularMatrix(
            "The pseudo-inverse solution is not finite".to_string(),
        ));
    }

    Ok(s)
}

/// Compute the least squares estimate of the spikes.
/// Square non-singular matrices are inverted directly, anything else goes through the pseudo-inverse.
///
/// # Examples
///
/// ```rust
/// use approx::assert_relative_eq;
/// use rusty_deconv::operator::build_forward_matrix;
/// use rusty_deconv::solver::solve_least_squares;
///
/// let a = build_forward_matrix(5, 0.9).unwrap();
/// let s = solve_least_squares(&a, &[0.0, 0.0, 1.0, 0.9, 0.81]).unwrap();
/// assert_relative_eq!(s[2], 1.0, epsilon = 1e-8);
/// assert_relative_eq!(s[3], 0.0, epsilon = 1e-8);
/// ```
pub fn solve_least_squares(a: &DMatrix<f64>, x: &[f64]) -> Result<DVector<f64>, DeconvError> {
    check_dims(a, x)?;
    if a.is_square() {
        match solve_direct(a, x) {
            Ok(s) => {
                debug!("Solved the {}x{} system directly", a.nrows(), a.ncols());
                return Ok(s);
            }
            Err(DeconvError::SingularMatrix(e)) => {
                warn!("Direct inversion failed ({}), falling back to the pseudo-inverse", e);
            }
            Err(e) => return Err(e),
        }
    }
    solve_pseudo_inverse(a, x)
}

pub(crate) fn check_dims(a: &DMatrix<f64>, x: &[f64]) -> Result<(), DeconvError> {
    if a.nrows() != x.len() {
        return Err(DeconvError::InvalidParameter(format!(
            "The matrix has {} rows but the trace has {} samples",
            a.nrows(),
            x.len()
        )));
    }
    if a.ncols() == 0 {
        return Err(DeconvError::InvalidParameter(
            "The matrix has no columns".to_string(),
        ));
    }
    if let Some(t) = x.iter().position(|v| !v.is_finite()) {
        return Err(DeconvError::InvalidParameter(format!(
            "The trace sample at index {} is not finite",
            t
        )));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(DeconvError::InvalidParameter(
            "The matrix has non-finite entries".to_string(),
        ));
    }
    Ok(())
}
