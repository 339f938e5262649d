//! Metrics to compare spike estimates.
use itertools::izip;
use nalgebra::{DMatrix, DVector};

use crate::error::DeconvError;
use crate::solver::lstsq::check_dims;

/// Returns the number of entries whose magnitude exceeds the tolerance.
pub fn count_nonzero(spikes: &[f64], tol: f64) -> usize {
    spikes.iter().filter(|s| s.abs() > tol).count()
}

/// Returns the Euclidean norm of the residual `x - A s`.
pub fn residual_norm(a: &DMatrix<f64>, spikes: &DVector<f64>, x: &[f64]) -> Result<f64, DeconvError> {
    check_dims(a, x)?;
    if a.ncols() != spikes.len() {
        return Err(DeconvError::InvalidParameter(format!(
            "The matrix has {} columns but the estimate has {} entries",
            a.ncols(),
            spikes.len()
        )));
    }
    Ok((DVector::from_column_slice(x) - a * spikes).norm())
}

/// Returns the LASSO objective `||x - A s||^2 + alpha ||s||_1`.
pub fn lasso_objective(
    a: &DMatrix<f64>,
    spikes: &DVector<f64>,
    x: &[f64],
    alpha: f64,
) -> Result<f64, DeconvError> {
    let r = residual_norm(a, spikes, x)?;
    Ok(r * r + alpha * spikes.lp_norm(1))
}

/// Returns the root mean squared error between an estimate and the true spikes.
pub fn root_mean_squared_error(estimate: &[f64], truth: &[f64]) -> Result<f64, DeconvError> {
    if estimate.len() != truth.len() || truth.is_empty() {
        return Err(DeconvError::InvalidParameter(format!(
            "Cannot compare sequences of length {} and {}",
            estimate.len(),
            truth.len()
        )));
    }
    let sse = izip!(estimate, truth).fold(0.0, |acc, (e, t)| acc + (e - t).powi(2));
    Ok((sse / truth.len() as f64).sqrt())
}
