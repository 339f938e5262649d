//! Inverse solvers recovering spikes from a trace and the forward matrix.
//!
//! - [`lstsq`]: unregularized least squares (direct inverse, with a pseudo-inverse fallback)
//! - [`lasso`]: L1-regularized least squares, promoting sparse estimates
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::DeconvError;

pub mod lasso;
pub mod lstsq;

pub use lasso::{solve_lasso, Lasso, LassoSolution};
pub use lstsq::{solve_direct, solve_least_squares, solve_pseudo_inverse};

/// The deconvolution method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    /// Least squares, i.e., no prior on the spikes.
    LeastSquares,
    /// L1-regularized least squares, i.e., Laplace prior on the spikes.
    Lasso(Lasso),
}

impl Method {
    /// Estimate the spikes with the method.
    pub fn solve(&self, a: &DMatrix<f64>, x: &[f64]) -> Result<DVector<f64>, DeconvError> {
        match self {
            Method::LeastSquares => solve_least_squares(a, x),
            Method::Lasso(lasso) => lasso.solve(a, x).map(LassoSolution::into_spikes),
        }
    }
}
