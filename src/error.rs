//! Error module for the Rusty Deconv library.
use std::error::Error;
use std::fmt;

use nalgebra::DVector;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum DeconvError {
    /// Error for invalid parameters, e.g., a decay outside (-1, 1) or a negative noise level.
    InvalidParameter(String),
    /// Error for a direct inversion attempted on a non-invertible matrix.
    SingularMatrix(String),
    /// The iterative solver exhausted its budget before converging.
    /// The last iterate is returned so the caller can still inspect it.
    NotConverged {
        iterate: DVector<f64>,
        num_iter: usize,
        max_update: f64,
    },
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for DeconvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeconvError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            DeconvError::SingularMatrix(e) => write!(f, "Singular matrix: {}", e),
            DeconvError::NotConverged {
                num_iter,
                max_update,
                ..
            } => write!(
                f,
                "Convergence error: no convergence after {} iterations (last update {:e})",
                num_iter, max_update
            ),
            DeconvError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for DeconvError {}

/// Check that the decay lies in the stable range (-1, 1).
pub(crate) fn check_gamma(gamma: f64) -> Result<(), DeconvError> {
    if !(gamma.is_finite() && gamma.abs() < 1.0) {
        return Err(DeconvError::InvalidParameter(format!(
            "The decay must lie in (-1, 1), got {}",
            gamma
        )));
    }
    Ok(())
}
