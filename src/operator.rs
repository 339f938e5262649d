//! The linear operator equivalent to the AR(1) forward model.
//!
//! Generating the trace of a spike sequence `s` is a matrix-vector product `x = A s` where `A` is
//! lower-triangular and constant along each diagonal (Toeplitz), with `A[i, j] = gamma^(i - j)` for `i >= j`.
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use crate::error::{check_gamma, DeconvError};

/// Returns the dense `len x len` forward matrix for the given decay.
///
/// # Examples
///
/// ```rust
/// use rusty_deconv::operator::build_forward_matrix;
///
/// let a = build_forward_matrix(3, 0.5).unwrap();
/// assert_eq!(a[(2, 0)], 0.25);
/// assert_eq!(a[(0, 2)], 0.0);
/// ```
pub fn build_forward_matrix(len: usize, gamma: f64) -> Result<DMatrix<f64>, DeconvError> {
    Ok(DecayOperator::build(len, gamma)?.to_matrix())
}

/// Compact representation of the forward matrix by its generating vector `[1, gamma, ..., gamma^(len - 1)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayOperator {
    gamma: f64,
    kernel: Vec<f64>,
}

impl DecayOperator {
    /// Create the operator for sequences of length `len`.
    /// Returns an error if the length is zero or if the decay is not in (-1, 1).
    pub fn build(len: usize, gamma: f64) -> Result<Self, DeconvError> {
        check_gamma(gamma)?;
        if len == 0 {
            return Err(DeconvError::InvalidParameter(
                "The sequence length must be positive".to_string(),
            ));
        }

        let kernel = std::iter::successors(Some(1.0), |g| Some(g * gamma))
            .take(len)
            .collect();

        Ok(DecayOperator { gamma, kernel })
    }

    /// Returns the decay of the operator.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Returns the length of the sequences the operator acts on.
    pub fn len(&self) -> usize {
        self.kernel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernel.is_empty()
    }

    /// Returns the first column of the forward matrix.
    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Materialize the dense forward matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.len(), |i, j| match i >= j {
            true => self.kernel[i - j],
            false => 0.0,
        })
    }

    /// Returns `A s`, computed with the recursion in O(len) time.
    pub fn apply(&self, spikes: &[f64]) -> Result<DVector<f64>, DeconvError> {
        self.check_len(spikes.len())?;
        let mut x = DVector::zeros(self.len());
        let mut prev = 0.0;
        for (t, &s) in spikes.iter().enumerate() {
            prev = self.gamma * prev + s;
            x[t] = prev;
        }
        Ok(x)
    }

    /// Returns `A^-1 x` in O(len) time.
    /// The inverse of the forward matrix is lower-bidiagonal with ones on the diagonal and `-gamma` below it.
    pub fn invert(&self, trace: &[f64]) -> Result<DVector<f64>, DeconvError> {
        self.check_len(trace.len())?;
        let mut s = DVector::zeros(self.len());
        s[0] = trace[0];
        for (t, (prev, next)) in trace.iter().tuple_windows().enumerate() {
            s[t + 1] = next - self.gamma * prev;
        }
        Ok(s)
    }

    fn check_len(&self, len: usize) -> Result<(), DeconvError> {
        if len != self.len() {
            return Err(DeconvError::InvalidParameter(format!(
                "Expected a sequence of length {}, got {}",
                self.len(),
                len
            )));
        }
        Ok(())
    }
}
