//! L1-regularized least squares (LASSO) by cyclic coordinate descent.
//!
//! The estimate minimizes `||x - A s||^2 + alpha ||s||_1`.
//! Each coordinate update is a soft-thresholding at `alpha / 2` of the partial residual correlation.
use log::{debug, info, trace, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::lstsq::check_dims;
use crate::error::DeconvError;
use crate::metrics::lasso_objective;
use crate::{DEFAULT_MAX_ITER, DEFAULT_TOLERANCE};

/// Configuration of the LASSO solver.
///
/// # Examples
///
/// ```rust
/// use rusty_deconv::operator::build_forward_matrix;
/// use rusty_deconv::solver::Lasso;
///
/// let a = build_forward_matrix(5, 0.9).unwrap();
/// let solution = Lasso::new(1e-3)
///     .with_max_iter(1_000)
///     .with_non_negative(true)
///     .solve(&a, &[0.0, 0.0, 1.0, 0.9, 0.81])
///     .unwrap();
///
/// assert!(solution.spikes()[2] > 0.99);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lasso {
    /// Weight of the L1 penalty.
    alpha: f64,
    /// Maximum number of coordinate descent sweeps.
    max_iter: usize,
    /// Relative tolerance on the largest coordinate update of a sweep.
    tolerance: f64,
    /// Restrict the estimate to non-negative values.
    non_negative: bool,
}

impl Lasso {
    pub fn new(alpha: f64) -> Self {
        Lasso {
            alpha,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            non_negative: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_non_negative(mut self, non_negative: bool) -> Self {
        self.non_negative = non_negative;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn non_negative(&self) -> bool {
        self.non_negative
    }

    fn validate(&self) -> Result<(), DeconvError> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(DeconvError::InvalidParameter(format!(
                "The regularization weight must be non-negative, got {}",
                self.alpha
            )));
        }
        if self.max_iter == 0 {
            return Err(DeconvError::InvalidParameter(
                "The iteration budget must be positive".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(DeconvError::InvalidParameter(format!(
                "The tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Run coordinate descent from the all-zero estimate.
    /// Returns a `NotConverged` error holding the last iterate if the iteration budget is exhausted.
    pub fn solve(&self, a: &DMatrix<f64>, x: &[f64]) -> Result<LassoSolution, DeconvError> {
        self.validate()?;
        check_dims(a, x)?;

        let col_norms: Vec<f64> = a.column_iter().map(|col| col.norm_squared()).collect();
        if let Some(j) = col_norms.iter().position(|&n| n == 0.0) {
            return Err(DeconvError::InvalidParameter(format!(
                "Column {} of the matrix is zero",
                j
            )));
        }

        let threshold = self.alpha / 2.0;
        let mut s: DVector<f64> = DVector::zeros(a.ncols());
        let mut r = DVector::from_column_slice(x);
        let mut max_update = f64::INFINITY;

        debug!(
            "Start coordinate descent on a {}x{} system (alpha={}, non_negative={})",
            a.nrows(),
            a.ncols(),
            self.alpha,
            self.non_negative
        );

        for it in 1..=self.max_iter {
            max_update = 0.0;
            let mut max_abs: f64 = 0.0;

            for (j, col) in a.column_iter().enumerate() {
                let old = s[j];
                let rho = col.dot(&r) + col_norms[j] * old;
                let mut new = soft_threshold(rho, threshold) / col_norms[j];
                if self.non_negative {
                    new = new.max(0.0);
                }

                let delta = new - old;
                if !delta.is_finite() {
                    warn!("Coordinate {} diverged at sweep {}", j, it);
                    return Err(DeconvError::NotConverged {
                        iterate: s,
                        num_iter: it,
                        max_update: f64::INFINITY,
                    });
                }
                if delta != 0.0 {
                    r.axpy(-delta, &col, 1.0);
                    s[j] = new;
                }

                max_update = max_update.max(delta.abs());
                max_abs = max_abs.max(new.abs());
            }

            trace!("Sweep {}: max update {:e}", it, max_update);

            if max_update <= self.tolerance * max_abs.max(1.0) {
                let objective = lasso_objective(a, &s, x, self.alpha)?;
                info!(
                    "Coordinate descent converged in {} sweeps (objective {:e})",
                    it, objective
                );
                return Ok(LassoSolution {
                    spikes: s,
                    num_iter: it,
                    objective,
                });
            }
        }

        warn!(
            "Coordinate descent did not converge within {} sweeps (last update {:e})",
            self.max_iter, max_update
        );
        Err(DeconvError::NotConverged {
            iterate: s,
            num_iter: self.max_iter,
            max_update,
        })
    }
}

/// A converged LASSO estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct LassoSolution {
    spikes: DVector<f64>,
    num_iter: usize,
    objective: f64,
}

impl LassoSolution {
    /// Returns the estimated spikes.
    pub fn spikes(&self) -> &DVector<f64> {
        &self.spikes
    }

    /// Returns the number of sweeps needed to converge.
    pub fn num_iter(&self) -> usize {
        self.num_iter
    }

    /// Returns the value of the objective at the estimate.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn into_spikes(self) -> DVector<f64> {
        self.spikes
    }
}

/// Solve the LASSO problem with the default tolerance.
pub fn solve_lasso(
    a: &DMatrix<f64>,
    x: &[f64],
    alpha: f64,
    max_iter: usize,
) -> Result<DVector<f64>, DeconvError> {
    Lasso::new(alpha)
        .with_max_iter(max_iter)
        .solve(a, x)
        .map(LassoSolution::into_spikes)
}

fn soft_threshold(z: f64, threshold: f64) -> f64 {
    z.signum() * (z.abs() - threshold).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::metrics::count_nonzero;
    use crate::operator::build_forward_matrix;
    use crate::solver::solve_least_squares;
    use crate::trace::generate_clean_trace;
    use crate::NONZERO_TOLERANCE;

    #[test]
    fn test_soft_threshold() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(-0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(0.5, 0.0), 0.5);
    }

    #[test]
    fn test_lasso_single_spike() {
        let a = build_forward_matrix(5, 0.9).unwrap();
        let x = generate_clean_trace(&[0.0, 0.0, 1.0, 0.0, 0.0], 0.9).unwrap();

        let solution = Lasso::new(1e-3).solve(&a, &x).unwrap();
        let s = solution.spikes();

        assert!(count_nonzero(s.as_slice(), NONZERO_TOLERANCE) <= 2);
        assert_eq!(s.imax(), 2);
        // Shrunk towards zero by the penalty.
        assert!(s[2] < 1.0);
        assert_relative_eq!(s[2], 1.0, epsilon = 1e-2);
        assert!(solution.num_iter() >= 1);
    }

    #[test]
    fn test_lasso_zero_alpha_matches_least_squares() {
        let spikes = vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let noise = vec![0.02, -0.01, 0.03, 0.0, -0.02, 0.01, 0.015, -0.03];
        let a = build_forward_matrix(spikes.len(), 0.8).unwrap();
        let x: Vec<f64> = generate_clean_trace(&spikes, 0.8)
            .unwrap()
            .iter()
            .zip(noise.iter())
            .map(|(x, n)| x + n)
            .collect();

        let s_lasso = Lasso::new(0.0)
            .with_tolerance(1e-12)
            .with_max_iter(100_000)
            .solve(&a, &x)
            .unwrap();
        let s_lstsq = solve_least_squares(&a, &x).unwrap();
        assert_relative_eq!(*s_lasso.spikes(), s_lstsq, epsilon = 1e-8);
    }

    #[test]
    fn test_lasso_huge_alpha_is_zero() {
        let a = build_forward_matrix(6, 0.7).unwrap();
        let x = generate_clean_trace(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0], 0.7).unwrap();
        let s = solve_lasso(&a, &x, 1e6, 100).unwrap();
        assert!(s.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_lasso_non_negative() {
        let a = build_forward_matrix(6, 0.5).unwrap();
        // The unconstrained estimate of this trace has a negative entry at index 3.
        let x = vec![1.0, 0.5, 0.25, -0.5, 0.0, 0.0];
        let s = Lasso::new(1e-4)
            .with_non_negative(true)
            .solve(&a, &x)
            .unwrap();
        assert!(s.spikes().iter().all(|&v| v >= 0.0));

        let s = Lasso::new(1e-4).solve(&a, &x).unwrap();
        assert!(s.spikes()[3] < 0.0);
    }

    #[test]
    fn test_lasso_not_converged() {
        let a = build_forward_matrix(10, 0.95).unwrap();
        let x = generate_clean_trace(&[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0], 0.95).unwrap();
        match Lasso::new(1e-6).with_max_iter(1).solve(&a, &x) {
            Err(DeconvError::NotConverged {
                iterate,
                num_iter,
                max_update,
            }) => {
                assert_eq!(num_iter, 1);
                assert_eq!(iterate.len(), 10);
                assert!(max_update > 0.0);
                assert!(iterate.iter().any(|&v| v != 0.0));
            }
            other => panic!("Expected a convergence error, got {:?}", other),
        }
    }

    #[test]
    fn test_lasso_invalid_parameters() {
        let a = build_forward_matrix(3, 0.5).unwrap();
        let x = vec![1.0, 0.5, 0.25];
        assert!(matches!(
            Lasso::new(-1.0).solve(&a, &x),
            Err(DeconvError::InvalidParameter(_))
        ));
        assert!(matches!(
            solve_lasso(&a, &x, 0.1, 0),
            Err(DeconvError::InvalidParameter(_))
        ));
        assert!(matches!(
            Lasso::new(0.1).with_tolerance(0.0).solve(&a, &x),
            Err(DeconvError::InvalidParameter(_))
        ));
        assert!(matches!(
            solve_lasso(&a, &[1.0, 0.5], 0.1, 10),
            Err(DeconvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_lasso_non_finite_trace() {
        let a = build_forward_matrix(4, 0.5).unwrap();
        assert!(matches!(
            solve_lasso(&a, &[1.0, f64::NAN, 0.0, 0.0], 0.1, 100),
            Err(DeconvError::InvalidParameter(_))
        ));
        assert!(matches!(
            Lasso::new(0.1).solve(&a, &[1.0, 0.0, f64::NEG_INFINITY, 0.0]),
            Err(DeconvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_lasso_overflow_is_not_converged() {
        // Finite inputs whose correlations overflow to infinity.
        let a = DMatrix::from_row_slice(2, 1, &[1e300, 1e300]);
        match solve_lasso(&a, &[1e300, 1e300], 0.0, 100) {
            Err(DeconvError::NotConverged { num_iter, .. }) => assert_eq!(num_iter, 1),
            other => panic!("Expected a convergence error, got {:?}", other),
        }
    }

    #[test]
    fn test_lasso_zero_column() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);
        assert!(matches!(
            solve_lasso(&a, &[1.0, 1.0], 0.1, 10),
            Err(DeconvError::InvalidParameter(_))
        ));
    }
}
