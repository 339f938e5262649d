//! This crate provides tools for recovering spikes from calcium imaging traces in Rust.
//!
//! The observed trace is modeled by a first-order autoregression driven by the spikes,
//! `x[t] = gamma * x[t-1] + s[t]`, plus Gaussian noise.
//! Recovering the spikes is a linear inverse problem with a lower-triangular Toeplitz forward matrix.
//!
//! # Forward Model
//!
//! ```rust
//! use approx::assert_relative_eq;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use rusty_deconv::trace::generate_trace;
//!
//! // One spike at index 2, observed without noise
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let trace = generate_trace(&[0.0, 0.0, 1.0, 0.0, 0.0], 0.9, 0.0, &mut rng).unwrap();
//!
//! assert_relative_eq!(trace[4], 0.81, epsilon = 1e-12);
//! ```
//!
//! # Deconvolution
//!
//! ## Least Squares
//!
//! ```rust
//! use approx::assert_relative_eq;
//! use nalgebra::DVector;
//! use rusty_deconv::operator::build_forward_matrix;
//! use rusty_deconv::solver::solve_least_squares;
//! use rusty_deconv::trace::generate_clean_trace;
//!
//! let spikes = vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
//! let a = build_forward_matrix(spikes.len(), 0.8).unwrap();
//! let trace = generate_clean_trace(&spikes, 0.8).unwrap();
//!
//! let estimate = solve_least_squares(&a, &trace).unwrap();
//! assert_relative_eq!(estimate, DVector::from_vec(spikes), epsilon = 1e-8);
//! ```
//!
//! ## Sparse Estimates
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use rusty_deconv::metrics::count_nonzero;
//! use rusty_deconv::operator::build_forward_matrix;
//! use rusty_deconv::solver::solve_lasso;
//! use rusty_deconv::trace::generate_trace;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let spikes = vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
//! let a = build_forward_matrix(spikes.len(), 0.9).unwrap();
//! let trace = generate_trace(&spikes, 0.9, 0.01, &mut rng).unwrap();
//!
//! // A large enough penalty removes most of the spurious spikes due to noise
//! let estimate = solve_lasso(&a, &trace, 0.1, 10_000).unwrap();
//! assert!(count_nonzero(estimate.as_slice(), 1e-9) < spikes.len());
//! ```

pub mod error;
pub mod metrics;
pub mod operator;
pub mod recording;
pub mod solver;
pub mod trace;

/// Default relative tolerance on the largest coordinate update for the LASSO solver to stop.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;
/// Default maximum number of coordinate descent sweeps.
pub const DEFAULT_MAX_ITER: usize = 10_000;
/// Singular values below this threshold are treated as zero by the pseudo-inverse.
pub const SINGULAR_VALUE_EPSILON: f64 = 1e-12;
/// The magnitude above which an estimated spike is counted as non-zero.
pub const NONZERO_TOLERANCE: f64 = 1e-9;
