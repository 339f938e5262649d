//! Forward model: calcium traces from spike sequences.
//!
//! The trace follows a first-order autoregression driven by the spikes,
//! i.e., `x[0] = s[0]` and `x[t] = gamma * x[t-1] + s[t]` for `t >= 1`,
//! optionally corrupted by i.i.d. Gaussian noise on every sample.
//! Only the first sample has no predecessor; there are no spikes before `t = 0`.
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{check_gamma, DeconvError};

/// Returns the noiseless trace produced by the spikes with the given decay.
///
/// # Examples
///
/// ```rust
/// use approx::assert_relative_eq;
/// use rusty_deconv::trace::generate_clean_trace;
///
/// let trace = generate_clean_trace(&[0.0, 0.0, 1.0, 0.0, 0.0], 0.9).unwrap();
/// assert_relative_eq!(trace[3], 0.9);
/// assert_relative_eq!(trace[4], 0.81);
/// ```
pub fn generate_clean_trace(spikes: &[f64], gamma: f64) -> Result<Vec<f64>, DeconvError> {
    check_gamma(gamma)?;
    if spikes.is_empty() {
        return Err(DeconvError::InvalidParameter(
            "The spike sequence must not be empty".to_string(),
        ));
    }

    let trace = spikes
        .iter()
        .scan(None, |state: &mut Option<f64>, &spike| {
            let x = match *state {
                Some(prev) => gamma * prev + spike,
                None => spike,
            };
            *state = Some(x);
            Some(x)
        })
        .collect();

    Ok(trace)
}

/// Returns the trace produced by the spikes with the given decay, with additive Gaussian noise of standard deviation `noise_sigma` on every sample.
/// The noise is drawn from the provided random number generator, so seeding it makes the trace reproducible.
pub fn generate_trace<R: Rng>(
    spikes: &[f64],
    gamma: f64,
    noise_sigma: f64,
    rng: &mut R,
) -> Result<Vec<f64>, DeconvError> {
    if !(noise_sigma.is_finite() && noise_sigma >= 0.0) {
        return Err(DeconvError::InvalidParameter(format!(
            "The noise level must be non-negative, got {}",
            noise_sigma
        )));
    }

    let mut trace = generate_clean_trace(spikes, gamma)?;
    if noise_sigma == 0.0 {
        return Ok(trace);
    }

    let noise = Normal::new(0.0, noise_sigma)
        .map_err(|e| DeconvError::InvalidParameter(format!("Invalid noise distribution: {}", e)))?;
    trace.iter_mut().for_each(|x| *x += noise.sample(rng));

    debug!(
        "Generated a trace of length {} (gamma={}, sigma={})",
        trace.len(),
        gamma,
        noise_sigma
    );

    Ok(trace)
}
