//! Recordings of calcium traces and deconvolution results, stored as JSON.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{check_gamma, DeconvError};
use crate::metrics::{count_nonzero, residual_norm, root_mean_squared_error};
use crate::operator::build_forward_matrix;
use crate::solver::Method;
use crate::trace::generate_trace;
use crate::NONZERO_TOLERANCE;

/// A calcium trace together with the decay of the indicator.
/// The spikes are only known for simulated recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// The decay of the AR(1) model.
    pub gamma: f64,
    /// The observed trace.
    pub trace: Vec<f64>,
    /// The ground-truth spikes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spikes: Option<Vec<f64>>,
    /// The standard deviation of the noise used to simulate the trace, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_sigma: Option<f64>,
}

impl Recording {
    /// Create a recording from a measured trace.
    pub fn new(trace: Vec<f64>, gamma: f64) -> Result<Self, DeconvError> {
        check_gamma(gamma)?;
        if trace.is_empty() {
            return Err(DeconvError::InvalidParameter(
                "The trace must not be empty".to_string(),
            ));
        }
        Ok(Recording {
            gamma,
            trace,
            spikes: None,
            noise_sigma: None,
        })
    }

    /// Simulate a recording by applying the forward model to the provided spikes.
    pub fn simulate<R: Rng>(
        spikes: Vec<f64>,
        gamma: f64,
        noise_sigma: f64,
        rng: &mut R,
    ) -> Result<Self, DeconvError> {
        check_spikes(&spikes)?;
        let trace = generate_trace(&spikes, gamma, noise_sigma, rng)?;
        Ok(Recording {
            gamma,
            trace,
            spikes: Some(spikes),
            noise_sigma: Some(noise_sigma),
        })
    }

    /// Returns the number of samples of the recording.
    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// Save the recording to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), DeconvError> {
        save_json(self, path)
    }

    /// Load a recording from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, DeconvError> {
        let recording: Recording = load_json(path)?;
        check_gamma(recording.gamma)?;
        if recording.trace.is_empty() {
            return Err(DeconvError::InvalidParameter(
                "The trace must not be empty".to_string(),
            ));
        }
        if let Some(spikes) = &recording.spikes {
            if spikes.len() != recording.trace.len() {
                return Err(DeconvError::InvalidParameter(format!(
                    "The recording has {} spikes for {} trace samples",
                    spikes.len(),
                    recording.trace.len()
                )));
            }
        }
        Ok(recording)
    }
}

/// The outcome of a deconvolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deconvolution {
    /// The method used to estimate the spikes.
    pub method: Method,
    /// The estimated spikes.
    pub spikes: Vec<f64>,
    /// The norm of the residual between the trace and the trace of the estimate.
    pub residual_norm: f64,
    /// The number of non-negligible estimated spikes.
    pub num_nonzero: usize,
    /// The root mean squared error to the ground truth, for simulated recordings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
}

impl Deconvolution {
    /// Estimate the spikes of a recording with the provided method.
    pub fn run(recording: &Recording, method: &Method) -> Result<Self, DeconvError> {
        let a = build_forward_matrix(recording.len(), recording.gamma)?;
        let estimate = method.solve(&a, &recording.trace)?;
        let residual_norm = residual_norm(&a, &estimate, &recording.trace)?;
        let spikes: Vec<f64> = estimate.iter().copied().collect();

        let rmse = match &recording.spikes {
            Some(truth) => Some(root_mean_squared_error(&spikes, truth)?),
            None => None,
        };
        let num_nonzero = count_nonzero(&spikes, NONZERO_TOLERANCE);

        info!(
            "Deconvolved {} samples: {} non-zero spikes, residual norm {:e}",
            spikes.len(),
            num_nonzero,
            residual_norm
        );

        Ok(Deconvolution {
            method: method.clone(),
            spikes,
            residual_norm,
            num_nonzero,
            rmse,
        })
    }

    /// Save the deconvolution to a file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), DeconvError> {
        save_json(self, path)
    }

    /// Load a deconvolution from a file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, DeconvError> {
        load_json(path)
    }
}

/// Load a spike sequence stored as a JSON array.
pub fn load_spikes<P: AsRef<Path>>(path: P) -> Result<Vec<f64>, DeconvError> {
    let spikes: Vec<f64> = load_json(path)?;
    check_spikes(&spikes)?;
    Ok(spikes)
}

fn check_spikes(spikes: &[f64]) -> Result<(), DeconvError> {
    if spikes.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(DeconvError::InvalidParameter(
            "Spikes must be finite and non-negative".to_string(),
        ));
    }
    Ok(())
}

fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), DeconvError> {
    let file = File::create(path).map_err(|e| DeconvError::IOError(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| DeconvError::IOError(e.to_string()))?;
    writer.flush().map_err(|e| DeconvError::IOError(e.to_string()))
}

fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, DeconvError> {
    let file = File::open(path).map_err(|e| DeconvError::IOError(e.to_string()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| DeconvError::IOError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tempfile::tempdir;

    use crate::solver::Lasso;

    #[test]
    fn test_recording_new_invalid() {
        assert!(Recording::new(vec![], 0.5).is_err());
        assert!(Recording::new(vec![1.0], 1.2).is_err());
    }

    #[test]
    fn test_recording_simulate_invalid_spikes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(matches!(
            Recording::simulate(vec![0.0, -1.0, 0.0], 0.9, 0.0, &mut rng),
            Err(DeconvError::InvalidParameter(_))
        ));
        assert!(matches!(
            Recording::simulate(vec![0.0, f64::NAN], 0.9, 0.0, &mut rng),
            Err(DeconvError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_recording_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recording.json");

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let recording =
            Recording::simulate(vec![0.0, 1.0, 0.0, 0.0, 1.0], 0.9, 0.05, &mut rng).unwrap();
        recording.save_to(&path).unwrap();

        assert_eq!(Recording::load_from(&path).unwrap(), recording);
    }

    #[test]
    fn test_recording_load_measured() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("measured.json");
        std::fs::write(&path, r#"{"gamma": 0.5, "trace": [1.0, 0.5, 0.25]}"#).unwrap();

        let recording = Recording::load_from(&path).unwrap();
        assert_eq!(recording, Recording::new(vec![1.0, 0.5, 0.25], 0.5).unwrap());
        assert!(recording.spikes.is_none());
    }

    #[test]
    fn test_recording_load_inconsistent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"gamma": 0.5, "trace": [1.0, 0.5], "spikes": [1.0]}"#).unwrap();
        assert!(matches!(
            Recording::load_from(&path),
            Err(DeconvError::InvalidParameter(_))
        ));

        assert!(matches!(
            Recording::load_from(dir.path().join("missing.json")),
            Err(DeconvError::IOError(_))
        ));
    }

    #[test]
    fn test_load_spikes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spikes.json");
        std::fs::write(&path, "[0.0, 1.0, 0.0]").unwrap();
        assert_eq!(load_spikes(&path).unwrap(), vec![0.0, 1.0, 0.0]);

        std::fs::write(&path, "[0.0, -1.0]").unwrap();
        assert!(load_spikes(&path).is_err());
    }

    #[test]
    fn test_deconvolution_run() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let recording = Recording::simulate(vec![0.0, 0.0, 1.0, 0.0, 0.0], 0.9, 0.0, &mut rng).unwrap();

        let deconv = Deconvolution::run(&recording, &Method::LeastSquares).unwrap();
        assert_eq!(deconv.num_nonzero, 1);
        assert_relative_eq!(deconv.residual_norm, 0.0, epsilon = 1e-10);
        assert_relative_eq!(deconv.rmse.unwrap(), 0.0, epsilon = 1e-10);

        let deconv = Deconvolution::run(&recording, &Method::Lasso(Lasso::new(1e-3))).unwrap();
        assert!(deconv.num_nonzero <= 2);
        assert!(deconv.residual_norm > 0.0);
    }

    #[test]
    fn test_deconvolution_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deconvolution.json");

        let recording = Recording::new(vec![1.0, 0.5, 1.25], 0.5).unwrap();
        let deconv = Deconvolution::run(&recording, &Method::LeastSquares).unwrap();
        deconv.save_to(&path).unwrap();

        assert_eq!(Deconvolution::load_from(&path).unwrap(), deconv);
    }
}
