use super::BaselineCorrector;
use crate::errors::{
    InputValidationError,
    NumericalError,
    Result,
};
use crate::models::Trace;
use crate::utils::banded::SymmetricPentadiagonal;
use crate::utils::validation::{
    check_finite,
    check_min_len,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AalsConfig {
    /// Smoothness penalty on the second differences of the baseline.
    pub lambda: f64,
    /// Weight given to samples above the current baseline estimate.
    pub p: f64,
    pub niter: usize,
}

impl Default for AalsConfig {
    fn default() -> Self {
        Self {
            lambda: 1e2,
            p: 0.001,
            niter: 10,
        }
    }
}

impl AalsConfig {
    pub fn validate(&self) -> std::result::Result<(), InputValidationError> {
        if !(self.lambda > 0.0 && self.lambda.is_finite()) {
            return Err(InputValidationError::invalid_parameter(
                "lambda",
                self.lambda,
                "must be finite and greater than 0",
            ));
        }
        if !(self.p > 0.0 && self.p < 1.0) {
            return Err(InputValidationError::invalid_parameter(
                "p",
                self.p,
                "must be strictly between 0 and 1",
            ));
        }
        if self.niter == 0 {
            return Err(InputValidationError::invalid_parameter(
                "niter",
                self.niter,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Asymmetric reweighted least squares baseline corrector.
///
/// Each iteration solves `(W + lambda D'D) z = W y` for the baseline `z`,
/// then reweights every sample with `p` if it lies above `z` and `1 - p`
/// otherwise. The corrected intensity is `y - z` on the original time axis.
#[derive(Debug, Clone)]
pub struct AalsCorrector {
    config: AalsConfig,
}

impl AalsCorrector {
    pub fn new(config: AalsConfig) -> std::result::Result<Self, InputValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn baseline(&self, y: &[f64]) -> Result<Vec<f64>> {
        check_min_len(y, 3, "aals signal")?;
        check_finite(y, "aals signal")?;

        let penalty = SymmetricPentadiagonal::second_difference_penalty(y.len(), self.config.lambda);
        let mut weights = vec![1.0; y.len()];
        let mut z = vec![0.0; y.len()];
        for _ in 0..self.config.niter {
            let system = penalty.with_added_diagonal(&weights);
            let rhs: Vec<f64> = weights.iter().zip(y.iter()).map(|(w, v)| w * v).collect();
            z = system.solve(&rhs).map_err(|e| match e {
                NumericalError::SingularSystem { row, pivot, .. } => NumericalError::SingularSystem {
                    row,
                    pivot,
                    context: "aals baseline".to_string(),
                },
                other => other,
            })?;
            for ((w, yi), zi) in weights.iter_mut().zip(y.iter()).zip(z.iter()) {
                *w = if yi > zi {
                    self.config.p
                } else {
                    1.0 - self.config.p
                };
            }
        }
        Ok(z)
    }
}

impl BaselineCorrector for AalsCorrector {
    fn name(&self) -> &'static str {
        "AALS"
    }

    fn correct(&self, trace: &Trace) -> Result<Trace> {
        let z = self.baseline(trace.intensity())?;
        let corrected = trace
            .intensity()
            .iter()
            .zip(z.iter())
            .map(|(y, b)| y - b)
            .collect();
        Ok(Trace::new(trace.time().to_vec(), corrected)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ChromaPickError;

    #[test]
    fn test_flat_baseline_with_bump_is_removed() {
        let n = 200;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.05).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64;
                10.0 + 100.0 * (-(t - 150.0).powi(2) / (2.0 * 25.0)).exp()
            })
            .collect();
        let trace = Trace::new(time, y).unwrap();
        let aals = AalsCorrector::new(AalsConfig::default()).unwrap();
        let out = aals.correct(&trace).unwrap();
        assert_eq!(out.len(), n);

        let baseline_region = &out.intensity()[..80];
        let mean = baseline_region.iter().sum::<f64>() / baseline_region.len() as f64;
        assert!(mean.abs() < 0.1, "Baseline mean not ~0: {}", mean);
        // The bump survives the correction.
        assert!(out.intensity()[150] > 80.0, "Got {}", out.intensity()[150]);
    }

    #[test]
    fn test_validation() {
        assert!(
            AalsCorrector::new(AalsConfig {
                p: 1.0,
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            AalsCorrector::new(AalsConfig {
                lambda: 0.0,
                ..Default::default()
            })
            .is_err()
        );
        let aals = AalsCorrector::new(AalsConfig::default()).unwrap();
        let out = aals.baseline(&[1.0, 2.0]);
        assert!(matches!(
            out,
            Err(ChromaPickError::InputValidation(
                InputValidationError::TooFewPoints { .. }
            ))
        ));
        let out = aals.baseline(&[1.0, f64::INFINITY, 2.0]);
        assert!(matches!(
            out,
            Err(ChromaPickError::InputValidation(
                InputValidationError::ExpectedFiniteData { .. }
            ))
        ));
    }
}
