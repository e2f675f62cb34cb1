use super::BaselineCorrector;
use crate::errors::{
    InputValidationError,
    Result,
};
use crate::models::Trace;
use crate::utils::rolling_calculators::{
    MAX_WINDOW_SIZE,
    PadMode,
    rolling_min_into,
};
use crate::utils::validation::{
    check_finite,
    check_min_len,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwmConfig {
    /// Odd window length in samples, at most [`MAX_WINDOW_SIZE`] (101).
    /// The rolling minimum keeps its window on the stack, so longer windows
    /// are rejected by [`SwmConfig::validate`] instead of being clamped.
    pub window_length: usize,
    pub padding_mode: PadMode,
}

impl Default for SwmConfig {
    fn default() -> Self {
        Self {
            window_length: 3,
            padding_mode: PadMode::Edge,
        }
    }
}

impl SwmConfig {
    pub fn validate(&self) -> std::result::Result<(), InputValidationError> {
        if self.window_length == 0 {
            return Err(InputValidationError::invalid_parameter(
                "window_length",
                self.window_length,
                "must be positive",
            ));
        }
        if self.window_length % 2 == 0 {
            return Err(InputValidationError::invalid_parameter(
                "window_length",
                self.window_length,
                "must be odd",
            ));
        }
        if self.window_length > MAX_WINDOW_SIZE {
            return Err(InputValidationError::invalid_parameter(
                "window_length",
                self.window_length,
                "exceeds the largest supported window",
            ));
        }
        Ok(())
    }
}

/// Sliding-window-minimum baseline corrector.
///
/// The baseline at each sample is the minimum of the padded signal over a
/// centered window. Samples that sit above their baseline keep their
/// original intensity; everything else is dropped, so the corrected trace
/// is usually shorter than the input.
#[derive(Debug, Clone)]
pub struct SwmCorrector {
    config: SwmConfig,
}

impl SwmCorrector {
    pub fn new(config: SwmConfig) -> std::result::Result<Self, InputValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn baseline(&self, intensity: &[f64]) -> std::result::Result<Vec<f64>, InputValidationError> {
        check_min_len(intensity, self.config.window_length, "swm signal")?;
        check_finite(intensity, "swm signal")?;
        let mut out = Vec::with_capacity(intensity.len());
        rolling_min_into(
            intensity,
            self.config.window_length,
            self.config.padding_mode,
            &mut out,
        );
        Ok(out)
    }
}

impl BaselineCorrector for SwmCorrector {
    fn name(&self) -> &'static str {
        "SWM"
    }

    fn correct(&self, trace: &Trace) -> Result<Trace> {
        let y = trace.intensity();
        let baseline = self.baseline(y)?;

        let (time, intensity): (Vec<f64>, Vec<f64>) = trace
            .time()
            .iter()
            .zip(y.iter())
            .zip(baseline.iter())
            .filter(|((_, yi), bi)| (**yi - **bi) > 0.0 && **yi != 0.0)
            .map(|((t, yi), _)| (*t, *yi))
            .unzip();

        if intensity.is_empty() {
            return Err(InputValidationError::NoPointsRemaining {
                context: "swm".to_string(),
            }
            .into());
        }
        debug!(
            "SWM kept {} of {} points (window {})",
            intensity.len(),
            y.len(),
            self.config.window_length
        );
        Ok(Trace::new(time, intensity)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ChromaPickError;

    fn trace(y: Vec<f64>) -> Trace {
        let t = (0..y.len()).map(|i| i as f64).collect();
        Trace::new(t, y).unwrap()
    }

    #[test]
    fn test_config_validation() {
        for bad in [0, 2, 4] {
            let cfg = SwmConfig {
                window_length: bad,
                ..Default::default()
            };
            assert!(SwmCorrector::new(cfg).is_err(), "window {} should fail", bad);
        }
        assert!(SwmCorrector::new(SwmConfig::default()).is_ok());
    }

    #[test]
    fn test_window_cap() {
        let largest = SwmConfig {
            window_length: MAX_WINDOW_SIZE,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
        let too_long = SwmConfig {
            window_length: MAX_WINDOW_SIZE + 2,
            ..Default::default()
        };
        assert!(matches!(
            too_long.validate(),
            Err(InputValidationError::InvalidParameter {
                name: "window_length",
                ..
            })
        ));
    }

    #[test]
    fn test_keeps_points_above_local_minimum() {
        let swm = SwmCorrector::new(SwmConfig::default()).unwrap();
        let input = trace(vec![1.0, 1.0, 3.0, 5.0, 3.0, 1.0, 1.0]);
        let out = swm.correct(&input).unwrap();
        assert_eq!(out.intensity(), &[3.0, 5.0, 3.0]);
        assert_eq!(out.time(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_errors() {
        let swm = SwmCorrector::new(SwmConfig {
            window_length: 5,
            ..Default::default()
        })
        .unwrap();
        let short = trace(vec![1.0, 2.0, 1.0]);
        assert!(matches!(
            swm.correct(&short),
            Err(ChromaPickError::InputValidation(
                InputValidationError::TooFewPoints { .. }
            ))
        ));

        let flat = trace(vec![2.0; 10]);
        assert!(matches!(
            swm.correct(&flat),
            Err(ChromaPickError::InputValidation(
                InputValidationError::NoPointsRemaining { .. }
            ))
        ));
    }

    #[test]
    fn test_reapplying_keeps_values() {
        let swm = SwmCorrector::new(SwmConfig::default()).unwrap();
        let y: Vec<f64> = (0..60)
            .map(|i| {
                let t = i as f64;
                1.0 + 20.0 * (-(t - 30.0).powi(2) / 18.0).exp() + (t * 1.3).sin().abs()
            })
            .collect();
        let once = swm.correct(&trace(y)).unwrap();
        let twice = swm.correct(&once).unwrap();
        for (t, v) in twice.time().iter().zip(twice.intensity().iter()) {
            let pos = once.time().iter().position(|x| x == t).unwrap();
            assert_eq!(once.intensity()[pos], *v);
        }
        assert!(twice.len() <= once.len());
    }
}
