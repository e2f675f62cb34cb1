//! Shape and quality metrics for a single peak.
//!
//! Metrics depend on each other and are always computed in this order:
//! boundaries, width, area, symmetry, skewness, prominence, Gaussian fit,
//! resolution and finally the composite score.

use crate::errors::InputValidationError;
use crate::models::{
    GaussianFit,
    Peak,
    Trace,
};
use crate::utils::curve_fit::{
    FitOptions,
    GaussianParams,
    ParamBounds,
    fit_gaussian,
};
use crate::utils::extrema::{
    half_max_width,
    local_minima_around,
};
use crate::utils::math::{
    mean,
    skewness,
    trapezoid,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// Converts a half-maximum width to the width at 5% of the height,
/// assuming a Gaussian profile.
const WIDTH_5_FACTOR: f64 = 2.355;
const FWHM_TO_SIGMA: f64 = 2.355;
const MIN_INITIAL_SIGMA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakAnalyzerConfig {
    pub max_fit_evaluations: usize,
    /// Nominal run length, in the same unit as the time axis.
    pub run_duration: f64,
    /// Fraction of the run treated as the solvent front.
    pub solvent_front_fraction: f64,
    pub solvent_front_exponent: f64,
}

impl Default for PeakAnalyzerConfig {
    fn default() -> Self {
        Self {
            max_fit_evaluations: 2000,
            run_duration: 60.0,
            solvent_front_fraction: 0.3,
            solvent_front_exponent: 6.0,
        }
    }
}

impl PeakAnalyzerConfig {
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if self.max_fit_evaluations == 0 {
            return Err(InputValidationError::invalid_parameter(
                "max_fit_evaluations",
                self.max_fit_evaluations,
                "must be positive",
            ));
        }
        if !(self.run_duration > 0.0) {
            return Err(InputValidationError::invalid_parameter(
                "run_duration",
                self.run_duration,
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.solvent_front_fraction) {
            return Err(InputValidationError::invalid_parameter(
                "solvent_front_fraction",
                self.solvent_front_fraction,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeakAnalyzer {
    config: PeakAnalyzerConfig,
}

impl PeakAnalyzer {
    pub fn new(config: PeakAnalyzerConfig) -> Result<Self, InputValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Builds the full peak record for the apex at `index`.
    ///
    /// `candidates` are the apex indices of every peak detected in the same
    /// trace (it may include `index` itself) and are only used for resolution.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds for the trace.
    pub fn analyze(&self, trace: &Trace, index: usize, candidates: &[usize]) -> Peak {
        let x = trace.time();
        let y = trace.intensity();
        assert!(index < y.len(), "Apex index {} out of bounds", index);

        let height = y[index];
        let (lb, rb) = local_minima_around(y, index);
        let width = half_max_width(y, index);
        let area = trapezoid(&x[lb..=rb], &y[lb..=rb]);
        let symmetry = symmetry(y, index, lb, rb);
        let skewness = skewness(&y[lb..=rb]);
        let prominence = height - y[lb].min(y[rb]);
        let (gaussian_residual, gaussian_fit) = self.fit(x, y, index, lb, rb);
        let resolution = resolution(x, y, index, width, candidates);

        let mut peak = Peak {
            time: x[index],
            index,
            height,
            left_base_index: lb,
            right_base_index: rb,
            left_base_time: x[lb],
            right_base_time: x[rb],
            width,
            width_5: width * WIDTH_5_FACTOR,
            area,
            symmetry,
            skewness,
            prominence,
            gaussian_residual,
            gaussian_fit,
            resolution,
            score: 0.0,
        };
        peak.score = self.score(&peak);
        peak
    }

    fn fit(
        &self,
        x: &[f64],
        y: &[f64],
        index: usize,
        lb: usize,
        rb: usize,
    ) -> (f64, Option<GaussianFit>) {
        let x_peak = &x[lb..=rb];
        let y_peak = &y[lb..=rb];
        let height = y[index];
        let baseline = y[lb].min(y[rb]);
        let amplitude = height - baseline;
        let y_shifted: Vec<f64> = y_peak.iter().map(|v| v - baseline).collect();

        let half_max = amplitude / 2.0;
        let above: Vec<usize> = y_shifted
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= half_max)
            .map(|(i, _)| i)
            .collect();
        let sigma_estimate = match (above.first(), above.last()) {
            (Some(first), Some(last)) if above.len() >= 2 => {
                (x_peak[*last] - x_peak[*first]) / FWHM_TO_SIGMA
            }
            _ => (x_peak[x_peak.len() - 1] - x_peak[0]) / 4.0,
        };

        let initial = GaussianParams {
            amplitude,
            mean: x[index],
            sigma: sigma_estimate.max(MIN_INITIAL_SIGMA),
        };
        let bounds = ParamBounds {
            lower: GaussianParams {
                amplitude: amplitude * 0.5,
                mean: x_peak[0],
                sigma: sigma_estimate * 0.2,
            },
            upper: GaussianParams {
                amplitude: amplitude * 1.5,
                mean: x_peak[x_peak.len() - 1],
                sigma: sigma_estimate * 5.0,
            },
        };
        let options = FitOptions {
            max_evaluations: self.config.max_fit_evaluations,
            ..Default::default()
        };

        match fit_gaussian(x_peak, &y_shifted, initial, bounds, options) {
            Ok(p) if height > 0.0 => {
                let fit = GaussianFit {
                    amplitude: p.amplitude,
                    mean: p.mean,
                    sigma: p.sigma,
                    baseline,
                };
                let sq: Vec<f64> = x_peak
                    .iter()
                    .zip(y_peak.iter())
                    .map(|(xi, yi)| (yi - fit.evaluate(*xi)).powi(2))
                    .collect();
                (mean(&sq).sqrt() / height, Some(fit))
            }
            Ok(_) => (1.0, None),
            Err(e) => {
                debug!("Gaussian fit failed at t={:.3}: {}", x[index], e);
                (1.0, None)
            }
        }
    }

    fn score(&self, peak: &Peak) -> f64 {
        let metrics = [
            peak.symmetry,
            1.0 / (1.0 + peak.gaussian_residual),
            (peak.resolution / 2.0).min(1.0),
            1.0 - peak.skewness.abs() / 2.0,
        ];
        mean(&metrics) * peak.prominence * peak.area * self.retention_time_weight(peak.time)
    }

    /// Penalty ramp that suppresses peaks inside the solvent front.
    pub fn retention_time_weight(&self, time: f64) -> f64 {
        let relative = time / self.config.run_duration;
        let front = self.config.solvent_front_fraction;
        if front > 0.0 && relative < front {
            (relative / front).max(0.0).powf(self.config.solvent_front_exponent)
        } else {
            1.0
        }
    }
}

/// One minus the mean absolute difference between mirrored samples around
/// the apex, normalized by the apex height.
fn symmetry(y: &[f64], index: usize, lb: usize, rb: usize) -> f64 {
    let height = y[index];
    if height == 0.0 {
        return 0.0;
    }
    let half = (index - lb).min(rb - index) + 1;
    let total: f64 = (0..half)
        .map(|s| (y[index - s] - y[index + s]).abs() / height)
        .sum();
    1.0 - total / half as f64
}

fn resolution(x: &[f64], y: &[f64], index: usize, width: f64, candidates: &[usize]) -> f64 {
    let nearest = candidates
        .iter()
        .copied()
        .filter(|c| *c != index)
        .min_by(|a, b| (x[*a] - x[index]).abs().total_cmp(&(x[*b] - x[index]).abs()));
    let Some(nearest) = nearest else {
        return f64::INFINITY;
    };
    let delta_t = (x[index] - x[nearest]).abs();
    let denom = width + half_max_width(y, nearest);
    if denom > 0.0 {
        2.0 * delta_t / denom
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::extrema::is_local_minimum;

    fn gaussian_trace(centers: &[(f64, f64)], sigma: f64, n: usize, dt: f64) -> Trace {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let intensity = time
            .iter()
            .map(|t| {
                0.5 + centers
                    .iter()
                    .map(|(c, h)| h * (-(t - c).powi(2) / (2.0 * sigma * sigma)).exp())
                    .sum::<f64>()
            })
            .collect();
        Trace::new(time, intensity).unwrap()
    }

    #[test]
    fn test_single_gaussian_metrics() {
        let trace = gaussian_trace(&[(30.0, 100.0)], 0.5, 601, 0.1);
        let analyzer = PeakAnalyzer::default();
        let peak = analyzer.analyze(&trace, 300, &[300]);

        assert_eq!(peak.index, 300);
        assert!((peak.time - 30.0).abs() < 1e-9);
        assert!(peak.left_base_index <= 300 && 300 <= peak.right_base_index);
        assert!(peak.resolution.is_infinite());
        assert!(peak.symmetry > 0.99, "Symmetry {}", peak.symmetry);
        assert!(peak.skewness.abs() < 0.05, "Skewness {}", peak.skewness);
        // FWHM of sigma 0.5 at dt 0.1 is ~11.8 samples.
        assert!((peak.width - 11.77).abs() < 0.1, "Width {}", peak.width);
        assert!((peak.width_5 - peak.width * 2.355).abs() < 1e-9);

        let fit = peak.gaussian_fit.expect("fit should succeed on a clean peak");
        assert!((fit.mean - 30.0).abs() < 1e-3, "{:?}", fit);
        assert!((fit.sigma - 0.5).abs() < 1e-2, "{:?}", fit);
        assert!(peak.gaussian_residual < 0.01);

        // Area of a Gaussian is h * sigma * sqrt(2 pi) plus the constant offset.
        let expected_area = 100.0 * 0.5 * (2.0 * std::f64::consts::PI).sqrt();
        assert!(peak.area > expected_area && peak.area < expected_area + 0.5 * 60.0 + 1.0);
        assert!(peak.score > 0.0);
    }

    #[test]
    fn test_boundaries_are_local_minima_or_edges() {
        let trace = gaussian_trace(&[(10.0, 50.0), (14.0, 80.0)], 0.8, 301, 0.1);
        let analyzer = PeakAnalyzer::default();
        let y = trace.intensity();
        for idx in [100, 140] {
            let peak = analyzer.analyze(&trace, idx, &[100, 140]);
            assert!(peak.left_base_index <= idx && idx <= peak.right_base_index);
            for b in [peak.left_base_index, peak.right_base_index] {
                assert!(b == 0 || b == y.len() - 1 || is_local_minimum(y, b));
            }
        }
    }

    #[test]
    fn test_resolution_uses_shared_delta_t() {
        let trace = gaussian_trace(&[(10.0, 50.0), (14.0, 80.0)], 0.5, 301, 0.1);
        let analyzer = PeakAnalyzer::default();
        let a = analyzer.analyze(&trace, 100, &[100, 140]);
        let b = analyzer.analyze(&trace, 140, &[100, 140]);
        let delta_a = a.resolution * (a.width + b.width) / 2.0;
        let delta_b = b.resolution * (b.width + a.width) / 2.0;
        assert!((delta_a - 4.0).abs() < 1e-6, "{}", delta_a);
        assert!((delta_a - delta_b).abs() < 1e-9);
    }

    #[test]
    fn test_resolution_nearest_by_time() {
        // Compacted axis: index 2 is closer by index, index 9 is closer in time.
        let time = vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 12.5, 13.0, 13.5, 14.0, 15.0];
        let intensity = vec![0.0, 2.0, 5.0, 2.0, 1.0, 6.0, 1.0, 0.0, 2.0, 4.0, 0.0];
        let trace = Trace::new(time, intensity).unwrap();
        let analyzer = PeakAnalyzer::default();
        let candidates = [2, 5, 9];
        let mid = analyzer.analyze(&trace, 5, &candidates);
        let right = analyzer.analyze(&trace, 9, &candidates);
        let delta = mid.resolution * (mid.width + right.width) / 2.0;
        assert!((delta - 2.0).abs() < 1e-9, "{}", delta);
    }

    #[test]
    fn test_flat_top_keeps_its_extent() {
        let time: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let intensity = vec![0.0, 1.0, 3.0, 6.0, 9.0, 9.0, 9.0, 6.0, 3.0, 1.0, 0.0];
        let trace = Trace::new(time, intensity).unwrap();
        let peak = PeakAnalyzer::default().analyze(&trace, 5, &[5]);
        assert_eq!(peak.left_base_index, 0);
        assert_eq!(peak.right_base_index, 10);
        assert!((peak.area - 47.0).abs() < 1e-9, "{}", peak.area);
        assert_eq!(peak.prominence, 9.0);
        assert!(peak.symmetry > 0.99);
        assert!(peak.score > 0.0);
    }

    #[test]
    fn test_fit_failure_is_recovered() {
        // Three samples with a flat top: the sigma estimate collapses and the fit is rejected.
        let trace = Trace::new(vec![0.0, 0.01, 0.02], vec![0.0, 5.0, 0.0]).unwrap();
        let peak = PeakAnalyzer::default().analyze(&trace, 1, &[1]);
        assert_eq!(peak.gaussian_residual, 1.0);
        assert!(peak.gaussian_fit.is_none());
    }

    #[test]
    fn test_solvent_front_weight() {
        let analyzer = PeakAnalyzer::default();
        assert_eq!(analyzer.retention_time_weight(30.0), 1.0);
        assert_eq!(analyzer.retention_time_weight(20.0), 1.0);
        let w = analyzer.retention_time_weight(9.0);
        assert!((w - 0.5_f64.powi(6)).abs() < 1e-12);
        assert!(analyzer.retention_time_weight(1.0) < 1e-6);
    }
}
