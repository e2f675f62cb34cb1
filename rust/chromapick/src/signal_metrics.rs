//! Trace-level signal statistics used to derive adaptive detection thresholds.
//!
//! # Noise estimate
//!
//! The noise level is taken from the quietest parts of the trace: a moving
//! standard deviation is computed, samples whose local deviation is within
//! `variation_threshold` times the minimum are grouped into regions (ignoring
//! `edge_exclusion` of the trace on each side), nearby regions are merged, and
//! the `noise_percentile` of the moving deviation inside those regions is the
//! noise. When fewer than `min_regions_required` regions exist the global
//! standard deviation is used instead.

use crate::errors::InputValidationError;
use crate::utils::math::{
    diff,
    excess_kurtosis,
    linear_slope,
    mean,
    percentile,
    skewness,
    std_dev,
    trapezoid,
};
use crate::utils::rolling_calculators::rolling_std_into;
use crate::utils::validation::{
    check_finite,
    check_same_length,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMetricsConfig {
    pub window_width: usize,
    pub variation_threshold: f64,
    pub min_region_width: usize,
    pub max_region_gap: usize,
    pub noise_percentile: f64,
    pub min_regions_required: usize,
    pub edge_exclusion: f64,
    pub baseline_percentile: f64,
}

impl Default for SignalMetricsConfig {
    fn default() -> Self {
        Self {
            window_width: 15,
            variation_threshold: 1.5,
            min_region_width: 5,
            max_region_gap: 20,
            noise_percentile: 50.0,
            min_regions_required: 3,
            edge_exclusion: 0.05,
            baseline_percentile: 10.0,
        }
    }
}

impl SignalMetricsConfig {
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if self.window_width == 0 {
            return Err(InputValidationError::invalid_parameter(
                "window_width",
                self.window_width,
                "must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.noise_percentile) {
            return Err(InputValidationError::invalid_parameter(
                "noise_percentile",
                self.noise_percentile,
                "must be within [0, 100]",
            ));
        }
        if !(0.0..=100.0).contains(&self.baseline_percentile) {
            return Err(InputValidationError::invalid_parameter(
                "baseline_percentile",
                self.baseline_percentile,
                "must be within [0, 100]",
            ));
        }
        if !(0.0..0.5).contains(&self.edge_exclusion) {
            return Err(InputValidationError::invalid_parameter(
                "edge_exclusion",
                self.edge_exclusion,
                "must be within [0, 0.5)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    pub noise_level: f64,
    /// Dynamic range over noise, `+inf` for noiseless traces.
    pub signal_to_noise: f64,
    pub quiet_regions: Vec<(usize, usize)>,
    pub baseline_mean: f64,
    /// Slope of a linear fit of intensity against time, `NaN` if time is constant.
    pub baseline_drift: f64,
    pub total_area: f64,
    pub positive_area: f64,
    pub negative_area: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub dynamic_range: f64,
    pub smoothness: f64,
    pub roughness: f64,
}

impl SignalMetrics {
    pub fn compute(
        time: &[f64],
        intensity: &[f64],
        config: &SignalMetricsConfig,
    ) -> Result<Self, InputValidationError> {
        check_same_length(time, intensity, "signal metrics")?;
        if intensity.is_empty() {
            return Err(InputValidationError::ExpectedNonEmptyData {
                context: "signal metrics".to_string(),
            });
        }
        check_finite(time, "signal metrics time")?;
        check_finite(intensity, "signal metrics intensity")?;

        let (noise_level, quiet_regions) = noise_level(intensity, config);
        let max = intensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = intensity.iter().copied().fold(f64::INFINITY, f64::min);
        let dynamic_range = max - min;
        let signal_to_noise = if noise_level == 0.0 {
            f64::INFINITY
        } else {
            dynamic_range / noise_level
        };

        let positive: Vec<f64> = intensity.iter().map(|x| x.max(0.0)).collect();
        let negative: Vec<f64> = intensity.iter().map(|x| x.min(0.0)).collect();
        let diffs = diff(intensity);
        let smoothness = if diffs.is_empty() {
            0.0
        } else {
            mean(&diffs.iter().map(|x| x.abs()).collect::<Vec<_>>())
        };

        let out = Self {
            noise_level,
            signal_to_noise,
            quiet_regions,
            baseline_mean: percentile(intensity, config.baseline_percentile),
            baseline_drift: linear_slope(time, intensity),
            total_area: trapezoid(time, intensity),
            positive_area: trapezoid(time, &positive),
            negative_area: trapezoid(time, &negative),
            skewness: skewness(intensity),
            kurtosis: excess_kurtosis(intensity),
            dynamic_range,
            smoothness,
            roughness: std_dev(&diffs),
        };
        debug!(
            "Signal metrics: noise {:.3e}, snr {:.2}, baseline {:.3}, roughness {:.3e}, regions {}",
            out.noise_level,
            out.signal_to_noise,
            out.baseline_mean,
            out.roughness,
            out.quiet_regions.len()
        );
        Ok(out)
    }
}

fn minimal_variation_regions(moving_std: &[f64], config: &SignalMetricsConfig) -> Vec<(usize, usize)> {
    let min_std = moving_std.iter().copied().fold(f64::INFINITY, f64::min);
    let threshold = min_std * config.variation_threshold;
    let start_idx = (moving_std.len() as f64 * config.edge_exclusion) as usize;
    let end_idx = moving_std.len() - start_idx;

    let mut regions = Vec::new();
    let mut current_start: Option<usize> = None;
    for (i, x) in moving_std
        .iter()
        .enumerate()
        .take(end_idx)
        .skip(start_idx)
    {
        let quiet = *x < threshold;
        match (quiet, current_start) {
            (true, None) => current_start = Some(i),
            (false, Some(start)) => {
                if i - start >= config.min_region_width {
                    regions.push((start, i));
                }
                current_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current_start {
        if end_idx - start >= config.min_region_width {
            regions.push((start, end_idx));
        }
    }

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(regions.len());
    for (start, end) in regions {
        match merged.last_mut() {
            Some(last) if start - last.1 <= config.max_region_gap => last.1 = end,
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn noise_level(intensity: &[f64], config: &SignalMetricsConfig) -> (f64, Vec<(usize, usize)>) {
    let mut moving_std = Vec::with_capacity(intensity.len());
    rolling_std_into(intensity, config.window_width, &mut moving_std);
    let regions = minimal_variation_regions(&moving_std, config);

    if regions.len() < config.min_regions_required {
        debug!(
            "Found only {} quiet regions, minimum required is {}, using global deviation",
            regions.len(),
            config.min_regions_required
        );
        return (std_dev(intensity), regions);
    }
    let quiet: Vec<f64> = regions
        .iter()
        .flat_map(|(start, end)| moving_std[*start..*end].iter().copied())
        .collect();
    (percentile(&quiet, config.noise_percentile), regions)
}
