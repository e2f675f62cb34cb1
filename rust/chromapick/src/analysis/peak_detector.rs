//! Adaptive local-maxima search.
//!
//! Thresholds are derived from the trace's [`SignalMetrics`] instead of fixed
//! constants, so the same configuration works across chromatograms whose
//! noise floor and sampling differ by orders of magnitude.

use super::peak_analyzer::PeakAnalyzer;
use crate::errors::InputValidationError;
use crate::models::{
    Peak,
    Trace,
};
use crate::signal_metrics::SignalMetrics;
use crate::utils::extrema::{
    FindPeaksOptions,
    find_peaks,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    pub min_snr_factor: f64,
    pub max_snr_factor: f64,
    pub snr_scale: f64,
    pub min_prominence_ratio: f64,
    pub noise_prominence_factor: f64,
    pub min_roughness_factor: f64,
    pub max_roughness_factor: f64,
    pub roughness_scale: f64,
    pub peak_separation_factor: f64,
    pub min_window_points: usize,
    pub min_window_roughness_factor: f64,
    pub max_window_roughness_factor: f64,
    pub window_roughness_scale: f64,
    pub relative_height: f64,
    pub width_threshold_scale: f64,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            min_snr_factor: 3.0,
            max_snr_factor: 10.0,
            snr_scale: 0.1,
            min_prominence_ratio: 0.01,
            noise_prominence_factor: 2.0,
            min_roughness_factor: 2.0,
            max_roughness_factor: 10.0,
            roughness_scale: 5.0,
            peak_separation_factor: 1.5,
            min_window_points: 50,
            min_window_roughness_factor: 5.0,
            max_window_roughness_factor: 20.0,
            window_roughness_scale: 10.0,
            relative_height: 0.3,
            width_threshold_scale: 0.01,
        }
    }
}

impl PeakDetectorConfig {
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if self.min_snr_factor > self.max_snr_factor {
            return Err(InputValidationError::invalid_parameter(
                "min_snr_factor",
                self.min_snr_factor,
                "must not exceed max_snr_factor",
            ));
        }
        if self.min_roughness_factor > self.max_roughness_factor {
            return Err(InputValidationError::invalid_parameter(
                "min_roughness_factor",
                self.min_roughness_factor,
                "must not exceed max_roughness_factor",
            ));
        }
        if self.min_window_roughness_factor > self.max_window_roughness_factor {
            return Err(InputValidationError::invalid_parameter(
                "min_window_roughness_factor",
                self.min_window_roughness_factor,
                "must not exceed max_window_roughness_factor",
            ));
        }
        if !(self.relative_height > 0.0 && self.relative_height <= 1.0) {
            return Err(InputValidationError::invalid_parameter(
                "relative_height",
                self.relative_height,
                "must be within (0, 1]",
            ));
        }
        if self.peak_separation_factor < 0.0 {
            return Err(InputValidationError::invalid_parameter(
                "peak_separation_factor",
                self.peak_separation_factor,
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// The concrete search parameters used for one trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionThresholds {
    pub height: f64,
    pub prominence: f64,
    pub width: f64,
    pub distance: usize,
    pub window_length: usize,
    pub rel_height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PeakDetector {
    config: PeakDetectorConfig,
    analyzer: PeakAnalyzer,
}

impl PeakDetector {
    pub fn new(
        config: PeakDetectorConfig,
        analyzer: PeakAnalyzer,
    ) -> Result<Self, InputValidationError> {
        config.validate()?;
        Ok(Self { config, analyzer })
    }

    pub fn thresholds(&self, trace: &Trace, metrics: &SignalMetrics) -> DetectionThresholds {
        let cfg = &self.config;
        let time = trace.time();
        let sampling_rate = match (time.first(), time.last()) {
            (Some(first), Some(last)) => (last - first) / time.len() as f64,
            _ => 0.0,
        };

        let snr_factor = (metrics.signal_to_noise * cfg.snr_scale)
            .clamp(cfg.min_snr_factor, cfg.max_snr_factor);
        let height = metrics.baseline_mean + metrics.noise_level * snr_factor;

        let prominence = (metrics.noise_level * cfg.noise_prominence_factor)
            .max(metrics.dynamic_range * cfg.min_prominence_ratio);

        let roughness_factor = (metrics.roughness * cfg.roughness_scale)
            .clamp(cfg.min_roughness_factor, cfg.max_roughness_factor);
        let unscaled_width = roughness_factor * sampling_rate;
        let distance = ((unscaled_width * cfg.peak_separation_factor).floor() as usize).max(1);

        let window_factor = (metrics.roughness * cfg.window_roughness_scale).clamp(
            cfg.min_window_roughness_factor,
            cfg.max_window_roughness_factor,
        );
        let window_length = if sampling_rate > 0.0 {
            ((window_factor / sampling_rate) as usize).max(cfg.min_window_points)
        } else {
            cfg.min_window_points
        };

        DetectionThresholds {
            height,
            prominence,
            width: unscaled_width * cfg.width_threshold_scale,
            distance,
            window_length,
            rel_height: cfg.relative_height,
        }
    }

    /// Finds and analyzes every candidate peak of `trace`.
    ///
    /// When a mask is given, samples outside it are zeroed for the search
    /// only. The returned peaks are analyzed on the unmodified trace.
    pub fn detect(
        &self,
        trace: &Trace,
        mask: Option<&[bool]>,
        metrics: &SignalMetrics,
    ) -> Result<Vec<Peak>, InputValidationError> {
        let thresholds = self.thresholds(trace, metrics);
        debug!("Detection thresholds: {:?}", thresholds);

        let searched: Vec<f64> = match mask {
            Some(mask) => {
                if mask.len() != trace.len() {
                    return Err(InputValidationError::ExpectedSlicesSameLength {
                        expected: trace.len(),
                        other: mask.len(),
                        context: "search mask".to_string(),
                    });
                }
                trace
                    .intensity()
                    .iter()
                    .zip(mask.iter())
                    .map(|(v, keep)| if *keep { *v } else { 0.0 })
                    .collect()
            }
            None => trace.intensity().to_vec(),
        };

        let options = FindPeaksOptions {
            height: Some(thresholds.height),
            prominence: Some(thresholds.prominence),
            width: Some(thresholds.width),
            distance: Some(thresholds.distance),
            wlen: Some(thresholds.window_length),
            rel_height: thresholds.rel_height,
        };
        let candidates = find_peaks(&searched, &options);
        let indices: Vec<usize> = candidates.iter().map(|c| c.index).collect();
        debug!(
            "Found {} candidate peaks at {:?}",
            indices.len(),
            indices.iter().map(|i| trace.time()[*i]).collect::<Vec<_>>()
        );

        Ok(indices
            .iter()
            .map(|idx| self.analyzer.analyze(trace, *idx, &indices))
            .collect())
    }
}
