use crate::errors::InputValidationError;
use crate::models::Peak;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimum absolute apex height.
    pub height_threshold: f64,
    /// Minimum apex height as a fraction of the trace maximum.
    pub pick_rel_height: f64,
    /// Minimum separation, in time units, from the latest descendant elution.
    pub peak_time_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            height_threshold: 5.0,
            pick_rel_height: 0.4,
            peak_time_threshold: 0.5,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if !(0.0..=1.0).contains(&self.pick_rel_height) {
            return Err(InputValidationError::invalid_parameter(
                "pick_rel_height",
                self.pick_rel_height,
                "must be within [0, 1]",
            ));
        }
        if !(self.peak_time_threshold >= 0.0) {
            return Err(InputValidationError::invalid_parameter(
                "peak_time_threshold",
                self.peak_time_threshold,
                "must not be negative",
            ));
        }
        if !self.height_threshold.is_finite() {
            return Err(InputValidationError::invalid_parameter(
                "height_threshold",
                self.height_threshold,
                "must be finite",
            ));
        }
        Ok(())
    }
}

/// What the already-picked descendants of a sequence impose on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescendantConstraints {
    /// Largest picked apex height among descendants, zero when none were picked.
    pub max_intensity: f64,
    /// Picked elution times of the descendants that have one.
    pub times: Vec<f64>,
}

impl DescendantConstraints {
    pub fn latest_time(&self) -> Option<f64> {
        self.times.iter().copied().reduce(f64::max)
    }
}

/// Index of the latest-eluting peak that passes every selection rule.
///
/// At level zero only the height rules apply.
pub fn select_peak(
    peaks: &[Peak],
    trace_max: f64,
    level: usize,
    constraints: &DescendantConstraints,
    config: &SelectionConfig,
) -> Option<usize> {
    let rel_threshold = trace_max * config.pick_rel_height;
    let mut best: Option<usize> = None;

    for (i, peak) in peaks.iter().enumerate() {
        if peak.height < config.height_threshold {
            debug!(
                "Rejected peak at {:.2}: height {:.2} below {:.2}",
                peak.time, peak.height, config.height_threshold
            );
            continue;
        }
        if peak.height < rel_threshold {
            debug!(
                "Rejected peak at {:.2}: height {:.2} below {:.0}% of max {:.2}",
                peak.time,
                peak.height,
                config.pick_rel_height * 100.0,
                trace_max
            );
            continue;
        }
        if level > 0 {
            if peak.height <= constraints.max_intensity {
                debug!(
                    "Rejected peak at {:.2}: height {:.2} not above descendant max {:.2}",
                    peak.time, peak.height, constraints.max_intensity
                );
                continue;
            }
            if let Some(t) = constraints
                .times
                .iter()
                .find(|t| peak.time <= *t + config.peak_time_threshold)
            {
                debug!(
                    "Rejected peak at {:.2}: does not elute after descendant at {:.2} + {:.2}",
                    peak.time, t, config.peak_time_threshold
                );
                continue;
            }
        }
        match best {
            Some(b) if peaks[b].time > peak.time => {}
            _ => best = Some(i),
        }
    }
    best
}
