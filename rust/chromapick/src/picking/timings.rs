//! Per-stage wall time, summed over every chromatogram of a run.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PickTimings {
    /// Baseline correction.
    pub correction: Duration,
    /// Signal metrics on the corrected trace.
    pub metrics: Duration,
    /// Adaptive search plus per-candidate analysis, typically the bulk of the time.
    pub detection: Duration,
    pub selection: Duration,
}

impl PickTimings {
    pub fn total(&self) -> Duration {
        self.correction + self.metrics + self.detection + self.selection
    }
}

impl Serialize for PickTimings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PickTimings", 4)?;
        state.serialize_field("correction_ms", &self.correction.as_millis())?;
        state.serialize_field("metrics_ms", &self.metrics.as_millis())?;
        state.serialize_field("detection_ms", &self.detection.as_millis())?;
        state.serialize_field("selection_ms", &self.selection.as_millis())?;
        state.end()
    }
}

impl std::ops::AddAssign for PickTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.correction += rhs.correction;
        self.metrics += rhs.metrics;
        self.detection += rhs.detection;
        self.selection += rhs.selection;
    }
}
