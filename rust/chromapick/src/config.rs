use crate::analysis::{
    PeakAnalyzerConfig,
    PeakDetectorConfig,
};
use crate::baseline::BaselineConfig;
use crate::errors::InputValidationError;
use crate::models::NULL_BUILDING_BLOCK_NAME;
use crate::picking::SelectionConfig;
use crate::signal_metrics::SignalMetricsConfig;
use serde::{
    Deserialize,
    Serialize,
};

/// Every tunable of a picking run.
///
/// Missing sections (and missing fields inside a section) take their defaults,
/// so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Name of the building block that marks a truncated position.
    pub null_building_block: String,
    pub baseline: BaselineConfig,
    pub signal_metrics: SignalMetricsConfig,
    pub detector: PeakDetectorConfig,
    pub analyzer: PeakAnalyzerConfig,
    pub selection: SelectionConfig,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            null_building_block: NULL_BUILDING_BLOCK_NAME.to_string(),
            baseline: BaselineConfig::default(),
            signal_metrics: SignalMetricsConfig::default(),
            detector: PeakDetectorConfig::default(),
            analyzer: PeakAnalyzerConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl PickerConfig {
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if self.null_building_block.is_empty() {
            return Err(InputValidationError::invalid_parameter(
                "null_building_block",
                "\"\"",
                "must not be empty",
            ));
        }
        self.baseline.validate()?;
        self.signal_metrics.validate()?;
        self.detector.validate()?;
        self.analyzer.validate()?;
        self.selection.validate()?;
        Ok(())
    }
}
