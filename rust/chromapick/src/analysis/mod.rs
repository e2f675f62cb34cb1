pub mod peak_analyzer;
pub mod peak_detector;

pub use peak_analyzer::{
    PeakAnalyzer,
    PeakAnalyzerConfig,
};
pub use peak_detector::{
    DetectionThresholds,
    PeakDetector,
    PeakDetectorConfig,
};
