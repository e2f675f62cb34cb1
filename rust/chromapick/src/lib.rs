pub mod analysis;
pub mod baseline;
pub mod config;
pub mod errors;
pub mod hierarchy;
pub mod models;
pub mod picking;
pub mod signal_metrics;
pub mod utils;

pub use config::PickerConfig;
pub use errors::{
    ChromaPickError,
    Result,
};
pub use hierarchy::Hierarchy;
pub use models::{
    BuildingBlock,
    Chromatogram,
    Peak,
    Sequence,
    Trace,
};
pub use picking::{
    BasicPeakPicker,
    HierarchicalPeakPicker,
    PeakPicker,
    PickOutcome,
    PickReport,
    PickResults,
};
