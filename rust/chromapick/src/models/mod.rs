mod building_block;
mod chromatogram;
mod peak;
mod sequence;

pub use building_block::{
    BuildingBlock,
    NULL_BUILDING_BLOCK_NAME,
};
pub use chromatogram::{
    Chromatogram,
    Trace,
};
pub use peak::{
    GaussianFit,
    Peak,
};
pub use sequence::Sequence;
