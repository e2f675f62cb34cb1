//! Baseline correction strategies.
//!
//! Both correctors are total functions from a raw trace to a corrected one.
//! [`AalsCorrector`] keeps the time axis; [`SwmCorrector`] drops samples that
//! sit on the baseline, so callers must use the time axis of the returned
//! trace rather than the raw one.

mod aals;
mod swm;

pub use aals::{
    AalsConfig,
    AalsCorrector,
};
pub use swm::{
    SwmConfig,
    SwmCorrector,
};

use crate::errors::{
    InputValidationError,
    Result,
};
use crate::models::Trace;
use serde::{
    Deserialize,
    Serialize,
};

pub trait BaselineCorrector: Send + Sync {
    fn name(&self) -> &'static str;
    fn correct(&self, trace: &Trace) -> Result<Trace>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BaselineConfig {
    #[serde(rename = "SWM", alias = "swm")]
    Swm(SwmConfig),
    #[serde(rename = "AALS", alias = "aals")]
    Aals(AalsConfig),
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig::Swm(SwmConfig::default())
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> std::result::Result<(), InputValidationError> {
        match self {
            BaselineConfig::Swm(x) => x.validate(),
            BaselineConfig::Aals(x) => x.validate(),
        }
    }

    pub fn build(&self) -> std::result::Result<Box<dyn BaselineCorrector>, InputValidationError> {
        Ok(match self {
            BaselineConfig::Swm(x) => Box::new(SwmCorrector::new(*x)?),
            BaselineConfig::Aals(x) => Box::new(AalsCorrector::new(*x)?),
        })
    }
}
