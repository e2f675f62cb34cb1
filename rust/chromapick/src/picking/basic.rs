use super::accumulator::{
    LevelAccumulator,
    ProcessedChromatogram,
};
use super::{
    DescendantConstraints,
    PeakPicker,
    PickReport,
    PickResults,
    PickTimings,
    Stages,
    finish,
    into_input_order,
};
use crate::config::PickerConfig;
use crate::errors::{
    InputValidationError,
    Result,
};
use crate::models::{
    BuildingBlock,
    Chromatogram,
};
#[cfg(not(feature = "serial"))]
use rayon::prelude::*;
use std::time::Instant;
use tracing::{
    debug,
    info,
};

/// Picks the latest sufficiently tall peak of each chromatogram, with no
/// constraints between chromatograms.
///
/// Every input is processed on its own, so repeated sequences (replicates)
/// are allowed and each gets its own outcome in [`PickReport::outcomes`].
pub struct BasicPeakPicker {
    stages: Stages,
    null_element: BuildingBlock,
}

impl BasicPeakPicker {
    pub fn new(config: &PickerConfig) -> std::result::Result<Self, InputValidationError> {
        Ok(Self {
            stages: Stages::new(config)?,
            null_element: BuildingBlock::new(config.null_building_block.as_str()),
        })
    }

    fn process_one(
        &self,
        input_index: usize,
        mut chromatogram: Chromatogram,
    ) -> (ProcessedChromatogram, PickTimings) {
        let mut timings = PickTimings::default();
        let res = self.run_stages(&mut chromatogram, &mut timings);
        (finish(input_index, chromatogram, res), timings)
    }

    fn run_stages(&self, chromatogram: &mut Chromatogram, timings: &mut PickTimings) -> Result<()> {
        let (corrected, metrics) = self.stages.prepare(chromatogram.raw(), timings)?;
        let peaks = self.stages.detect(&corrected, None, &metrics, timings)?;
        let picked = self.stages.select(
            &corrected,
            &peaks,
            0,
            &DescendantConstraints::default(),
            timings,
        );
        chromatogram.set_corrected(corrected);
        chromatogram.set_metrics(metrics);
        chromatogram.set_peaks(peaks);
        chromatogram.set_picked(picked);
        Ok(())
    }
}

impl PeakPicker for BasicPeakPicker {
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    fn pick(&self, chromatograms: Vec<Chromatogram>) -> Result<PickReport> {
        let start = Instant::now();
        let num_input = chromatograms.len();

        #[cfg(not(feature = "serial"))]
        let mut acc: LevelAccumulator = chromatograms
            .into_par_iter()
            .enumerate()
            .map(|(i, c)| self.process_one(i, c))
            .collect();

        #[cfg(feature = "serial")]
        let mut acc: LevelAccumulator = chromatograms
            .into_iter()
            .enumerate()
            .map(|(i, c)| self.process_one(i, c))
            .collect();

        acc.sort_by_input_index();
        info!(
            "Picked {}/{} chromatograms ({} failed) in {:?}",
            acc.num_picked(),
            num_input,
            acc.num_failed(),
            start.elapsed()
        );

        let mut results = PickResults::default();
        results.timings = acc.timings;
        for p in acc.processed.iter() {
            let seq = p.chromatogram.sequence();
            if results.get(seq).is_some() {
                debug!("Input {} repeats {}, keyed result kept from its first occurrence", p.input_index, seq);
                continue;
            }
            let level = seq.count_non_null(&self.null_element);
            results.insert(seq.clone(), level, p.outcome.clone());
        }
        let (chromatograms, outcomes) = into_input_order(acc.processed);
        Ok(PickReport {
            chromatograms,
            outcomes,
            results,
            hierarchy: None,
        })
    }
}
