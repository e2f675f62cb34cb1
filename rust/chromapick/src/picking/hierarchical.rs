//! Level-by-level picking over the truncation lattice of a batch.
//!
//! The batch is organized around its base sequence, the one with the most
//! non-null building blocks. Levels are processed in ascending order and a
//! level only starts once every pick of the previous one is recorded, since
//! a chromatogram's search window and selection rules depend on the elution
//! times and heights picked for its direct descendants. Within a level the
//! chromatograms are independent and processed in parallel.
//!
//! A sequence that occurs more than once in a batch is processed once, for
//! its first occurrence. The repeats are reported as failed, since the
//! write-once elution record holds a single pick per sequence.

use super::accumulator::{
    LevelAccumulator,
    ProcessedChromatogram,
};
use super::elution_record::ElutionRecord;
use super::{
    PeakPicker,
    PickOutcome,
    PickReport,
    PickResults,
    PickTimings,
    Stages,
    finish,
    into_input_order,
    reject_duplicate,
    split_duplicates,
};
use crate::config::PickerConfig;
use crate::errors::{
    HierarchyError,
    InputValidationError,
    Result,
};
use crate::hierarchy::Hierarchy;
use crate::models::{
    BuildingBlock,
    Chromatogram,
    Sequence,
};
#[cfg(not(feature = "serial"))]
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{
    debug,
    info,
};

pub struct HierarchicalPeakPicker {
    stages: Stages,
    null_element: BuildingBlock,
}

impl HierarchicalPeakPicker {
    pub fn new(config: &PickerConfig) -> std::result::Result<Self, InputValidationError> {
        Ok(Self {
            stages: Stages::new(config)?,
            null_element: BuildingBlock::new(config.null_building_block.as_str()),
        })
    }

    /// The sequence with the most non-null building blocks. Ties go to the
    /// first one in input order.
    pub fn base_sequence(
        &self,
        chromatograms: &[Chromatogram],
    ) -> std::result::Result<Sequence, HierarchyError> {
        self.base_of(chromatograms.iter().map(|c| c.sequence()))
    }

    fn base_of<'a>(
        &self,
        sequences: impl Iterator<Item = &'a Sequence>,
    ) -> std::result::Result<Sequence, HierarchyError> {
        let mut best: Option<(&Sequence, usize)> = None;
        for seq in sequences {
            let n = seq.count_non_null(&self.null_element);
            match best {
                Some((_, b)) if b >= n => {}
                _ => best = Some((seq, n)),
            }
        }
        best.map(|(s, _)| s.clone()).ok_or(HierarchyError::Empty)
    }

    /// `sequences` must be distinct.
    fn build_hierarchy(&self, sequences: &[&Sequence]) -> std::result::Result<Hierarchy, HierarchyError> {
        let base = self.base_of(sequences.iter().copied())?;
        let hierarchy = Hierarchy::from_base(self.null_element.clone(), &base)?;
        for seq in sequences {
            if seq.len() != base.len() {
                return Err(HierarchyError::LengthMismatch {
                    sequence: seq.to_string(),
                    expected: base.len(),
                    found: seq.len(),
                });
            }
            if !hierarchy.contains(seq) {
                return Err(HierarchyError::UnknownSequence {
                    sequence: seq.to_string(),
                });
            }
        }
        debug!(
            "Base sequence {} spans {} levels",
            base,
            hierarchy.max_level().map_or(0, |x| x + 1)
        );
        Ok(hierarchy)
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip(self, chromatograms, hierarchy, record), level = "trace")
    )]
    fn process_level(
        &self,
        chromatograms: Vec<(usize, Chromatogram)>,
        level: usize,
        hierarchy: &Hierarchy,
        record: &ElutionRecord,
    ) -> LevelAccumulator {
        #[cfg(not(feature = "serial"))]
        let mut acc: LevelAccumulator = chromatograms
            .into_par_iter()
            .map(|(i, c)| self.process_one(i, c, level, hierarchy, record))
            .collect();

        #[cfg(feature = "serial")]
        let mut acc: LevelAccumulator = chromatograms
            .into_iter()
            .map(|(i, c)| self.process_one(i, c, level, hierarchy, record))
            .collect();

        acc.sort_by_input_index();
        acc
    }

    fn process_one(
        &self,
        input_index: usize,
        mut chromatogram: Chromatogram,
        level: usize,
        hierarchy: &Hierarchy,
        record: &ElutionRecord,
    ) -> (ProcessedChromatogram, PickTimings) {
        let mut timings = PickTimings::default();
        let res = self.run_stages(&mut chromatogram, level, hierarchy, record, &mut timings);
        (finish(input_index, chromatogram, res), timings)
    }

    fn run_stages(
        &self,
        chromatogram: &mut Chromatogram,
        level: usize,
        hierarchy: &Hierarchy,
        record: &ElutionRecord,
        timings: &mut PickTimings,
    ) -> Result<()> {
        let (corrected, metrics) = self.stages.prepare(chromatogram.raw(), timings)?;

        let constraints = if level > 0 {
            record.constraints_for(hierarchy, chromatogram.sequence())
        } else {
            Default::default()
        };

        let mask = if level > 0 {
            let start = match constraints.latest_time() {
                Some(t) => {
                    let min_time = t + self.stages.selection().peak_time_threshold;
                    debug!(
                        "{}: latest descendant elutes at {:.2}, searching from {:.2}",
                        chromatogram.sequence(),
                        t,
                        min_time
                    );
                    corrected.search_sorted(min_time)
                }
                None => 0,
            };
            Some((0..corrected.len()).map(|i| i >= start).collect::<Vec<bool>>())
        } else {
            None
        };

        let peaks = self
            .stages
            .detect(&corrected, mask.as_deref(), &metrics, timings)?;
        let picked = self
            .stages
            .select(&corrected, &peaks, level, &constraints, timings);

        chromatogram.set_corrected(corrected);
        chromatogram.set_metrics(metrics);
        if let Some(mask) = mask {
            chromatogram.set_search_mask(mask)?;
        }
        chromatogram.set_peaks(peaks);
        chromatogram.set_picked(picked);
        Ok(())
    }
}

impl PeakPicker for HierarchicalPeakPicker {
    /// Fails only when the batch does not form a consistent hierarchy.
    /// Failures of single chromatograms, repeated sequences included, are
    /// reported in the results.
    fn pick(&self, chromatograms: Vec<Chromatogram>) -> Result<PickReport> {
        let (unique, repeated) = split_duplicates(chromatograms);
        let distinct: Vec<&Sequence> = unique.iter().map(|(_, c)| c.sequence()).collect();
        let mut hierarchy = self.build_hierarchy(&distinct)?;
        let max_level = hierarchy.max_level().unwrap_or(0);

        let mut by_level: BTreeMap<usize, Vec<(usize, Chromatogram)>> = BTreeMap::new();
        for (i, c) in unique {
            by_level
                .entry(hierarchy.level(c.sequence()))
                .or_default()
                .push((i, c));
        }

        let mut record = ElutionRecord::default();
        let mut results = PickResults::default();
        let mut out: Vec<ProcessedChromatogram> = repeated
            .into_iter()
            .map(|(i, c)| reject_duplicate(i, c))
            .collect();

        for level in 0..=max_level {
            let Some(level_chroms) = by_level.remove(&level) else {
                debug!("No chromatograms at level {}", level);
                continue;
            };
            let num_input = level_chroms.len();
            let start = Instant::now();
            let acc = self.process_level(level_chroms, level, &hierarchy, &record);
            info!(
                "Level {}: picked {}/{} chromatograms ({} failed) in {:?}",
                level,
                acc.num_picked(),
                num_input,
                acc.num_failed(),
                start.elapsed()
            );

            results.timings += acc.timings;
            for p in acc.processed {
                let seq = p.chromatogram.sequence().clone();
                if let PickOutcome::Picked(peak) = &p.outcome {
                    record.record(seq.clone(), peak.time, peak.height)?;
                }
                results.insert(seq, level, p.outcome.clone());
                out.push(p);
            }
        }

        hierarchy.set_sequence_values(record.times().map(|(s, t)| (s.clone(), t)));
        debug!("{:?}", results.timings);
        let (chromatograms, outcomes) = into_input_order(out);
        Ok(PickReport {
            chromatograms,
            outcomes,
            results,
            hierarchy: Some(hierarchy),
        })
    }
}
