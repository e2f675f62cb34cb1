//! Collection of per-chromatogram results from (possibly parallel) iterators.

use super::results::PickOutcome;
use super::timings::PickTimings;
use crate::models::Chromatogram;
use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};

/// A processed chromatogram together with its outcome.
#[derive(Debug)]
pub(crate) struct ProcessedChromatogram {
    /// Position of the chromatogram in the batch handed to the picker.
    pub(crate) input_index: usize,
    pub(crate) chromatogram: Chromatogram,
    pub(crate) outcome: PickOutcome,
}

/// Fold/reduce accumulator over `(ProcessedChromatogram, PickTimings)`.
///
/// Each thread folds into a local accumulator, the locals are then merged
/// pairwise. Entry order is not preserved, callers sort if they need to.
#[derive(Debug, Default)]
pub(crate) struct LevelAccumulator {
    pub(crate) processed: Vec<ProcessedChromatogram>,
    pub(crate) timings: PickTimings,
}

impl LevelAccumulator {
    pub(crate) fn reduce(mut self, other: Self) -> Self {
        self.processed.extend(other.processed);
        self.timings += other.timings;
        self
    }

    pub(crate) fn fold(mut self, item: (ProcessedChromatogram, PickTimings)) -> Self {
        self.processed.push(item.0);
        self.timings += item.1;
        self
    }

    pub(crate) fn num_picked(&self) -> usize {
        self.processed
            .iter()
            .filter(|x| matches!(x.outcome, PickOutcome::Picked(_)))
            .count()
    }

    pub(crate) fn num_failed(&self) -> usize {
        self.processed
            .iter()
            .filter(|x| matches!(x.outcome, PickOutcome::Failed { .. }))
            .count()
    }

    pub(crate) fn sort_by_input_index(&mut self) {
        self.processed.sort_by_key(|p| p.input_index);
    }
}

impl FromIterator<(ProcessedChromatogram, PickTimings)> for LevelAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (ProcessedChromatogram, PickTimings)>,
    {
        iter.into_iter()
            .fold(LevelAccumulator::default(), LevelAccumulator::fold)
    }
}

impl FromParallelIterator<(ProcessedChromatogram, PickTimings)> for LevelAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (ProcessedChromatogram, PickTimings)>,
    {
        par_iter
            .into_par_iter()
            .fold(LevelAccumulator::default, LevelAccumulator::fold)
            .reduce(LevelAccumulator::default, LevelAccumulator::reduce)
    }
}
