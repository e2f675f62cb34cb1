//! Peak picking over batches of chromatograms.
//!
//! Two pickers share the same stages (baseline correction, signal metrics,
//! adaptive detection, selection):
//!
//! - [`BasicPeakPicker`] treats every chromatogram independently.
//! - [`HierarchicalPeakPicker`] walks the truncation lattice of the batch
//!   from level zero upwards, so every pick is constrained by the picks of
//!   the chromatogram's direct descendants.

mod accumulator;
mod basic;
mod elution_record;
mod hierarchical;
mod results;
mod selection;
mod timings;

pub use basic::BasicPeakPicker;
pub use elution_record::ElutionRecord;
pub use hierarchical::HierarchicalPeakPicker;
pub use results::{
    PickOutcome,
    PickResults,
    PickedPeak,
    SequenceResult,
};
pub use selection::{
    DescendantConstraints,
    SelectionConfig,
    select_peak,
};
pub use timings::PickTimings;

use crate::analysis::{
    PeakAnalyzer,
    PeakDetector,
};
use crate::baseline::BaselineCorrector;
use crate::config::PickerConfig;
use crate::errors::{
    HierarchyError,
    InputValidationError,
    Result,
};
use crate::hierarchy::Hierarchy;
use crate::models::{
    Chromatogram,
    Peak,
    Trace,
};
use crate::signal_metrics::{
    SignalMetrics,
    SignalMetricsConfig,
};
use accumulator::ProcessedChromatogram;
use std::collections::HashSet;
use std::time::Instant;
use tracing::warn;

/// Everything a picking run produces.
#[derive(Debug)]
pub struct PickReport {
    /// The input chromatograms, in input order, with their corrected traces,
    /// peaks and picks.
    pub chromatograms: Vec<Chromatogram>,
    /// One outcome per input chromatogram, aligned with `chromatograms`.
    pub outcomes: Vec<PickOutcome>,
    /// Outcomes keyed by sequence. When a sequence occurs more than once in
    /// the batch, its first occurrence is the one stored here.
    pub results: PickResults,
    /// The lattice the batch was processed against, with picked elution
    /// times stored as sequence values. `None` for non-hierarchical pickers.
    pub hierarchy: Option<Hierarchy>,
}

pub trait PeakPicker {
    fn pick(&self, chromatograms: Vec<Chromatogram>) -> Result<PickReport>;
}

/// The per-chromatogram stages shared by both pickers.
pub(crate) struct Stages {
    corrector: Box<dyn BaselineCorrector>,
    metrics: SignalMetricsConfig,
    detector: PeakDetector,
    selection: SelectionConfig,
}

impl Stages {
    pub(crate) fn new(config: &PickerConfig) -> std::result::Result<Self, InputValidationError> {
        config.validate()?;
        let analyzer = PeakAnalyzer::new(config.analyzer)?;
        Ok(Self {
            corrector: config.baseline.build()?,
            metrics: config.signal_metrics,
            detector: PeakDetector::new(config.detector, analyzer)?,
            selection: config.selection,
        })
    }

    pub(crate) fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    pub(crate) fn prepare(
        &self,
        raw: &Trace,
        timings: &mut PickTimings,
    ) -> Result<(Trace, SignalMetrics)> {
        let start = Instant::now();
        let corrected = self.corrector.correct(raw)?;
        timings.correction += start.elapsed();

        let start = Instant::now();
        let metrics = SignalMetrics::compute(corrected.time(), corrected.intensity(), &self.metrics)?;
        timings.metrics += start.elapsed();
        Ok((corrected, metrics))
    }

    pub(crate) fn detect(
        &self,
        trace: &Trace,
        mask: Option<&[bool]>,
        metrics: &SignalMetrics,
        timings: &mut PickTimings,
    ) -> Result<Vec<Peak>> {
        let start = Instant::now();
        let peaks = self.detector.detect(trace, mask, metrics)?;
        timings.detection += start.elapsed();
        Ok(peaks)
    }

    pub(crate) fn select(
        &self,
        trace: &Trace,
        peaks: &[Peak],
        level: usize,
        constraints: &DescendantConstraints,
        timings: &mut PickTimings,
    ) -> Option<usize> {
        let start = Instant::now();
        let picked = select_peak(
            peaks,
            trace.max_intensity(),
            level,
            constraints,
            &self.selection,
        );
        timings.selection += start.elapsed();
        picked
    }
}

/// Turns the result of processing one chromatogram into its outcome.
/// Failures are logged and kept, they never abort the batch.
pub(crate) fn finish(
    input_index: usize,
    chromatogram: Chromatogram,
    processed: Result<()>,
) -> ProcessedChromatogram {
    let outcome = match processed {
        Ok(()) => match chromatogram.picked_peak() {
            Some(p) => PickOutcome::Picked(PickedPeak::from(p)),
            None => PickOutcome::NoPeak,
        },
        Err(e) => {
            warn!("Failed to process {}: {}", chromatogram.sequence(), e);
            PickOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    ProcessedChromatogram {
        input_index,
        chromatogram,
        outcome,
    }
}

/// Splits a batch into the first occurrence of every sequence and the
/// repeated ones, both tagged with their input index.
pub(crate) fn split_duplicates(
    chromatograms: Vec<Chromatogram>,
) -> (Vec<(usize, Chromatogram)>, Vec<(usize, Chromatogram)>) {
    let mut seen = HashSet::with_capacity(chromatograms.len());
    let mut unique = Vec::with_capacity(chromatograms.len());
    let mut repeated = Vec::new();
    for (i, c) in chromatograms.into_iter().enumerate() {
        if seen.insert(c.sequence().clone()) {
            unique.push((i, c));
        } else {
            repeated.push((i, c));
        }
    }
    (unique, repeated)
}

/// Marks a repeated chromatogram as failed without processing it.
pub(crate) fn reject_duplicate(input_index: usize, chromatogram: Chromatogram) -> ProcessedChromatogram {
    let err = HierarchyError::DuplicateSequence {
        sequence: chromatogram.sequence().to_string(),
    };
    warn!("Skipping input {}: {}", input_index, err);
    ProcessedChromatogram {
        input_index,
        chromatogram,
        outcome: PickOutcome::Failed {
            reason: err.to_string(),
        },
    }
}

/// Orders processed chromatograms by input index and splits them into the
/// report's aligned vectors.
pub(crate) fn into_input_order(
    mut processed: Vec<ProcessedChromatogram>,
) -> (Vec<Chromatogram>, Vec<PickOutcome>) {
    processed.sort_by_key(|p| p.input_index);
    processed
        .into_iter()
        .map(|p| (p.chromatogram, p.outcome))
        .unzip()
}
