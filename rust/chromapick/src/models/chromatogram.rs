use super::peak::Peak;
use super::sequence::Sequence;
use crate::errors::InputValidationError;
use crate::signal_metrics::SignalMetrics;
use crate::utils::validation::{
    check_finite,
    check_same_length,
};

/// A validated `(time, intensity)` pair of axes.
///
/// Baseline correction may drop points, so a corrected trace carries its own
/// time axis instead of borrowing the raw one.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    time: Vec<f64>,
    intensity: Vec<f64>,
}

impl Trace {
    pub fn new(time: Vec<f64>, intensity: Vec<f64>) -> Result<Self, InputValidationError> {
        check_same_length(&time, &intensity, "trace axes")?;
        if time.is_empty() {
            return Err(InputValidationError::ExpectedNonEmptyData {
                context: "trace axes".to_string(),
            });
        }
        check_finite(&time, "trace time")?;
        check_finite(&intensity, "trace intensity")?;
        if let Some(index) = time.windows(2).position(|w| w[1] < w[0]) {
            return Err(InputValidationError::NonMonotonicTime {
                index: index + 1,
                context: "trace time".to_string(),
            });
        }
        Ok(Self { time, intensity })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn max_intensity(&self) -> f64 {
        self.intensity
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// First index whose time is not smaller than `t`.
    pub fn search_sorted(&self, t: f64) -> usize {
        self.time.partition_point(|x| *x < t)
    }
}

/// Time/intensity trace of one library member along with everything the
/// picking stages derive from it.
///
/// A chromatogram is owned by exactly one stage at a time. Setting a new
/// corrected trace invalidates the mask, the detected peaks and the pick,
/// since those all index into the corrected trace.
#[derive(Debug, Clone)]
pub struct Chromatogram {
    sequence: Sequence,
    raw: Trace,
    corrected: Option<Trace>,
    search_mask: Option<Vec<bool>>,
    metrics: Option<SignalMetrics>,
    peaks: Vec<Peak>,
    picked: Option<usize>,
}

impl Chromatogram {
    pub fn new(
        sequence: Sequence,
        time: Vec<f64>,
        intensity: Vec<f64>,
    ) -> Result<Self, InputValidationError> {
        let raw = Trace::new(time, intensity)
            .map_err(|e| e.append_to_context(&format!("chromatogram {}", sequence)))?;
        Ok(Self {
            sequence,
            raw,
            corrected: None,
            search_mask: None,
            metrics: None,
            peaks: Vec::new(),
            picked: None,
        })
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn raw(&self) -> &Trace {
        &self.raw
    }

    pub fn corrected(&self) -> Option<&Trace> {
        self.corrected.as_ref()
    }

    pub fn search_mask(&self) -> Option<&[bool]> {
        self.search_mask.as_deref()
    }

    pub fn metrics(&self) -> Option<&SignalMetrics> {
        self.metrics.as_ref()
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn picked_peak(&self) -> Option<&Peak> {
        self.picked.map(|i| &self.peaks[i])
    }

    pub fn picked_index(&self) -> Option<usize> {
        self.picked
    }

    pub fn set_corrected(&mut self, trace: Trace) {
        self.corrected = Some(trace);
        self.search_mask = None;
        self.metrics = None;
        self.peaks.clear();
        self.picked = None;
    }

    pub fn set_metrics(&mut self, metrics: SignalMetrics) {
        self.metrics = Some(metrics);
    }

    /// The mask must match the corrected trace, which therefore has to be set first.
    pub fn set_search_mask(&mut self, mask: Vec<bool>) -> Result<(), InputValidationError> {
        let expected = match &self.corrected {
            Some(x) => x.len(),
            None => {
                return Err(InputValidationError::ExpectedNonEmptyData {
                    context: format!("search mask set before correction of {}", self.sequence),
                });
            }
        };
        if mask.len() != expected {
            return Err(InputValidationError::ExpectedSlicesSameLength {
                expected,
                other: mask.len(),
                context: format!("search mask of {}", self.sequence),
            });
        }
        self.search_mask = Some(mask);
        Ok(())
    }

    pub fn clear_search_mask(&mut self) {
        self.search_mask = None;
    }

    pub fn set_peaks(&mut self, peaks: Vec<Peak>) {
        self.peaks = peaks;
        self.picked = None;
    }

    /// Marks one of the detected peaks as the picked one.
    ///
    /// # Panics
    /// Panics if `index` does not point into the detected peaks.
    pub fn set_picked(&mut self, index: Option<usize>) {
        if let Some(i) = index {
            assert!(
                i < self.peaks.len(),
                "Picked index {} out of bounds for {} peaks",
                i,
                self.peaks.len()
            );
        }
        self.picked = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq() -> Sequence {
        Sequence::from_names(&["Ala", "Gly"])
    }

    #[test]
    fn test_rejects_mismatched_axes() {
        let out = Chromatogram::new(seq(), vec![0.0, 1.0], vec![1.0]);
        assert!(matches!(
            out,
            Err(InputValidationError::ExpectedSlicesSameLength { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_and_non_monotonic() {
        let out = Chromatogram::new(seq(), vec![0.0, 1.0, 2.0], vec![1.0, f64::NAN, 2.0]);
        assert!(matches!(
            out,
            Err(InputValidationError::ExpectedFiniteData { index: 1, .. })
        ));
        let out = Chromatogram::new(seq(), vec![0.0, 2.0, 1.0], vec![1.0, 1.0, 2.0]);
        assert!(matches!(
            out,
            Err(InputValidationError::NonMonotonicTime { index: 2, .. })
        ));
    }

    #[test]
    fn test_new_correction_resets_derived_state() {
        let mut chrom = Chromatogram::new(seq(), vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 1.0]).unwrap();
        assert!(chrom.set_search_mask(vec![true; 3]).is_err());

        let trace = Trace::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 1.0]).unwrap();
        chrom.set_corrected(trace.clone());
        assert!(chrom.set_search_mask(vec![true; 2]).is_err());
        chrom.set_search_mask(vec![false, true, true]).unwrap();
        assert!(chrom.search_mask().is_some());

        chrom.set_corrected(trace);
        assert!(chrom.search_mask().is_none());
        assert!(chrom.picked_peak().is_none());
    }

    #[test]
    fn test_search_sorted() {
        let trace = Trace::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0; 4]).unwrap();
        assert_eq!(trace.search_sorted(1.5), 2);
        assert_eq!(trace.search_sorted(1.0), 1);
        assert_eq!(trace.search_sorted(-1.0), 0);
        assert_eq!(trace.search_sorted(10.0), 4);
    }
}
