use super::selection::DescendantConstraints;
use crate::errors::HierarchyError;
use crate::hierarchy::Hierarchy;
use crate::models::Sequence;
use std::collections::HashMap;

/// Picked elution time and apex height per sequence.
///
/// Each sequence is written at most once. Entries are only added between
/// levels and read by the ancestors processed at later levels.
#[derive(Debug, Clone, Default)]
pub struct ElutionRecord {
    times: HashMap<Sequence, f64>,
    intensities: HashMap<Sequence, f64>,
}

impl ElutionRecord {
    pub fn record(
        &mut self,
        sequence: Sequence,
        time: f64,
        intensity: f64,
    ) -> Result<(), HierarchyError> {
        if self.times.contains_key(&sequence) {
            return Err(HierarchyError::DuplicateSequence {
                sequence: sequence.to_string(),
            });
        }
        self.intensities.insert(sequence.clone(), intensity);
        self.times.insert(sequence, time);
        Ok(())
    }

    pub fn time(&self, sequence: &Sequence) -> Option<f64> {
        self.times.get(sequence).copied()
    }

    pub fn intensity(&self, sequence: &Sequence) -> Option<f64> {
        self.intensities.get(sequence).copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = (&Sequence, f64)> + '_ {
        self.times.iter().map(|(k, v)| (k, *v))
    }

    /// Collects the recorded values of the direct descendants of `sequence`.
    /// Descendants without a pick contribute nothing.
    pub fn constraints_for(&self, hierarchy: &Hierarchy, sequence: &Sequence) -> DescendantConstraints {
        let mut out = DescendantConstraints::default();
        for desc in hierarchy.descendants(sequence) {
            if let Some(t) = self.time(desc) {
                out.times.push(t);
            }
            if let Some(h) = self.intensity(desc) {
                out.max_intensity = out.max_intensity.max(h);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BuildingBlock;

    #[test]
    fn test_write_once() {
        let mut rec = ElutionRecord::default();
        let s = Sequence::from_names(&["A", "Null"]);
        rec.record(s.clone(), 1.0, 10.0).unwrap();
        assert!(rec.record(s.clone(), 2.0, 20.0).is_err());
        assert_eq!(rec.time(&s), Some(1.0));
        assert_eq!(rec.intensity(&s), Some(10.0));
    }

    #[test]
    fn test_constraints_skip_unpicked() {
        let base = Sequence::from_names(&["X", "Y"]);
        let h = Hierarchy::from_base(BuildingBlock::null(), &base).unwrap();
        let mut rec = ElutionRecord::default();
        rec.record(Sequence::from_names(&["Null", "Y"]), 4.0, 60.0)
            .unwrap();
        let c = rec.constraints_for(&h, &base);
        assert_eq!(c.times, vec![4.0]);
        assert_eq!(c.max_intensity, 60.0);

        let empty = rec.constraints_for(&h, &Sequence::from_names(&["X", "Null"]));
        assert!(empty.times.is_empty());
        assert_eq!(empty.max_intensity, 0.0);
    }
}
