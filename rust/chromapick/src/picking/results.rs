use super::timings::PickTimings;
use crate::models::{
    GaussianFit,
    Peak,
    Sequence,
};
use serde::{
    Serialize,
    Serializer,
    ser::SerializeStruct,
};
use std::collections::BTreeMap;

/// The caller-facing summary of a picked peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickedPeak {
    pub time: f64,
    pub height: f64,
    pub area: f64,
    pub width: f64,
    pub score: f64,
    pub gaussian_fit: Option<GaussianFit>,
}

impl From<&Peak> for PickedPeak {
    fn from(peak: &Peak) -> Self {
        Self {
            time: peak.time,
            height: peak.height,
            area: peak.area,
            width: peak.width,
            score: peak.score,
            gaussian_fit: peak.gaussian_fit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PickOutcome {
    Picked(PickedPeak),
    /// No candidate survived selection. This is a normal result.
    NoPeak,
    /// Processing this chromatogram failed. Other chromatograms are unaffected.
    Failed { reason: String },
}

impl PickOutcome {
    pub fn picked(&self) -> Option<&PickedPeak> {
        match self {
            Self::Picked(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceResult {
    pub sequence: Sequence,
    pub level: usize,
    pub outcome: PickOutcome,
}

/// Results of one picking run, keyed by sequence.
#[derive(Debug, Clone, Default)]
pub struct PickResults {
    entries: BTreeMap<Sequence, SequenceResult>,
    pub timings: PickTimings,
}

impl PickResults {
    pub fn insert(&mut self, sequence: Sequence, level: usize, outcome: PickOutcome) {
        self.entries.insert(
            sequence.clone(),
            SequenceResult {
                sequence,
                level,
                outcome,
            },
        );
    }

    pub fn get(&self, sequence: &Sequence) -> Option<&SequenceResult> {
        self.entries.get(sequence)
    }

    pub fn outcome(&self, sequence: &Sequence) -> Option<&PickOutcome> {
        self.get(sequence).map(|x| &x.outcome)
    }

    /// Apex time of the picked peak, if one was picked.
    pub fn retention_time(&self, sequence: &Sequence) -> Option<f64> {
        self.outcome(sequence)
            .and_then(|x| x.picked())
            .map(|x| x.time)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceResult> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_picked(&self) -> usize {
        self.iter()
            .filter(|x| matches!(x.outcome, PickOutcome::Picked(_)))
            .count()
    }

    pub fn num_failed(&self) -> usize {
        self.iter()
            .filter(|x| matches!(x.outcome, PickOutcome::Failed { .. }))
            .count()
    }

    /// Adds the entries of `other`. Entries already present are kept.
    pub fn merge(&mut self, other: PickResults) {
        for (k, v) in other.entries {
            self.entries.entry(k).or_insert(v);
        }
        self.timings += other.timings;
    }
}

impl Serialize for PickResults {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let results: Vec<&SequenceResult> = self.entries.values().collect();
        let mut state = serializer.serialize_struct("PickResults", 2)?;
        state.serialize_field("results", &results)?;
        state.serialize_field("timings", &self.timings)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picked(time: f64) -> PickOutcome {
        PickOutcome::Picked(PickedPeak {
            time,
            height: 10.0,
            area: 1.0,
            width: 3.0,
            score: 1.0,
            gaussian_fit: None,
        })
    }

    #[test]
    fn test_counts_and_lookup() {
        let mut res = PickResults::default();
        let a = Sequence::from_names(&["A", "Null"]);
        let b = Sequence::from_names(&["Null", "B"]);
        let c = Sequence::from_names(&["A", "B"]);
        res.insert(a.clone(), 1, picked(3.0));
        res.insert(b.clone(), 1, PickOutcome::NoPeak);
        res.insert(
            c.clone(),
            2,
            PickOutcome::Failed {
                reason: "bad".to_string(),
            },
        );
        assert_eq!(res.len(), 3);
        assert_eq!(res.num_picked(), 1);
        assert_eq!(res.num_failed(), 1);
        assert_eq!(res.retention_time(&a), Some(3.0));
        assert_eq!(res.retention_time(&b), None);
    }

    #[test]
    fn test_merge_keeps_existing() {
        let a = Sequence::from_names(&["A"]);
        let mut first = PickResults::default();
        first.insert(a.clone(), 1, picked(1.0));
        let mut second = PickResults::default();
        second.insert(a.clone(), 1, picked(2.0));
        second.insert(Sequence::from_names(&["B"]), 1, PickOutcome::NoPeak);
        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.retention_time(&a), Some(1.0));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let json = serde_json::to_value(PickOutcome::NoPeak).unwrap();
        assert_eq!(json["status"], "no_peak");
        let json = serde_json::to_value(picked(4.0)).unwrap();
        assert_eq!(json["status"], "picked");
        assert_eq!(json["time"], 4.0);
    }
}
