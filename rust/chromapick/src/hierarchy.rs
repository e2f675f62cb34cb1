//! Truncation lattice over building-block sequences.
//!
//! A sequence at level `k` has `k` non-null positions. Its direct
//! descendants are the sequences obtained by nulling exactly one of those
//! positions, so every edge of the lattice goes from level `k` to `k - 1`.
//!
//! ```
//! use chromapick::hierarchy::Hierarchy;
//! use chromapick::models::{BuildingBlock, Sequence};
//!
//! let base = Sequence::from_names(&["X", "Y"]);
//! let hierarchy = Hierarchy::from_base(BuildingBlock::null(), &base).unwrap();
//! assert_eq!(hierarchy.max_level(), Some(2));
//! assert_eq!(hierarchy.sequences_by_level(0).count(), 1);
//! ```

use crate::errors::HierarchyError;
use crate::models::{
    BuildingBlock,
    Sequence,
};
use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};

#[derive(Debug, Clone)]
pub struct Hierarchy {
    null_element: BuildingBlock,
    sequence_length: Option<usize>,
    levels: BTreeMap<usize, BTreeSet<Sequence>>,
    descendants: HashMap<Sequence, BTreeSet<Sequence>>,
    ancestors: HashMap<Sequence, BTreeSet<Sequence>>,
    values: HashMap<Sequence, f64>,
}

impl Hierarchy {
    pub fn new(null_element: BuildingBlock) -> Self {
        Self {
            null_element,
            sequence_length: None,
            levels: BTreeMap::new(),
            descendants: HashMap::new(),
            ancestors: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Builds the hierarchy made of `base` and every order-preserving
    /// descendant of it.
    pub fn from_base(null_element: BuildingBlock, base: &Sequence) -> Result<Self, HierarchyError> {
        let mut out = Self::new(null_element);
        let mut all = out.all_descendants_preserving_order(base);
        all.insert(base.clone());
        out.add_sequences(all)?;
        Ok(out)
    }

    pub fn null_element(&self) -> &BuildingBlock {
        &self.null_element
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> Result<(), HierarchyError> {
        match self.sequence_length {
            Some(expected) if expected != sequence.len() => {
                return Err(HierarchyError::LengthMismatch {
                    sequence: sequence.to_string(),
                    expected,
                    found: sequence.len(),
                });
            }
            Some(_) => {}
            None => self.sequence_length = Some(sequence.len()),
        }

        let level = self.level(&sequence);
        let direct = self.direct_descendants(&sequence);
        for desc in direct.iter() {
            self.ancestors
                .entry(desc.clone())
                .or_default()
                .insert(sequence.clone());
        }
        self.descendants
            .entry(sequence.clone())
            .or_default()
            .extend(direct);
        self.levels.entry(level).or_default().insert(sequence);
        Ok(())
    }

    pub fn add_sequences(
        &mut self,
        sequences: impl IntoIterator<Item = Sequence>,
    ) -> Result<(), HierarchyError> {
        for seq in sequences {
            self.add_sequence(seq)?;
        }
        Ok(())
    }

    pub fn contains(&self, sequence: &Sequence) -> bool {
        self.levels
            .get(&self.level(sequence))
            .is_some_and(|x| x.contains(sequence))
    }

    pub fn level(&self, sequence: &Sequence) -> usize {
        sequence.count_non_null(&self.null_element)
    }

    pub fn max_level(&self) -> Option<usize> {
        self.levels.keys().next_back().copied()
    }

    /// Sequences added at `level`, in sequence order.
    pub fn sequences_by_level(&self, level: usize) -> impl Iterator<Item = &Sequence> + '_ {
        self.levels.get(&level).into_iter().flatten()
    }

    /// Direct descendants of an added sequence. Empty for unknown sequences.
    pub fn descendants(&self, sequence: &Sequence) -> impl Iterator<Item = &Sequence> + '_ {
        self.descendants.get(sequence).into_iter().flatten()
    }

    /// Added sequences that have `sequence` as a direct descendant.
    pub fn ancestors(&self, sequence: &Sequence) -> impl Iterator<Item = &Sequence> + '_ {
        self.ancestors.get(sequence).into_iter().flatten()
    }

    /// One sequence per non-null position of `sequence`, with that position nulled.
    pub fn direct_descendants(&self, sequence: &Sequence) -> BTreeSet<Sequence> {
        sequence
            .iter()
            .enumerate()
            .filter(|(_, bb)| **bb != self.null_element)
            .map(|(i, _)| sequence.replaced(i, &self.null_element))
            .collect()
    }

    /// Every sequence of the same length holding exactly `k` of the non-null
    /// elements of `sequence`, in their original relative order, at any
    /// positions that keep that order.
    pub fn descendants_with_k_elements(&self, sequence: &Sequence, k: usize) -> BTreeSet<Sequence> {
        let mut result = BTreeSet::new();
        let non_null: Vec<&BuildingBlock> = sequence
            .iter()
            .filter(|bb| **bb != self.null_element)
            .collect();
        let length = sequence.len();
        if k > non_null.len() {
            return result;
        }

        for selected in combinations(non_null.len(), k) {
            let elements: Vec<&BuildingBlock> = selected.iter().map(|i| non_null[*i]).collect();
            // (next free slot, next element, partial sequence)
            let mut stack = vec![(0usize, 0usize, vec![self.null_element.clone(); length])];
            while let Some((pos, elem_idx, current)) = stack.pop() {
                if elem_idx == elements.len() {
                    result.insert(Sequence::new(current));
                    continue;
                }
                let max_pos = length - (elements.len() - elem_idx);
                for slot in pos..=max_pos {
                    let mut next = current.clone();
                    next[slot] = elements[elem_idx].clone();
                    stack.push((slot + 1, elem_idx + 1, next));
                }
            }
        }
        result
    }

    /// Union of [`Hierarchy::descendants_with_k_elements`] for every `k`
    /// from zero to the non-null count of `sequence`.
    ///
    /// Elements may shift into other slots, so `n` non-null elements in a
    /// sequence of length `n` give `Σ C(n,k)²` placements. The `2^n` count of
    /// in-place truncations is what [`Hierarchy::truncations`] returns.
    pub fn all_descendants_preserving_order(&self, sequence: &Sequence) -> BTreeSet<Sequence> {
        let n = self.level(sequence);
        (0..=n)
            .flat_map(|k| self.descendants_with_k_elements(sequence, k))
            .collect()
    }

    /// Closure of `sequence` under [`Hierarchy::direct_descendants`],
    /// including `sequence` itself. Positions never move, so a sequence with
    /// `n` non-null elements has exactly `2^n` truncations.
    pub fn truncations(&self, sequence: &Sequence) -> BTreeSet<Sequence> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![sequence.clone()];
        while let Some(seq) = stack.pop() {
            if seen.contains(&seq) {
                continue;
            }
            stack.extend(self.direct_descendants(&seq));
            seen.insert(seq);
        }
        seen
    }

    pub fn set_sequence_value(&mut self, sequence: Sequence, value: f64) {
        self.values.insert(sequence, value);
    }

    pub fn set_sequence_values(&mut self, values: impl IntoIterator<Item = (Sequence, f64)>) {
        self.values.extend(values);
    }

    pub fn sequence_value(&self, sequence: &Sequence) -> Option<f64> {
        self.values.get(sequence).copied()
    }

    /// Sequences at `level` sorted by their stored value, unvalued ones last.
    pub fn ordered_sequences_by_level(&self, level: usize) -> Vec<Sequence> {
        self.sorted_by_value(self.sequences_by_level(level))
    }

    /// Direct descendants sorted by their stored value, unvalued ones last.
    pub fn ordered_descendants(&self, sequence: &Sequence) -> Vec<Sequence> {
        self.sorted_by_value(self.descendants(sequence))
    }

    fn sorted_by_value<'a>(&self, seqs: impl Iterator<Item = &'a Sequence>) -> Vec<Sequence> {
        let mut out: Vec<Sequence> = seqs.cloned().collect();
        out.sort_by(|a, b| {
            let va = self.sequence_value(a).unwrap_or(f64::INFINITY);
            let vb = self.sequence_value(b).unwrap_or(f64::INFINITY);
            va.total_cmp(&vb)
        });
        out
    }
}

/// All `k`-subsets of `0..n` as ascending index lists, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        let Some(i) = (0..k).rev().find(|i| idx[*i] != i + n - k) else {
            return out;
        };
        idx[i] += 1;
        for j in (i + 1)..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(names: &[&str]) -> Sequence {
        Sequence::from_names(names)
    }

    #[test]
    fn test_combinations() {
        assert_eq!(combinations(3, 0), vec![Vec::<usize>::new()]);
        assert_eq!(
            combinations(3, 2),
            vec![vec![0, 1], vec![0, 2], vec![1, 2]]
        );
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn test_direct_descendants() {
        let h = Hierarchy::new(BuildingBlock::null());
        let d = h.direct_descendants(&seq(&["A", "Null", "C"]));
        let expected: BTreeSet<Sequence> = [seq(&["Null", "Null", "C"]), seq(&["A", "Null", "Null"])]
            .into_iter()
            .collect();
        assert_eq!(d, expected);
    }

    #[test]
    fn test_placements_keep_order() {
        let h = Hierarchy::new(BuildingBlock::null());
        let base = seq(&["X", "Y"]);
        let one = h.descendants_with_k_elements(&base, 1);
        let expected: BTreeSet<Sequence> = [
            seq(&["X", "Null"]),
            seq(&["Null", "X"]),
            seq(&["Y", "Null"]),
            seq(&["Null", "Y"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(one, expected);
        // Y never precedes X.
        let all = h.all_descendants_preserving_order(&base);
        assert_eq!(all.len(), 6);
        assert!(!all.contains(&seq(&["Y", "X"])));
    }

    #[test]
    fn test_truncation_count() {
        let h = Hierarchy::new(BuildingBlock::null());
        for names in [vec!["X", "Y"], vec!["A", "B", "C"], vec!["A", "Null", "C", "D"]] {
            let s = seq(&names);
            let n = h.level(&s);
            let t = h.truncations(&s);
            assert_eq!(t.len(), 1 << n, "Expected {:?}, got {:?}", 1 << n, t);
            assert!(t.iter().all(|x| x.len() == s.len()));
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut h = Hierarchy::new(BuildingBlock::null());
        h.add_sequence(seq(&["A", "B"])).unwrap();
        let err = h.add_sequence(seq(&["A", "B", "C"])).unwrap_err();
        assert!(matches!(err, HierarchyError::LengthMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_ordered_views_put_missing_last() {
        let base = seq(&["X", "Y"]);
        let mut h = Hierarchy::from_base(BuildingBlock::null(), &base).unwrap();
        h.set_sequence_value(seq(&["Null", "Y"]), 4.0);
        h.set_sequence_values([(seq(&["X", "Null"]), 3.0)]);
        let ordered = h.ordered_descendants(&base);
        assert_eq!(ordered, vec![seq(&["X", "Null"]), seq(&["Null", "Y"])]);

        let level_one = h.ordered_sequences_by_level(1);
        assert_eq!(level_one.len(), 4);
        assert_eq!(level_one[0], seq(&["X", "Null"]));
        assert_eq!(level_one[1], seq(&["Null", "Y"]));
        assert_eq!(h.sequence_value(&seq(&["Null", "X"])), None);
    }
}
