use super::building_block::BuildingBlock;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use std::sync::Arc;

/// Ordered, fixed-length tuple of building blocks.
///
/// Sequences are immutable value keys; cloning only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(Arc<[BuildingBlock]>);

impl Sequence {
    pub fn new(blocks: impl Into<Arc<[BuildingBlock]>>) -> Self {
        Self(blocks.into())
    }

    /// Builds a sequence from building block names, mostly useful in tests
    /// and when reading tabular data.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        names.iter().map(|x| BuildingBlock::new(x.as_ref())).collect()
    }

    pub fn blocks(&self) -> &[BuildingBlock] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildingBlock> {
        self.0.iter()
    }

    pub fn count_non_null(&self, null_element: &BuildingBlock) -> usize {
        self.0.iter().filter(|x| *x != null_element).count()
    }

    /// Returns a copy of the sequence with `position` replaced by `block`.
    ///
    /// # Panics
    /// Panics if `position` is out of bounds.
    pub fn replaced(&self, position: usize, block: &BuildingBlock) -> Self {
        let mut out = self.0.to_vec();
        out[position] = block.clone();
        Self::new(out)
    }
}

impl FromIterator<BuildingBlock> for Sequence {
    fn from_iter<I: IntoIterator<Item = BuildingBlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, bb) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{}", bb)?;
        }
        Ok(())
    }
}
