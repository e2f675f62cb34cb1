use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{
    Hash,
    Hasher,
};

pub const NULL_BUILDING_BLOCK_NAME: &str = "Null";

/// An atomic unit of a library member (e.g. an amino acid).
///
/// Two building blocks are the same building block when their names match,
/// the chemical metadata is carried along but never compared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingBlock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smiles: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BuildingBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            smiles: None,
            properties: BTreeMap::new(),
        }
    }

    /// The conventional placeholder for a truncated position.
    pub fn null() -> Self {
        Self::new(NULL_BUILDING_BLOCK_NAME)
    }

    pub fn with_smiles(mut self, smiles: impl Into<String>) -> Self {
        self.smiles = Some(smiles.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl PartialEq for BuildingBlock {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BuildingBlock {}

impl Hash for BuildingBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for BuildingBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildingBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for BuildingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
