use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository id of a stored source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

/// Repository id of a compiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src#{}", self.0)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cls#{}", self.0)
    }
}

/// One row of a source enumeration: dotted qualified name and its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub qualified_name: String,
    pub id: SourceId,
}

impl SourceEntry {
    pub fn new(qualified_name: impl Into<String>, id: SourceId) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            id,
        }
    }
}

/// One row of an artifact enumeration: dotted binary class name and its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub class_name: String,
    pub id: ArtifactId,
}

impl ArtifactEntry {
    pub fn new(class_name: impl Into<String>, id: ArtifactId) -> Self {
        Self {
            class_name: class_name.into(),
            id,
        }
    }
}

/// Full compiled artifact row, as held by a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub id: ArtifactId,
    pub class_name: String,
    pub bytes: Vec<u8>,
    pub parent: SourceId,
}
