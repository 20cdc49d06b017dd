//! Thread-safe in-memory repositories.

use codestore_api::{
    ArtifactEntry, ArtifactId, ArtifactRepository, CompiledArtifact, RepositoryError,
    SourceEntry, SourceId, SourceRepository,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

const SOURCES: &str = "source";
const ARTIFACTS: &str = "artifact";

/// Source units keyed by qualified name.
///
/// Checking in content for an existing name keeps its id, so a later compile
/// pass sees the same source.
pub struct MemorySourceRepository {
    sources: RwLock<BTreeMap<String, (SourceId, Vec<u8>)>>,
    next_id: AtomicU64,
}

impl MemorySourceRepository {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Check in `content` under `qualified_name`, returning the source id.
    pub fn put(&self, qualified_name: &str, content: impl Into<Vec<u8>>) -> SourceId {
        let mut sources = self.sources.write().unwrap();
        let content = content.into();
        match sources.get_mut(qualified_name) {
            Some((id, existing)) => {
                *existing = content;
                *id
            }
            None => {
                let id = SourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
                sources.insert(qualified_name.to_string(), (id, content));
                id
            }
        }
    }

    pub fn remove(&self, qualified_name: &str) -> bool {
        self.sources.write().unwrap().remove(qualified_name).is_some()
    }

    pub fn id_of(&self, qualified_name: &str) -> Option<SourceId> {
        self.sources
            .read()
            .unwrap()
            .get(qualified_name)
            .map(|(id, _)| *id)
    }

    pub fn clear(&self) {
        self.sources.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.sources.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySourceRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRepository for MemorySourceRepository {
    fn enumerate(&self) -> Result<Vec<SourceEntry>, RepositoryError> {
        let sources = self.sources.read().unwrap();
        Ok(sources
            .iter()
            .map(|(name, (id, _))| SourceEntry::new(name.clone(), *id))
            .collect())
    }

    fn fetch_content(&self, id: SourceId) -> Result<Vec<u8>, RepositoryError> {
        let sources = self.sources.read().unwrap();
        sources
            .values()
            .find(|(source_id, _)| *source_id == id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| RepositoryError::NotFound {
                store: SOURCES,
                key: id.to_string(),
            })
    }
}

#[derive(Default)]
struct ArtifactTable {
    rows: BTreeMap<ArtifactId, CompiledArtifact>,
    by_name: HashMap<String, ArtifactId>,
}

/// Compiled artifacts keyed by id with a unique class-name index.
pub struct MemoryArtifactRepository {
    table: RwLock<ArtifactTable>,
    next_id: AtomicU64,
}

impl MemoryArtifactRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ArtifactTable::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn get(&self, class_name: &str) -> Option<CompiledArtifact> {
        let table = self.table.read().unwrap();
        table
            .by_name
            .get(class_name)
            .and_then(|id| table.rows.get(id))
            .cloned()
    }

    /// Every artifact, ordered by class name.
    pub fn snapshot(&self) -> Vec<CompiledArtifact> {
        let table = self.table.read().unwrap();
        let mut rows: Vec<CompiledArtifact> = table.rows.values().cloned().collect();
        rows.sort_by(|a, b| a.class_name.cmp(&b.class_name));
        rows
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryArtifactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactRepository for MemoryArtifactRepository {
    fn enumerate(&self) -> Result<Vec<ArtifactEntry>, RepositoryError> {
        let table = self.table.read().unwrap();
        Ok(table
            .rows
            .values()
            .map(|row| ArtifactEntry::new(row.class_name.clone(), row.id))
            .collect())
    }

    fn fetch_content(&self, class_name: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.get(class_name).map(|row| row.bytes))
    }

    fn insert(
        &self,
        class_name: &str,
        parent: SourceId,
        bytes: &[u8],
    ) -> Result<ArtifactId, RepositoryError> {
        let mut table = self.table.write().unwrap();
        if table.by_name.contains_key(class_name) {
            return Err(RepositoryError::storage(
                ARTIFACTS,
                format!("duplicate class name {class_name}"),
            ));
        }
        let id = ArtifactId(self.next_id.fetch_add(1, Ordering::Relaxed));
        table.by_name.insert(class_name.to_string(), id);
        table.rows.insert(
            id,
            CompiledArtifact {
                id,
                class_name: class_name.to_string(),
                bytes: bytes.to_vec(),
                parent,
            },
        );
        Ok(id)
    }

    fn update(&self, id: ArtifactId, bytes: &[u8]) -> Result<(), RepositoryError> {
        let mut table = self.table.write().unwrap();
        let row = table.rows.get_mut(&id).ok_or_else(|| RepositoryError::NotFound {
            store: ARTIFACTS,
            key: id.to_string(),
        })?;
        row.bytes = bytes.to_vec();
        Ok(())
    }

    fn delete(&self, id: ArtifactId) -> Result<(), RepositoryError> {
        let mut table = self.table.write().unwrap();
        let row = table.rows.remove(&id).ok_or_else(|| RepositoryError::NotFound {
            store: ARTIFACTS,
            key: id.to_string(),
        })?;
        table.by_name.remove(&row.class_name);
        Ok(())
    }
}
