//! Storage collaborators consumed by the code store.
//!
//! Both repositories are owned by an outer persistence layer; the code store
//! only reads sources and is the single writer of compiled artifacts.

use crate::error::RepositoryError;
use crate::models::{ArtifactEntry, ArtifactId, SourceEntry, SourceId};

/// Key -> bytes store of source units.
pub trait SourceRepository: Send + Sync {
    /// List every stored source as (qualified name, id).
    fn enumerate(&self) -> Result<Vec<SourceEntry>, RepositoryError>;

    /// Check out the raw content of one source.
    fn fetch_content(&self, id: SourceId) -> Result<Vec<u8>, RepositoryError>;
}

/// Key -> bytes store of compiled classfiles.
pub trait ArtifactRepository: Send + Sync {
    /// List every stored artifact as (class name, id).
    fn enumerate(&self) -> Result<Vec<ArtifactEntry>, RepositoryError>;

    /// Bytes of the artifact whose class name matches exactly, `None` if absent.
    fn fetch_content(&self, class_name: &str) -> Result<Option<Vec<u8>>, RepositoryError>;

    fn insert(
        &self,
        class_name: &str,
        parent: SourceId,
        bytes: &[u8],
    ) -> Result<ArtifactId, RepositoryError>;

    fn update(&self, id: ArtifactId, bytes: &[u8]) -> Result<(), RepositoryError>;

    fn delete(&self, id: ArtifactId) -> Result<(), RepositoryError>;
}
