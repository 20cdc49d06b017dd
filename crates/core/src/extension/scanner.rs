//! Annotation scanning over pseudo-directories of classfiles.
//!
//! [`AnnotationScanner`] works against any [`ScanDirectory`];
//! [`ArtifactDirectory`] presents the artifact repository as one, with one
//! pseudo-file per stored artifact.

use crate::loader::LoadedClass;
use crate::store::TransactionScope;
use codestore_api::models::naming;
use codestore_api::{ArtifactRepository, FileKind, RepositoryError, TransactionManager};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One file of a scanned directory. Content is only read on demand.
pub trait ScanEntry {
    /// Relative path, e.g. `a/Foo.class`.
    fn name(&self) -> &str;

    fn content(&self) -> Result<&[u8], RepositoryError>;
}

pub trait ScanDirectory {
    fn entries(&self) -> Result<Vec<Box<dyn ScanEntry + '_>>, RepositoryError>;
}

/// A stored artifact seen as a file. The name comes from the repository
/// listing; bytes are fetched on first access and kept.
pub struct PseudoFile<'a> {
    repository: &'a dyn ArtifactRepository,
    class_name: String,
    path: String,
    content: OnceCell<Vec<u8>>,
}

impl<'a> PseudoFile<'a> {
    pub fn new(repository: &'a dyn ArtifactRepository, class_name: String) -> Self {
        let path = naming::to_virtual_path(&class_name, FileKind::Class)
            .trim_start_matches('/')
            .to_string();
        Self {
            repository,
            class_name,
            path,
            content: OnceCell::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_loaded(&self) -> bool {
        self.content.get().is_some()
    }
}

impl ScanEntry for PseudoFile<'_> {
    fn name(&self) -> &str {
        &self.path
    }

    fn content(&self) -> Result<&[u8], RepositoryError> {
        self.content
            .get_or_try_init(|| {
                self.repository
                    .fetch_content(&self.class_name)?
                    .ok_or_else(|| RepositoryError::NotFound {
                        store: "artifact",
                        key: self.class_name.clone(),
                    })
            })
            .map(Vec::as_slice)
    }
}

pub struct ArtifactDirectory<'a> {
    repository: &'a dyn ArtifactRepository,
}

impl<'a> ArtifactDirectory<'a> {
    pub fn new(repository: &'a dyn ArtifactRepository) -> Self {
        Self { repository }
    }
}

impl ScanDirectory for ArtifactDirectory<'_> {
    fn entries(&self) -> Result<Vec<Box<dyn ScanEntry + '_>>, RepositoryError> {
        Ok(self
            .repository
            .enumerate()?
            .into_iter()
            .map(|e| {
                Box::new(PseudoFile::new(self.repository, e.class_name)) as Box<dyn ScanEntry + '_>
            })
            .collect())
    }
}

/// Result of one scan.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    /// Binary names of classes carrying the annotation, sorted.
    pub matches: Vec<String>,
    /// Entries seen in the directory.
    pub visited: usize,
    /// Entries whose content was read.
    pub fetched: usize,
    /// Entries rejected by name before reading.
    pub skipped: usize,
    /// Entries that could not be parsed as classfiles.
    pub unreadable: usize,
    pub duration: Duration,
}

/// Finds classfiles annotated with one annotation type.
#[derive(Debug, Clone)]
pub struct AnnotationScanner {
    annotation: String,
    packages: Vec<String>,
}

impl AnnotationScanner {
    pub fn new(annotation: impl Into<String>) -> Self {
        Self {
            annotation: annotation.into(),
            packages: Vec::new(),
        }
    }

    /// Restrict the scan to classes under these package prefixes.
    pub fn with_packages(mut self, packages: impl IntoIterator<Item = String>) -> Self {
        self.packages.extend(packages);
        self
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Class name of `entry_name` if the scanner wants to read it.
    pub fn accepts(&self, entry_name: &str) -> Option<String> {
        let (class_name, kind) = naming::from_virtual_path(&format!("/{entry_name}"))?;
        if kind != FileKind::Class {
            return None;
        }
        if self.packages.is_empty()
            || self
                .packages
                .iter()
                .any(|p| naming::in_package(&class_name, p, true))
        {
            Some(class_name)
        } else {
            None
        }
    }

    pub fn scan(&self, directory: &dyn ScanDirectory) -> Result<ScanOutcome, RepositoryError> {
        let start = Instant::now();
        let mut outcome = ScanOutcome::default();

        for entry in directory.entries()? {
            outcome.visited += 1;
            let Some(class_name) = self.accepts(entry.name()) else {
                outcome.skipped += 1;
                continue;
            };

            let bytes = entry.content()?;
            outcome.fetched += 1;
            match LoadedClass::parse(&class_name, bytes) {
                Ok(class) if class.has_annotation(&self.annotation) => {
                    debug!("{} carries {}", class.name(), self.annotation);
                    outcome.matches.push(class.name().to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping unreadable entry {}: {}", entry.name(), e);
                    outcome.unreadable += 1;
                }
            }
        }

        outcome.matches.sort();
        outcome.duration = start.elapsed();
        Ok(outcome)
    }
}

/// Scans the artifact repository for an annotation inside a transaction
/// scope: the ambient one if active, otherwise a private one that is closed
/// again before returning.
pub struct ArtifactIndexScanner {
    artifacts: Arc<dyn ArtifactRepository>,
    transactions: Arc<dyn TransactionManager>,
    scanner: AnnotationScanner,
}

impl ArtifactIndexScanner {
    pub fn new(
        artifacts: Arc<dyn ArtifactRepository>,
        transactions: Arc<dyn TransactionManager>,
        scanner: AnnotationScanner,
    ) -> Self {
        Self {
            artifacts,
            transactions,
            scanner,
        }
    }

    pub fn annotation(&self) -> &str {
        self.scanner.annotation()
    }

    pub fn scan(&self) -> Result<ScanOutcome, RepositoryError> {
        let scope = TransactionScope::enter(self.transactions.as_ref())?;
        let directory = ArtifactDirectory::new(self.artifacts.as_ref());

        match self.scanner.scan(&directory) {
            Ok(outcome) => {
                scope.close()?;
                info!(
                    "Artifact scan complete: {} entries, {} read, {} matching {} in {:?}",
                    outcome.visited,
                    outcome.fetched,
                    outcome.matches.len(),
                    self.scanner.annotation(),
                    outcome.duration
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(abort) = scope.abort() {
                    warn!("failed to abort scan transaction: {}", abort);
                }
                Err(e)
            }
        }
    }
}
