//! Whole-repository compile pass.
//!
//! A pass runs in four phases:
//! 1. enumerate sources (W) and existing artifacts (E)
//! 2. run the backend once over all of W through a [`StoreFileManager`]
//! 3. abort on any error diagnostic, before anything is written
//! 4. reconcile: update outputs already in E, insert new ones, delete the rest
//!
//! Phase 4 is best effort. A failed write is logged and recorded in the
//! [`CompileReport`] while the remaining writes go ahead, so a pass that
//! returns `Ok` with failures may leave the artifact set partially updated.
//!
//! Passes must be serialised by the caller; nothing here locks the artifact
//! namespace.

pub mod diagnostics;
pub mod vfs;

pub use diagnostics::DiagnosticCollector;
pub use vfs::{CapturedOutput, StoreFileManager};

use crate::error::{CompilationError, Result};
use codestore_api::models::naming;
use codestore_api::{
    ArtifactId, ArtifactRepository, CompilationUnit, CompileOptions, CompilerBackend,
    RepositoryError, SourceId, SourceRepository,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Write that did not make it into the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub class_name: String,
    pub action: WriteAction,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Insert,
    Update,
    Delete,
}

/// Outcome of a successful pass.
#[derive(Debug, Default, Clone)]
pub struct CompileReport {
    pub sources: usize,
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub warnings: usize,
    pub failures: Vec<WriteFailure>,
    pub duration: Duration,
}

impl CompileReport {
    /// Every write of the reconciliation phase succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct CompilationOrchestrator {
    sources: Arc<dyn SourceRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    backend: Arc<dyn CompilerBackend>,
}

impl CompilationOrchestrator {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        backend: Arc<dyn CompilerBackend>,
    ) -> Self {
        Self {
            sources,
            artifacts,
            backend,
        }
    }

    /// Recompile every stored source and bring the artifact repository in
    /// line with the result.
    pub fn compile(&self, options: &CompileOptions) -> Result<CompileReport> {
        let start = Instant::now();

        let working_set: BTreeMap<String, SourceId> = self
            .sources
            .enumerate()?
            .into_iter()
            .map(|e| (e.qualified_name, e.id))
            .collect();
        let mut existing: HashMap<String, ArtifactId> = self
            .artifacts
            .enumerate()?
            .into_iter()
            .map(|e| (e.class_name, e.id))
            .collect();
        debug!(
            "compile pass over {} sources, {} existing artifacts",
            working_set.len(),
            existing.len()
        );

        let units: Vec<CompilationUnit> = working_set
            .iter()
            .map(|(name, id)| CompilationUnit::new(name.clone(), *id, self.sources.clone()))
            .collect();

        let mut files = StoreFileManager::new(units.iter().cloned());
        let mut diagnostics = DiagnosticCollector::new();
        let succeeded = self
            .backend
            .compile(options, &mut files, &mut diagnostics, &units)
            .map_err(|e| CompilationError::Backend {
                backend: self.backend.name().to_string(),
                source: e,
            })?;

        if let Some(e) = units.iter().find_map(CompilationUnit::fetch_failure) {
            error!("source checkout failed during compilation: {}", e);
            return Err(e.into());
        }
        if !succeeded || diagnostics.has_errors() {
            return Err(CompilationError::Failed {
                diagnostics: diagnostics.into_diagnostics(),
            }
            .into());
        }

        let mut report = CompileReport {
            sources: working_set.len(),
            warnings: diagnostics.warning_count(),
            ..CompileReport::default()
        };

        for (class_name, output) in files.into_outputs() {
            match existing.remove(&class_name) {
                Some(id) => match self.artifacts.update(id, &output.bytes) {
                    Ok(()) => {
                        debug!("updated {} ({})", class_name, id);
                        report.updated.push(class_name);
                    }
                    Err(e) => record_failure(&mut report, class_name, WriteAction::Update, e),
                },
                None => match resolve_parent(&working_set, &class_name, &output) {
                    Some(parent) => {
                        match self.artifacts.insert(&class_name, parent, &output.bytes) {
                            Ok(id) => {
                                debug!("inserted {} ({}) from {}", class_name, id, parent);
                                report.inserted.push(class_name);
                            }
                            Err(e) => {
                                record_failure(&mut report, class_name, WriteAction::Insert, e)
                            }
                        }
                    }
                    None => {
                        let e = RepositoryError::NotFound {
                            store: "source",
                            key: naming::outer_class_name(&class_name).to_string(),
                        };
                        record_failure(&mut report, class_name, WriteAction::Insert, e);
                    }
                },
            }
        }

        let mut stale: Vec<(String, ArtifactId)> = existing.into_iter().collect();
        stale.sort();
        for (class_name, id) in stale {
            match self.artifacts.delete(id) {
                Ok(()) => {
                    debug!("deleted stale {} ({})", class_name, id);
                    report.deleted.push(class_name);
                }
                Err(e) => record_failure(&mut report, class_name, WriteAction::Delete, e),
            }
        }

        report.duration = start.elapsed();
        info!(
            "Compile pass complete: {} sources, {} inserted, {} updated, {} deleted, {} failed writes in {:?}",
            report.sources,
            report.inserted.len(),
            report.updated.len(),
            report.deleted.len(),
            report.failures.len(),
            report.duration
        );
        Ok(report)
    }
}

/// Parent source of a new artifact: the outer class name looked up in W,
/// then the unit the backend attributed the output to.
fn resolve_parent(
    working_set: &BTreeMap<String, SourceId>,
    class_name: &str,
    output: &CapturedOutput,
) -> Option<SourceId> {
    working_set
        .get(naming::outer_class_name(class_name))
        .or_else(|| {
            output
                .sibling
                .as_deref()
                .and_then(|name| working_set.get(name))
        })
        .copied()
}

fn record_failure(
    report: &mut CompileReport,
    class_name: String,
    action: WriteAction,
    e: RepositoryError,
) {
    error!("failed to {:?} artifact {}: {}", action, class_name, e);
    report.failures.push(WriteFailure {
        class_name,
        action,
        message: e.to_string(),
    });
}
