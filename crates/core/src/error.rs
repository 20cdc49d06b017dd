use codestore_api::{
    BoxError, ClassResolutionError, Diagnostic, ExtensionInstantiationError, FileManagerError,
    RepositoryError,
};
use thiserror::Error;

/// Aborted compile pass. Nothing has been persisted when this is returned.
#[derive(Error, Debug)]
pub enum CompilationError {
    #[error("compilation failed with {} error(s): {}", errors(.diagnostics), summary(.diagnostics))]
    Failed { diagnostics: Vec<Diagnostic> },
    #[error("compiler backend {backend} could not run: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BoxError,
    },
}

impl CompilationError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompilationError::Failed { diagnostics } => diagnostics,
            CompilationError::Backend { .. } => &[],
        }
    }
}

fn errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

fn summary(diagnostics: &[Diagnostic]) -> String {
    let mut shown: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .take(3)
        .map(|d| d.to_string())
        .collect();
    if shown.is_empty() {
        shown.push("backend reported failure".to_string());
    }
    shown.join("; ")
}

#[derive(Error, Debug)]
pub enum CodeStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    ClassResolution(#[from] ClassResolutionError),
    #[error(transparent)]
    Extension(#[from] ExtensionInstantiationError),
    #[error("File manager error: {0}")]
    FileManager(#[from] FileManagerError),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CodeStoreError>;
