pub mod compiler;
pub mod error;
pub mod extension;
pub mod models;
pub mod repository;
pub mod transaction;

// Re-export commonly used types
pub use compiler::{
    CompilationUnit, CompileOptions, CompilerBackend, Diagnostic, DiagnosticListener, FileKind,
    FileManager, Location, Severity,
};
pub use error::{
    BoxError, ClassResolutionError, ExtensionInstantiationError, FileManagerError,
    RepositoryError,
};
pub use extension::{ConstructorKind, Extension};
pub use models::*;
pub use repository::{ArtifactRepository, SourceRepository};
pub use transaction::TransactionManager;
