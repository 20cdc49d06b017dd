pub mod compile;
pub mod config;
pub mod error;
pub mod extension;
pub mod loader;
pub mod logging;
pub mod store;

pub use compile::{CompilationOrchestrator, CompileReport};
pub use config::CodeStoreConfig;
pub use error::{CodeStoreError, CompilationError, Result};
pub use extension::{BindingTable, ExtensionRegistry, ExtensionSet};
pub use loader::{ArtifactClassLoader, ClassLoader, LoadedClass, LoaderCell};
