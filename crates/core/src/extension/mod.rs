//! Extension discovery over the compiled artifact set.
//!
//! ```text
//! ArtifactIndexScanner ──▶ discovery ──▶ ExtensionRegistry ──▶ ExtensionSet
//!   (marked classes)      (assignable,    (scan once,          (by weight)
//!                          ctor kind)      ExtensionLinker)
//! ```

pub mod discovery;
pub mod registry;
pub mod scanner;

pub use registry::{
    Binding, BindingTable, ExtensionInstance, ExtensionLinker, ExtensionRegistry, ExtensionSet,
};
pub use scanner::{
    AnnotationScanner, ArtifactDirectory, ArtifactIndexScanner, PseudoFile, ScanDirectory,
    ScanEntry, ScanOutcome,
};
