//! In-process storage primitives.
//!
//! The production repositories live in an outer persistence layer; these
//! implementations back embedded deployments and the test suites.

pub mod memory;
pub mod transaction;

pub use memory::{MemoryArtifactRepository, MemorySourceRepository};
pub use transaction::{LocalTransactionManager, TransactionScope};
