use crate::error::RepositoryError;

/// Ambient transactional context provided by the persistence layer.
///
/// Implementations decide what "active" means (per thread, per request...);
/// the code store only needs to know whether one exists and how to open and
/// close its own.
pub trait TransactionManager: Send + Sync {
    fn is_active(&self) -> bool;

    fn begin(&self) -> Result<(), RepositoryError>;

    fn commit(&self) -> Result<(), RepositoryError>;

    fn abort(&self) -> Result<(), RepositoryError>;
}
