//! Begin-if-absent / end-if-opened transaction handling.

use codestore_api::{RepositoryError, TransactionManager};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Scoped participation in an ambient transaction.
///
/// Entering joins the active transaction when there is one and otherwise
/// opens a private one. Only a transaction opened by the scope itself is ever
/// committed or aborted by it; dropping the scope without [`close`] aborts
/// what it opened.
///
/// [`close`]: TransactionScope::close
pub struct TransactionScope<'a> {
    manager: &'a dyn TransactionManager,
    opened: bool,
    finished: bool,
}

impl<'a> TransactionScope<'a> {
    pub fn enter(manager: &'a dyn TransactionManager) -> Result<Self, RepositoryError> {
        let opened = if manager.is_active() {
            false
        } else {
            manager.begin()?;
            debug!("opened private transaction");
            true
        };
        Ok(Self {
            manager,
            opened,
            finished: false,
        })
    }

    /// Whether this scope began the transaction it runs in.
    pub fn opened(&self) -> bool {
        self.opened
    }

    /// Commit the transaction if this scope opened it.
    pub fn close(mut self) -> Result<(), RepositoryError> {
        self.finished = true;
        if self.opened {
            self.manager.commit()?;
            debug!("committed private transaction");
        }
        Ok(())
    }

    /// Abort the transaction if this scope opened it.
    pub fn abort(mut self) -> Result<(), RepositoryError> {
        self.finished = true;
        if self.opened {
            self.manager.abort()?;
        }
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.opened && !self.finished {
            if let Err(e) = self.manager.abort() {
                warn!("failed to abort private transaction: {}", e);
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStats {
    pub begun: usize,
    pub committed: usize,
    pub aborted: usize,
}

#[derive(Default)]
struct TxState {
    active: bool,
    stats: TransactionStats,
}

/// Single-slot transaction manager for embedded use and tests.
#[derive(Default)]
pub struct LocalTransactionManager {
    state: Mutex<TxState>,
}

impl LocalTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TransactionStats {
        self.state.lock().unwrap().stats
    }
}

impl TransactionManager for LocalTransactionManager {
    fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    fn begin(&self) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.active {
            return Err(RepositoryError::Transaction(
                "a transaction is already active".to_string(),
            ));
        }
        state.active = true;
        state.stats.begun += 1;
        Ok(())
    }

    fn commit(&self) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.active {
            return Err(RepositoryError::Transaction(
                "no active transaction to commit".to_string(),
            ));
        }
        state.active = false;
        state.stats.committed += 1;
        Ok(())
    }

    fn abort(&self) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if !state.active {
            return Err(RepositoryError::Transaction(
                "no active transaction to abort".to_string(),
            ));
        }
        state.active = false;
        state.stats.aborted += 1;
        Ok(())
    }
}
