use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::UnitOfWork;

/// Scoped transaction guard.
///
/// Rolls back on drop unless [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback) consumed it first, so an early
/// return or a panic never leaves a transaction dangling.
pub struct Transaction {
    uow: Arc<dyn UnitOfWork>,
    finished: bool,
}

impl Transaction {
    pub fn begin(uow: Arc<dyn UnitOfWork>) -> StoreResult<Self> {
        uow.begin()?;
        Ok(Self {
            uow,
            finished: false,
        })
    }

    pub fn commit(mut self) -> StoreResult<()> {
        self.finished = true;
        self.uow.commit()
    }

    pub fn rollback(mut self) -> StoreResult<()> {
        self.finished = true;
        self.uow.rollback()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.uow.rollback() {
            Ok(()) => debug!("transaction rolled back on drop"),
            Err(e) => warn!(error = %e, "rollback on drop failed"),
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish()
    }
}

/// Run `f` inside a transaction on `uow`.
///
/// Commits when `f` returns `Ok`; rolls back when it returns `Err` or
/// panics. Nested calls fail with [`StoreError::TransactionActive`].
pub fn run_in_transaction<T, E, F>(uow: Arc<dyn UnitOfWork>, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<StoreError>,
{
    let transaction = Transaction::begin(uow)?;
    let value = f()?;
    transaction.commit()?;
    Ok(value)
}
