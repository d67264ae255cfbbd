use std::collections::HashSet;
use std::sync::Arc;

use dvl_cache::{KeyCache, KeySet};
use dvl_store::{run_in_transaction, RecordStore, StoreResult, UnitOfWork};
use dvl_types::{DataVaultObject, EntityKind, RecordKey};
use tracing::{debug, warn};

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// Read access and transactions shared by every repository.
pub trait Repository<R: DataVaultObject> {
    /// Backing store of the repository's own record shape.
    type Store: RecordStore<R> + ?Sized;

    fn store(&self) -> &Self::Store;

    /// Point read by primary key.
    fn get_by_key(&self, key: &R::Key) -> RepoResult<Option<R>> {
        Ok(self.store().get(key)?)
    }

    /// Every stored row.
    fn get_all(&self) -> RepoResult<Vec<R>> {
        Ok(self.store().scan()?)
    }

    /// The rows that are currently valid. Every row, unless overridden.
    fn get_current(&self) -> RepoResult<Vec<R>> {
        self.get_all()
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(self.store().count()?)
    }

    /// Run `f` in one transaction: commit on `Ok`, roll back on `Err` or
    /// panic.
    ///
    /// Caches are not rolled back.
    fn execute_in_transaction<T, F>(&self, f: F) -> RepoResult<T>
    where
        Self: Sized,
        F: FnOnce() -> RepoResult<T>,
    {
        run_in_transaction(self.store().unit_of_work(), f)
    }
}

/// Run `f` as one unit of work, joining the caller's transaction if one is
/// already active.
pub(crate) fn atomically<T>(
    uow: Arc<dyn UnitOfWork>,
    f: impl FnOnce() -> RepoResult<T>,
) -> RepoResult<T> {
    if uow.in_transaction() {
        f()
    } else {
        run_in_transaction(uow, f)
    }
}

/// Attach to the `kind` namespace of a key cache, loading it from storage
/// once if no other repository did so before.
pub(crate) fn attach_namespace<K: RecordKey>(
    kind: EntityKind,
    cache: &KeyCache<K>,
    load: impl FnOnce() -> StoreResult<HashSet<K>>,
) -> RepoResult<KeySet<K>> {
    if cache.is_initialized(kind) {
        debug!(kind = %kind, "key cache already initialized; reusing shared keys");
    } else {
        cache.initialize(kind, load()?)?;
    }
    Ok(cache.get_keys(kind)?)
}

/// Resolve the key set a hub or link repository deduplicates against.
///
/// `None` means caching is disabled.
pub(crate) fn attach_key_set<K: RecordKey>(
    kind: EntityKind,
    cache: Option<&KeyCache<K>>,
    config: &RepositoryConfig,
    load: impl FnOnce() -> StoreResult<HashSet<K>>,
) -> RepoResult<Option<KeySet<K>>> {
    if !config.key_caching.is_enabled() {
        warn!(
            kind = %kind,
            "primary key caching is disabled; duplicate keys will fail as constraint violations"
        );
        return Ok(None);
    }
    let cache = cache.ok_or(RepoError::MissingKeyCache { kind })?;
    attach_namespace(kind, cache, load).map(Some)
}
