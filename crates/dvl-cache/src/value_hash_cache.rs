use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dvl_types::{EntityKind, RecordKey};
use tracing::debug;

use crate::error::{CacheError, CacheResult};

/// How a value hash compared to the cached one for its reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashChange {
    /// No hash was cached for the reference.
    New,
    /// A different hash was cached; it has been replaced.
    Changed,
    /// The cached hash is identical; nothing was changed.
    Unchanged,
}

impl HashChange {
    /// Whether a new satellite row has to be written.
    pub fn requires_write(self) -> bool {
        !matches!(self, HashChange::Unchanged)
    }
}

/// Live view of one namespace's reference → latest value hash mapping.
///
/// Holds exactly one hash per reference: the most recent one.
pub struct ValueHashes<R, H> {
    hashes: Arc<Mutex<HashMap<R, H>>>,
}

impl<R: RecordKey, H: RecordKey> ValueHashes<R, H> {
    fn new(hashes: HashMap<R, H>) -> Self {
        Self {
            hashes: Arc::new(Mutex::new(hashes)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<R, H>> {
        self.hashes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached hash of `reference`.
    pub fn get(&self, reference: &R) -> Option<H> {
        self.lock().get(reference).cloned()
    }

    /// Cache `hash` for `reference`, returning the replaced hash.
    pub fn insert(&self, reference: R, hash: H) -> Option<H> {
        self.lock().insert(reference, hash)
    }

    pub fn remove(&self, reference: &R) -> Option<H> {
        self.lock().remove(reference)
    }

    /// Compare `hash` with the cached one and cache it unless unchanged.
    ///
    /// Lookup, comparison and replacement happen under one lock.
    pub fn replace_if_changed(&self, reference: R, hash: H) -> HashChange {
        let mut hashes = self.lock();
        match hashes.get(&reference) {
            Some(cached) if *cached == hash => HashChange::Unchanged,
            Some(_) => {
                hashes.insert(reference, hash);
                HashChange::Changed
            }
            None => {
                hashes.insert(reference, hash);
                HashChange::New
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current mapping.
    pub fn snapshot(&self) -> HashMap<R, H> {
        self.lock().clone()
    }

    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hashes, &other.hashes)
    }
}

impl<R, H> Clone for ValueHashes<R, H> {
    fn clone(&self) -> Self {
        Self {
            hashes: Arc::clone(&self.hashes),
        }
    }
}

impl<R: RecordKey, H: RecordKey> fmt::Debug for ValueHashes<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHashes")
            .field("len", &self.len())
            .finish()
    }
}

/// Process-wide mapping from entity kind to {reference → latest value
/// hash}.
///
/// Same lifecycle and sharing rules as [`KeyCache`](crate::KeyCache).
pub struct ValueHashCache<R, H> {
    namespaces: Arc<RwLock<HashMap<EntityKind, ValueHashes<R, H>>>>,
}

impl<R: RecordKey, H: RecordKey> ValueHashCache<R, H> {
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed `kind` with the latest hash per reference.
    ///
    /// Fails with [`CacheError::AlreadyInitialized`] on a second call.
    pub fn initialize(&self, kind: EntityKind, latest: HashMap<R, H>) -> CacheResult<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if namespaces.contains_key(&kind) {
            return Err(CacheError::AlreadyInitialized { kind });
        }
        debug!(kind = %kind, references = latest.len(), "value hash cache initialized");
        namespaces.insert(kind, ValueHashes::new(latest));
        Ok(())
    }

    pub fn is_initialized(&self, kind: EntityKind) -> bool {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// The live mapping of `kind`.
    ///
    /// Fails with [`CacheError::NotInitialized`] if `kind` was never seeded.
    pub fn get_values(&self, kind: EntityKind) -> CacheResult<ValueHashes<R, H>> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .ok_or(CacheError::NotInitialized { kind })
    }

    /// The live mapping of `kind`, or a detached empty mapping and `false`.
    pub fn try_get_values(&self, kind: EntityKind) -> (ValueHashes<R, H>, bool) {
        match self.get_values(kind) {
            Ok(values) => (values, true),
            Err(_) => (ValueHashes::new(HashMap::new()), false),
        }
    }

    /// Drop the namespace of `kind`. Returns `true` if it existed.
    pub fn remove(&self, kind: EntityKind) -> bool {
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind)
            .is_some()
    }

    pub fn clear(&self) {
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Sorted list of initialized kinds.
    pub fn kinds(&self) -> Vec<EntityKind> {
        let namespaces = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<EntityKind> = namespaces.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.namespaces, &other.namespaces)
    }
}

impl<R: RecordKey, H: RecordKey> Default for ValueHashCache<R, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, H> Clone for ValueHashCache<R, H> {
    fn clone(&self) -> Self {
        Self {
            namespaces: Arc::clone(&self.namespaces),
        }
    }
}

impl<R: RecordKey, H: RecordKey> fmt::Debug for ValueHashCache<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHashCache")
            .field("kinds", &self.kinds())
            .finish()
    }
}
