use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use dvl_types::{EntityKind, RecordKey};
use tracing::debug;

use crate::error::{CacheError, CacheResult};

/// Live view of one namespace's key set.
///
/// Clones share the same set, and the set stays shared with the
/// [`KeyCache`] it came from. [`insert`](KeySet::insert) is the
/// at-most-once guard: it reports whether the key was new.
pub struct KeySet<K> {
    keys: Arc<Mutex<HashSet<K>>>,
}

impl<K: RecordKey> KeySet<K> {
    fn new(keys: HashSet<K>) -> Self {
        Self {
            keys: Arc::new(Mutex::new(keys)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<K>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a key. Returns `true` if it was not present before.
    pub fn insert(&self, key: K) -> bool {
        self.lock().insert(key)
    }

    /// Remove a key. Returns `true` if it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current keys.
    pub fn snapshot(&self) -> HashSet<K> {
        self.lock().clone()
    }

    /// Returns `true` if both views share the same underlying set.
    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.keys, &other.keys)
    }
}

impl<K> Clone for KeySet<K> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<K: RecordKey> fmt::Debug for KeySet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").field("len", &self.len()).finish()
    }
}

/// Process-wide mapping from entity kind to the keys already persisted for
/// that kind.
///
/// Cloning shares the cache. A namespace is created empty on
/// [`initialize`](KeyCache::initialize), seeded once, then only grows
/// through its [`KeySet`] (or shrinks when timeline links close).
pub struct KeyCache<K> {
    namespaces: Arc<RwLock<HashMap<EntityKind, KeySet<K>>>>,
}

impl<K: RecordKey> KeyCache<K> {
    /// Create an empty cache with no initialized namespaces.
    pub fn new() -> Self {
        Self {
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed `kind` with its initial keys.
    ///
    /// Fails with [`CacheError::AlreadyInitialized`] if `kind` was seeded
    /// before, so tracked keys are never silently discarded.
    pub fn initialize(&self, kind: EntityKind, keys: HashSet<K>) -> CacheResult<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if namespaces.contains_key(&kind) {
            return Err(CacheError::AlreadyInitialized { kind });
        }
        debug!(kind = %kind, keys = keys.len(), "key cache initialized");
        namespaces.insert(kind, KeySet::new(keys));
        Ok(())
    }

    pub fn is_initialized(&self, kind: EntityKind) -> bool {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// The live key set of `kind`.
    ///
    /// Fails with [`CacheError::NotInitialized`] if `kind` was never seeded.
    pub fn get_keys(&self, kind: EntityKind) -> CacheResult<KeySet<K>> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .ok_or(CacheError::NotInitialized { kind })
    }

    /// The live key set of `kind`, or a detached empty set and `false` if
    /// `kind` was never seeded.
    pub fn try_get_keys(&self, kind: EntityKind) -> (KeySet<K>, bool) {
        match self.get_keys(kind) {
            Ok(keys) => (keys, true),
            Err(_) => (KeySet::new(HashSet::new()), false),
        }
    }

    /// Drop the whole namespace of `kind`. Returns `true` if it existed.
    ///
    /// Views handed out earlier keep working but are detached from the
    /// cache.
    pub fn remove(&self, kind: EntityKind) -> bool {
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind)
            .is_some()
    }

    /// Drop every namespace.
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

    /// Returns `true` if both handles share the same cache.
    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.namespaces, &other.namespaces)
    }
}

impl<K: RecordKey> Default for KeyCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyCache<K> {
    fn clone(&self) -> Self {
        Self {
            namespaces: Arc::clone(&self.namespaces),
        }
    }
}

impl<K: RecordKey> fmt::Debug for KeyCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("kinds", &self.kinds())
            .finish()
    }
}
