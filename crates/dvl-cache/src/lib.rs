//! In-memory write-path caches for Data Vault repositories.
//!
//! Loading a hub or link that already exists would violate its primary key
//! constraint. Instead of asking storage before every insert, repositories
//! keep the keys (and, for value-hashed satellites, the latest value hash
//! per reference) they have seen in a cache that is filled once from
//! storage and then kept current on every write.
//!
//! # Caches
//!
//! - [`KeyCache`] -- per [`EntityKind`](dvl_types::EntityKind), the set of persisted keys
//! - [`ValueHashCache`] -- per kind, reference key → latest value hash
//!
//! # Sharing
//!
//! Both caches are cheap handles: cloning one shares the underlying state.
//! Hand the same cache to several repositories and they agree on what has
//! been written without re-querying storage. Reads return live views
//! ([`KeySet`], [`ValueHashes`]) that mutate the cache directly.
//!
//! # Rules
//!
//! 1. A namespace is initialized exactly once; a second attempt fails.
//! 2. Strict reads of an uninitialized namespace fail; `try_` reads don't.
//! 3. Cache mutation and storage writes are not atomic with each other.
//!    After a crash the cache is rebuilt from storage.

pub mod error;
pub mod key_cache;
pub mod value_hash_cache;

pub use error::{CacheError, CacheResult};
pub use key_cache::{KeyCache, KeySet};
pub use value_hash_cache::{HashChange, ValueHashCache, ValueHashes};
