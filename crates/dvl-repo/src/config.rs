use dvl_cache::KeyCache;
use dvl_types::{HashFunction, RecordKey};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Whether hub and link repositories deduplicate through a [`KeyCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCaching {
    Enabled,
    /// Every insert reaches storage; duplicates fail there.
    #[default]
    Disabled,
}

impl KeyCaching {
    pub fn is_enabled(self) -> bool {
        matches!(self, KeyCaching::Enabled)
    }
}

/// Repository settings.
///
/// ```toml
/// key_caching = "enabled"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub key_caching: KeyCaching,
}

impl RepositoryConfig {
    /// Configuration with key caching enabled.
    pub fn cached() -> Self {
        Self {
            key_caching: KeyCaching::Enabled,
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        toml::from_str(text).map_err(|e| RepoError::InvalidConfig(e.to_string()))
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string(self).map_err(|e| RepoError::InvalidConfig(e.to_string()))
    }
}

/// Everything a hub, link or timeline repository is wired with.
///
/// Clones share the hash function and the key cache, so handing clones of
/// one context to several repositories makes them agree on which keys were
/// already written.
pub struct RepositoryContext<K> {
    pub hash_function: Option<HashFunction<K>>,
    pub key_cache: Option<KeyCache<K>>,
    pub config: RepositoryConfig,
}

impl<K: RecordKey> RepositoryContext<K> {
    /// Uncached context computing keys with `hash_function`.
    pub fn new(hash_function: HashFunction<K>) -> Self {
        Self {
            hash_function: Some(hash_function),
            key_cache: None,
            config: RepositoryConfig::default(),
        }
    }

    /// Cached context sharing `key_cache`.
    pub fn cached(hash_function: HashFunction<K>, key_cache: KeyCache<K>) -> Self {
        Self::new(hash_function)
            .with_key_cache(key_cache)
            .with_config(RepositoryConfig::cached())
    }

    pub fn with_key_cache(mut self, key_cache: KeyCache<K>) -> Self {
        self.key_cache = Some(key_cache);
        self
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }
}

impl<K> Default for RepositoryContext<K> {
    fn default() -> Self {
        Self {
            hash_function: None,
            key_cache: None,
            config: RepositoryConfig::default(),
        }
    }
}

impl<K> Clone for RepositoryContext<K> {
    fn clone(&self) -> Self {
        Self {
            hash_function: self.hash_function.clone(),
            key_cache: self.key_cache.clone(),
            config: self.config.clone(),
        }
    }
}

impl<K: RecordKey> std::fmt::Debug for RepositoryContext<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryContext")
            .field("hash_function", &self.hash_function)
            .field("key_cache", &self.key_cache)
            .field("config", &self.config)
            .finish()
    }
}
