use dvl_cache::CacheError;
use dvl_store::StoreError;
use dvl_types::EntityKind;

/// Errors from repository operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    /// No hash function was supplied to a repository that computes keys.
    #[error("no hash function supplied; keys cannot be computed")]
    MissingHashFunction,

    /// Key caching is enabled but no cache instance was supplied.
    #[error("key caching is enabled for '{kind}' but no key cache was supplied")]
    MissingKeyCache { kind: EntityKind },

    /// Configuration text could not be parsed.
    #[error("invalid repository configuration: {0}")]
    InvalidConfig(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Storage errors, constraint violations included, pass through as is.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RepoResult<T> = Result<T, RepoError>;
