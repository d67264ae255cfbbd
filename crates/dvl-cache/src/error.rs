use dvl_types::EntityKind;

/// Errors from cache operations.
///
/// Both variants signal a wiring mistake, not a runtime condition; they are
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// A namespace was initialized twice.
    #[error("cache for '{kind}' was already initialized; cached entries must not be overwritten")]
    AlreadyInitialized { kind: EntityKind },

    /// A strict read hit a namespace that was never initialized.
    #[error("cache for '{kind}' was not initialized")]
    NotInitialized { kind: EntityKind },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
