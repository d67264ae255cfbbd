use dvl_types::EntityKind;

/// Errors from storage operations.
///
/// These surface to callers unchanged; the repositories never catch or
/// retry them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A row with the same primary key already exists.
    #[error("unique constraint violated on '{kind}': duplicate key {key}")]
    ConstraintViolation { kind: EntityKind, key: String },

    /// A record without a primary key was handed to the store.
    #[error("cannot store '{kind}' record without a primary key")]
    MissingKey { kind: EntityKind },

    /// An update targeted a row that does not exist.
    #[error("no '{kind}' row with key {key}")]
    NotFound { kind: EntityKind, key: String },

    /// `begin` was called while a transaction is already running.
    #[error("a transaction is already active")]
    TransactionActive,

    /// `commit` or `rollback` was called outside a transaction.
    #[error("no active transaction")]
    NoTransaction,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
