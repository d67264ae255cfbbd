//! Storage collaborator for the Data Vault loader.
//!
//! The repositories in `dvl-repo` never talk to a database directly. They
//! need a store that can append rows, enforce primary-key uniqueness, answer
//! a handful of bulk and point queries, and group writes into a unit of
//! work. This crate defines that contract and ships an in-memory backend.
//!
//! # Traits
//!
//! - [`RecordStore`] -- rows of one record shape keyed by primary key
//! - [`SatelliteStore`] -- per-reference history queries for satellites
//! - [`UnitOfWork`] -- begin / commit / rollback
//!
//! # Backends
//!
//! - [`InMemoryDatabase`] / [`InMemoryTable`] -- `BTreeMap` tables sharing one
//!   transaction coordinator, for tests and embedding
//!
//! # Design Rules
//!
//! 1. A batch insert is all-or-nothing: one duplicate key rejects the batch.
//! 2. Constraint violations are returned, never swallowed.
//! 3. Rollback restores every table touched since `begin`.

pub mod error;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryDatabase, InMemoryTable};
pub use traits::{RecordStore, SatelliteStore, UnitOfWork};
pub use transaction::{run_in_transaction, Transaction};
