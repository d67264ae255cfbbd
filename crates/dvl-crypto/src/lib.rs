//! Hashing primitives for the Data Vault loader.
//!
//! Provides domain-separated BLAKE3 hashing of business-key and value
//! strings. A [`KeyHasher`] converts into the [`dvl_types::HashFunction`]
//! the repositories are wired with.
//!
//! Hashing is delegated to the `blake3` crate.

pub mod hasher;

pub use hasher::KeyHasher;
