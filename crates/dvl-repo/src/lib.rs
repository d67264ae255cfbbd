//! Data Vault repositories with cache-backed write deduplication.
//!
//! Each repository wraps a store from `dvl-store` and implements the insert
//! algorithm of one record shape:
//!
//! - [`HubRepository`] / [`LinkRepository`] -- hash the business key, skip
//!   keys the shared [`KeyCache`](dvl_cache::KeyCache) has seen
//! - [`SatelliteRepository`] -- append a row per insert
//! - [`ValueHashedSatelliteRepository`] -- append only when values change
//! - [`LinkTimelineRepository`] -- links with open/closed validity periods
//!
//! Read access and transactions come from the [`Repository`] trait.
//!
//! # Wiring
//!
//! Repositories are built from a [`RepositoryContext`]: the hash function,
//! an optional shared key cache, and a [`RepositoryConfig`]. Enabling key
//! caching without a cache fails at construction. Repositories handed the
//! same cache agree on which keys exist; the first one seeds the cache from
//! storage, later ones reuse it.

pub mod config;
pub mod error;
pub mod hub;
pub mod link;
pub mod outcome;
pub mod repository;
pub mod satellite;
pub mod timeline;
pub mod value_hashed;

mod keyed;

#[cfg(test)]
mod fixtures;

pub use config::{KeyCaching, RepositoryConfig, RepositoryContext};
pub use error::{RepoError, RepoResult};
pub use hub::HubRepository;
pub use link::LinkRepository;
pub use outcome::{InsertOutcome, Inserted};
pub use repository::Repository;
pub use satellite::SatelliteRepository;
pub use timeline::LinkTimelineRepository;
pub use value_hashed::ValueHashedSatelliteRepository;
