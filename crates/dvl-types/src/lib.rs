//! Foundation types for the Data Vault loader (DVL).
//!
//! This crate provides the record vocabulary every other DVL crate builds
//! on: how a record shape is named, how it is keyed, and which capabilities
//! a hub, link or satellite exposes to the repositories.
//!
//! # Key Types
//!
//! - [`EntityKind`] -- Type-safe namespace descriptor of a record shape
//! - [`HashFunction`] -- Caller-supplied business-key hash
//! - [`LoadDate`] / [`LoadMetadata`] -- Load timestamp and audit attributes
//! - [`Hub`], [`Link`], [`Satellite`], [`ValueHashedSatellite`],
//!   [`TimelineSatellite`], [`TimelineLink`] -- Record capabilities
//! - [`SatelliteKey`] -- Composite (reference, load date) key

pub mod hash;
pub mod kind;
pub mod load;
pub mod record;

pub use hash::HashFunction;
pub use kind::EntityKind;
pub use load::{LoadDate, LoadMetadata, LoadReference, StoreLoadInfo};
pub use record::{
    DataVaultObject, Hub, Link, RecordKey, Satellite, SatelliteKey, TimelineLink,
    TimelineSatellite, ValueHashedSatellite,
};
