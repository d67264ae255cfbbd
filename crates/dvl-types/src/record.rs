//! Capability traits for the four Data Vault record shapes.
//!
//! Repositories are generic over these traits, so any concrete record type
//! becomes storable by implementing the capabilities it has. All dispatch is
//! resolved at compile time.
//!
//! | Shape                  | Key                                  | Trait                    |
//! |------------------------|--------------------------------------|--------------------------|
//! | Hub                    | hash of the business key             | [`Hub`]                  |
//! | Link                   | hash of the related keys             | [`Link`]                 |
//! | Satellite              | (reference, load date)               | [`Satellite`]            |
//! | Value-hashed satellite | (reference, load date) + value hash  | [`ValueHashedSatellite`] |
//! | Timeline satellite     | (reference, load date) + end date    | [`TimelineSatellite`]    |

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::kind::EntityKind;
use crate::load::{LoadDate, LoadReference, StoreLoadInfo};

/// Bounds every primary key, reference or value hash must satisfy.
pub trait RecordKey: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> RecordKey for T where T: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

/// Features shared by every Data Vault record.
pub trait DataVaultObject: Clone + fmt::Debug + Send + Sync + 'static {
    /// Primary key type. Satellites use [`SatelliteKey`].
    type Key: RecordKey;

    /// Cache and storage namespace of this record shape.
    const KIND: EntityKind;

    /// The primary key, or `None` while it has not been computed yet.
    fn primary_key(&self) -> Option<Self::Key>;

    fn load_date(&self) -> LoadDate;

    fn set_load_date(&mut self, load_date: LoadDate);

    /// Concatenation of all business-key attributes, without separators.
    fn business_key_string(&self) -> String;

    /// Opt-in: store record source and loader directly on the record.
    fn set_store_load_info(&mut self, _info: &StoreLoadInfo) {}

    /// Opt-in: reference a separately stored load-information row.
    fn set_load_reference(&mut self, _reference: LoadReference) {}

    /// Opt-in: record who edited the source data.
    fn set_edited_by(&mut self, _editor: &str) {}
}

/// A hub: one row per distinct business key, never updated.
pub trait Hub: DataVaultObject {
    fn set_primary_key(&mut self, key: Self::Key);
}

/// A link: one row per distinct combination of related keys, never updated.
pub trait Link: DataVaultObject {
    fn set_primary_key(&mut self, key: Self::Key);
}

/// A satellite: timestamped attribute state of a hub or link.
///
/// Implementors set `type Key = SatelliteKey<Self::Reference>` and build the
/// primary key with [`SatelliteKey::of`].
pub trait Satellite: DataVaultObject {
    /// Key type of the described hub or link.
    type Reference: RecordKey;

    /// The described hub/link key, or `None` if it still has to be derived
    /// from the business-key string.
    fn reference(&self) -> Option<&Self::Reference>;

    fn set_reference(&mut self, reference: Self::Reference);
}

/// A satellite that only gets a new row when its attribute values change.
pub trait ValueHashedSatellite: Satellite {
    type ValueHash: RecordKey;

    /// Concatenation of all non-key attribute values.
    fn value_string(&self) -> String;

    fn value_hash(&self) -> Option<&Self::ValueHash>;

    fn set_value_hash(&mut self, hash: Self::ValueHash);
}

/// A satellite recording the validity periods of a link.
///
/// At most one row per link key has no end date; that row is the open
/// period.
pub trait TimelineSatellite: Satellite {
    /// A fresh open row for `reference`, starting at `load_date`.
    fn open(reference: Self::Reference, load_date: LoadDate) -> Self;

    fn end_date(&self) -> Option<LoadDate>;

    fn set_end_date(&mut self, end_date: Option<LoadDate>);

    fn is_open(&self) -> bool {
        self.end_date().is_none()
    }
}

/// A link that can be logically removed and re-added, paired with the
/// timeline satellite that records its periods.
pub trait TimelineLink: Link {
    type Timeline: TimelineSatellite<Reference = Self::Key>;
}

/// Composite primary key of a satellite row.
///
/// Ordering is by reference first, then load date, so all rows of one
/// reference are adjacent and chronological.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SatelliteKey<R> {
    pub reference: R,
    pub load_date: LoadDate,
}

impl<R> SatelliteKey<R> {
    pub fn new(reference: R, load_date: LoadDate) -> Self {
        Self {
            reference,
            load_date,
        }
    }
}

impl<R: RecordKey> SatelliteKey<R> {
    /// The key of `satellite`, once its reference is known.
    pub fn of<S>(satellite: &S) -> Option<Self>
    where
        S: Satellite<Reference = R>,
    {
        satellite
            .reference()
            .map(|reference| Self::new(reference.clone(), satellite.load_date()))
    }
}
