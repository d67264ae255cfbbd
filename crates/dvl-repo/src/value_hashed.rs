use std::collections::HashMap;
use std::sync::Arc;

use dvl_cache::{ValueHashCache, ValueHashes};
use dvl_store::SatelliteStore;
use dvl_types::{HashFunction, LoadDate, LoadMetadata, ValueHashedSatellite};
use tracing::{debug, trace};

use crate::error::RepoResult;
use crate::keyed::write_staged;
use crate::outcome::Inserted;
use crate::repository::Repository;
use crate::satellite::SatelliteRepository;

/// Repository for satellites that only get a row when their values change.
///
/// A row is written when its reference has no cached hash or the cached
/// hash differs; identical values are skipped. The value-hash cache holds
/// the latest hash per reference and is always on.
pub struct ValueHashedSatelliteRepository<S: ValueHashedSatellite> {
    satellites: SatelliteRepository<S>,
    value_hash_function: HashFunction<S::ValueHash>,
    hashes: ValueHashes<S::Reference, S::ValueHash>,
}

impl<S: ValueHashedSatellite> ValueHashedSatelliteRepository<S> {
    /// Seeds `cache` with the latest stored hash per reference unless
    /// another repository did so before.
    pub fn new(
        store: Arc<dyn SatelliteStore<S>>,
        hash_function: HashFunction<S::Reference>,
        value_hash_function: HashFunction<S::ValueHash>,
        cache: ValueHashCache<S::Reference, S::ValueHash>,
    ) -> RepoResult<Self> {
        if cache.is_initialized(S::KIND) {
            debug!(kind = %S::KIND, "value hash cache already initialized; reusing shared hashes");
        } else {
            let latest: HashMap<S::Reference, S::ValueHash> = store
                .latest_per_reference()?
                .into_iter()
                .filter_map(|row| Some((row.reference()?.clone(), row.value_hash()?.clone())))
                .collect();
            cache.initialize(S::KIND, latest)?;
        }
        Ok(Self {
            hashes: cache.get_values(S::KIND)?,
            satellites: SatelliteRepository::new(store, hash_function),
            value_hash_function,
        })
    }

    /// The value hash of `satellite`'s current values.
    pub fn calculate_value_hash(&self, satellite: &S) -> S::ValueHash {
        self.value_hash_function.hash(&satellite.value_string())
    }

    /// Assign the reference (if missing) and the value hash.
    pub fn calculate_hashes(&self, satellite: S) -> S {
        let mut satellite = self.satellites.calculate_hashes(satellite);
        let value_hash = self.calculate_value_hash(&satellite);
        satellite.set_value_hash(value_hash);
        satellite
    }

    fn stage(&self, satellite: S, load_date: LoadDate, metadata: &LoadMetadata) -> Inserted<S> {
        let mut satellite = self.satellites.prepare(satellite, load_date, metadata);
        let reference = self.satellites.calculate_hash(&satellite);
        let value_hash = self.calculate_value_hash(&satellite);
        satellite.set_value_hash(value_hash.clone());

        let change = self.hashes.replace_if_changed(reference.clone(), value_hash);
        if change.requires_write() {
            Inserted::written(satellite)
        } else {
            trace!(kind = %S::KIND, reference = ?reference, "values unchanged; skipping insert");
            Inserted::skipped(satellite)
        }
    }

    pub fn insert(&self, satellite: S, load_date: LoadDate) -> RepoResult<Inserted<S>> {
        self.insert_with(satellite, load_date, &LoadMetadata::none())
    }

    pub fn insert_with(
        &self,
        satellite: S,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Inserted<S>> {
        let inserted = self.stage(satellite, load_date, metadata);
        if inserted.is_written() {
            self.satellites.satellite_store().insert(&inserted.record)?;
        }
        Ok(inserted)
    }

    pub fn insert_many(
        &self,
        satellites: impl IntoIterator<Item = S>,
        load_date: LoadDate,
    ) -> RepoResult<Vec<Inserted<S>>> {
        self.insert_many_with(satellites, load_date, &LoadMetadata::none())
    }

    pub fn insert_many_with(
        &self,
        satellites: impl IntoIterator<Item = S>,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Vec<Inserted<S>>> {
        let staged: Vec<Inserted<S>> = satellites
            .into_iter()
            .map(|s| self.stage(s, load_date, metadata))
            .collect();
        write_staged(self.satellites.satellite_store(), &staged)?;
        Ok(staged)
    }

    /// All rows of `reference`, oldest first.
    pub fn history(&self, reference: &S::Reference) -> RepoResult<Vec<S>> {
        self.satellites.history(reference)
    }
}

impl<S: ValueHashedSatellite> Repository<S> for ValueHashedSatelliteRepository<S> {
    type Store = dyn SatelliteStore<S>;

    fn store(&self) -> &Self::Store {
        self.satellites.satellite_store()
    }

    fn get_current(&self) -> RepoResult<Vec<S>> {
        self.satellites.get_current()
    }
}
