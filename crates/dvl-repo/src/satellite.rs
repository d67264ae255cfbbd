use std::sync::Arc;

use dvl_store::SatelliteStore;
use dvl_types::{HashFunction, LoadDate, LoadMetadata, Satellite};

use crate::error::RepoResult;
use crate::keyed::write_staged;
use crate::outcome::Inserted;
use crate::repository::Repository;

/// Repository for plain satellites.
///
/// Every insert appends a row. Two inserts for one reference with the same
/// load date collide on the (reference, load date) key; the storage error
/// is returned unchanged.
pub struct SatelliteRepository<S: Satellite> {
    store: Arc<dyn SatelliteStore<S>>,
    hash_function: HashFunction<S::Reference>,
}

impl<S: Satellite> SatelliteRepository<S> {
    /// `hash_function` derives the reference from the business-key string
    /// of satellites inserted without one.
    pub fn new(
        store: Arc<dyn SatelliteStore<S>>,
        hash_function: HashFunction<S::Reference>,
    ) -> Self {
        Self {
            store,
            hash_function,
        }
    }

    /// The reference of `satellite`: the preset one, or the hash of its
    /// business-key string.
    pub fn calculate_hash(&self, satellite: &S) -> S::Reference {
        match satellite.reference() {
            Some(reference) => reference.clone(),
            None => self.hash_function.hash(&satellite.business_key_string()),
        }
    }

    /// Assign the reference of `satellite` if it has none.
    pub fn calculate_hashes(&self, mut satellite: S) -> S {
        if satellite.reference().is_none() {
            let reference = self.calculate_hash(&satellite);
            satellite.set_reference(reference);
        }
        satellite
    }

    pub(crate) fn prepare(
        &self,
        mut satellite: S,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> S {
        metadata.stamp(&mut satellite, load_date);
        self.calculate_hashes(satellite)
    }

    pub(crate) fn satellite_store(&self) -> &(dyn SatelliteStore<S> + 'static) {
        self.store.as_ref()
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
        let satellite = self.prepare(satellite, load_date, metadata);
        self.store.insert(&satellite)?;
        Ok(Inserted::written(satellite))
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
            .map(|s| Inserted::written(self.prepare(s, load_date, metadata)))
            .collect();
        write_staged(self.store.as_ref(), &staged)?;
        Ok(staged)
    }

    /// All rows of `reference`, oldest first.
    pub fn history(&self, reference: &S::Reference) -> RepoResult<Vec<S>> {
        Ok(self.store.history(reference)?)
    }
}

impl<S: Satellite> Repository<S> for SatelliteRepository<S> {
    type Store = dyn SatelliteStore<S>;

    fn store(&self) -> &Self::Store {
        self.store.as_ref()
    }

    /// The most recent row per reference.
    fn get_current(&self) -> RepoResult<Vec<S>> {
        Ok(self.store.latest_per_reference()?)
    }
}
