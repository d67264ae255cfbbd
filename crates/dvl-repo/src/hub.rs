use std::sync::Arc;

use dvl_store::RecordStore;
use dvl_types::{Hub, LoadDate, LoadMetadata};

use crate::config::{KeyCaching, RepositoryContext};
use crate::error::RepoResult;
use crate::keyed::KeyedWriter;
use crate::outcome::Inserted;
use crate::repository::Repository;

/// Repository for hubs.
///
/// With key caching enabled, a hub whose business key was seen before (in
/// this process, or in storage when the cache was seeded) is never written
/// twice and never fails.
pub struct HubRepository<H: Hub> {
    writer: KeyedWriter<H>,
}

impl<H: Hub> HubRepository<H> {
    /// Fails with `MissingHashFunction` or `MissingKeyCache` on bad wiring.
    /// Seeds the shared key cache from storage if it is not seeded yet.
    pub fn new(
        store: Arc<dyn RecordStore<H>>,
        context: RepositoryContext<H::Key>,
    ) -> RepoResult<Self> {
        Ok(Self {
            writer: KeyedWriter::new(store, &context, H::set_primary_key)?,
        })
    }

    pub fn key_caching(&self) -> KeyCaching {
        self.writer.key_caching()
    }

    /// The key `hub` would get, without assigning it.
    pub fn calculate_hash(&self, hub: &H) -> H::Key {
        self.writer.calculate_hash(hub)
    }

    /// Compute and assign the key of `hub`.
    pub fn calculate_hashes(&self, hub: H) -> H {
        self.writer.calculate_hashes(hub)
    }

    pub fn insert(&self, hub: H, load_date: LoadDate) -> RepoResult<Inserted<H>> {
        self.insert_with(hub, load_date, &LoadMetadata::none())
    }

    pub fn insert_with(
        &self,
        hub: H,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Inserted<H>> {
        self.writer.insert_with(hub, load_date, metadata)
    }

    /// Insert several hubs with one storage write.
    pub fn insert_many(
        &self,
        hubs: impl IntoIterator<Item = H>,
        load_date: LoadDate,
    ) -> RepoResult<Vec<Inserted<H>>> {
        self.insert_many_with(hubs, load_date, &LoadMetadata::none())
    }

    pub fn insert_many_with(
        &self,
        hubs: impl IntoIterator<Item = H>,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Vec<Inserted<H>>> {
        self.writer.insert_many_with(hubs, load_date, metadata)
    }
}

impl<H: Hub> Repository<H> for HubRepository<H> {
    type Store = dyn RecordStore<H>;

    fn store(&self) -> &Self::Store {
        self.writer.store()
    }
}
