use std::sync::Arc;

use dvl_store::RecordStore;
use dvl_types::{Link, LoadDate, LoadMetadata};

use crate::config::{KeyCaching, RepositoryContext};
use crate::error::RepoResult;
use crate::keyed::KeyedWriter;
use crate::outcome::Inserted;
use crate::repository::Repository;

/// Repository for links.
///
/// Keys are the hash of the concatenated keys of the related hubs or links,
/// as returned by the link's business-key string. Deduplication works as for
/// hubs.
pub struct LinkRepository<L: Link> {
    writer: KeyedWriter<L>,
}

impl<L: Link> LinkRepository<L> {
    pub fn new(
        store: Arc<dyn RecordStore<L>>,
        context: RepositoryContext<L::Key>,
    ) -> RepoResult<Self> {
        Ok(Self {
            writer: KeyedWriter::new(store, &context, L::set_primary_key)?,
        })
    }

    pub(crate) fn writer(&self) -> &KeyedWriter<L> {
        &self.writer
    }

    pub fn key_caching(&self) -> KeyCaching {
        self.writer.key_caching()
    }

    pub fn calculate_hash(&self, link: &L) -> L::Key {
        self.writer.calculate_hash(link)
    }

    pub fn calculate_hashes(&self, link: L) -> L {
        self.writer.calculate_hashes(link)
    }

    pub fn insert(&self, link: L, load_date: LoadDate) -> RepoResult<Inserted<L>> {
        self.insert_with(link, load_date, &LoadMetadata::none())
    }

    pub fn insert_with(
        &self,
        link: L,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Inserted<L>> {
        self.writer.insert_with(link, load_date, metadata)
    }

    pub fn insert_many(
        &self,
        links: impl IntoIterator<Item = L>,
        load_date: LoadDate,
    ) -> RepoResult<Vec<Inserted<L>>> {
        self.insert_many_with(links, load_date, &LoadMetadata::none())
    }

    pub fn insert_many_with(
        &self,
        links: impl IntoIterator<Item = L>,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Vec<Inserted<L>>> {
        self.writer.insert_many_with(links, load_date, metadata)
    }
}

impl<L: Link> Repository<L> for LinkRepository<L> {
    type Store = dyn RecordStore<L>;

    fn store(&self) -> &Self::Store {
        self.writer.store()
    }
}
