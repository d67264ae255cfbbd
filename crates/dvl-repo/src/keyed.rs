use std::sync::Arc;

use dvl_cache::KeySet;
use dvl_store::RecordStore;
use dvl_types::{DataVaultObject, HashFunction, LoadDate, LoadMetadata};
use tracing::trace;

use crate::config::{KeyCaching, RepositoryContext};
use crate::error::{RepoError, RepoResult};
use crate::outcome::Inserted;
use crate::repository::attach_key_set;

/// Insert engine shared by hubs and links: hash the business key, then
/// write unless the key cache has seen the key before.
pub(crate) struct KeyedWriter<R: DataVaultObject> {
    store: Arc<dyn RecordStore<R>>,
    hash_function: HashFunction<R::Key>,
    keys: Option<KeySet<R::Key>>,
    assign: fn(&mut R, R::Key),
}

impl<R: DataVaultObject> KeyedWriter<R> {
    pub(crate) fn new(
        store: Arc<dyn RecordStore<R>>,
        context: &RepositoryContext<R::Key>,
        assign: fn(&mut R, R::Key),
    ) -> RepoResult<Self> {
        let hash_function = context
            .hash_function
            .clone()
            .ok_or(RepoError::MissingHashFunction)?;
        let keys = attach_key_set(R::KIND, context.key_cache.as_ref(), &context.config, || {
            store.distinct_keys()
        })?;
        Ok(Self {
            store,
            hash_function,
            keys,
            assign,
        })
    }

    pub(crate) fn store(&self) -> &(dyn RecordStore<R> + 'static) {
        self.store.as_ref()
    }

    pub(crate) fn key_caching(&self) -> KeyCaching {
        if self.keys.is_some() {
            KeyCaching::Enabled
        } else {
            KeyCaching::Disabled
        }
    }

    pub(crate) fn calculate_hash(&self, record: &R) -> R::Key {
        self.hash_function.hash(&record.business_key_string())
    }

    pub(crate) fn calculate_hashes(&self, mut record: R) -> R {
        let key = self.calculate_hash(&record);
        (self.assign)(&mut record, key);
        record
    }

    /// Stamp and key `record`, and decide whether it has to be written.
    ///
    /// The cache is updated here, before anything reaches storage.
    pub(crate) fn stage(
        &self,
        mut record: R,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> Inserted<R> {
        metadata.stamp(&mut record, load_date);
        let key = self.calculate_hash(&record);
        (self.assign)(&mut record, key.clone());
        match &self.keys {
            Some(keys) if !keys.insert(key.clone()) => {
                trace!(kind = %R::KIND, key = ?key, "key already cached; skipping insert");
                Inserted::skipped(record)
            }
            _ => Inserted::written(record),
        }
    }

    pub(crate) fn insert_with(
        &self,
        record: R,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Inserted<R>> {
        let inserted = self.stage(record, load_date, metadata);
        if inserted.is_written() {
            self.store.insert(&inserted.record)?;
        }
        Ok(inserted)
    }

    pub(crate) fn insert_many_with(
        &self,
        records: impl IntoIterator<Item = R>,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Vec<Inserted<R>>> {
        let staged: Vec<Inserted<R>> = records
            .into_iter()
            .map(|record| self.stage(record, load_date, metadata))
            .collect();
        write_staged(self.store.as_ref(), &staged)?;
        Ok(staged)
    }
}

/// Write every staged record marked as written, in one batch.
pub(crate) fn write_staged<R, St>(store: &St, staged: &[Inserted<R>]) -> RepoResult<()>
where
    R: DataVaultObject,
    St: RecordStore<R> + ?Sized,
{
    let batch: Vec<R> = staged
        .iter()
        .filter(|inserted| inserted.is_written())
        .map(|inserted| inserted.record.clone())
        .collect();
    if !batch.is_empty() {
        store.insert_batch(&batch)?;
    }
    Ok(())
}
