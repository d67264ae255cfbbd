use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dvl_types::{DataVaultObject, Satellite};

use crate::error::StoreResult;

/// Groups writes into one atomic unit.
///
/// Implementations allow one active transaction at a time.
pub trait UnitOfWork: Send + Sync {
    /// Start a transaction. Fails with `TransactionActive` if one is running.
    fn begin(&self) -> StoreResult<()>;

    /// Make every write since `begin` permanent.
    fn commit(&self) -> StoreResult<()>;

    /// Discard every write since `begin`.
    fn rollback(&self) -> StoreResult<()>;

    fn in_transaction(&self) -> bool;
}

/// Rows of one record shape, keyed by primary key.
///
/// All implementations must satisfy these invariants:
/// - Primary keys are unique. Inserting an existing key fails with
///   `ConstraintViolation` and writes nothing.
/// - A batch insert is all-or-nothing, including duplicates inside the
///   batch itself.
/// - Records without a primary key are rejected with `MissingKey`.
pub trait RecordStore<R: DataVaultObject>: Send + Sync {
    /// Append rows as one write.
    fn insert_batch(&self, records: &[R]) -> StoreResult<()>;

    /// Replace existing rows by primary key.
    ///
    /// Fails with `NotFound` (writing nothing) if any key is absent.
    fn update_batch(&self, records: &[R]) -> StoreResult<()>;

    /// Point read by primary key.
    fn get(&self, key: &R::Key) -> StoreResult<Option<R>>;

    /// Every stored row, ordered by primary key.
    fn scan(&self) -> StoreResult<Vec<R>>;

    /// The unit of work writes to this store take part in.
    fn unit_of_work(&self) -> Arc<dyn UnitOfWork>;

    /// Append one row.
    fn insert(&self, record: &R) -> StoreResult<()> {
        self.insert_batch(std::slice::from_ref(record))
    }

    /// Distinct primary keys of all stored rows.
    ///
    /// The bulk read used to seed a key cache.
    fn distinct_keys(&self) -> StoreResult<HashSet<R::Key>> {
        Ok(self
            .scan()?
            .iter()
            .filter_map(DataVaultObject::primary_key)
            .collect())
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.scan()?.len() as u64)
    }
}

/// History queries over satellite rows.
///
/// Default methods are written against [`RecordStore::scan`]; backends with
/// ordered keys may override them.
pub trait SatelliteStore<S: Satellite>: RecordStore<S> {
    /// All rows of `reference`, oldest first.
    fn history(&self, reference: &S::Reference) -> StoreResult<Vec<S>> {
        let mut rows: Vec<S> = self
            .scan()?
            .into_iter()
            .filter(|row| row.reference() == Some(reference))
            .collect();
        rows.sort_by_key(DataVaultObject::load_date);
        Ok(rows)
    }

    /// The row of `reference` with the greatest load date.
    fn most_recent(&self, reference: &S::Reference) -> StoreResult<Option<S>> {
        Ok(self.history(reference)?.pop())
    }

    /// The most recent row of every reference, ordered by reference.
    fn latest_per_reference(&self) -> StoreResult<Vec<S>> {
        let mut latest: BTreeMap<S::Reference, S> = BTreeMap::new();
        for row in self.scan()? {
            let Some(reference) = row.reference().cloned() else {
                continue;
            };
            match latest.get(&reference) {
                Some(current) if current.load_date() >= row.load_date() => {}
                _ => {
                    latest.insert(reference, row);
                }
            }
        }
        Ok(latest.into_values().collect())
    }
}
