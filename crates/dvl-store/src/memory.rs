use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use chrono::{DateTime, Utc};
use dvl_types::{DataVaultObject, RecordKey, Satellite, SatelliteKey};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{RecordStore, SatelliteStore, UnitOfWork};

/// A table taking part in the shared transaction.
trait Participant: Send + Sync {
    /// Remember the current rows.
    fn checkpoint(&self);
    /// Go back to the remembered rows.
    fn restore(&self);
    /// Forget the remembered rows.
    fn release(&self);
}

#[derive(Default)]
struct CoordinatorState {
    active: bool,
    participants: Vec<Weak<dyn Participant>>,
}

impl CoordinatorState {
    fn for_each(&self, f: impl Fn(&dyn Participant)) {
        for participant in self.participants.iter().filter_map(Weak::upgrade) {
            f(participant.as_ref());
        }
    }
}

/// Snapshot-based unit of work shared by all tables of one database.
#[derive(Default)]
struct Coordinator {
    state: Mutex<CoordinatorState>,
}

impl Coordinator {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, participant: Weak<dyn Participant>) {
        let mut state = self.lock();
        if state.active {
            if let Some(table) = participant.upgrade() {
                table.checkpoint();
            }
        }
        state.participants.retain(|p| p.strong_count() > 0);
        state.participants.push(participant);
    }
}

impl UnitOfWork for Coordinator {
    fn begin(&self) -> StoreResult<()> {
        let mut state = self.lock();
        if state.active {
            return Err(StoreError::TransactionActive);
        }
        state.for_each(|table| table.checkpoint());
        state.active = true;
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.active {
            return Err(StoreError::NoTransaction);
        }
        state.for_each(|table| table.release());
        state.active = false;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.active {
            return Err(StoreError::NoTransaction);
        }
        state.for_each(|table| table.restore());
        state.active = false;
        debug!(tables = state.participants.len(), "in-memory transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.lock().active
    }
}

/// In-memory database: a factory for tables that share one transaction.
///
/// Intended for tests and embedding. Clones share the same coordinator.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    coordinator: Arc<Coordinator>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty table for `R` in this database.
    pub fn table<R: DataVaultObject>(&self) -> Arc<InMemoryTable<R>> {
        let table = Arc::new(InMemoryTable {
            rows: RwLock::new(BTreeMap::new()),
            checkpoint: Mutex::new(None),
            coordinator: Arc::clone(&self.coordinator),
        });
        let participant: Arc<dyn Participant> = table.clone();
        self.coordinator.register(Arc::downgrade(&participant));
        table
    }

    /// The unit of work shared by every table of this database.
    pub fn unit_of_work(&self) -> Arc<dyn UnitOfWork> {
        self.coordinator.clone()
    }
}

impl fmt::Debug for InMemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDatabase")
            .field("in_transaction", &self.coordinator.in_transaction())
            .finish()
    }
}

/// In-memory, `BTreeMap`-based table of one record shape.
///
/// Rows are ordered by primary key, so satellite rows of one reference are
/// adjacent and chronological. Rows are cloned on read and write.
pub struct InMemoryTable<R: DataVaultObject> {
    rows: RwLock<BTreeMap<R::Key, R>>,
    checkpoint: Mutex<Option<BTreeMap<R::Key, R>>>,
    coordinator: Arc<Coordinator>,
}

impl<R: DataVaultObject> InMemoryTable<R> {
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<R::Key, R>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<R::Key, R>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn saved(&self) -> MutexGuard<'_, Option<BTreeMap<R::Key, R>>> {
        self.checkpoint.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove all rows. Not transactional.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn violation(key: &R::Key) -> StoreError {
        StoreError::ConstraintViolation {
            kind: R::KIND,
            key: format!("{key:?}"),
        }
    }
}

impl<R: DataVaultObject> Participant for InMemoryTable<R> {
    fn checkpoint(&self) {
        let rows = self.read().clone();
        *self.saved() = Some(rows);
    }

    fn restore(&self) {
        if let Some(rows) = self.saved().take() {
            *self.write() = rows;
        }
    }

    fn release(&self) {
        self.saved().take();
    }
}

impl<R: DataVaultObject> RecordStore<R> for InMemoryTable<R> {
    fn insert_batch(&self, records: &[R]) -> StoreResult<()> {
        let mut rows = self.write();
        let mut staged = BTreeMap::new();
        for record in records {
            let key = record
                .primary_key()
                .ok_or(StoreError::MissingKey { kind: R::KIND })?;
            if rows.contains_key(&key) || staged.contains_key(&key) {
                return Err(Self::violation(&key));
            }
            staged.insert(key, record.clone());
        }
        rows.append(&mut staged);
        Ok(())
    }

    fn update_batch(&self, records: &[R]) -> StoreResult<()> {
        let mut rows = self.write();
        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let key = record
                .primary_key()
                .ok_or(StoreError::MissingKey { kind: R::KIND })?;
            if !rows.contains_key(&key) {
                return Err(StoreError::NotFound {
                    kind: R::KIND,
                    key: format!("{key:?}"),
                });
            }
            staged.push((key, record.clone()));
        }
        rows.extend(staged);
        Ok(())
    }

    fn get(&self, key: &R::Key) -> StoreResult<Option<R>> {
        Ok(self.read().get(key).cloned())
    }

    fn scan(&self) -> StoreResult<Vec<R>> {
        Ok(self.read().values().cloned().collect())
    }

    fn unit_of_work(&self) -> Arc<dyn UnitOfWork> {
        self.coordinator.clone()
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }
}

impl<S, Ref> SatelliteStore<S> for InMemoryTable<S>
where
    Ref: RecordKey,
    S: Satellite<Reference = Ref, Key = SatelliteKey<Ref>>,
{
    fn history(&self, reference: &Ref) -> StoreResult<Vec<S>> {
        let first = SatelliteKey::new(reference.clone(), DateTime::<Utc>::MIN_UTC);
        let last = SatelliteKey::new(reference.clone(), DateTime::<Utc>::MAX_UTC);
        Ok(self.read().range(first..=last).map(|(_, row)| row.clone()).collect())
    }

    fn most_recent(&self, reference: &Ref) -> StoreResult<Option<S>> {
        let first = SatelliteKey::new(reference.clone(), DateTime::<Utc>::MIN_UTC);
        let last = SatelliteKey::new(reference.clone(), DateTime::<Utc>::MAX_UTC);
        Ok(self
            .read()
            .range(first..=last)
            .next_back()
            .map(|(_, row)| row.clone()))
    }
}

impl<R: DataVaultObject> fmt::Debug for InMemoryTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTable")
            .field("kind", &R::KIND)
            .field("rows", &self.len())
            .finish()
    }
}
