//! Open/close state machine for removable links.
//!
//! Per link key the timeline moves Unseen → Open → Closed → Open → … Open
//! means the most recent timeline row has no end date. At most one row per
//! link key is open at any time; opening an open link and closing a closed
//! (or unknown) link are no-ops.
//!
//! With key caching enabled two namespaces of the shared [`KeyCache`] are
//! used: the link's own kind holds every link key ever written, the
//! timeline satellite's kind holds the keys that are currently open.
//! Without caching, the most recent timeline row is read from storage for
//! every transition.
//!
//! [`KeyCache`]: dvl_cache::KeyCache

use std::collections::HashSet;
use std::sync::Arc;

use dvl_cache::KeySet;
use dvl_store::{RecordStore, SatelliteStore, StoreResult};
use dvl_types::{DataVaultObject, LoadDate, LoadMetadata, TimelineLink, TimelineSatellite};
use tracing::{trace, warn};

use crate::config::{KeyCaching, RepositoryContext};
use crate::error::{RepoError, RepoResult};
use crate::link::LinkRepository;
use crate::outcome::Inserted;
use crate::repository::{atomically, attach_namespace, Repository};

/// Repository for links whose validity is tracked by a timeline satellite.
pub struct LinkTimelineRepository<L: TimelineLink> {
    links: LinkRepository<L>,
    timeline: Arc<dyn SatelliteStore<L::Timeline>>,
    open: Option<KeySet<L::Key>>,
}

/// References whose most recent timeline row is open.
fn open_references<T: TimelineSatellite>(
    store: &dyn SatelliteStore<T>,
) -> StoreResult<HashSet<T::Reference>> {
    Ok(store
        .latest_per_reference()?
        .into_iter()
        .filter(TimelineSatellite::is_open)
        .filter_map(|row| row.reference().cloned())
        .collect())
}

impl<L: TimelineLink> LinkTimelineRepository<L> {
    /// Both cache namespaces are seeded independently: a namespace another
    /// repository already seeded is reused as is.
    pub fn new(
        links: Arc<dyn RecordStore<L>>,
        timeline: Arc<dyn SatelliteStore<L::Timeline>>,
        context: RepositoryContext<L::Key>,
    ) -> RepoResult<Self> {
        let caching = context.config.key_caching;
        let cache = context.key_cache.clone();
        let links = LinkRepository::new(links, context)?;
        let open = match (caching, cache) {
            (KeyCaching::Disabled, _) => None,
            (KeyCaching::Enabled, None) => {
                return Err(RepoError::MissingKeyCache { kind: L::KIND })
            }
            (KeyCaching::Enabled, Some(cache)) => Some(attach_namespace(
                <L::Timeline as DataVaultObject>::KIND,
                &cache,
                || open_references(timeline.as_ref()),
            )?),
        };
        Ok(Self {
            links,
            timeline,
            open,
        })
    }

    pub fn key_caching(&self) -> KeyCaching {
        self.links.key_caching()
    }

    /// The key of `link`: its primary key, or the hash of its business-key
    /// string if it was never keyed.
    pub fn link_key(&self, link: &L) -> L::Key {
        link.primary_key().unwrap_or_else(|| self.calculate_hash(link))
    }

    pub fn calculate_hash(&self, link: &L) -> L::Key {
        self.links.calculate_hash(link)
    }

    pub fn calculate_hashes(&self, link: L) -> L {
        self.links.calculate_hashes(link)
    }

    /// All timeline rows of `key`, oldest first.
    pub fn timeline(&self, key: &L::Key) -> RepoResult<Vec<L::Timeline>> {
        Ok(self.timeline.history(key)?)
    }

    /// Whether `key` has an open period in storage.
    pub fn is_open(&self, key: &L::Key) -> RepoResult<bool> {
        Ok(self
            .timeline
            .most_recent(key)?
            .is_some_and(|row| row.is_open()))
    }

    /// The open-period row to write for `key`, if the link is not open yet.
    fn stage_open(
        &self,
        key: &L::Key,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Option<L::Timeline>> {
        let already_open = match &self.open {
            Some(open) => !open.insert(key.clone()),
            None => self
                .timeline
                .most_recent(key)?
                .is_some_and(|row| row.is_open()),
        };
        if already_open {
            trace!(kind = %L::KIND, key = ?key, "link already open; timeline unchanged");
            return Ok(None);
        }
        let mut row = <L::Timeline as TimelineSatellite>::open(key.clone(), load_date);
        metadata.stamp(&mut row, load_date);
        Ok(Some(row))
    }

    /// The open row of `key` with its end date set, if the link is open.
    fn stage_close(
        &self,
        key: &L::Key,
        removal_date: LoadDate,
    ) -> RepoResult<Option<L::Timeline>> {
        if let Some(open) = &self.open {
            if !open.remove(key) {
                trace!(kind = %L::KIND, key = ?key, "link not open; nothing to close");
                return Ok(None);
            }
        }
        match self.timeline.most_recent(key)? {
            Some(mut row) if row.is_open() => {
                row.set_end_date(Some(removal_date));
                Ok(Some(row))
            }
            current if self.open.is_some() => {
                warn!(
                    kind = %L::KIND,
                    key = ?key,
                    stored = current.is_some(),
                    "open-link cache has no matching open timeline row in storage; skipping close"
                );
                Ok(None)
            }
            _ => {
                trace!(kind = %L::KIND, key = ?key, "link not open; nothing to close");
                Ok(None)
            }
        }
    }

    /// Insert `link` and open its period unless it is open already.
    ///
    /// The outcome is `Written` if the link row or a timeline row was
    /// written.
    pub fn insert(&self, link: L, load_date: LoadDate) -> RepoResult<Inserted<L>> {
        self.insert_with(link, load_date, &LoadMetadata::none())
    }

    pub fn insert_with(
        &self,
        link: L,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Inserted<L>> {
        let mut inserted = self.insert_many_with([link], load_date, metadata)?;
        Ok(inserted.remove(0))
    }

    pub fn insert_many(
        &self,
        links: impl IntoIterator<Item = L>,
        load_date: LoadDate,
    ) -> RepoResult<Vec<Inserted<L>>> {
        self.insert_many_with(links, load_date, &LoadMetadata::none())
    }

    /// Link rows and timeline rows are each written in one batch, inside
    /// one unit of work.
    pub fn insert_many_with(
        &self,
        links: impl IntoIterator<Item = L>,
        load_date: LoadDate,
        metadata: &LoadMetadata,
    ) -> RepoResult<Vec<Inserted<L>>> {
        let writer = self.links.writer();
        let mut results = Vec::new();
        let mut new_links = Vec::new();
        let mut opened = Vec::new();

        for link in links {
            let inserted = writer.stage(link, load_date, metadata);
            let key = self.link_key(&inserted.record);
            let row = self.stage_open(&key, load_date, metadata)?;
            if inserted.is_written() {
                new_links.push(inserted.record.clone());
            }
            results.push(match row {
                Some(row) => {
                    opened.push(row);
                    Inserted::written(inserted.record)
                }
                None => inserted,
            });
        }

        atomically(writer.store().unit_of_work(), || {
            if !new_links.is_empty() {
                writer.store().insert_batch(&new_links)?;
            }
            if !opened.is_empty() {
                self.timeline.insert_batch(&opened)?;
            }
            Ok(())
        })?;
        Ok(results)
    }

    /// Close the period of `link` at `removal_date`.
    ///
    /// Returns `false` (and writes nothing) if the link was not open.
    pub fn remove_link(&self, link: &L, removal_date: LoadDate) -> RepoResult<bool> {
        self.remove_key(&self.link_key(link), removal_date)
    }

    pub fn remove_key(&self, key: &L::Key, removal_date: LoadDate) -> RepoResult<bool> {
        match self.stage_close(key, removal_date)? {
            Some(row) => {
                self.write_closed(std::slice::from_ref(&row))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close the periods of all `links` at `removal_date` with one write.
    ///
    /// A link listed more than once is closed once. Returns the number of
    /// periods closed.
    pub fn remove_links<'a>(
        &self,
        links: impl IntoIterator<Item = &'a L>,
        removal_date: LoadDate,
    ) -> RepoResult<usize> {
        let mut seen = HashSet::new();
        let mut closed = Vec::new();
        for link in links {
            let key = self.link_key(link);
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(row) = self.stage_close(&key, removal_date)? {
                closed.push(row);
            }
        }
        self.write_closed(&closed)?;
        Ok(closed.len())
    }

    fn write_closed(&self, closed: &[L::Timeline]) -> RepoResult<()> {
        if closed.is_empty() {
            return Ok(());
        }
        atomically(self.timeline.unit_of_work(), || {
            Ok(self.timeline.update_batch(closed)?)
        })
    }
}

impl<L: TimelineLink> Repository<L> for LinkTimelineRepository<L> {
    type Store = dyn RecordStore<L>;

    fn store(&self) -> &Self::Store {
        self.links.writer().store()
    }

    /// Links whose most recent timeline row is open.
    fn get_current(&self) -> RepoResult<Vec<L>> {
        let open = open_references(self.timeline.as_ref())?;
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|link| link.primary_key().is_some_and(|key| open.contains(&key)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::outcome::InsertOutcome;
    use crate::LinkRepository;
    use dvl_cache::KeyCache;
    use dvl_store::{InMemoryDatabase, InMemoryTable};
    use proptest::prelude::*;

    type Repo = LinkTimelineRepository<CustomerOrderLink>;

    struct Fixture {
        db: InMemoryDatabase,
        links: Arc<InMemoryTable<CustomerOrderLink>>,
        timeline: Arc<InMemoryTable<CustomerOrderTimeline>>,
        cache: KeyCache<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let db = InMemoryDatabase::new();
            Self {
                links: db.table::<CustomerOrderLink>(),
                timeline: db.table::<CustomerOrderTimeline>(),
                db,
                cache: KeyCache::new(),
            }
        }

        fn repo(&self, caching: KeyCaching) -> Repo {
            let context = match caching {
                KeyCaching::Enabled => RepositoryContext::cached(link_hash(), self.cache.clone()),
                KeyCaching::Disabled => RepositoryContext::new(link_hash()),
            };
            Repo::new(self.links.clone(), self.timeline.clone(), context).unwrap()
        }
    }

    const MODES: [KeyCaching; 2] = [KeyCaching::Enabled, KeyCaching::Disabled];

    fn link(order: &str) -> CustomerOrderLink {
        CustomerOrderLink::new("CUST-1", order)
    }

    fn end_dates(repo: &Repo, key: &String) -> Vec<Option<LoadDate>> {
        repo.timeline(key)
            .unwrap()
            .iter()
            .map(|row| row.end_date)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Open / close / reopen
    // -----------------------------------------------------------------------

    #[test]
    fn open_close_reopen_cycle() {
        init_tracing();
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Enabled);
        let l = link("ORD-1");
        let key = repo.link_key(&l);

        repo.insert(l.clone(), t(0)).unwrap();
        assert!(repo.remove_link(&l, t(1)).unwrap());
        repo.insert(l.clone(), t(2)).unwrap();
        assert!(repo.remove_link(&l, t(3)).unwrap());

        let rows = repo.timeline(&key).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].load_date, t(0));
        assert_eq!(rows[0].end_date, Some(t(1)));
        assert_eq!(rows[1].load_date, t(2));
        assert_eq!(rows[1].end_date, Some(t(3)));
        assert_eq!(fixture.links.len(), 1);
    }

    #[test]
    fn opening_an_open_link_is_a_noop() {
        for mode in MODES {
            let fixture = Fixture::new();
            let repo = fixture.repo(mode);

            let first = repo.insert(link("ORD-1"), t(0)).unwrap();
            assert_eq!(first.outcome, InsertOutcome::Written);
            if mode.is_enabled() {
                let again = repo.insert(link("ORD-1"), t(1)).unwrap();
                assert_eq!(again.outcome, InsertOutcome::Skipped);
            }
            assert_eq!(fixture.timeline.len(), 1, "{mode:?}");
            assert_eq!(end_dates(&repo, &repo.link_key(&link("ORD-1"))), vec![None]);
        }
    }

    #[test]
    fn closing_a_closed_or_unknown_link_is_a_noop() {
        for mode in MODES {
            let fixture = Fixture::new();
            let repo = fixture.repo(mode);

            assert!(!repo.remove_link(&link("never"), t(0)).unwrap());
            assert!(fixture.timeline.is_empty());

            repo.insert(link("ORD-1"), t(1)).unwrap();
            assert!(repo.remove_link(&link("ORD-1"), t(2)).unwrap());
            assert!(!repo.remove_link(&link("ORD-1"), t(3)).unwrap());
            assert_eq!(
                end_dates(&repo, &repo.link_key(&link("ORD-1"))),
                vec![Some(t(2))],
                "{mode:?}"
            );
        }
    }

    #[test]
    fn uncached_close_ends_the_open_row() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Disabled);
        let key = repo.link_key(&link("ORD-1"));

        repo.insert(link("ORD-1"), t(0)).unwrap();
        assert!(repo.is_open(&key).unwrap());
        assert!(repo.remove_key(&key, t(4)).unwrap());
        assert!(!repo.is_open(&key).unwrap());
        assert_eq!(end_dates(&repo, &key), vec![Some(t(4))]);
    }

    #[test]
    fn uncached_duplicate_link_row_surfaces() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Disabled);
        repo.insert(link("ORD-1"), t(0)).unwrap();
        repo.remove_link(&link("ORD-1"), t(1)).unwrap();

        // Reopening writes the link row again, which storage rejects.
        let err = repo.insert(link("ORD-1"), t(2)).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Store(dvl_store::StoreError::ConstraintViolation { .. })
        ));
        // No new period was opened either.
        assert_eq!(fixture.timeline.len(), 1);
        assert!(!repo.is_open(&repo.link_key(&link("ORD-1"))).unwrap());
    }

    #[test]
    fn timeline_rows_carry_metadata() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Enabled);
        let metadata = LoadMetadata::none()
            .with_store(dvl_types::StoreLoadInfo::new("erp", "loader 2.1"));

        let inserted = repo.insert_with(link("ORD-1"), t(0), &metadata).unwrap();
        let rows = repo.timeline(inserted.record.key.as_ref().unwrap()).unwrap();
        assert_eq!(rows[0].loaded_by.as_deref(), Some("loader 2.1"));
    }

    // -----------------------------------------------------------------------
    // Cache initialization
    // -----------------------------------------------------------------------

    #[test]
    fn caches_seed_all_links_and_open_links() {
        init_tracing();
        let fixture = Fixture::new();
        {
            let loader = fixture.repo(KeyCaching::Disabled);
            loader.insert_many([link("open"), link("closed")], t(0)).unwrap();
            loader.remove_link(&link("closed"), t(1)).unwrap();
        }

        let repo = fixture.repo(KeyCaching::Enabled);
        let all = fixture.cache.get_keys(CustomerOrderLink::KIND).unwrap();
        let open = fixture.cache.get_keys(CustomerOrderTimeline::KIND).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(open.snapshot(), HashSet::from([repo.link_key(&link("open"))]));

        // Open link: nothing to do. Closed link: a fresh period.
        let open_again = repo.insert(link("open"), t(2)).unwrap();
        assert_eq!(open_again.outcome, InsertOutcome::Skipped);
        let reopened = repo.insert(link("closed"), t(2)).unwrap();
        assert_eq!(reopened.outcome, InsertOutcome::Written);
        assert_eq!(fixture.links.len(), 2);
        assert_eq!(fixture.timeline.len(), 3);
    }

    #[test]
    fn namespaces_are_seeded_independently() {
        let fixture = Fixture::new();
        let links = LinkRepository::<CustomerOrderLink>::new(
            fixture.links.clone(),
            RepositoryContext::cached(link_hash(), fixture.cache.clone()),
        )
        .unwrap();
        links.insert(link("ORD-1"), t(0)).unwrap();
        assert!(!fixture.cache.is_initialized(CustomerOrderTimeline::KIND));

        let repo = fixture.repo(KeyCaching::Enabled);
        assert!(fixture.cache.is_initialized(CustomerOrderTimeline::KIND));

        // The link row exists but has no period yet; inserting opens one.
        let inserted = repo.insert(link("ORD-1"), t(1)).unwrap();
        assert!(inserted.is_written());
        assert_eq!(fixture.links.len(), 1);
        assert_eq!(fixture.timeline.len(), 1);
    }

    #[test]
    fn caching_without_cache_fails_fast() {
        let fixture = Fixture::new();
        let context =
            RepositoryContext::new(link_hash()).with_config(crate::RepositoryConfig::cached());
        let err = Repo::new(fixture.links.clone(), fixture.timeline.clone(), context)
            .err()
            .unwrap();
        assert!(matches!(err, RepoError::MissingKeyCache { .. }));
    }

    #[test]
    fn cache_drift_skips_close() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Enabled);
        let key = repo.link_key(&link("ORD-1"));
        repo.insert(link("ORD-1"), t(0)).unwrap();

        // Someone else closed the row behind the cache's back.
        let mut row = repo.timeline(&key).unwrap().remove(0);
        row.end_date = Some(t(1));
        fixture.timeline.update_batch(&[row]).unwrap();

        assert!(!repo.remove_key(&key, t(2)).unwrap());
        assert_eq!(end_dates(&repo, &key), vec![Some(t(1))]);
    }

    // -----------------------------------------------------------------------
    // Batches and transactions
    // -----------------------------------------------------------------------

    #[test]
    fn remove_links_closes_each_open_link_once() {
        for mode in MODES {
            let fixture = Fixture::new();
            let repo = fixture.repo(mode);
            let links = [link("A"), link("B"), link("C")];
            repo.insert_many(links.clone(), t(0)).unwrap();
            repo.remove_link(&links[2], t(1)).unwrap();

            let closed = repo.remove_links(&links, t(2)).unwrap();
            assert_eq!(closed, 2, "{mode:?}");
            assert!(repo.get_current().unwrap().is_empty());
        }
    }

    #[test]
    fn repeated_link_in_batch_is_closed_once() {
        for mode in MODES {
            let fixture = Fixture::new();
            let repo = fixture.repo(mode);
            repo.insert(link("A"), t(0)).unwrap();

            let closed = repo.remove_links(&[link("A"), link("A")], t(1)).unwrap();
            assert_eq!(closed, 1, "{mode:?}");
            assert_eq!(fixture.timeline.len(), 1);
            assert_eq!(
                end_dates(&repo, &repo.link_key(&link("A"))),
                vec![Some(t(1))],
                "{mode:?}"
            );
            assert_eq!(repo.remove_links(&[link("A")], t(2)).unwrap(), 0, "{mode:?}");
        }
    }

    #[test]
    fn current_view_lists_open_links() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Enabled);
        repo.insert_many([link("A"), link("B")], t(0)).unwrap();
        repo.remove_link(&link("A"), t(1)).unwrap();

        let current = repo.get_current().unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].order, "B");
        assert_eq!(repo.get_all().unwrap().len(), 2);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn caller_transaction_is_joined() {
        let fixture = Fixture::new();
        let repo = fixture.repo(KeyCaching::Enabled);

        let result: RepoResult<()> = repo.execute_in_transaction(|| {
            repo.insert(link("A"), t(0))?;
            repo.remove_link(&link("A"), t(1))?;
            Err(RepoError::InvalidConfig("abort".into()))
        });
        assert!(result.is_err());
        assert!(fixture.links.is_empty());
        assert!(fixture.timeline.is_empty());
        assert!(!fixture.db.unit_of_work().in_transaction());
    }

    // -----------------------------------------------------------------------
    // At most one open period, for any sequence of transitions
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn at_most_one_open_period(
            cached in any::<bool>(),
            ops in proptest::collection::vec((any::<bool>(), 0usize..3), 1..40),
        ) {
            let fixture = Fixture::new();
            let mode = if cached { KeyCaching::Enabled } else { KeyCaching::Disabled };
            let repo = fixture.repo(mode);
            let links = [link("A"), link("B"), link("C")];
            let keys: Vec<String> = links.iter().map(|l| repo.link_key(l)).collect();
            let mut expected_open = [false; 3];
            // The disabled path writes link rows unconditionally.
            let mut link_written = [false; 3];

            for (step, (open, index)) in ops.into_iter().enumerate() {
                let at = t(step as i64);
                let rows_before = fixture.timeline.len();
                if open {
                    if !cached && link_written[index] {
                        continue;
                    }
                    repo.insert(links[index].clone(), at).unwrap();
                    link_written[index] = true;
                    let grew = if expected_open[index] { 0 } else { 1 };
                    prop_assert_eq!(fixture.timeline.len(), rows_before + grew);
                    expected_open[index] = true;
                } else {
                    let closed = repo.remove_link(&links[index], at).unwrap();
                    prop_assert_eq!(closed, expected_open[index]);
                    prop_assert_eq!(fixture.timeline.len(), rows_before);
                    expected_open[index] = false;
                }

                for (key, expected) in keys.iter().zip(expected_open) {
                    let open_rows = repo
                        .timeline(key)
                        .unwrap()
                        .iter()
                        .filter(|row| row.is_open())
                        .count();
                    prop_assert!(open_rows <= 1);
                    prop_assert_eq!(open_rows == 1, expected);
                }
            }
        }
    }
}
