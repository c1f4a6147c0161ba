//! Sorted-index backend
//!
//! Layout over a key / sorted-set engine:
//! - payloads: plain key `<id>` -> payload, written create-if-absent
//! - kind membership: sorted set `<kind>List`
//! - link membership: sorted set `<id>_<kind>Links`
//!
//! Listings are assembled from the engine's native set scan. A scan step
//! may return more or fewer members than asked for, so page size is a hint
//! here, not an exact contract.

use crate::kind::RecordKind;
use crate::pagination::{Cursor, Page};
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// Scan hint used when the caller asked for an unbounded page
pub const UNBOUNDED_SCAN_COUNT: usize = 1000;

/// Primitive operations of a key / sorted-set engine.
///
/// Mirrors the Redis commands the backend relies on: `SET NX`, `GET`,
/// `ZADD`, `ZSCORE` and `ZSCAN`. All members are stored with score 0.
///
/// Values and sets share one keyspace. Payloads live under the bare record
/// id, so an id equal to an index key (`<kind>List`, `..._<kind>Links`)
/// would make later set operations on that key fail with a type error.
/// `SortedIndexBackend::put` refuses such ids before writing anything.
pub trait SortedSetStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store `value` under `key` unless the key exists. Returns whether it was written.
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Add `member` to `set`, creating the set if needed. Idempotent.
    fn add_member(&self, set: &str, member: &str) -> Result<()>;

    fn is_member(&self, set: &str, member: &str) -> Result<bool>;

    /// One scan step starting at `cursor` with a `count` hint.
    ///
    /// Returns the next scan cursor (`0` once the scan is complete) and
    /// the members seen in this step. A missing set scans as empty.
    fn scan(&self, set: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>)>;
}

/// `StorageBackend` over any `SortedSetStore`
pub struct SortedIndexBackend<S> {
    store: S,
}

impl<S: SortedSetStore> SortedIndexBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    fn links_key(id: &str, kind: RecordKind) -> String {
        format!("{}_{}Links", id, kind.as_str())
    }

    /// Whether a payload stored under `id` would occupy an index key
    fn is_index_key(id: &str) -> bool {
        RecordKind::all().iter().any(|kind| {
            id == kind.list_key() || id.ends_with(&format!("_{}Links", kind.as_str()))
        })
    }

    /// Accumulate scan steps into one page.
    ///
    /// The caller's cursor is always scanned at least once, so a starting
    /// `0` means "from the beginning". A `0` handed back by the engine
    /// after that means the scan finished and becomes `next = None`.
    fn scan_page(&self, set: &str, cursor: Cursor, limit: Option<usize>) -> Result<Page> {
        let mut position = cursor.position();
        let mut ids = Vec::new();

        loop {
            let count = match limit {
                Some(limit) => limit.saturating_sub(ids.len()).max(1),
                None => UNBOUNDED_SCAN_COUNT,
            };
            let (next, batch) = self.store.scan(set, position, count)?;
            ids.extend(batch);

            if next == 0 {
                return Ok(Page::last(ids));
            }
            position = next;

            if let Some(limit) = limit {
                if ids.len() >= limit {
                    return Ok(Page::new(Some(Cursor::new(position)), ids));
                }
            }
        }
    }
}

impl<S: SortedSetStore> StorageBackend for SortedIndexBackend<S> {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    fn exists(&self, kind: RecordKind, id: &str) -> Result<bool> {
        tracing::debug!("Checking for record existence: {} ({})", kind, id);
        self.store.is_member(&kind.list_key(), id)
    }

    fn put(&self, kind: RecordKind, id: &str, payload: &str) -> Result<()> {
        if Self::is_index_key(id) {
            return Err(Error::InvalidRecord(format!(
                "identifier {} collides with an index key",
                id
            )));
        }
        // The payload key is global, so create-if-absent also rejects an
        // identifier already used by another kind.
        if !self.store.set_if_absent(id, payload)? {
            return Err(Error::DuplicateIdentifier(id.to_string()));
        }
        tracing::debug!("Adding {} record with id {}", kind, id);
        self.store.add_member(&kind.list_key(), id)
    }

    fn add_link(&self, id: &str, kind: RecordKind, target: &str) -> Result<()> {
        self.store.add_member(&Self::links_key(id, kind), target)
    }

    fn get(&self, id: &str) -> Result<String> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::IdentifierNotFound(id.to_string()))
    }

    fn list_kind_links(
        &self,
        kind: RecordKind,
        id: &str,
        cursor: Cursor,
        limit: Option<usize>,
    ) -> Result<Page> {
        self.scan_page(&Self::links_key(id, kind), cursor, limit)
    }

    fn list_kind(&self, kind: RecordKind, cursor: Cursor, limit: usize) -> Result<Page> {
        self.scan_page(&kind.list_key(), cursor, Some(limit.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::conformance::conformance_tests;
    use crate::storage::MemorySortedSets;
    use parking_lot::Mutex;

    fn backend() -> SortedIndexBackend<MemorySortedSets> {
        SortedIndexBackend::new(MemorySortedSets::new())
    }

    conformance_tests!(backend());

    /// Engine that hands back oversized scan steps, like Redis does for
    /// small sets.
    struct GreedyScan {
        inner: MemorySortedSets,
        calls: Mutex<usize>,
    }

    impl SortedSetStore for GreedyScan {
        fn name(&self) -> &'static str {
            "greedy"
        }
        fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
            self.inner.set_if_absent(key, value)
        }
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }
        fn add_member(&self, set: &str, member: &str) -> Result<()> {
            self.inner.add_member(set, member)
        }
        fn is_member(&self, set: &str, member: &str) -> Result<bool> {
            self.inner.is_member(set, member)
        }
        fn scan(&self, set: &str, cursor: u64, _count: usize) -> Result<(u64, Vec<String>)> {
            *self.calls.lock() += 1;
            self.inner.scan(set, cursor, 3)
        }
    }

    #[test]
    fn test_page_size_is_a_hint() {
        let backend = SortedIndexBackend::new(GreedyScan {
            inner: MemorySortedSets::new(),
            calls: Mutex::new(0),
        });
        for i in 0..10 {
            backend.put(RecordKind::Agent, &format!("agent-{i}"), "{}").unwrap();
        }

        // Steps of 3 overshoot a limit of 2 and the page keeps them all
        let page = backend.list_kind(RecordKind::Agent, Cursor::START, 2).unwrap();
        assert_eq!(page.ids.len(), 3);
        assert_eq!(page.next, Some(Cursor::new(3)));

        let rest = backend.list_kind(RecordKind::Agent, Cursor::new(3), 100).unwrap();
        assert_eq!(rest.ids.len(), 7);
        assert!(rest.is_last());
    }

    #[test]
    fn test_unbounded_links_scan_until_done() {
        let backend = SortedIndexBackend::new(GreedyScan {
            inner: MemorySortedSets::new(),
            calls: Mutex::new(0),
        });
        for i in 0..8 {
            backend.add_link("obj", RecordKind::Relationship, &format!("rel-{i}")).unwrap();
        }
        let page = backend
            .list_kind_links(RecordKind::Relationship, "obj", Cursor::START, None)
            .unwrap();
        assert_eq!(page.ids.len(), 8);
        assert!(page.is_last());
        assert_eq!(*backend.store().calls.lock(), 3);
    }

    #[test]
    fn test_duplicate_across_kinds_rejected() {
        let backend = backend();
        backend.put(RecordKind::Object, "shared", "{}").unwrap();
        let err = backend.put(RecordKind::Event, "shared", "{}").unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier(_)));
        assert!(!backend.exists(RecordKind::Event, "shared").unwrap());
    }

    #[test]
    fn test_index_key_ids_rejected_before_write() {
        let backend = backend();
        for id in ["eventList", "abc_relationshipLinks"] {
            let err = backend.put(RecordKind::Object, id, "{}").unwrap_err();
            assert!(matches!(err, Error::InvalidRecord(_)));
            assert!(backend.store().get(id).unwrap().is_none());
        }

        backend.put(RecordKind::Event, "e1", "{}").unwrap();
        assert!(backend.exists(RecordKind::Event, "e1").unwrap());
        backend.add_link("abc", RecordKind::Relationship, "rel").unwrap();
    }

    #[test]
    fn test_index_key_layout() {
        let backend = backend();
        backend.put(RecordKind::Rights, "r1", "{}").unwrap();
        backend.add_link("r1", RecordKind::Relationship, "rel").unwrap();
        assert!(backend.store().is_member("rightsList", "r1").unwrap());
        assert!(backend.store().is_member("r1_relationshipLinks", "rel").unwrap());
    }
}
