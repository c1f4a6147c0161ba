//! Storage Layer - the contract every persistence engine satisfies
//!
//! Two index representations implement it:
//! - `SortedIndexBackend`: payloads under their own key, kind membership and
//!   link membership as ordered sets (`<kind>List`, `<id>_<kind>Links`),
//!   paginated with the set scan cursor. Runs over Redis or in-process sets.
//! - `DocumentStore`: payloads in a `records` collection, membership as
//!   `{_id}` collections (`<kind>List`, `<id>Linked<kind>`), paginated by
//!   skip count. Runs over SQLite.
//!
//! Linking is not implemented per backend; `StorageBackend::link` runs the
//! shared algorithm in `crate::linker` against the primitives below.

pub mod factory;
pub mod memory;
pub mod redis;
pub mod schema;
pub mod sorted;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod conformance;

pub use factory::open_backend;
pub use memory::MemorySortedSets;
pub use redis::RedisSortedSets;
pub use sorted::{SortedIndexBackend, SortedSetStore};
pub use sqlite::DocumentStore;

use crate::kind::RecordKind;
use crate::linker::{self, LinkOutcome};
use crate::pagination::{Cursor, Page};
use crate::Result;

/// Capability interface shared by all persistence engines.
///
/// Implementations hold no cross-request state beyond their connections;
/// concurrency control is left to the engine itself.
pub trait StorageBackend: Send + Sync {
    /// Short engine name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Whether `id` is in `kind`'s membership index
    fn exists(&self, kind: RecordKind, id: &str) -> Result<bool>;

    /// Insert a new record.
    ///
    /// Fails with `DuplicateIdentifier` if `id` is already taken anywhere in
    /// the store; an existing record is never overwritten.
    fn put(&self, kind: RecordKind, id: &str, payload: &str) -> Result<()>;

    /// Write one direction of a link: `target` joins `id`'s `kind` links.
    /// Idempotent.
    fn add_link(&self, id: &str, kind: RecordKind, target: &str) -> Result<()>;

    /// Fetch a payload by its global identifier
    fn get(&self, id: &str) -> Result<String>;

    /// Page through the `kind` identifiers linked to `id`.
    ///
    /// `limit = None` returns everything in a single, final page.
    fn list_kind_links(
        &self,
        kind: RecordKind,
        id: &str,
        cursor: Cursor,
        limit: Option<usize>,
    ) -> Result<Page>;

    /// Page through every identifier of `kind`
    fn list_kind(&self, kind: RecordKind, cursor: Cursor, limit: usize) -> Result<Page>;

    /// Link two records in both directions, minting a stub relationship
    /// when `kind2` is not a relationship. See `crate::linker::link`.
    fn link(
        &self,
        kind1: RecordKind,
        id1: &str,
        kind2: RecordKind,
        id2: &str,
    ) -> Result<LinkOutcome> {
        linker::link(self, kind1, id1, kind2, id2)
    }

    /// Every `kind` identifier linked to `id`
    fn all_kind_links(&self, kind: RecordKind, id: &str) -> Result<Vec<String>> {
        Ok(self.list_kind_links(kind, id, Cursor::START, None)?.ids)
    }

    /// Kind of the record stored under `id`, if any
    fn find_kind(&self, id: &str) -> Result<Option<RecordKind>> {
        for &kind in RecordKind::all() {
            if self.exists(kind, id)? {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    /// Count the records of `kind` by walking its whole listing
    fn count_kind(&self, kind: RecordKind, page_size: usize) -> Result<usize> {
        let mut cursor = Cursor::START;
        let mut total = 0;
        loop {
            let page = self.list_kind(kind, cursor, page_size)?;
            total += page.ids.len();
            match page.next {
                Some(next) => cursor = next,
                None => return Ok(total),
            }
        }
    }
}
