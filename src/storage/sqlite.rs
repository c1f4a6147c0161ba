//! SQLite document store implementation
//!
//! Models a document database on two tables:
//! - `records`: the `{_id, payload}` collection
//! - `collections`: every named `{_id}` collection, keyed by name
//!
//! Listings sort by `_id` ascending and page by skip count. Whether another
//! page exists is decided by peeking one row past the page, which assumes
//! no writes land on the collection between the two reads.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::schema;
use crate::kind::RecordKind;
use crate::pagination::{Cursor, Page};
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// How long a writer waits on a locked database file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed document store
pub struct DocumentStore {
    conn: Mutex<Connection>,
}

impl DocumentStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!("Opened document store {} (journal mode {})", path.display(), mode);
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn linked_collection(id: &str, kind: RecordKind) -> String {
        format!("{}Linked{}", id, kind.as_str())
    }

    /// One page of a collection: `skip` rows in, at most `limit` rows.
    fn find_page(&self, collection: &str, cursor: Cursor, limit: Option<usize>) -> Result<Page> {
        let skip = i64::try_from(cursor.position())
            .map_err(|_| Error::InvalidCursor(cursor.to_string()))?;
        let conn = self.conn.lock();

        // LIMIT -1 is SQLite for "no limit"
        let sql_limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = conn.prepare_cached(
            "SELECT _id FROM collections WHERE collection = ?1 ORDER BY _id ASC LIMIT ?2 OFFSET ?3",
        )?;
        let ids = stmt
            .query_map(params![collection, sql_limit, skip], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let Some(limit) = limit else {
            return Ok(Page::last(ids));
        };

        let peek_at = skip.saturating_add(limit as i64);
        let more = conn
            .query_row(
                "SELECT 1 FROM collections WHERE collection = ?1 ORDER BY _id ASC LIMIT 1 OFFSET ?2",
                params![collection, peek_at],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let next = more.then(|| Cursor::new(peek_at as u64));
        Ok(Page::new(next, ids))
    }

    #[cfg(test)]
    fn count_records(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl StorageBackend for DocumentStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn exists(&self, kind: RecordKind, id: &str) -> Result<bool> {
        tracing::debug!("Checking for record existence: {} ({})", kind, id);
        let found = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM collections WHERE collection = ?1 AND _id = ?2",
                params![kind.list_key(), id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn put(&self, kind: RecordKind, id: &str, payload: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let inserted = tx
            .execute(
                "INSERT INTO records (_id, payload) VALUES (?1, ?2)",
                params![id, payload],
            )
            .and_then(|_| {
                tx.execute(
                    "INSERT INTO collections (collection, _id) VALUES (?1, ?2)",
                    params![kind.list_key(), id],
                )
            });

        match inserted {
            Ok(_) => {
                tx.commit()?;
                tracing::debug!("Adding {} record with id {}", kind, id);
                Ok(())
            }
            // Dropping the transaction rolls back a half-done insert
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::DuplicateIdentifier(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn add_link(&self, id: &str, kind: RecordKind, target: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO collections (collection, _id) VALUES (?1, ?2)",
            params![Self::linked_collection(id, kind), target],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<String> {
        self.conn
            .lock()
            .query_row(
                "SELECT payload FROM records WHERE _id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::IdentifierNotFound(id.to_string()))
    }

    fn list_kind_links(
        &self,
        kind: RecordKind,
        id: &str,
        cursor: Cursor,
        limit: Option<usize>,
    ) -> Result<Page> {
        self.find_page(&Self::linked_collection(id, kind), cursor, limit)
    }

    fn list_kind(&self, kind: RecordKind, cursor: Cursor, limit: usize) -> Result<Page> {
        self.find_page(&kind.list_key(), cursor, Some(limit.max(1)))
    }
}
