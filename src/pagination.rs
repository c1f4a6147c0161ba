//! Pagination protocol shared by every listing operation
//!
//! Outward shape is uniform across backends: a listing starts at cursor
//! `"0"`, every page carries the cursor for the next one, and a `None`
//! next cursor means there is nothing left. What the number inside a
//! cursor means is up to the backend (a scan position for the
//! sorted-index backend, a skip count for the document backend).

use crate::{Error, Result};
use serde::Serialize;
use std::str::FromStr;

/// Default upper bound for a single page
pub const DEFAULT_MAX_LIMIT: usize = 1000;

/// Opaque pagination position. `Cursor::START` begins a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor(u64);

impl Cursor {
    pub const START: Cursor = Cursor(0);

    pub fn new(position: u64) -> Self {
        Self(position)
    }

    pub fn position(&self) -> u64 {
        self.0
    }

}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Cursor)
            .map_err(|_| Error::InvalidCursor(s.to_string()))
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of identifiers plus the cursor for the following page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    /// `None` once the listing is exhausted
    pub next: Option<Cursor>,
    pub ids: Vec<String>,
}

impl Page {
    pub fn new(next: Option<Cursor>, ids: Vec<String>) -> Self {
        Self { next, ids }
    }

    /// A final page
    pub fn last(ids: Vec<String>) -> Self {
        Self { next: None, ids }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Pagination block echoed back to API clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub starting_cursor: String,
    pub next_cursor: Option<String>,
    pub limit: usize,
}

impl Pagination {
    /// `starting` is echoed verbatim, as the caller sent it
    pub fn new(starting: &str, page: &Page, limit: usize) -> Self {
        Self {
            starting_cursor: starting.to_string(),
            next_cursor: page.next.map(|c| c.to_string()),
            limit,
        }
    }
}

/// Clamp a requested page size to the configured maximum.
///
/// Oversized requests are served at the maximum rather than rejected, and a
/// missing or zero limit means "as large as allowed".
pub fn clamp_limit(requested: Option<usize>, max_limit: usize) -> usize {
    match requested {
        Some(limit) if limit > max_limit => {
            tracing::warn!("Received request above max limit ({}), capping", max_limit);
            max_limit
        }
        Some(0) | None => max_limit,
        Some(limit) => limit,
    }
}
