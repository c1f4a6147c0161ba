//! In-process sorted-set engine
//!
//! Backs the `memory` backend for development and tests. Like Redis, plain
//! values and sets share one keyspace, and touching a key as the wrong type
//! fails with `WrongType`. Sets are kept in member order and the scan
//! cursor is a position in that order; a returned cursor of `0` means the
//! scan is complete.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::storage::sorted::SortedSetStore;
use crate::{Error, Result};

#[derive(Debug)]
enum Entry {
    Value(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Default)]
pub struct MemorySortedSets {
    keys: RwLock<HashMap<String, Entry>>,
}

impl MemorySortedSets {
    pub fn new() -> Self {
        Self::default()
    }
}

fn wrong_type(key: &str) -> Error {
    Error::WrongType(key.to_string())
}

impl SortedSetStore for MemorySortedSets {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut keys = self.keys.write();
        if keys.contains_key(key) {
            return Ok(false);
        }
        keys.insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.keys.read().get(key) {
            None => Ok(None),
            Some(Entry::Value(value)) => Ok(Some(value.clone())),
            Some(Entry::Set(_)) => Err(wrong_type(key)),
        }
    }

    fn add_member(&self, set: &str, member: &str) -> Result<()> {
        let mut keys = self.keys.write();
        let entry = keys
            .entry(set.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            Entry::Value(_) => Err(wrong_type(set)),
        }
    }

    fn is_member(&self, set: &str, member: &str) -> Result<bool> {
        match self.keys.read().get(set) {
            None => Ok(false),
            Some(Entry::Set(members)) => Ok(members.contains(member)),
            Some(Entry::Value(_)) => Err(wrong_type(set)),
        }
    }

    fn scan(&self, set: &str, cursor: u64, count: usize) -> Result<(u64, Vec<String>)> {
        let keys = self.keys.read();
        let members = match keys.get(set) {
            None => return Ok((0, Vec::new())),
            Some(Entry::Set(members)) => members,
            Some(Entry::Value(_)) => return Err(wrong_type(set)),
        };

        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let batch: Vec<String> = members
            .iter()
            .skip(start)
            .take(count.max(1))
            .cloned()
            .collect();

        let end = start.saturating_add(batch.len());
        let next = if end >= members.len() { 0 } else { end as u64 };
        Ok((next, batch))
    }
}
