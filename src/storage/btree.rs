//! BTreeMap-based index structures
//!
//! Each index is a BTreeMap<IndexKey, Vec<EntryId>> so range scans walk keys
//! in order. Posting lists are always sorted ascending.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use crate::idlist::{EntryId, IdList};

use super::store::KeyRange;

/// Normalized index key.
///
/// Ordering is deterministic: Int < String.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Integer-syntax value
    Int(i64),
    /// Normalized string value
    String(String),
}

impl IndexKey {
    /// Create a key from an integer
    pub fn from_int(v: i64) -> Self {
        IndexKey::Int(v)
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// The smallest string key
    pub fn empty() -> Self {
        IndexKey::String(String::new())
    }

    /// The single key under which a presence index stores its IDs
    pub fn presence() -> Self {
        IndexKey::String("+".to_string())
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Int(v) => write!(f, "{}", v),
            IndexKey::String(s) => f.write_str(s),
        }
    }
}

/// A single attribute index using BTreeMap for ordered keys.
#[derive(Debug, Default)]
pub struct IndexTree {
    /// Maps keys to sorted posting lists
    tree: BTreeMap<IndexKey, Vec<EntryId>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert an ID for a key, keeping the posting list ascending.
    pub fn insert(&mut self, key: IndexKey, id: EntryId) {
        let ids = self.tree.entry(key).or_default();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id);
        }
    }

    /// Remove an ID for a key.
    ///
    /// If the key has no more IDs, removes the key entirely.
    pub fn remove(&mut self, key: &IndexKey, id: EntryId) {
        if let Some(ids) = self.tree.get_mut(key) {
            if let Ok(pos) = ids.binary_search(&id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// IDs stored under an exact key.
    pub fn lookup_eq(&self, key: &IndexKey) -> IdList {
        match self.tree.get(key) {
            Some(ids) => IdList::Ids(ids.clone()),
            None => IdList::empty(),
        }
    }

    /// Union of the IDs under every key in `range`.
    ///
    /// An inverted or empty range yields an empty list.
    pub fn lookup_range(&self, range: &KeyRange) -> IdList {
        if range.is_empty() {
            return IdList::empty();
        }
        let bounds: (Bound<&IndexKey>, Bound<&IndexKey>) =
            (range.lower.as_ref(), range.upper.as_ref());

        let mut result = Vec::new();
        for (_, ids) in self.tree.range(bounds) {
            result.extend_from_slice(ids);
        }
        IdList::from_ids(result)
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of postings
    pub fn posting_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}
