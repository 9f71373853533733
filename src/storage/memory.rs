//! In-memory attribute index store
//!
//! Maintains one `IndexTree` per configured attribute and index kind.
//!
//! # API
//!
//! - `with_index(attr, kinds)` - Configure indexes for an attribute
//! - `add_entry(entry)` / `remove_entry(entry)` - Keep indexes in step with entries
//! - `rebuild(entries)` - Clear and re-index everything
//! - `IndexStore::read` / `IndexStore::range_read` - Lookups used by the planner

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::entry::Entry;
use crate::filter::attr;
use crate::idlist::IdList;
use crate::keys::KeyGenerator;

use super::btree::{IndexKey, IndexTree};
use super::errors::StoreResult;
use super::store::{IndexKind, IndexRead, IndexStore, KeyRange};

/// BTreeMap-backed index store.
///
/// Attributes are indexed by base type; values of every subtype land in the
/// base type's index.
pub struct MemoryIndexStore {
    keys: Arc<dyn KeyGenerator>,

    /// Configured index kinds per lowercased base type
    configured: BTreeMap<String, Vec<IndexKind>>,

    trees: HashMap<(String, IndexKind), IndexTree>,
}

impl MemoryIndexStore {
    /// Creates a store with no indexes configured
    pub fn new(keys: Arc<dyn KeyGenerator>) -> Self {
        Self {
            keys,
            configured: BTreeMap::new(),
            trees: HashMap::new(),
        }
    }

    /// Configures index kinds for an attribute (builder style).
    pub fn with_index(mut self, attr_type: &str, kinds: impl IntoIterator<Item = IndexKind>) -> Self {
        for kind in kinds {
            self.add_index(attr_type, kind);
        }
        self
    }

    /// Configures one index. Existing entries are not re-indexed; call
    /// `rebuild` afterwards.
    pub fn add_index(&mut self, attr_type: &str, kind: IndexKind) {
        let name = Self::index_name(attr_type);
        let kinds = self.configured.entry(name.clone()).or_default();
        if !kinds.contains(&kind) {
            kinds.push(kind.clone());
            self.trees.insert((name, kind), IndexTree::new());
        }
    }

    pub fn is_indexed(&self, attr_type: &str, kind: &IndexKind) -> bool {
        self.trees
            .contains_key(&(Self::index_name(attr_type), kind.clone()))
    }

    /// Clears every index and re-indexes `entries`.
    pub fn rebuild<'a>(&mut self, entries: impl IntoIterator<Item = &'a Entry>) {
        for tree in self.trees.values_mut() {
            tree.clear();
        }
        let mut count = 0usize;
        for entry in entries {
            self.add_entry(entry);
            count += 1;
        }
        debug!(entries = count, indexes = self.trees.len(), "index rebuild complete");
    }

    /// Indexes every configured attribute of `entry`.
    pub fn add_entry(&mut self, entry: &Entry) {
        for (name, key) in self.entry_keys(entry) {
            if let Some(tree) = self.trees.get_mut(&name) {
                tree.insert(key, entry.id());
            }
        }
    }

    /// Removes `entry` from every index it was added to.
    pub fn remove_entry(&mut self, entry: &Entry) {
        for (name, key) in self.entry_keys(entry) {
            if let Some(tree) = self.trees.get_mut(&name) {
                tree.remove(&key, entry.id());
            }
        }
    }

    fn entry_keys(&self, entry: &Entry) -> Vec<((String, IndexKind), IndexKey)> {
        let mut out = Vec::new();
        for (name, kinds) in &self.configured {
            let values = entry.values_matching(name);
            if values.is_empty() {
                continue;
            }
            for kind in kinds {
                if *kind == IndexKind::Presence {
                    out.push(((name.clone(), kind.clone()), IndexKey::presence()));
                    continue;
                }
                for value in &values {
                    for key in self.keys.value_to_keys(name, value, kind) {
                        out.push(((name.clone(), kind.clone()), key));
                    }
                }
            }
        }
        out
    }

    fn index_name(attr_type: &str) -> String {
        attr::base_type(attr_type).to_lowercase()
    }

    fn tree(&self, attr_type: &str, kind: &IndexKind) -> Option<&IndexTree> {
        self.trees.get(&(Self::index_name(attr_type), kind.clone()))
    }

    fn apply_limit(ids: IdList, allids_limit: usize) -> IdList {
        if allids_limit > 0 && !ids.is_allids() && ids.len() > allids_limit {
            IdList::allids()
        } else {
            ids
        }
    }
}

impl IndexStore for MemoryIndexStore {
    fn read(
        &self,
        attr_type: &str,
        kind: &IndexKind,
        key: Option<&IndexKey>,
        allids_limit: usize,
    ) -> StoreResult<IndexRead> {
        let Some(tree) = self.tree(attr_type, kind) else {
            trace!(attr = attr_type, %kind, "no such index");
            return Ok(IndexRead::unindexed());
        };
        let ids = match key {
            Some(key) => tree.lookup_eq(key),
            None => tree.lookup_eq(&IndexKey::presence()),
        };
        Ok(IndexRead::indexed(Self::apply_limit(ids, allids_limit)))
    }

    fn range_read(
        &self,
        attr_type: &str,
        kind: &IndexKind,
        range: &KeyRange,
        allids_limit: usize,
    ) -> StoreResult<IndexRead> {
        let Some(tree) = self.tree(attr_type, kind) else {
            trace!(attr = attr_type, %kind, "no such index");
            return Ok(IndexRead::unindexed());
        };
        let ids = tree.lookup_range(range);
        Ok(IndexRead::indexed(Self::apply_limit(ids, allids_limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Schema, Syntax, SyntaxKeyGenerator};

    fn store() -> MemoryIndexStore {
        let schema = Arc::new(Schema::new().with_syntax("age", Syntax::Integer));
        let mut store = MemoryIndexStore::new(Arc::new(SyntaxKeyGenerator::new(schema)))
            .with_index("cn", [IndexKind::Equality, IndexKind::Presence, IndexKind::Substring])
            .with_index("age", [IndexKind::Equality]);
        let entries = vec![
            Entry::new(1).with("cn", "Alice").with("age", "30"),
            Entry::new(2).with("cn", "Bob").with("age", "41"),
            Entry::new(3).with("cn;lang-fr", "Alicia"),
            Entry::new(4).with("sn", "NoCn"),
        ];
        store.rebuild(&entries);
        store
    }

    #[test]
    fn test_equality_read() {
        let s = store();
        let read = s
            .read("cn", &IndexKind::Equality, Some(&IndexKey::from_string("alice")), 0)
            .unwrap();
        assert_eq!(read, IndexRead::indexed(IdList::from_ids([1])));
    }

    #[test]
    fn test_presence_includes_subtypes() {
        let s = store();
        let read = s.read("cn", &IndexKind::Presence, None, 0).unwrap();
        assert_eq!(read.ids, IdList::from_ids([1, 2, 3]));
    }

    #[test]
    fn test_unconfigured_index_is_unindexed() {
        let s = store();
        let read = s.read("sn", &IndexKind::Equality, Some(&IndexKey::from_string("x")), 0).unwrap();
        assert!(read.unindexed);
        assert!(read.ids.is_allids());

        let read = s.read("age", &IndexKind::Presence, None, 0).unwrap();
        assert!(read.unindexed);
    }

    #[test]
    fn test_range_read() {
        let s = store();
        let read = s
            .range_read("age", &IndexKind::Equality, &KeyRange::at_least(IndexKey::from_int(35)), 0)
            .unwrap();
        assert_eq!(read.ids, IdList::from_ids([2]));
    }

    #[test]
    fn test_allids_limit() {
        let s = store();
        let read = s.read("cn", &IndexKind::Presence, None, 2).unwrap();
        assert!(read.ids.is_allids());
        assert!(!read.unindexed);
    }

    #[test]
    fn test_remove_entry() {
        let mut s = store();
        s.remove_entry(&Entry::new(1).with("cn", "Alice").with("age", "30"));
        let read = s.read("cn", &IndexKind::Presence, None, 0).unwrap();
        assert_eq!(read.ids, IdList::from_ids([2, 3]));
    }
}
