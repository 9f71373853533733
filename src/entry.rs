//! In-memory directory entries
//!
//! Entries are what the storage index is built from and what the exact
//! filter test runs against.

use std::collections::BTreeMap;

use crate::filter::attr;
use crate::idlist::EntryId;

/// A directory entry: an identifier and multi-valued attributes.
///
/// Attribute types are keyed by lowercased base type; subtype options are
/// kept as part of the stored type so `cn;lang-fr` stays distinct from `cn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: EntryId,
    attrs: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            attrs: BTreeMap::new(),
        }
    }

    /// Adds a value (builder style).
    pub fn with(mut self, attr_type: &str, value: impl Into<String>) -> Self {
        self.add_value(attr_type, value);
        self
    }

    pub fn add_value(&mut self, attr_type: &str, value: impl Into<String>) {
        self.attrs
            .entry(attr_type.to_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Values of an attribute type (exact type, case-insensitive).
    pub fn values(&self, attr_type: &str) -> &[String] {
        self.attrs
            .get(&attr_type.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Values of an attribute type including every subtype of its base type.
    ///
    /// `cn` returns values of `cn` and `cn;lang-fr`; `cn;lang-fr` returns
    /// only its own values.
    pub fn values_matching(&self, attr_type: &str) -> Vec<&String> {
        if attr::has_subtype(attr_type) {
            return self.values(attr_type).iter().collect();
        }
        self.attrs
            .iter()
            .filter(|(stored, _)| attr::types_equivalent(stored, attr_type))
            .flat_map(|(_, values)| values.iter())
            .collect()
    }

    /// All attribute types present.
    pub fn attribute_types(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }
}
