//! Registered indexes and decoder chains
//!
//! An `IndexEntry` is one registered index: a descriptor filter naming the
//! attribute and match kind it serves, the namespace it covers, and the
//! lookup capability. A filter node's `DecoderChain` lists the entries able
//! to answer it, primary first.

use std::fmt;
use std::sync::Arc;

use crate::dn::Dn;
use crate::filter::{attr, Filter, FilterChoice, FilterKind};
use crate::idlist::IdList;

/// Match kind served by an index, derived from its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// `(attr=*)`
    Presence,
    /// `(attr=**)`
    Equality,
    /// `(attr=?*)`
    Substring,
}

impl DescriptorKind {
    /// Classifies a parsed descriptor filter.
    pub fn classify(descriptor: &Filter) -> Option<Self> {
        match descriptor.kind() {
            FilterKind::Present(_) => Some(DescriptorKind::Presence),
            FilterKind::Substrings(sub) if sub.has_no_pieces() => Some(DescriptorKind::Equality),
            FilterKind::Substrings(_) => Some(DescriptorKind::Substring),
            _ => None,
        }
    }

    /// True if a search filter of type `choice` is served by this kind.
    pub fn serves(self, choice: FilterChoice) -> bool {
        matches!(
            (self, choice),
            (DescriptorKind::Presence, FilterChoice::Present)
                | (DescriptorKind::Equality, FilterChoice::Equality)
                | (DescriptorKind::Substring, FilterChoice::Substrings)
        )
    }
}

/// Lookup capability of a plugin index.
pub trait IndexLookup: Send + Sync {
    /// Candidates for `filter` within `namespace`, or `None` to decline and
    /// let classic evaluation run.
    fn lookup(&self, filter: &Filter, namespace: &Dn) -> Option<IdList>;
}

impl<F> IndexLookup for F
where
    F: Fn(&Filter, &Dn) -> Option<IdList> + Send + Sync,
{
    fn lookup(&self, filter: &Filter, namespace: &Dn) -> Option<IdList> {
        self(filter, namespace)
    }
}

/// A registered index.
pub struct IndexEntry {
    plugin_id: String,
    descriptor: Filter,
    kind: DescriptorKind,
    indexed_attr: String,
    lookup: Option<Arc<dyn IndexLookup>>,
    namespace: Dn,
    associated_attrs: Vec<String>,
}

impl IndexEntry {
    pub(crate) fn new(
        plugin_id: String,
        descriptor: Filter,
        kind: DescriptorKind,
        indexed_attr: String,
        lookup: Option<Arc<dyn IndexLookup>>,
        namespace: Dn,
        associated_attrs: Vec<String>,
    ) -> Self {
        Self {
            plugin_id,
            descriptor,
            kind,
            indexed_attr,
            lookup,
            namespace,
            associated_attrs,
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn descriptor(&self) -> &Filter {
        &self.descriptor
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn indexed_attr(&self) -> &str {
        &self.indexed_attr
    }

    /// `None` means the index is registered but disabled.
    pub fn lookup(&self) -> Option<&Arc<dyn IndexLookup>> {
        self.lookup.as_ref()
    }

    /// Backend suffix this index covers.
    pub fn namespace(&self) -> &Dn {
        &self.namespace
    }

    pub fn associated_attrs(&self) -> &[String] {
        &self.associated_attrs
    }

    /// True if this index serves `filter` directly: same attribute type
    /// (schema-equivalent) and a compatible filter type.
    pub fn matches_filter(&self, filter: &Filter) -> bool {
        if !filter.is_simple() || !self.kind.serves(filter.choice()) {
            return false;
        }
        filter
            .attribute()
            .is_some_and(|a| attr::types_equivalent(&self.indexed_attr, a))
    }

    /// True if `filter` can be answered together with this index: either
    /// directly, or because its attribute is one of the associated ones.
    pub fn matches_associated(&self, filter: &Filter) -> bool {
        if self.matches_filter(filter) {
            return true;
        }
        filter.attribute().is_some_and(|a| {
            self.associated_attrs
                .iter()
                .any(|assoc| attr::types_equivalent(assoc, a))
        })
    }

    /// True if `alternate` may back this index in a decoder chain: same
    /// indexed attribute, and every associated attribute of this index is
    /// among the alternate's.
    pub fn matches_index(&self, alternate: &IndexEntry) -> bool {
        attr::types_equivalent(&self.indexed_attr, &alternate.indexed_attr)
            && self.associated_attrs.iter().all(|mine| {
                alternate
                    .associated_attrs
                    .iter()
                    .any(|theirs| attr::types_equivalent(mine, theirs))
            })
    }
}

impl fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("plugin_id", &self.plugin_id)
            .field("descriptor", &self.descriptor.to_string())
            .field("namespace", &self.namespace.as_str())
            .field("enabled", &self.lookup.is_some())
            .field("associated_attrs", &self.associated_attrs)
            .finish()
    }
}

/// Ordered indexes able to evaluate a filter node: a primary and its
/// alternates. Entries are shared with the registry.
#[derive(Clone, Default)]
pub struct DecoderChain {
    entries: Vec<Arc<IndexEntry>>,
}

impl DecoderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(&self) -> Option<&Arc<IndexEntry>> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, entry: Arc<IndexEntry>) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Decoder identity: same primary index entry, or both unassigned.
    pub fn same_decoder(&self, other: &DecoderChain) -> bool {
        match (self.primary(), other.primary()) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DecoderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| format!("{}:{}@{}", e.plugin_id, e.descriptor, e.namespace)),
            )
            .finish()
    }
}
