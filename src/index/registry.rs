//! Index plugin registry
//!
//! Plugins register indexes at startup; searches take a read guard for the
//! whole assign/evaluate walk. The registry is an explicit handle shared by
//! `Arc`, never a process global.
//!
//! # API
//!
//! - `register_plugin(id, validator)` - Add a plugin (first registration wins)
//! - `register_index(id, descriptor)` - Add or replace one index of a plugin
//! - `read()` - Read guard for a search
//! - `RegistryReader::assign_filter_decoders(filter)` - Assign, flatten and group
//! - `RegistryReader::evaluate(filter, namespace)` - Ask the assigned decoder

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info, trace};

use crate::dn::Dn;
use crate::filter::{attr, parse, Filter};
use crate::idlist::IdList;
use crate::storage::BackendResolver;

use super::decoder::{DecoderChain, DescriptorKind, IndexEntry, IndexLookup};
use super::errors::{RegistryError, RegistryResult};
use super::grouping::{self, AssignedFilter};

/// Reports whether a plugin's indexes are currently usable.
pub type PluginValidator = Arc<dyn Fn() -> bool + Send + Sync>;

/// Registration request for one index.
#[derive(Clone)]
pub struct IndexDescriptor {
    filter: String,
    namespace: Dn,
    lookup: Option<Arc<dyn IndexLookup>>,
    associated_attrs: Vec<String>,
}

impl IndexDescriptor {
    /// Descriptor with no lookup (disabled) and no associated attributes.
    ///
    /// `filter` is `(attr=*)` for presence, `(attr=**)` for equality or
    /// `(attr=?*)` for substring.
    pub fn new(filter: &str, namespace: Dn) -> Self {
        Self {
            filter: filter.to_string(),
            namespace,
            lookup: None,
            associated_attrs: Vec::new(),
        }
    }

    pub fn with_lookup(mut self, lookup: impl IndexLookup + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    pub fn with_shared_lookup(mut self, lookup: Arc<dyn IndexLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Attributes this index can answer together with its own.
    pub fn with_associated<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.associated_attrs = attrs.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDescriptor")
            .field("filter", &self.filter)
            .field("namespace", &self.namespace.as_str())
            .field("enabled", &self.lookup.is_some())
            .field("associated_attrs", &self.associated_attrs)
            .finish()
    }
}

/// Outcome of asking a filter's decoder chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// A plugin index produced the candidates.
    Evaluated(IdList),
    /// No usable decoder; evaluate classically.
    Unevaluated,
}

struct IndexPlugin {
    id: String,
    /// Most recently registered first
    indexes: Vec<Arc<IndexEntry>>,
    validator: Option<PluginValidator>,
}

impl IndexPlugin {
    fn is_usable(&self) -> bool {
        self.validator.as_ref().map_or(true, |validate| validate())
    }
}

#[derive(Default)]
pub(crate) struct RegistryState {
    /// Most recently registered first
    plugins: Vec<IndexPlugin>,
    index_count: usize,
}

impl RegistryState {
    /// Fills the decoder chain of one simple filter node.
    ///
    /// The first usable matching index becomes primary; later matches join
    /// as alternates if the primary accepts them (`matches_index`).
    pub(crate) fn assign_decoder(&self, filter: &mut Filter) {
        let mut chain = DecoderChain::new();
        for plugin in &self.plugins {
            if !plugin.is_usable() {
                trace!(plugin = %plugin.id, "plugin indexes unavailable, skipping");
                continue;
            }
            for entry in &plugin.indexes {
                if !entry.matches_filter(filter) {
                    continue;
                }
                if entry.lookup().is_none() {
                    trace!(plugin = %plugin.id, descriptor = %entry.descriptor(), "index disabled");
                    continue;
                }
                let accepted = match chain.primary() {
                    None => true,
                    Some(primary) => primary.matches_index(entry),
                };
                if accepted {
                    chain.push(Arc::clone(entry));
                }
            }
        }
        if !chain.is_empty() {
            trace!(filter = %filter, decoders = chain.len(), "decoder assigned");
        }
        filter.set_decoders(chain);
    }
}

/// Registry of index plugins.
pub struct IndexRegistry {
    state: RwLock<RegistryState>,
    resolver: Arc<dyn BackendResolver>,
}

impl IndexRegistry {
    /// Creates an empty registry resolving namespaces with `resolver`.
    pub fn new(resolver: Arc<dyn BackendResolver>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            resolver,
        }
    }

    /// Adds a plugin. Registering an id that already exists is a no-op:
    /// the first registration wins.
    pub fn register_plugin(
        &self,
        plugin_id: &str,
        validator: Option<PluginValidator>,
    ) -> RegistryResult<()> {
        let mut state = self.state.write();
        if state
            .plugins
            .iter()
            .any(|p| p.id.eq_ignore_ascii_case(plugin_id))
        {
            debug!(plugin = plugin_id, "plugin already registered");
            return Ok(());
        }
        state.plugins.insert(
            0,
            IndexPlugin {
                id: plugin_id.to_string(),
                indexes: Vec::new(),
                validator,
            },
        );
        info!(plugin = plugin_id, "index plugin registered");
        Ok(())
    }

    /// Adds an index to a plugin, or replaces the plugin's index for the same
    /// attribute and kind in place.
    ///
    /// Validation happens before the write lock is taken; a failed
    /// registration leaves the registry unchanged.
    pub fn register_index(
        &self,
        plugin_id: &str,
        descriptor: IndexDescriptor,
    ) -> RegistryResult<()> {
        let filter = parse(&descriptor.filter).map_err(|source| RegistryError::InvalidDescriptor {
            descriptor: descriptor.filter.clone(),
            source,
        })?;
        let kind = DescriptorKind::classify(&filter)
            .ok_or_else(|| RegistryError::UnsupportedDescriptor(descriptor.filter.clone()))?;
        let indexed_attr = filter
            .attribute()
            .ok_or_else(|| RegistryError::UnsupportedDescriptor(descriptor.filter.clone()))?
            .to_string();
        let namespace = self
            .resolver
            .select(&descriptor.namespace)
            .ok_or_else(|| RegistryError::NamespaceNotServed(descriptor.namespace.to_string()))?;

        let entry = Arc::new(IndexEntry::new(
            plugin_id.to_string(),
            filter,
            kind,
            indexed_attr,
            descriptor.lookup,
            namespace,
            descriptor.associated_attrs,
        ));

        let mut state = self.state.write();
        let plugin = state
            .plugins
            .iter_mut()
            .find(|p| p.id.eq_ignore_ascii_case(plugin_id))
            .ok_or_else(|| RegistryError::UnknownPlugin(plugin_id.to_string()))?;

        let existing = plugin.indexes.iter().position(|e| {
            e.kind() == entry.kind() && attr::types_equivalent(e.indexed_attr(), entry.indexed_attr())
        });
        match existing {
            Some(pos) => {
                debug!(plugin = plugin_id, descriptor = %entry.descriptor(), "index replaced");
                plugin.indexes[pos] = entry;
            }
            None => {
                debug!(plugin = plugin_id, descriptor = %entry.descriptor(), "index added");
                plugin.indexes.insert(0, entry);
                state.index_count += 1;
            }
        }
        Ok(())
    }

    /// Read guard for one search's assignment and evaluation walk.
    pub fn read(&self) -> RegistryReader<'_> {
        RegistryReader {
            state: self.state.read(),
        }
    }

    /// Assigns decoders under a short-lived read guard.
    pub fn assign_filter_decoders<'f>(&self, filter: &'f mut Filter) -> AssignedFilter<'f> {
        self.read().assign_filter_decoders(filter)
    }

    pub fn plugin_count(&self) -> usize {
        self.state.read().plugins.len()
    }

    /// Number of distinct registered indexes.
    pub fn index_count(&self) -> usize {
        self.state.read().index_count
    }
}

impl fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("IndexRegistry")
            .field(
                "plugins",
                &state.plugins.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            )
            .field("index_count", &state.index_count)
            .finish()
    }
}

/// Registry read guard held across one search.
///
/// Registration blocks while any reader is alive.
pub struct RegistryReader<'r> {
    state: RwLockReadGuard<'r, RegistryState>,
}

impl RegistryReader<'_> {
    /// Assigns a decoder chain to one simple filter node.
    pub fn assign_decoder(&self, filter: &mut Filter) {
        self.state.assign_decoder(filter);
    }

    /// Assigns decoders throughout `filter`, then flattens and groups list
    /// nodes. The returned guard releases every decoder when dropped.
    pub fn assign_filter_decoders<'f>(&self, filter: &'f mut Filter) -> AssignedFilter<'f> {
        trace!(filter = %filter, "before decoder assignment");
        grouping::assign_decoders(&self.state, filter);
        trace!(filter = %filter, "after decoder assignment");
        AssignedFilter::new(filter)
    }

    /// Asks the first decoder covering `namespace` for candidates.
    pub fn evaluate(&self, filter: &Filter, namespace: &Dn) -> Evaluation {
        for entry in filter.decoders().iter() {
            if entry.namespace() != namespace {
                continue;
            }
            let Some(lookup) = entry.lookup() else {
                continue;
            };
            return match lookup.lookup(filter, namespace) {
                Some(ids) => {
                    debug!(plugin = entry.plugin_id(), filter = %filter, count = ids.len(), "evaluated by index plugin");
                    Evaluation::Evaluated(ids)
                }
                None => Evaluation::Unevaluated,
            };
        }
        Evaluation::Unevaluated
    }

    pub fn plugin_count(&self) -> usize {
        self.state.plugins.len()
    }

    pub fn index_count(&self) -> usize {
        self.state.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SuffixResolver;

    fn registry() -> IndexRegistry {
        IndexRegistry::new(Arc::new(SuffixResolver::new([
            Dn::new("dc=example,dc=com"),
            Dn::new("dc=other,dc=com"),
        ])))
    }

    fn ns() -> Dn {
        Dn::new("dc=example,dc=com")
    }

    fn fixed(ids: &'static [u64]) -> impl IndexLookup {
        move |_: &Filter, _: &Dn| Some(IdList::from_ids(ids.iter().copied()))
    }

    #[test]
    fn test_register_plugin_first_wins() {
        let r = registry();
        r.register_plugin("p1", None).unwrap();
        r.register_plugin("P1", Some(Arc::new(|| false))).unwrap();
        assert_eq!(r.plugin_count(), 1);

        // The first registration had no validator, so the plugin stays usable
        r.register_index("p1", IndexDescriptor::new("(cn=*)", ns()).with_lookup(fixed(&[1])))
            .unwrap();
        let mut f = parse("(cn=*)").unwrap();
        r.read().assign_decoder(&mut f);
        assert!(f.has_decoder());
    }

    #[test]
    fn test_register_index_errors_leave_registry_unchanged() {
        let r = registry();
        r.register_plugin("p", None).unwrap();

        let err = r
            .register_index("p", IndexDescriptor::new("(cn=x)", ns()))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_INDEX_UNSUPPORTED_DESCRIPTOR");

        let err = r
            .register_index("p", IndexDescriptor::new("(cn=", ns()))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_INDEX_INVALID_DESCRIPTOR");

        let err = r
            .register_index("p", IndexDescriptor::new("(cn=*)", Dn::new("o=nowhere")))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_INDEX_NAMESPACE_NOT_SERVED");

        let err = r
            .register_index("missing", IndexDescriptor::new("(cn=*)", ns()))
            .unwrap_err();
        assert_eq!(err.code(), "DIR_INDEX_UNKNOWN_PLUGIN");

        assert_eq!(r.index_count(), 0);
    }

    #[test]
    fn test_namespace_resolves_to_backend_suffix() {
        let r = registry();
        r.register_plugin("p", None).unwrap();
        r.register_index(
            "p",
            IndexDescriptor::new("(uid=**)", Dn::new("ou=people,dc=example,dc=com"))
                .with_lookup(fixed(&[3])),
        )
        .unwrap();

        let mut f = parse("(uid=jdoe)").unwrap();
        let reader = r.read();
        reader.assign_decoder(&mut f);
        assert_eq!(f.decoders().primary().unwrap().namespace(), &ns());
        assert_eq!(
            reader.evaluate(&f, &ns()),
            Evaluation::Evaluated(IdList::from_ids([3]))
        );
        assert_eq!(
            reader.evaluate(&f, &Dn::new("dc=other,dc=com")),
            Evaluation::Unevaluated
        );
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let r = registry();
        r.register_plugin("p", None).unwrap();
        r.register_index("p", IndexDescriptor::new("(uid=**)", ns()).with_lookup(fixed(&[1])))
            .unwrap();
        r.register_index("p", IndexDescriptor::new("(UID=**)", ns()).with_lookup(fixed(&[2])))
            .unwrap();
        assert_eq!(r.index_count(), 1);

        let mut f = parse("(uid=a)").unwrap();
        let reader = r.read();
        reader.assign_decoder(&mut f);
        assert_eq!(f.decoders().len(), 1);
        assert_eq!(
            reader.evaluate(&f, &ns()),
            Evaluation::Evaluated(IdList::from_ids([2]))
        );
    }

    #[test]
    fn test_kinds_do_not_cross_match() {
        let r = registry();
        r.register_plugin("p", None).unwrap();
        r.register_index("p", IndexDescriptor::new("(uid=?*)", ns()).with_lookup(fixed(&[1])))
            .unwrap();

        let reader = r.read();
        let mut eq = parse("(uid=a)").unwrap();
        reader.assign_decoder(&mut eq);
        assert!(!eq.has_decoder());

        let mut sub = parse("(uid=a*)").unwrap();
        reader.assign_decoder(&mut sub);
        assert!(sub.has_decoder());
    }

    #[test]
    fn test_failing_validator_skips_plugin() {
        let r = registry();
        r.register_plugin("offline", Some(Arc::new(|| false))).unwrap();
        r.register_index("offline", IndexDescriptor::new("(cn=*)", ns()).with_lookup(fixed(&[1])))
            .unwrap();
        r.register_plugin("online", None).unwrap();
        r.register_index("online", IndexDescriptor::new("(cn=*)", ns()).with_lookup(fixed(&[2])))
            .unwrap();

        let mut f = parse("(cn=*)").unwrap();
        let reader = r.read();
        reader.assign_decoder(&mut f);
        assert_eq!(f.decoders().len(), 1);
        assert_eq!(f.decoders().primary().unwrap().plugin_id(), "online");
    }

    #[test]
    fn test_shared_lookup_serves_several_indexes() {
        let r = registry();
        r.register_plugin("p", None).unwrap();
        let shared: Arc<dyn IndexLookup> = Arc::new(fixed(&[4, 9]));
        r.register_index("p", IndexDescriptor::new("(cn=*)", ns()).with_shared_lookup(Arc::clone(&shared)))
            .unwrap();
        r.register_index("p", IndexDescriptor::new("(sn=**)", ns()).with_shared_lookup(shared))
            .unwrap();
        assert_eq!(r.index_count(), 2);

        let mut f = parse("(sn=smith)").unwrap();
        let reader = r.read();
        let assigned = reader.assign_filter_decoders(&mut f);
        assert_eq!(
            reader.evaluate(&assigned, &ns()),
            Evaluation::Evaluated(IdList::from_ids([4, 9]))
        );
    }

    #[test]
    fn test_declining_lookup_is_unevaluated() {
        let r = registry();
        r.register_plugin("p", None).unwrap();
        r.register_index(
            "p",
            IndexDescriptor::new("(cn=*)", ns()).with_lookup(|_: &Filter, _: &Dn| None),
        )
        .unwrap();

        let mut f = parse("(cn=*)").unwrap();
        let reader = r.read();
        reader.assign_decoder(&mut f);
        assert_eq!(reader.evaluate(&f, &ns()), Evaluation::Unevaluated);
        assert_eq!(
            reader.evaluate(&parse("(cn=*)").unwrap(), &ns()),
            Evaluation::Unevaluated
        );
    }
}
