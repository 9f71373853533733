//! Backend search entry points
//!
//! A backend owns its attribute index store, key generator, optional VLV
//! indexes and planner configuration. A search runs as:
//!
//! 1. Take the registry read guard
//! 2. Assign decoders to the filter (flatten/group)
//! 3. Evaluate candidates
//! 4. Release decoders, then the guard

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dn::Dn;
use crate::filter::Filter;
use crate::idlist::IdList;
use crate::index::{IndexRegistry, RegistryReader};
use crate::keys::KeyGenerator;
use crate::storage::{IndexStore, VlvIndex};

use super::candidates::CandidateEvaluator;
use super::config::PlannerConfig;
use super::context::SearchContext;
use super::errors::{PlannerError, PlannerResult};

/// One database backend serving a suffix.
pub struct Backend {
    suffix: Dn,
    store: Arc<dyn IndexStore>,
    keys: Arc<dyn KeyGenerator>,
    vlv: Option<Arc<dyn VlvIndex>>,
    config: PlannerConfig,
}

impl Backend {
    /// Creates a backend. Fails if `config` does not validate.
    pub fn new(
        suffix: Dn,
        store: Arc<dyn IndexStore>,
        keys: Arc<dyn KeyGenerator>,
        config: PlannerConfig,
    ) -> PlannerResult<Self> {
        config.validate()?;
        Ok(Self {
            suffix,
            store,
            keys,
            vlv: None,
            config,
        })
    }

    /// Attaches VLV indexes.
    pub fn with_vlv(mut self, vlv: Arc<dyn VlvIndex>) -> Self {
        self.vlv = Some(vlv);
        self
    }

    pub fn suffix(&self) -> &Dn {
        &self.suffix
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// A context for a search of this backend starting at `base`.
    pub fn search_context(&self, base: Dn) -> SearchContext {
        SearchContext::new(base, self.suffix.clone())
    }

    /// Candidate IDs for `filter`.
    ///
    /// With a registry reader, nodes carrying decoders are offered to their
    /// index plugins first. A filter that cannot be evaluated at all yields
    /// no candidates.
    pub fn filter_candidates(
        &self,
        filter: &Filter,
        ctx: &mut SearchContext,
        registry: Option<&RegistryReader<'_>>,
    ) -> PlannerResult<IdList> {
        if self.config.record_key_stats {
            ctx.enable_key_stats();
        }
        let allids_limit = self.config.allids_limit(ctx);

        let evaluator = CandidateEvaluator::new(
            self.store.as_ref(),
            self.keys.as_ref(),
            self.vlv.as_deref(),
            &self.config,
            registry,
            allids_limit,
        );
        let evaluated = evaluator.candidates(filter, ctx).inspect_err(|err| match err {
            PlannerError::Storage(store) if store.is_fatal() => {
                error!(suffix = %self.suffix, code = store.code(), error = %store, "index store failed")
            }
            PlannerError::Storage(store) => {
                warn!(suffix = %self.suffix, code = store.code(), error = %store, "index read failed")
            }
            _ => {}
        })?;
        let ids = match evaluated {
            Some(ids) => ids,
            None => {
                debug!(filter = %filter, "filter not evaluable, no candidates");
                IdList::empty()
            }
        };

        if ctx.notes().unindexed {
            info!(base = %ctx.base(), filter = %filter, "unindexed search");
        }
        Ok(ids)
    }

    /// Full search pass: decoder assignment, evaluation and release.
    ///
    /// The registry read guard is held for the whole pass. Decoders are
    /// released on every exit path, including errors.
    pub fn search_candidates(
        &self,
        registry: &IndexRegistry,
        filter: &mut Filter,
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        let reader = registry.read();
        let assigned = reader.assign_filter_decoders(filter);
        let result = self.filter_candidates(&assigned, ctx, Some(&reader));
        assigned.release();
        result
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("suffix", &self.suffix)
            .field("vlv", &self.vlv.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::filter::parse;
    use crate::index::IndexDescriptor;
    use crate::keys::{Schema, SyntaxKeyGenerator};
    use crate::planner::ConfigError;
    use crate::storage::{IndexKind, MemoryIndexStore, SuffixResolver, VlvSearchList};

    fn suffix() -> Dn {
        Dn::new("dc=example,dc=com")
    }

    fn backend(config: PlannerConfig) -> Backend {
        let keys: Arc<dyn KeyGenerator> = Arc::new(SyntaxKeyGenerator::new(Arc::new(Schema::new())));
        let mut store = MemoryIndexStore::new(Arc::clone(&keys))
            .with_index("cn", [IndexKind::Equality])
            .with_index("nscpentrydn", [IndexKind::Equality]);
        store.rebuild(&[
            Entry::new(1).with("cn", "alice").with("nscpentrydn", "cn=alice,dc=example,dc=com"),
            Entry::new(2).with("cn", "bob"),
        ]);
        Backend::new(suffix(), Arc::new(store), keys, config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let keys: Arc<dyn KeyGenerator> = Arc::new(SyntaxKeyGenerator::new(Arc::new(Schema::new())));
        let store = Arc::new(MemoryIndexStore::new(Arc::clone(&keys)));
        let config = PlannerConfig {
            allids_threshold: 0,
            ..Default::default()
        };
        let err = Backend::new(suffix(), store, keys, config).unwrap_err();
        assert!(matches!(err, crate::planner::PlannerError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_not_evaluable_filter_has_no_candidates() {
        let b = backend(PlannerConfig::default());
        let mut ctx = b.search_context(suffix());
        let f = parse("(cn=**)").unwrap();
        assert_eq!(b.filter_candidates(&f, &mut ctx, None).unwrap(), IdList::empty());
    }

    #[test]
    fn test_presence_fallback_scans_equality_index() {
        let b = backend(PlannerConfig::default());
        let mut ctx = b.search_context(suffix());
        let f = parse("(nsCpEntryDN=*)").unwrap();
        assert_eq!(b.filter_candidates(&f, &mut ctx, None).unwrap(), IdList::from_ids([1]));
    }

    #[test]
    fn test_vlv_consulted_when_enabled() {
        let vlv = Arc::new(VlvSearchList::new());
        vlv.add("by-sn", suffix(), parse("(sn=x)").unwrap(), IdList::from_ids([7]));

        let b = backend(PlannerConfig::default()).with_vlv(vlv.clone());
        let mut ctx = b.search_context(suffix());
        let f = parse("(sn=x)").unwrap();
        assert_eq!(b.filter_candidates(&f, &mut ctx, None).unwrap(), IdList::from_ids([7]));
        assert!(!ctx.notes().unindexed);

        let config = PlannerConfig {
            use_vlv: false,
            ..Default::default()
        };
        let b = backend(config).with_vlv(vlv);
        let mut ctx = b.search_context(suffix());
        assert_eq!(b.filter_candidates(&f, &mut ctx, None).unwrap(), IdList::allids());
        assert!(ctx.notes().unindexed);
    }

    #[test]
    fn test_key_stats_recorded_when_configured() {
        let config = PlannerConfig {
            record_key_stats: true,
            ..Default::default()
        };
        let b = backend(config);
        let mut ctx = b.search_context(suffix());
        let f = parse("(cn=alice)").unwrap();
        b.filter_candidates(&f, &mut ctx, None).unwrap();

        let stats = ctx.key_stats().unwrap();
        assert_eq!(stats.lookups.len(), 1);
        assert_eq!(stats.lookups[0].attr, "cn");
        assert_eq!(stats.lookups[0].id_count, Some(1));
    }

    #[test]
    fn test_search_candidates_uses_plugin_and_releases() {
        let registry = IndexRegistry::new(Arc::new(SuffixResolver::new([suffix()])));
        registry.register_plugin("sn-index", None).unwrap();
        registry
            .register_index(
                "sn-index",
                IndexDescriptor::new("(sn=**)", suffix())
                    .with_lookup(|_: &Filter, _: &Dn| Some(IdList::from_ids([2]))),
            )
            .unwrap();

        let b = backend(PlannerConfig::default());
        let mut ctx = b.search_context(suffix());
        let mut f = parse("(sn=smith)").unwrap();
        let ids = b.search_candidates(&registry, &mut f, &mut ctx).unwrap();
        assert_eq!(ids, IdList::from_ids([2]));
        assert!(f.is_released());
        assert!(!ctx.notes().unindexed);
    }
}
