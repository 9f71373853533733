//! Filter candidate evaluation
//!
//! Each node is tried, in order, against the index plugin registry, the
//! VLV indexes and finally the backend's attribute indexes. Results are
//! over-approximations: ALLIDS is always a legal answer, a missing true
//! match never is.
//!
//! Internally `None` means a node could not be evaluated at all (malformed
//! assertion). An AND containing such a child yields `None`; an OR treats
//! it as ALLIDS.

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::filter::{attr, ExtensibleAssertion, Filter, FilterChoice, FilterKind};
use crate::idlist::{intersection, notin, union, IdList};
use crate::index::{Evaluation, RegistryReader};
use crate::keys::KeyGenerator;
use crate::storage::{IndexKey, IndexKind, IndexRead, IndexStore, KeyRange, RangeOp, VlvIndex};

use super::config::PlannerConfig;
use super::context::SearchContext;
use super::errors::PlannerResult;
use super::range::{self, BoundedRange};

/// Candidate evaluator for one search.
pub(crate) struct CandidateEvaluator<'a, 'r> {
    store: &'a dyn IndexStore,
    keys: &'a dyn KeyGenerator,
    vlv: Option<&'a dyn VlvIndex>,
    config: &'a PlannerConfig,
    registry: Option<&'a RegistryReader<'r>>,
    allids_limit: usize,
}

impl<'a, 'r> CandidateEvaluator<'a, 'r> {
    pub(crate) fn new(
        store: &'a dyn IndexStore,
        keys: &'a dyn KeyGenerator,
        vlv: Option<&'a dyn VlvIndex>,
        config: &'a PlannerConfig,
        registry: Option<&'a RegistryReader<'r>>,
        allids_limit: usize,
    ) -> Self {
        Self {
            store,
            keys,
            vlv,
            config,
            registry,
            allids_limit,
        }
    }

    /// Candidates of one filter node.
    pub(crate) fn candidates(
        &self,
        filter: &Filter,
        ctx: &mut SearchContext,
    ) -> PlannerResult<Option<IdList>> {
        // 1. Index plugin decoder
        if let Some(registry) = self.registry.filter(|_| filter.has_decoder()) {
            if let Evaluation::Evaluated(ids) = registry.evaluate(filter, ctx.namespace()) {
                return Ok(Some(ids));
            }
        }

        // 2. VLV index for this exact filter
        if let Some(vlv) = self.vlv.filter(|_| self.config.use_vlv) {
            if let Some(ids) = vlv.find_index_by_filter(ctx.base(), filter) {
                debug!(filter = %filter, ids = ids.len(), "candidates from vlv index");
                return Ok(Some(ids));
            }
        }

        // 3. Attribute indexes
        let result = match filter.kind() {
            FilterKind::Equality(_) => self.ava_candidates(filter, FilterChoice::Equality, ctx)?,
            FilterKind::Approx(_) => self.ava_candidates(filter, FilterChoice::Approx, ctx)?,
            FilterKind::Ge(_) => self.ava_candidates(filter, FilterChoice::Ge, ctx)?,
            FilterKind::Le(_) => self.ava_candidates(filter, FilterChoice::Le, ctx)?,
            FilterKind::Present(_) => self.presence_candidates(filter, ctx)?,
            FilterKind::Substrings(_) => self.substring_candidates(filter, ctx)?,
            FilterKind::Extensible(assertion) => {
                Some(self.extensible_candidates(filter, assertion, ctx)?)
            }
            FilterKind::And(children) => self.list_candidates(FilterChoice::And, children, ctx)?,
            FilterKind::Or(children) => self.list_candidates(FilterChoice::Or, children, ctx)?,
            FilterKind::Not(_) => Some(IdList::allids()),
        };

        trace!(
            filter = %filter,
            ids = result.as_ref().map(IdList::len),
            "filter candidates"
        );
        Ok(result)
    }

    /// Applies the invalid-attribute flags. Returns true if the node must
    /// yield no candidates.
    fn rejected_by_policy(&self, filter: &Filter, ctx: &mut SearchContext) -> bool {
        let flags = filter.flags();
        if flags.invalid_attr_warn {
            warn!(filter = %filter, "filter contains an invalid attribute");
            ctx.note_filter_invalid();
        }
        if flags.invalid_attr_undefine {
            debug!(filter = %filter, "rejecting invalid filter per policy");
        }
        flags.invalid_attr_undefine
    }

    fn note_read(&self, read: &IndexRead, ctx: &mut SearchContext) {
        if read.unindexed {
            ctx.note_unindexed();
        }
    }

    /// Equality, approx, GE and LE.
    fn ava_candidates(
        &self,
        filter: &Filter,
        choice: FilterChoice,
        ctx: &mut SearchContext,
    ) -> PlannerResult<Option<IdList>> {
        let Ok((attr, value)) = filter.get_ava() else {
            debug!(filter = %filter, "assertion has no attribute or value");
            return Ok(None);
        };

        if self.rejected_by_policy(filter, ctx) {
            return Ok(Some(IdList::empty()));
        }

        let kind = match choice {
            FilterChoice::Ge => return self.range_candidates(attr, Some(value), None, ctx).map(Some),
            FilterChoice::Le => return self.range_candidates(attr, None, Some(value), ctx).map(Some),
            FilterChoice::Approx => IndexKind::Approx,
            _ => IndexKind::Equality,
        };

        let keys = self.keys.assertion_to_keys(attr, value, choice);
        if keys.is_empty() {
            trace!(attr = %attr, kind = %kind, "no keys, ALLIDS");
            ctx.note_unindexed();
            return Ok(Some(IdList::allids()));
        }

        self.keys_to_idl(attr, &kind, RangeOp::Equal, &keys, ctx).map(Some)
    }

    fn presence_candidates(
        &self,
        filter: &Filter,
        ctx: &mut SearchContext,
    ) -> PlannerResult<Option<IdList>> {
        let Ok(attr) = filter.get_type() else {
            return Ok(None);
        };

        if self.rejected_by_policy(filter, ctx) {
            return Ok(Some(IdList::empty()));
        }

        let read = self
            .store
            .read(attr, &IndexKind::Presence, None, self.allids_limit)?;
        self.note_read(&read, ctx);

        let coarse = self
            .config
            .presence_range_fallback
            .iter()
            .any(|a| a.eq_ignore_ascii_case(attr));
        if read.ids.is_allids() && coarse {
            debug!(attr = %attr, "presence index gave ALLIDS, scanning equality index");
            let range = KeyRange::at_least(IndexKey::empty());
            let read = self
                .store
                .range_read(attr, &IndexKind::Equality, &range, self.allids_limit)?;
            return Ok(Some(read.ids));
        }

        Ok(Some(read.ids))
    }

    fn substring_candidates(
        &self,
        filter: &Filter,
        ctx: &mut SearchContext,
    ) -> PlannerResult<Option<IdList>> {
        let Ok(sub) = filter.get_subfilt() else {
            debug!(filter = %filter, "substring filter has no pieces");
            return Ok(None);
        };

        if self.rejected_by_policy(filter, ctx) {
            return Ok(Some(IdList::empty()));
        }

        let keys = self.keys.assertion_to_keys_sub(sub);
        if keys.is_empty() {
            trace!(attr = %sub.attr, "no substring keys, ALLIDS");
            ctx.note_unindexed();
            return Ok(Some(IdList::allids()));
        }

        self.keys_to_idl(&sub.attr, &IndexKind::Substring, RangeOp::Equal, &keys, ctx)
            .map(Some)
    }

    /// Per assertion value: intersect the key results. Across values: union.
    fn extensible_candidates(
        &self,
        filter: &Filter,
        assertion: &ExtensibleAssertion,
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        if self.rejected_by_policy(filter, ctx) {
            return Ok(IdList::empty());
        }

        let Some(plan) = self.keys.extensible_index(assertion) else {
            trace!(filter = %filter, "extensible filter not indexable");
            ctx.note_unindexed();
            return Ok(IdList::allids());
        };

        let mut result: Option<IdList> = None;
        for keys in &plan.keys_per_value {
            let ids = if keys.is_empty() {
                ctx.note_unindexed();
                IdList::allids()
            } else {
                self.keys_to_idl(&plan.attr, &plan.kind, plan.operator, keys, ctx)?
            };
            result = Some(match result {
                None => ids,
                Some(prev) => union(&prev, &ids),
            });
            if result.as_ref().is_some_and(IdList::is_allids) {
                break;
            }
        }

        Ok(result.unwrap_or_else(IdList::allids))
    }

    /// Reads every key and intersects the results. An empty intermediate
    /// result ends the scan.
    fn keys_to_idl(
        &self,
        attr: &str,
        kind: &IndexKind,
        operator: RangeOp,
        keys: &[IndexKey],
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        let started = Instant::now();
        let mut acc: Option<IdList> = None;

        for key in keys {
            let read = match operator {
                RangeOp::Equal => self.store.read(attr, kind, Some(key), self.allids_limit)?,
                op => {
                    let range = KeyRange::from_op(op, key.clone());
                    self.store.range_read(attr, kind, &range, self.allids_limit)?
                }
            };
            trace!(attr = %attr, kind = %kind, key = %key, ids = read.ids.len(), "key read");
            ctx.record_key_lookup(attr, kind, key, &read.ids);
            self.note_read(&read, ctx);

            let ids = match acc {
                None => read.ids,
                Some(prev) => intersection(&prev, &read.ids),
            };
            let done = ids.is_empty();
            acc = Some(ids);
            if done {
                break;
            }
        }

        ctx.add_key_lookup_time(started.elapsed());
        Ok(acc.unwrap_or_else(IdList::allids))
    }

    /// One range scan over the equality index.
    fn range_candidates(
        &self,
        attr: &str,
        low: Option<&str>,
        high: Option<&str>,
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        let low_keys = low.map(|v| self.keys.assertion_to_keys(attr, v, FilterChoice::Equality));
        let high_keys = high.map(|v| self.keys.assertion_to_keys(attr, v, FilterChoice::Equality));

        let Some(range) = range::key_range(low_keys, high_keys) else {
            trace!(attr = %attr, "range bound has no keys, ALLIDS");
            ctx.note_unindexed();
            return Ok(IdList::allids());
        };

        let read = self
            .store
            .range_read(attr, &IndexKind::Equality, &range, self.allids_limit)?;
        self.note_read(&read, ctx);
        trace!(attr = %attr, ids = read.ids.len(), "range read");
        Ok(read.ids)
    }

    fn bounded_range_candidates(
        &self,
        children: &[Filter],
        pair: &BoundedRange<'_>,
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        let rejected_low = self.rejected_by_policy(&children[pair.ge], ctx);
        let rejected_high = self.rejected_by_policy(&children[pair.le], ctx);
        if rejected_low || rejected_high {
            return Ok(IdList::empty());
        }
        self.range_candidates(pair.attr, Some(pair.low), Some(pair.high), ctx)
    }

    /// `(!(attr=value))` inside an AND: the child's equality candidates are
    /// subtracted from the running result.
    fn negated_equality(child: &Filter) -> Option<&Filter> {
        match child.kind() {
            FilterKind::Not(inner) if inner.choice() == FilterChoice::Equality => Some(inner),
            _ => None,
        }
    }

    fn subtract_negated(
        &self,
        acc: IdList,
        negated: &Filter,
        ctx: &mut SearchContext,
    ) -> PlannerResult<IdList> {
        // Subtyped values are not in the index.
        let excluded = match negated.attribute() {
            Some(a) if attr::has_subtype(a) => Some(IdList::allids()),
            _ => self.ava_candidates(negated, FilterChoice::Equality, ctx)?,
        };

        let Some(excluded) = excluded else {
            return Ok(acc);
        };
        if acc.is_allids() || excluded.is_allids() {
            trace!(filter = %negated, "NOT subtraction skipped");
            ctx.set_must_apply_filter_test();
            return Ok(acc);
        }
        Ok(notin(&acc, &excluded).unwrap_or(acc))
    }

    fn list_candidates(
        &self,
        choice: FilterChoice,
        children: &[Filter],
        ctx: &mut SearchContext,
    ) -> PlannerResult<Option<IdList>> {
        let is_and = choice == FilterChoice::And;
        let pair = if is_and {
            range::bounded_range_pair(children)
        } else {
            None
        };

        if let Some(pair) = pair.as_ref().filter(|_| children.len() == 2) {
            debug!(attr = %pair.attr, low = %pair.low, high = %pair.high, "bounded range");
            return self.bounded_range_candidates(children, pair, ctx).map(Some);
        }

        let mut acc: Option<IdList> = None;
        // AND below the filter test threshold: remaining positive children
        // are skipped, negated equalities are still subtracted.
        let mut narrowed = false;
        for (position, child) in children.iter().enumerate() {
            let remaining = children.len() - position - 1;

            if is_and {
                let negated = Self::negated_equality(child);
                if pair.is_some_and(|p| p.skipped_at() == position) || (narrowed && negated.is_none()) {
                    continue;
                }

                let ids = if let Some(negated) = negated {
                    let current = acc.take().unwrap_or_else(IdList::allids);
                    acc = Some(self.subtract_negated(current, negated, ctx)?);
                    ctx.check_abandoned()?;
                    continue;
                } else if let Some(p) = pair.as_ref().filter(|p| p.evaluated_at() == position) {
                    self.bounded_range_candidates(children, p, ctx)?
                } else {
                    match self.candidates(child, ctx)? {
                        Some(ids) => ids,
                        None => {
                            trace!(filter = %child, "AND child not computable");
                            return Ok(None);
                        }
                    }
                };

                let next = match acc.take() {
                    None => ids,
                    Some(prev) => intersection(&prev, &ids),
                };
                ctx.check_abandoned()?;

                if next.is_empty() {
                    return Ok(Some(next));
                }
                let threshold = self.config.filter_test_threshold;
                if remaining > 0 && !next.is_allids() && threshold > 0 && next.len() <= threshold {
                    debug!(ids = next.len(), threshold, "AND below filter test threshold");
                    ctx.set_must_apply_filter_test();
                    narrowed = true;
                }
                acc = Some(next);
            } else {
                let ids = self.candidates(child, ctx)?.unwrap_or_else(IdList::allids);
                let mut next = match acc.take() {
                    None => ids,
                    Some(prev) => union(&prev, &ids),
                };
                ctx.check_abandoned()?;

                if ctx.is_paged() && self.allids_limit > 0 && next.len() > self.allids_limit {
                    debug!(limit = self.allids_limit, "paged OR over ALLIDS limit");
                    next = IdList::allids();
                }
                if next.is_allids() {
                    if remaining > 0 {
                        debug!("OR reached ALLIDS, stopping");
                    }
                    ctx.set_must_apply_filter_test();
                    return Ok(Some(next));
                }
                acc = Some(next);
            }
        }

        Ok(Some(acc.unwrap_or_else(|| {
            if is_and {
                IdList::allids()
            } else {
                IdList::empty()
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::entry::Entry;
    use crate::filter::{parse, FilterFlags};
    use crate::keys::{Schema, Syntax, SyntaxKeyGenerator};
    use crate::storage::MemoryIndexStore;
    use std::sync::Arc;

    struct Fixture {
        store: MemoryIndexStore,
        keys: SyntaxKeyGenerator,
        config: PlannerConfig,
    }

    fn fixture() -> Fixture {
        let schema = Arc::new(Schema::new().with_syntax("age", Syntax::Integer));
        let keys = SyntaxKeyGenerator::new(schema);
        let mut store = MemoryIndexStore::new(Arc::new(keys.clone()))
            .with_index("objectclass", [IndexKind::Equality])
            .with_index(
                "cn",
                [IndexKind::Equality, IndexKind::Presence, IndexKind::Substring, IndexKind::Approx],
            )
            .with_index(
                "age",
                [IndexKind::Equality, IndexKind::MatchingRule("2.5.13.15".into())],
            );
        store.rebuild(&[
            Entry::new(1).with("objectclass", "person").with("cn", "alice").with("age", "30"),
            Entry::new(2).with("objectclass", "person").with("cn", "bob").with("age", "70"),
            Entry::new(3).with("objectclass", "person").with("cn", "carol").with("age", "18"),
        ]);
        Fixture {
            store,
            keys,
            config: PlannerConfig::default(),
        }
    }

    fn ctx() -> SearchContext {
        let base = Dn::new("dc=example,dc=com");
        SearchContext::new(base.clone(), base)
    }

    fn eval(fx: &Fixture, filter: &str, ctx: &mut SearchContext) -> Option<IdList> {
        let f = parse(filter).unwrap();
        CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 4000)
            .candidates(&f, ctx)
            .unwrap()
    }

    #[test]
    fn test_equality() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn=Bob)", &mut c), Some(IdList::from_ids([2])));
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_unindexed_attribute_is_allids() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(sn=x)", &mut c), Some(IdList::allids()));
        assert!(c.notes().unindexed);
    }

    #[test]
    fn test_ge_le() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(age>=30)", &mut c), Some(IdList::from_ids([1, 2])));
        assert_eq!(eval(&fx, "(age<=30)", &mut c), Some(IdList::from_ids([1, 3])));
    }

    #[test]
    fn test_substring() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn=*aro*)", &mut c), Some(IdList::from_ids([3])));

        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn=*o*)", &mut c), Some(IdList::allids()));
        assert!(c.notes().unindexed);
    }

    #[test]
    fn test_presence() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn=*)", &mut c), Some(IdList::from_ids([1, 2, 3])));
    }

    #[test]
    fn test_and_not_subtraction() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(
            eval(&fx, "(&(objectClass=person)(!(cn=bob)))", &mut c),
            Some(IdList::from_ids([1, 3]))
        );
    }

    #[test]
    fn test_leading_not_degenerates_to_allids() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(&(!(cn=bob)))", &mut c), Some(IdList::allids()));
        assert!(c.must_apply_filter_test());
    }

    #[test]
    fn test_subtype_not_contributes_nothing() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(
            eval(&fx, "(&(objectclass=person)(!(cn;lang-fr=bob)))", &mut c),
            Some(IdList::from_ids([1, 2, 3]))
        );
        assert!(c.must_apply_filter_test());
    }

    #[test]
    fn test_and_threshold_stops_early() {
        let mut fx = fixture();
        fx.config.filter_test_threshold = 1;
        let mut c = ctx();
        // (sn=x) would be unindexed; it is never read.
        assert_eq!(eval(&fx, "(&(cn=alice)(sn=x))", &mut c), Some(IdList::from_ids([1])));
        assert!(c.must_apply_filter_test());
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_and_empty_child_short_circuits() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(&(cn=nobody)(sn=x))", &mut c), Some(IdList::empty()));
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_or_allids_stops() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(|(sn=x)(cn=alice))", &mut c), Some(IdList::allids()));
        assert!(c.must_apply_filter_test());
    }

    #[test]
    fn test_paged_or_capped_by_allids_limit() {
        let fx = fixture();
        let f = parse("(|(cn=alice)(cn=bob))").unwrap();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 1);

        let mut c = ctx();
        assert_eq!(evaluator.candidates(&f, &mut c).unwrap(), Some(IdList::from_ids([1, 2])));

        let mut c = ctx().paged(10);
        assert_eq!(evaluator.candidates(&f, &mut c).unwrap(), Some(IdList::allids()));
    }

    #[test]
    fn test_empty_lists() {
        let fx = fixture();
        let mut c = ctx();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 0);
        assert_eq!(
            evaluator.candidates(&Filter::and(Vec::new()), &mut c).unwrap(),
            Some(IdList::allids())
        );
        assert_eq!(
            evaluator.candidates(&Filter::or(Vec::new()), &mut c).unwrap(),
            Some(IdList::empty())
        );
    }

    #[test]
    fn test_malformed_child() {
        let fx = fixture();
        let mut c = ctx();
        let malformed = parse("(cn=**)").unwrap();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 0);

        let and = Filter::and(vec![malformed.clone(), Filter::eq("cn", "alice")]);
        assert_eq!(evaluator.candidates(&and, &mut c).unwrap(), None);

        let or = Filter::or(vec![Filter::eq("cn", "alice"), malformed]);
        assert_eq!(evaluator.candidates(&or, &mut c).unwrap(), Some(IdList::allids()));
    }

    #[test]
    fn test_policy_flags() {
        let fx = fixture();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 0);

        let mut c = ctx();
        let warn = Filter::eq("cn", "alice").with_flags(FilterFlags {
            invalid_attr_warn: true,
            invalid_attr_undefine: false,
        });
        assert_eq!(evaluator.candidates(&warn, &mut c).unwrap(), Some(IdList::from_ids([1])));
        assert!(c.notes().filter_invalid);

        let mut c = ctx();
        let undefine = Filter::present("cn").with_flags(FilterFlags {
            invalid_attr_warn: false,
            invalid_attr_undefine: true,
        });
        assert_eq!(evaluator.candidates(&undefine, &mut c).unwrap(), Some(IdList::empty()));
        assert!(!c.notes().filter_invalid);
    }

    #[test]
    fn test_policy_rejects_unkeyable_substring() {
        let fx = fixture();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 0);

        let mut c = ctx();
        let short = parse("(cn=*o*)").unwrap().with_flags(FilterFlags {
            invalid_attr_warn: false,
            invalid_attr_undefine: true,
        });
        assert_eq!(evaluator.candidates(&short, &mut c).unwrap(), Some(IdList::empty()));
        assert!(!c.notes().unindexed);

        let mut c = ctx();
        let unknown_rule = parse("(cn:1.2.3.4:=x)").unwrap().with_flags(FilterFlags {
            invalid_attr_warn: false,
            invalid_attr_undefine: true,
        });
        assert_eq!(evaluator.candidates(&unknown_rule, &mut c).unwrap(), Some(IdList::empty()));
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_approx() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn~=caroll)", &mut c), Some(IdList::from_ids([3])));
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_extensible_without_rule() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn:=ALICE)", &mut c), Some(IdList::from_ids([1])));
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_extensible_ordering_rule() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(
            eval(&fx, "(age:integerOrderingMatch:=30)", &mut c),
            Some(IdList::from_ids([3]))
        );
        assert!(!c.notes().unindexed);
    }

    #[test]
    fn test_extensible_not_indexable() {
        let fx = fixture();
        let mut c = ctx();
        assert_eq!(eval(&fx, "(cn:1.2.3.4:=x)", &mut c), Some(IdList::allids()));
        assert!(c.notes().unindexed);

        let mut c = ctx();
        assert_eq!(eval(&fx, "(:caseIgnoreMatch:=x)", &mut c), Some(IdList::allids()));
        assert!(c.notes().unindexed);
    }

    #[test]
    fn test_abandon_between_children() {
        let fx = fixture();
        let mut c = ctx();
        c.abandon_handle().store(true, std::sync::atomic::Ordering::Release);
        let f = parse("(|(cn=alice)(cn=bob))").unwrap();
        let evaluator = CandidateEvaluator::new(&fx.store, &fx.keys, None, &fx.config, None, 0);
        assert_eq!(
            evaluator.candidates(&f, &mut c),
            Err(crate::planner::PlannerError::Abandoned)
        );
    }
}
