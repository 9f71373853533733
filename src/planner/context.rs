//! Per-search state
//!
//! Inputs the evaluator reads (base, namespace, paging, limits, the abandon
//! flag) and the side channels it writes (operation notes, the
//! filter-test flag, key lookup statistics).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::dn::Dn;
use crate::idlist::IdList;
use crate::storage::{IndexKey, IndexKind};

use super::errors::{PlannerError, PlannerResult};

/// Notes surfaced to the operation log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationNotes {
    /// Some part of the filter could not use an index
    pub unindexed: bool,
    /// The filter named an attribute undefined in schema
    pub filter_invalid: bool,
}

/// Paged-results state of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResults {
    pub page_size: usize,
    /// Set when evaluation fell back to unindexed candidates
    pub unindexed: bool,
}

/// One key read by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookupStat {
    pub attr: String,
    pub kind: IndexKind,
    pub key: IndexKey,
    /// `None` when the read returned ALLIDS
    pub id_count: Option<usize>,
}

/// Key lookups of one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyLookupStats {
    pub lookups: Vec<KeyLookupStat>,
    pub elapsed: Duration,
}

/// State of one search operation.
#[derive(Debug)]
pub struct SearchContext {
    base: Dn,
    namespace: Dn,
    paged: Option<PagedResults>,
    allids_limit: Option<usize>,
    abandon: Arc<AtomicBool>,
    notes: OperationNotes,
    must_apply_filter_test: bool,
    key_stats: Option<KeyLookupStats>,
}

impl SearchContext {
    /// `namespace` is the suffix of the backend being searched.
    pub fn new(base: Dn, namespace: Dn) -> Self {
        Self {
            base,
            namespace,
            paged: None,
            allids_limit: None,
            abandon: Arc::new(AtomicBool::new(false)),
            notes: OperationNotes::default(),
            must_apply_filter_test: false,
            key_stats: None,
        }
    }

    /// Marks the search as paged.
    pub fn paged(mut self, page_size: usize) -> Self {
        self.paged = Some(PagedResults {
            page_size,
            unindexed: false,
        });
        self
    }

    /// Per-connection ALLIDS limit overriding the configured threshold.
    pub fn with_allids_limit(mut self, limit: usize) -> Self {
        self.allids_limit = Some(limit);
        self
    }

    /// Shares an abandon flag with the connection layer.
    pub fn with_abandon_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abandon = flag;
        self
    }

    /// Handle the connection layer sets to abandon this search.
    pub fn abandon_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abandon)
    }

    pub fn base(&self) -> &Dn {
        &self.base
    }

    pub fn namespace(&self) -> &Dn {
        &self.namespace
    }

    pub fn paged_results(&self) -> Option<&PagedResults> {
        self.paged.as_ref()
    }

    pub fn is_paged(&self) -> bool {
        self.paged.is_some()
    }

    pub fn allids_limit_override(&self) -> Option<usize> {
        self.allids_limit
    }

    pub fn notes(&self) -> OperationNotes {
        self.notes
    }

    /// True if candidates may include non-matching entries beyond what the
    /// filter test would catch anyway (a shortcut skipped work).
    pub fn must_apply_filter_test(&self) -> bool {
        self.must_apply_filter_test
    }

    pub fn key_stats(&self) -> Option<&KeyLookupStats> {
        self.key_stats.as_ref()
    }

    /// Starts recording key lookups.
    pub fn enable_key_stats(&mut self) {
        if self.key_stats.is_none() {
            self.key_stats = Some(KeyLookupStats::default());
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandon.load(Ordering::Acquire)
    }

    pub(crate) fn check_abandoned(&self) -> PlannerResult<()> {
        if self.is_abandoned() {
            Err(PlannerError::Abandoned)
        } else {
            Ok(())
        }
    }

    pub(crate) fn note_unindexed(&mut self) {
        self.notes.unindexed = true;
        if let Some(paged) = self.paged.as_mut() {
            paged.unindexed = true;
        }
    }

    pub(crate) fn note_filter_invalid(&mut self) {
        self.notes.filter_invalid = true;
    }

    pub(crate) fn set_must_apply_filter_test(&mut self) {
        self.must_apply_filter_test = true;
    }

    pub(crate) fn record_key_lookup(&mut self, attr: &str, kind: &IndexKind, key: &IndexKey, ids: &IdList) {
        if let Some(stats) = self.key_stats.as_mut() {
            stats.lookups.push(KeyLookupStat {
                attr: attr.to_string(),
                kind: kind.clone(),
                key: key.clone(),
                id_count: ids.ids().map(<[u64]>::len),
            });
        }
    }

    pub(crate) fn add_key_lookup_time(&mut self, elapsed: Duration) {
        if let Some(stats) = self.key_stats.as_mut() {
            stats.elapsed += elapsed;
        }
    }
}
