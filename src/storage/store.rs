//! Storage index contract
//!
//! The candidate evaluator reads postings through `IndexStore`. A store
//! answers ALLIDS when a key's posting list exceeds the caller's limit, and
//! flags a read `unindexed` when the attribute has no index of the asked kind.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use crate::idlist::IdList;

use super::btree::IndexKey;
use super::errors::StoreResult;

/// Kind of attribute index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Presence,
    Equality,
    Approx,
    Substring,
    /// Extensible-match index named by rule OID
    MatchingRule(String),
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Presence => write!(f, "pres"),
            IndexKind::Equality => write!(f, "eq"),
            IndexKind::Approx => write!(f, "approx"),
            IndexKind::Substring => write!(f, "sub"),
            IndexKind::MatchingRule(oid) => write!(f, "mr:{}", oid),
        }
    }
}

/// Comparison applied to stored keys relative to an assertion key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl RangeOp {
    /// True if a stored value ordered `ord` relative to the assertion
    /// satisfies this operator.
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            RangeOp::Less => ord == Ordering::Less,
            RangeOp::LessOrEqual => ord != Ordering::Greater,
            RangeOp::Equal => ord == Ordering::Equal,
            RangeOp::GreaterOrEqual => ord != Ordering::Less,
            RangeOp::Greater => ord == Ordering::Greater,
        }
    }
}

/// Key interval for range reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Bound<IndexKey>,
    pub upper: Bound<IndexKey>,
}

impl KeyRange {
    /// `[low, high]`
    pub fn between(low: IndexKey, high: IndexKey) -> Self {
        Self {
            lower: Bound::Included(low),
            upper: Bound::Included(high),
        }
    }

    /// `[low, ∞)`
    pub fn at_least(low: IndexKey) -> Self {
        Self {
            lower: Bound::Included(low),
            upper: Bound::Unbounded,
        }
    }

    /// `(-∞, high]`
    pub fn at_most(high: IndexKey) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Included(high),
        }
    }

    /// Keys standing in relation `op` to `key`.
    pub fn from_op(op: RangeOp, key: IndexKey) -> Self {
        match op {
            RangeOp::Less => Self {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(key),
            },
            RangeOp::LessOrEqual => Self::at_most(key),
            RangeOp::Equal => Self::between(key.clone(), key),
            RangeOp::GreaterOrEqual => Self::at_least(key),
            RangeOp::Greater => Self {
                lower: Bound::Excluded(key),
                upper: Bound::Unbounded,
            },
        }
    }

    /// True if no key can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        let (lo, lo_inclusive) = match &self.lower {
            Bound::Included(k) => (k, true),
            Bound::Excluded(k) => (k, false),
            Bound::Unbounded => return false,
        };
        let (hi, hi_inclusive) = match &self.upper {
            Bound::Included(k) => (k, true),
            Bound::Excluded(k) => (k, false),
            Bound::Unbounded => return false,
        };
        match lo.cmp(hi) {
            Ordering::Greater => true,
            Ordering::Equal => !(lo_inclusive && hi_inclusive),
            Ordering::Less => false,
        }
    }
}

/// Result of an index read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRead {
    pub ids: IdList,
    /// No index of the requested kind exists for the attribute.
    pub unindexed: bool,
}

impl IndexRead {
    pub fn indexed(ids: IdList) -> Self {
        Self {
            ids,
            unindexed: false,
        }
    }

    pub fn unindexed() -> Self {
        Self {
            ids: IdList::allids(),
            unindexed: true,
        }
    }
}

/// Attribute index storage.
///
/// `allids_limit` of 0 means unlimited.
pub trait IndexStore: Send + Sync {
    /// IDs stored under one key. `None` reads the presence key.
    fn read(
        &self,
        attr: &str,
        kind: &IndexKind,
        key: Option<&IndexKey>,
        allids_limit: usize,
    ) -> StoreResult<IndexRead>;

    /// Union of IDs under every key in `range`, computed in one scan.
    fn range_read(
        &self,
        attr: &str,
        kind: &IndexKind,
        range: &KeyRange,
        allids_limit: usize,
    ) -> StoreResult<IndexRead>;
}
