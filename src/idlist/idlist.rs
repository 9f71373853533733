//! Sorted entry-ID lists with an ALLIDS sentinel.

use std::cmp::Ordering;
use std::fmt;

/// Entry identifier
pub type EntryId = u64;

/// A candidate list.
///
/// `Ids` always holds strictly ascending identifiers.
#[derive(Clone, PartialEq, Eq)]
pub enum IdList {
    /// Every entry is a candidate; do not enumerate.
    AllIds,
    /// Concrete ascending identifiers.
    Ids(Vec<EntryId>),
}

impl IdList {
    /// Creates an empty, growable list. `hint` only sizes the allocation.
    pub fn alloc(hint: usize) -> Self {
        IdList::Ids(Vec::with_capacity(hint))
    }

    /// Creates an empty list.
    pub fn empty() -> Self {
        IdList::Ids(Vec::new())
    }

    /// Creates the ALLIDS sentinel.
    pub fn allids() -> Self {
        IdList::AllIds
    }

    /// Builds a list from arbitrary identifiers, sorting and deduplicating.
    pub fn from_ids(ids: impl IntoIterator<Item = EntryId>) -> Self {
        let mut ids: Vec<EntryId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        IdList::Ids(ids)
    }

    /// Inserts `id` if absent, keeping ascending order.
    ///
    /// Appending past the current maximum is the common case when a store or
    /// plugin builds a list in key order, so that path is checked first.
    /// Inserting into ALLIDS is a no-op.
    pub fn insert(&mut self, id: EntryId) {
        let IdList::Ids(ids) = self else {
            return;
        };
        match ids.last() {
            None => ids.push(id),
            Some(&last) if id > last => ids.push(id),
            Some(_) => {
                if let Err(pos) = ids.binary_search(&id) {
                    ids.insert(pos, id);
                }
            }
        }
    }

    pub fn is_allids(&self) -> bool {
        matches!(self, IdList::AllIds)
    }

    /// Number of concrete members. ALLIDS reports `usize::MAX`, larger
    /// than any real count.
    pub fn len(&self) -> usize {
        match self {
            IdList::AllIds => usize::MAX,
            IdList::Ids(ids) => ids.len(),
        }
    }

    /// True only for a concrete list with no members.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdList::Ids(ids) if ids.is_empty())
    }

    /// Concrete members, or `None` for ALLIDS.
    pub fn ids(&self) -> Option<&[EntryId]> {
        match self {
            IdList::AllIds => None,
            IdList::Ids(ids) => Some(ids),
        }
    }

    /// Membership test; ALLIDS contains everything.
    pub fn contains(&self, id: EntryId) -> bool {
        match self {
            IdList::AllIds => true,
            IdList::Ids(ids) => ids.binary_search(&id).is_ok(),
        }
    }
}

impl Default for IdList {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for IdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdList::AllIds => write!(f, "ALLIDS"),
            IdList::Ids(ids) => f.debug_list().entries(ids).finish(),
        }
    }
}

impl FromIterator<EntryId> for IdList {
    fn from_iter<I: IntoIterator<Item = EntryId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

/// Set intersection. ALLIDS is the identity; inputs are not consumed.
pub fn intersection(a: &IdList, b: &IdList) -> IdList {
    let (a, b) = match (a, b) {
        (IdList::AllIds, other) | (other, IdList::AllIds) => return other.clone(),
        (IdList::Ids(a), IdList::Ids(b)) => (a, b),
    };

    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    IdList::Ids(out)
}

/// Set union. Either side ALLIDS makes the result ALLIDS.
pub fn union(a: &IdList, b: &IdList) -> IdList {
    let (a, b) = match (a, b) {
        (IdList::AllIds, _) | (_, IdList::AllIds) => return IdList::AllIds,
        (IdList::Ids(a), IdList::Ids(b)) => (a, b),
    };

    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    IdList::Ids(out)
}

/// Set difference `a - b`.
///
/// Returns `None` when nothing changed and the caller should keep using `a`:
/// `a` is ALLIDS (nothing enumerable to subtract from), `b` is ALLIDS
/// (an unindexed subtrahend carries no information), or the lists are
/// disjoint.
pub fn notin(a: &IdList, b: &IdList) -> Option<IdList> {
    let (IdList::Ids(a), IdList::Ids(b)) = (a, b) else {
        return None;
    };

    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;
    for &id in a {
        while j < b.len() && b[j] < id {
            j += 1;
        }
        if j < b.len() && b[j] == id {
            continue;
        }
        out.push(id);
    }

    if out.len() == a.len() {
        None
    } else {
        Some(IdList::Ids(out))
    }
}
