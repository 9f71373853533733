//! Virtual list view indexes
//!
//! A VLV search is a pre-built candidate list for one (base, filter) pair.
//! A search whose base and filter equal a registered VLV search can take
//! its list instead of evaluating the filter.

use parking_lot::RwLock;
use tracing::debug;

use crate::dn::Dn;
use crate::filter::Filter;
use crate::idlist::IdList;

/// VLV lookup used by the candidate evaluator.
pub trait VlvIndex: Send + Sync {
    /// Candidates of a VLV search matching `base` and `filter`, if any.
    fn find_index_by_filter(&self, base: &Dn, filter: &Filter) -> Option<IdList>;
}

#[derive(Debug, Clone)]
struct VlvSearch {
    name: String,
    base: Dn,
    filter: Filter,
    ids: IdList,
    online: bool,
}

/// Registered VLV searches.
#[derive(Debug, Default)]
pub struct VlvSearchList {
    searches: RwLock<Vec<VlvSearch>>,
}

impl VlvSearchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a named VLV search.
    pub fn add(&self, name: &str, base: Dn, filter: Filter, ids: IdList) {
        let mut searches = self.searches.write();
        searches.retain(|s| s.name != name);
        searches.push(VlvSearch {
            name: name.to_string(),
            base,
            filter,
            ids,
            online: true,
        });
    }

    /// Takes a VLV index offline (e.g. while it is rebuilt) or back online.
    pub fn set_online(&self, name: &str, online: bool) -> bool {
        let mut searches = self.searches.write();
        match searches.iter_mut().find(|s| s.name == name) {
            Some(search) => {
                search.online = online;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.searches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.read().is_empty()
    }
}

impl VlvIndex for VlvSearchList {
    fn find_index_by_filter(&self, base: &Dn, filter: &Filter) -> Option<IdList> {
        let searches = self.searches.read();
        let search = searches
            .iter()
            .find(|s| s.online && s.base == *base && s.filter == *filter)?;
        debug!(vlv = %search.name, count = search.ids.len(), "using vlv index");
        Some(search.ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse;

    #[test]
    fn test_match_on_base_and_filter() {
        let list = VlvSearchList::new();
        let base = Dn::new("ou=people,dc=example,dc=com");
        list.add("by-sn", base.clone(), parse("(objectclass=person)").unwrap(), IdList::from_ids([1, 2]));

        let hit = list.find_index_by_filter(&base, &parse("(objectClass=person)").unwrap());
        assert!(hit.is_none(), "attribute spelling is part of the filter");

        let hit = list.find_index_by_filter(&base, &parse("(objectclass=person)").unwrap());
        assert_eq!(hit, Some(IdList::from_ids([1, 2])));

        let other = Dn::new("dc=example,dc=com");
        assert!(list
            .find_index_by_filter(&other, &parse("(objectclass=person)").unwrap())
            .is_none());
    }

    #[test]
    fn test_offline_search_is_skipped() {
        let list = VlvSearchList::new();
        let base = Dn::new("dc=example,dc=com");
        let filter = parse("(cn=*)").unwrap();
        list.add("all", base.clone(), filter.clone(), IdList::from_ids([9]));
        assert!(list.set_online("all", false));
        assert!(list.find_index_by_filter(&base, &filter).is_none());
        assert!(!list.set_online("missing", true));
    }
}
