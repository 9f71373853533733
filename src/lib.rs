//! aerodir - index-backed filter resolution for a directory server
//!
//! Resolves LDAP search filters into candidate entry-ID lists:
//! index plugins claim filter subtrees, the rest is answered from
//! attribute indexes, and anything unindexable degrades to ALLIDS.

pub mod dn;
pub mod entry;
pub mod filter;
pub mod idlist;
pub mod index;
pub mod keys;
pub mod planner;
pub mod storage;
