//! ID list algebra
//!
//! Candidate lists are ordered sets of entry identifiers, or the ALLIDS
//! sentinel meaning "no index could narrow this; every entry is a candidate".
//!
//! # Invariants
//!
//! - Concrete lists are strictly ascending (no duplicates)
//! - ALLIDS ∩ X = X, ALLIDS ∪ X = ALLIDS
//! - Lists are created per evaluation and never shared across operations

mod idlist;

pub use idlist::{intersection, notin, union, EntryId, IdList};
