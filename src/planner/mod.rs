//! Filter candidate planner
//!
//! Turns a search filter into a candidate ID list for one backend, using
//! index plugins, VLV indexes and attribute indexes in that order.
//!
//! # Design Principles
//!
//! - Over-approximate: candidates are always re-tested against the filter
//! - Unindexed is not an error: it is ALLIDS plus a note on the context
//! - One thread drives one search; only the registry is shared
//!
//! # Invariants
//!
//! - A true match is never missing from the candidate list
//! - An empty AND child makes the AND empty
//! - An abandoned search stops at the next combination boundary

mod backend;
mod candidates;
mod config;
mod context;
mod errors;
mod range;

pub use backend::Backend;
pub use config::PlannerConfig;
pub use context::{KeyLookupStat, KeyLookupStats, OperationNotes, PagedResults, SearchContext};
pub use errors::{ConfigError, ConfigResult, PlannerError, PlannerResult};
pub use range::{bounded_range_pair, key_range, BoundedRange};
