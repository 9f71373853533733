//! Storage-side collaborators of the search planner
//!
//! Attribute indexes, backend selection and VLV lists. The planner only
//! sees the traits (`IndexStore`, `BackendResolver`, `VlvIndex`); the
//! in-memory implementations here back the tests and embedded use.
//!
//! # Design Principles
//!
//! - Deterministic: BTreeMap key order, ascending posting lists
//! - Unindexed is a flag on the read, never an error
//! - Range reads are one scan, never several merged reads
//!
//! # Invariants
//!
//! - A posting list above the caller's limit is returned as ALLIDS
//! - Inverted ranges read as empty

mod btree;
mod errors;
mod memory;
mod resolver;
mod store;
mod vlv;

pub use btree::{IndexKey, IndexTree};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryIndexStore;
pub use resolver::{BackendResolver, SuffixResolver};
pub use store::{IndexKind, IndexRead, IndexStore, KeyRange, RangeOp};
pub use vlv::{VlvIndex, VlvSearchList};
