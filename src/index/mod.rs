//! Index plugin subsystem
//!
//! Plugins register indexes that can answer presence, equality or substring
//! filters on an attribute within one backend. Before a search runs, every
//! simple filter node is given a decoder chain of matching indexes, and
//! list nodes are regrouped so one index can claim as large a subtree as
//! possible.
//!
//! # Design Principles
//!
//! - Explicit handle: the registry is created and shared by the caller
//! - Read-mostly: searches hold a read guard, registration takes the write lock
//! - Decoder identity is identity of the primary index entry
//!
//! # Invariants
//!
//! - Most recently registered plugin is consulted first
//! - A disabled index never blocks another plugin from claiming a filter
//! - Grouping conserves the multiset of leaf filters
//! - Decoders are released on every exit path

mod decoder;
mod errors;
mod grouping;
mod registry;

pub use decoder::{DecoderChain, DescriptorKind, IndexEntry, IndexLookup};
pub use errors::{RegistryError, RegistryResult};
pub use grouping::{flatten_filter, AssignedFilter};
pub use registry::{
    Evaluation, IndexDescriptor, IndexRegistry, PluginValidator, RegistryReader,
};
