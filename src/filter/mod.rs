//! Search filters
//!
//! The filter tree the planner evaluates, its string syntax, and the exact
//! filter test.
//!
//! # Design Principles
//!
//! - Owned children: list nodes own a `Vec<Filter>`; restructuring moves
//!   nodes, never clones them
//! - Malformed nodes are reported by accessors (`get_ava`, `get_type`,
//!   `get_subfilt`) and handled by the caller
//! - The decoder slot is scratch state of one search
//!
//! # Invariants
//!
//! - Child-list edits preserve sibling order
//! - `Display` output re-parses to an equal filter

pub mod attr;
mod ast;
mod display;
mod errors;
mod matcher;
mod parser;

pub use ast::{
    Ava, ExtensibleAssertion, Filter, FilterChoice, FilterFlags, FilterKind, SubstringAssertion,
};
pub use errors::{FilterError, FilterResult};
pub use parser::parse;
