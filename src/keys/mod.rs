//! Key derivation for attribute indexes
//!
//! Turns assertion values into normalized index keys: equality keys per
//! attribute syntax, phonetic keys for approximate match, anchored n-gram
//! keys for substrings, and matching-rule keys for extensible filters.
//!
//! # Invariants
//!
//! - Stored values and assertions are keyed by the same functions
//! - An entry matching an assertion carries every key the assertion yields
//! - No keys means "cannot use the index", never "no match"

mod generator;
mod rules;
mod syntax;

pub use generator::{
    approx_keys, phonetic, ExtensibleIndex, KeyGenerator, SubstringKeyConfig, SyntaxKeyGenerator,
};
pub use rules::{builtin_rules, MatchingRule, SyntaxRule};
pub use syntax::{Schema, Syntax};
