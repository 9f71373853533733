//! Attribute syntaxes and the schema that maps attributes to them
//!
//! A syntax decides how values normalize and order. Index keys and the
//! exact filter test both go through the same syntax, so an entry that
//! matches a filter always carries the keys the filter asks the index for.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::filter::attr;
use crate::storage::IndexKey;

use super::rules::{builtin_rules, MatchingRule};

/// Value syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    /// Case-insensitive string, whitespace runs collapsed
    #[default]
    CaseIgnoreString,
    /// Case-sensitive string, whitespace runs collapsed
    CaseExactString,
    /// Signed 64-bit integer
    Integer,
}

impl Syntax {
    /// Text form used for substring and approximate matching.
    pub fn normalize_text(self, value: &str) -> String {
        let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
        match self {
            Syntax::CaseIgnoreString => collapsed.to_lowercase(),
            Syntax::CaseExactString | Syntax::Integer => collapsed,
        }
    }

    /// Equality/ordering key, or `None` if the value is invalid for the syntax.
    pub fn equality_key(self, value: &str) -> Option<IndexKey> {
        match self {
            Syntax::Integer => value.trim().parse::<i64>().ok().map(IndexKey::from_int),
            _ => Some(IndexKey::from_string(self.normalize_text(value))),
        }
    }

    /// Orders two values; `None` if either is invalid.
    pub fn compare(self, a: &str, b: &str) -> Option<Ordering> {
        Some(self.equality_key(a)?.cmp(&self.equality_key(b)?))
    }
}

/// Attribute-to-syntax map plus the known matching rules.
#[derive(Clone)]
pub struct Schema {
    syntaxes: HashMap<String, Syntax>,
    rules: Vec<Arc<dyn MatchingRule>>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("syntaxes", &self.syntaxes)
            .field("rules", &self.rules.iter().map(|r| r.oid()).collect::<Vec<_>>())
            .finish()
    }
}

impl Schema {
    /// Schema with the built-in matching rules; every attribute defaults to
    /// case-ignore string syntax.
    pub fn new() -> Self {
        Self {
            syntaxes: HashMap::new(),
            rules: builtin_rules(),
        }
    }

    /// Declares an attribute's syntax (builder style).
    pub fn with_syntax(mut self, attr_type: &str, syntax: Syntax) -> Self {
        self.syntaxes
            .insert(attr::base_type(attr_type).to_lowercase(), syntax);
        self
    }

    /// Adds a matching rule. Later rules shadow earlier ones with the same id.
    pub fn with_rule(mut self, rule: Arc<dyn MatchingRule>) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn syntax_of(&self, attr_type: &str) -> Syntax {
        self.syntaxes
            .get(&attr::base_type(attr_type).to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// Looks up a matching rule by OID or name.
    pub fn find_rule(&self, id: &str) -> Option<&Arc<dyn MatchingRule>> {
        self.rules.iter().find(|rule| rule.handles(id))
    }
}
