//! Matching rules for extensible match
//!
//! A rule supplies index keys for its assertion values, the operator the
//! index lookup applies to those keys, and the exact comparison used by the
//! filter test.

use std::sync::Arc;

use crate::storage::{IndexKey, RangeOp};

use super::syntax::Syntax;

/// An extensible-match rule.
pub trait MatchingRule: Send + Sync {
    /// Rule OID; also the name of its index.
    fn oid(&self) -> &str;

    /// True if `id` names this rule (OID or descriptive name).
    fn handles(&self, id: &str) -> bool {
        self.oid().eq_ignore_ascii_case(id)
    }

    /// How index keys are compared against the stored keys.
    fn operator(&self) -> RangeOp;

    /// Splits an assertion into the values to look up. Results across
    /// values are unioned.
    fn assertion_values(&self, assertion: &str) -> Vec<String> {
        vec![assertion.to_string()]
    }

    /// Index keys for one value; all must be present (intersection).
    fn index_keys(&self, value: &str) -> Vec<IndexKey>;

    /// Whether an attribute value satisfies one assertion value.
    fn matches(&self, value: &str, assertion: &str) -> bool;
}

/// Rule defined by a syntax and an operator.
#[derive(Debug, Clone)]
pub struct SyntaxRule {
    oid: &'static str,
    name: &'static str,
    syntax: Syntax,
    operator: RangeOp,
}

impl SyntaxRule {
    pub const fn new(oid: &'static str, name: &'static str, syntax: Syntax, operator: RangeOp) -> Self {
        Self {
            oid,
            name,
            syntax,
            operator,
        }
    }
}

impl MatchingRule for SyntaxRule {
    fn oid(&self) -> &str {
        self.oid
    }

    fn handles(&self, id: &str) -> bool {
        self.oid.eq_ignore_ascii_case(id) || self.name.eq_ignore_ascii_case(id)
    }

    fn operator(&self) -> RangeOp {
        self.operator
    }

    fn index_keys(&self, value: &str) -> Vec<IndexKey> {
        self.syntax.equality_key(value).into_iter().collect()
    }

    fn matches(&self, value: &str, assertion: &str) -> bool {
        match self.syntax.compare(value, assertion) {
            Some(ord) => self.operator.accepts(ord),
            None => false,
        }
    }
}

/// Standard equality and ordering rules.
pub fn builtin_rules() -> Vec<Arc<dyn MatchingRule>> {
    vec![
        Arc::new(SyntaxRule::new("2.5.13.2", "caseIgnoreMatch", Syntax::CaseIgnoreString, RangeOp::Equal)),
        Arc::new(SyntaxRule::new("2.5.13.3", "caseIgnoreOrderingMatch", Syntax::CaseIgnoreString, RangeOp::Less)),
        Arc::new(SyntaxRule::new("2.5.13.5", "caseExactMatch", Syntax::CaseExactString, RangeOp::Equal)),
        Arc::new(SyntaxRule::new("2.5.13.14", "integerMatch", Syntax::Integer, RangeOp::Equal)),
        Arc::new(SyntaxRule::new("2.5.13.15", "integerOrderingMatch", Syntax::Integer, RangeOp::Less)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_rule() {
        let rule = SyntaxRule::new("2.5.13.15", "integerOrderingMatch", Syntax::Integer, RangeOp::Less);
        assert!(rule.matches("4", "5"));
        assert!(!rule.matches("5", "5"));
        assert!(!rule.matches("abc", "5"));
        assert_eq!(rule.index_keys("5"), vec![IndexKey::from_int(5)]);
    }

    #[test]
    fn test_equality_rule_handles_name() {
        let rule = SyntaxRule::new("2.5.13.2", "caseIgnoreMatch", Syntax::CaseIgnoreString, RangeOp::Equal);
        assert!(rule.handles("CASEIGNOREMATCH"));
        assert!(rule.matches("Alice", "alice"));
    }
}
