//! Exact filter test
//!
//! Evaluates a filter against an entry. Candidate lists are supersets; this
//! is the test every candidate goes through before it is returned.

use crate::entry::Entry;
use crate::keys::{approx_keys, Schema};

use super::ast::{Ava, ExtensibleAssertion, Filter, FilterKind, SubstringAssertion};
use crate::storage::RangeOp;

impl Filter {
    /// True if `entry` satisfies this filter under `schema`.
    pub fn matches(&self, entry: &Entry, schema: &Schema) -> bool {
        match self.kind() {
            FilterKind::And(children) => children.iter().all(|f| f.matches(entry, schema)),
            FilterKind::Or(children) => children.iter().any(|f| f.matches(entry, schema)),
            FilterKind::Not(child) => !child.matches(entry, schema),
            FilterKind::Equality(ava) => compare_match(entry, schema, ava, RangeOp::Equal),
            FilterKind::Ge(ava) => compare_match(entry, schema, ava, RangeOp::GreaterOrEqual),
            FilterKind::Le(ava) => compare_match(entry, schema, ava, RangeOp::LessOrEqual),
            FilterKind::Approx(ava) => approx_match(entry, schema, ava),
            FilterKind::Present(attr) => !entry.values_matching(attr).is_empty(),
            FilterKind::Substrings(sub) => substring_match(entry, schema, sub),
            FilterKind::Extensible(ext) => extensible_match(entry, schema, ext),
        }
    }
}

fn compare_match(entry: &Entry, schema: &Schema, ava: &Ava, op: RangeOp) -> bool {
    let syntax = schema.syntax_of(&ava.attr);
    entry
        .values_matching(&ava.attr)
        .iter()
        .filter_map(|v| syntax.compare(v, &ava.value))
        .any(|ord| op.accepts(ord))
}

/// Every word code of the assertion must appear among the value's codes.
fn approx_match(entry: &Entry, schema: &Schema, ava: &Ava) -> bool {
    let syntax = schema.syntax_of(&ava.attr);
    let wanted = approx_keys(syntax, &ava.value);
    entry.values_matching(&ava.attr).iter().any(|v| {
        let have = approx_keys(syntax, v);
        wanted.iter().all(|k| have.contains(k))
    })
}

fn substring_match(entry: &Entry, schema: &Schema, sub: &SubstringAssertion) -> bool {
    let syntax = schema.syntax_of(&sub.attr);
    let initial = sub.initial.as_deref().map(|s| syntax.normalize_text(s));
    let any: Vec<String> = sub.any.iter().map(|s| syntax.normalize_text(s)).collect();
    let final_ = sub.final_.as_deref().map(|s| syntax.normalize_text(s));

    entry.values_matching(&sub.attr).iter().any(|value| {
        let value = syntax.normalize_text(value);
        let mut rest = value.as_str();
        if let Some(initial) = &initial {
            match rest.strip_prefix(initial.as_str()) {
                Some(r) => rest = r,
                None => return false,
            }
        }
        for piece in &any {
            match rest.find(piece.as_str()) {
                Some(pos) => rest = &rest[pos + piece.len()..],
                None => return false,
            }
        }
        match &final_ {
            Some(final_) => rest.ends_with(final_.as_str()),
            None => true,
        }
    })
}

fn extensible_match(entry: &Entry, schema: &Schema, ext: &ExtensibleAssertion) -> bool {
    let values: Vec<&String> = match &ext.attr {
        Some(attr) => entry.values_matching(attr),
        None => entry
            .attribute_types()
            .flat_map(|t| entry.values(t).iter())
            .collect(),
    };

    match &ext.rule {
        None => {
            let Some(attr) = ext.attr.as_deref() else {
                return false;
            };
            let syntax = schema.syntax_of(attr);
            values
                .iter()
                .any(|v| syntax.compare(v, &ext.value) == Some(std::cmp::Ordering::Equal))
        }
        Some(id) => {
            let Some(rule) = schema.find_rule(id) else {
                return false;
            };
            rule.assertion_values(&ext.value)
                .iter()
                .any(|assertion| values.iter().any(|v| rule.matches(v, assertion)))
        }
    }
}
