//! Index key derivation
//!
//! The same functions derive keys for stored values and for filter
//! assertions, so every entry that truly matches an assertion carries all of
//! the assertion's keys.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::filter::{ExtensibleAssertion, FilterChoice, SubstringAssertion};
use crate::planner::{ConfigError, ConfigResult};
use crate::storage::{IndexKey, IndexKind, RangeOp};

use super::syntax::{Schema, Syntax};

/// Window sizes for substring keys.
///
/// `begin_len` and `end_len` count the anchor marker, so the defaults give
/// keys like `^ab`, `abc` and `yz$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringKeyConfig {
    #[serde(default = "default_window")]
    pub begin_len: usize,
    #[serde(default = "default_window")]
    pub middle_len: usize,
    #[serde(default = "default_window")]
    pub end_len: usize,
}

fn default_window() -> usize {
    3
}

impl Default for SubstringKeyConfig {
    fn default() -> Self {
        Self {
            begin_len: default_window(),
            middle_len: default_window(),
            end_len: default_window(),
        }
    }
}

impl SubstringKeyConfig {
    /// Window sizes below 2 would produce marker-only or empty keys.
    pub fn is_valid(&self) -> bool {
        self.begin_len >= 2 && self.middle_len >= 1 && self.end_len >= 2
    }
}

/// How to evaluate an extensible filter against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensibleIndex {
    pub attr: String,
    pub kind: IndexKind,
    pub operator: RangeOp,
    /// Keys for each assertion value: intersect within, union across.
    pub keys_per_value: Vec<Vec<IndexKey>>,
}

/// Key derivation used by the candidate evaluator and the index store.
pub trait KeyGenerator: Send + Sync {
    /// Keys for an equality, approx, GE or LE assertion. Empty when the
    /// value cannot be indexed.
    fn assertion_to_keys(&self, attr: &str, value: &str, choice: FilterChoice) -> Vec<IndexKey>;

    /// Substring keys; empty when no piece is long enough.
    fn assertion_to_keys_sub(&self, sub: &SubstringAssertion) -> Vec<IndexKey>;

    /// Index plan for an extensible filter, or `None` if it is not indexable.
    fn extensible_index(&self, assertion: &ExtensibleAssertion) -> Option<ExtensibleIndex>;

    /// Keys under which a stored value is indexed.
    fn value_to_keys(&self, attr: &str, value: &str, kind: &IndexKind) -> Vec<IndexKey>;
}

/// Schema-driven key generator.
#[derive(Debug, Clone)]
pub struct SyntaxKeyGenerator {
    schema: Arc<Schema>,
    substr: SubstringKeyConfig,
}

impl SyntaxKeyGenerator {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            substr: SubstringKeyConfig::default(),
        }
    }

    /// Replaces the substring windows. The store and the planner must share
    /// one generator, so windows are fixed before either is built.
    pub fn with_substring_config(mut self, substr: SubstringKeyConfig) -> ConfigResult<Self> {
        if !substr.is_valid() {
            return Err(ConfigError::invalid(format!(
                "substring windows {}/{}/{}: begin_len and end_len must be >= 2, middle_len >= 1",
                substr.begin_len, substr.middle_len, substr.end_len
            )));
        }
        self.substr = substr;
        Ok(self)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn equality_keys(&self, attr: &str, value: &str) -> Vec<IndexKey> {
        self.schema
            .syntax_of(attr)
            .equality_key(value)
            .into_iter()
            .collect()
    }

    fn text(&self, attr: &str, value: &str) -> Vec<char> {
        self.schema.syntax_of(attr).normalize_text(value).chars().collect()
    }

    fn windows(&self, chars: &[char], out: &mut BTreeSet<String>) {
        let n = self.substr.middle_len;
        if chars.len() >= n {
            for w in chars.windows(n) {
                out.insert(w.iter().collect());
            }
        }
    }

    fn begin_key(&self, chars: &[char], out: &mut BTreeSet<String>) {
        let n = self.substr.begin_len - 1;
        if chars.len() >= n {
            out.insert(std::iter::once('^').chain(chars[..n].iter().copied()).collect());
        }
    }

    fn end_key(&self, chars: &[char], out: &mut BTreeSet<String>) {
        let n = self.substr.end_len - 1;
        if chars.len() >= n {
            out.insert(chars[chars.len() - n..].iter().copied().chain(std::iter::once('$')).collect());
        }
    }
}

impl KeyGenerator for SyntaxKeyGenerator {
    fn assertion_to_keys(&self, attr: &str, value: &str, choice: FilterChoice) -> Vec<IndexKey> {
        match choice {
            FilterChoice::Equality | FilterChoice::Ge | FilterChoice::Le => {
                self.equality_keys(attr, value)
            }
            FilterChoice::Approx => approx_keys(self.schema.syntax_of(attr), value),
            _ => Vec::new(),
        }
    }

    fn assertion_to_keys_sub(&self, sub: &SubstringAssertion) -> Vec<IndexKey> {
        let mut keys = BTreeSet::new();
        if let Some(initial) = &sub.initial {
            let chars = self.text(&sub.attr, initial);
            self.begin_key(&chars, &mut keys);
            self.windows(&chars, &mut keys);
        }
        for any in &sub.any {
            self.windows(&self.text(&sub.attr, any), &mut keys);
        }
        if let Some(final_) = &sub.final_ {
            let chars = self.text(&sub.attr, final_);
            self.windows(&chars, &mut keys);
            self.end_key(&chars, &mut keys);
        }
        trace!(attr = %sub.attr, count = keys.len(), "substring keys");
        keys.into_iter().map(IndexKey::from_string).collect()
    }

    fn extensible_index(&self, assertion: &ExtensibleAssertion) -> Option<ExtensibleIndex> {
        let attr = assertion.attr.as_deref()?;
        match &assertion.rule {
            None => Some(ExtensibleIndex {
                attr: attr.to_string(),
                kind: IndexKind::Equality,
                operator: RangeOp::Equal,
                keys_per_value: vec![self.equality_keys(attr, &assertion.value)],
            }),
            Some(id) => {
                let rule = self.schema.find_rule(id)?;
                let keys_per_value = rule
                    .assertion_values(&assertion.value)
                    .iter()
                    .map(|value| rule.index_keys(value))
                    .collect();
                Some(ExtensibleIndex {
                    attr: attr.to_string(),
                    kind: IndexKind::MatchingRule(rule.oid().to_string()),
                    operator: rule.operator(),
                    keys_per_value,
                })
            }
        }
    }

    fn value_to_keys(&self, attr: &str, value: &str, kind: &IndexKind) -> Vec<IndexKey> {
        match kind {
            IndexKind::Presence => vec![IndexKey::presence()],
            IndexKind::Equality => self.equality_keys(attr, value),
            IndexKind::Approx => approx_keys(self.schema.syntax_of(attr), value),
            IndexKind::Substring => {
                let chars = self.text(attr, value);
                let mut keys = BTreeSet::new();
                self.begin_key(&chars, &mut keys);
                self.windows(&chars, &mut keys);
                self.end_key(&chars, &mut keys);
                keys.into_iter().map(IndexKey::from_string).collect()
            }
            IndexKind::MatchingRule(oid) => match self.schema.find_rule(oid) {
                Some(rule) => rule.index_keys(value),
                None => Vec::new(),
            },
        }
    }
}

/// One phonetic key per word.
pub fn approx_keys(syntax: Syntax, value: &str) -> Vec<IndexKey> {
    let codes: BTreeSet<String> = syntax
        .normalize_text(value)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(phonetic)
        .collect();
    codes.into_iter().map(IndexKey::from_string).collect()
}

/// Soundex code of a word. Words without letters are kept verbatim.
pub fn phonetic(word: &str) -> String {
    fn class(c: char) -> Option<char> {
        match c {
            'b' | 'f' | 'p' | 'v' => Some('1'),
            'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
            'd' | 't' => Some('3'),
            'l' => Some('4'),
            'm' | 'n' => Some('5'),
            'r' => Some('6'),
            _ => None,
        }
    }

    let mut letters = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase());
    let Some(first) = letters.next() else {
        return word.to_string();
    };

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut last = class(first);
    for c in letters {
        let digit = class(c);
        if let Some(d) = digit.filter(|_| digit != last) {
            code.push(d);
            if code.len() == 4 {
                break;
            }
        }
        // h and w do not separate equal codes
        if c != 'h' && c != 'w' {
            last = digit;
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    code
}
