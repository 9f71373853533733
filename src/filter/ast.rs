//! Search filter tree
//!
//! A filter is either a list (AND, OR), a negation (NOT) or a simple
//! assertion on one attribute. Each node carries a decoder slot filled in
//! by index assignment and cleared again when the search releases it.

use crate::index::DecoderChain;

use super::errors::{FilterError, FilterResult};

/// Filter node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterChoice {
    And,
    Or,
    Not,
    Equality,
    Substrings,
    Ge,
    Le,
    Present,
    Approx,
    Extensible,
}

impl FilterChoice {
    /// True for AND and OR.
    pub fn is_list(self) -> bool {
        matches!(self, FilterChoice::And | FilterChoice::Or)
    }

    /// True for the complex types (AND, OR, NOT).
    pub fn is_complex(self) -> bool {
        matches!(self, FilterChoice::And | FilterChoice::Or | FilterChoice::Not)
    }
}

/// Attribute-value assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ava {
    pub attr: String,
    pub value: String,
}

/// Substring assertion: `attr=initial*any*...*final`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstringAssertion {
    pub attr: String,
    pub initial: Option<String>,
    pub any: Vec<String>,
    pub final_: Option<String>,
}

impl SubstringAssertion {
    /// True when no piece is present (`attr=**`).
    pub fn has_no_pieces(&self) -> bool {
        self.initial.is_none() && self.any.is_empty() && self.final_.is_none()
    }
}

/// Extensible match assertion: `attr:dn:rule:=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensibleAssertion {
    /// Attribute type; `None` matches against every attribute.
    pub attr: Option<String>,
    /// Matching rule OID or name; `None` uses the attribute's equality rule.
    pub rule: Option<String>,
    pub value: String,
    /// Also match against the entry's RDN values.
    pub dn_attrs: bool,
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality(Ava),
    Approx(Ava),
    Ge(Ava),
    Le(Ava),
    Present(String),
    Substrings(SubstringAssertion),
    Extensible(ExtensibleAssertion),
}

/// Per-node policy flags set by upstream schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterFlags {
    /// Attribute is undefined in schema: warn and evaluate normally.
    pub invalid_attr_warn: bool,
    /// Attribute is undefined in schema: evaluate to no candidates.
    pub invalid_attr_undefine: bool,
}

/// A search filter node.
///
/// Equality ignores the decoder slot.
#[derive(Debug, Clone)]
pub struct Filter {
    kind: FilterKind,
    flags: FilterFlags,
    decoders: DecoderChain,
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.flags == other.flags
    }
}

impl Filter {
    /// Wraps a payload in a node with no flags and no decoder.
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            flags: FilterFlags::default(),
            decoders: DecoderChain::default(),
        }
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Self::new(FilterKind::And(children))
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Self::new(FilterKind::Or(children))
    }

    /// Builds an AND or OR node.
    ///
    /// # Panics
    ///
    /// Panics if `choice` is not a list type.
    pub fn list(choice: FilterChoice, children: Vec<Filter>) -> Self {
        match choice {
            FilterChoice::And => Self::and(children),
            FilterChoice::Or => Self::or(children),
            other => panic!("Filter::list called with non-list choice {:?}", other),
        }
    }

    pub fn not(child: Filter) -> Self {
        Self::new(FilterKind::Not(Box::new(child)))
    }

    pub fn eq(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterKind::Equality(Ava {
            attr: attr.into(),
            value: value.into(),
        }))
    }

    pub fn approx(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterKind::Approx(Ava {
            attr: attr.into(),
            value: value.into(),
        }))
    }

    pub fn ge(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterKind::Ge(Ava {
            attr: attr.into(),
            value: value.into(),
        }))
    }

    pub fn le(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterKind::Le(Ava {
            attr: attr.into(),
            value: value.into(),
        }))
    }

    pub fn present(attr: impl Into<String>) -> Self {
        Self::new(FilterKind::Present(attr.into()))
    }

    pub fn substrings(
        attr: impl Into<String>,
        initial: Option<&str>,
        any: &[&str],
        final_: Option<&str>,
    ) -> Self {
        Self::new(FilterKind::Substrings(SubstringAssertion {
            attr: attr.into(),
            initial: initial.map(str::to_string),
            any: any.iter().map(|s| s.to_string()).collect(),
            final_: final_.map(str::to_string),
        }))
    }

    pub fn extensible(assertion: ExtensibleAssertion) -> Self {
        Self::new(FilterKind::Extensible(assertion))
    }

    /// Sets policy flags (builder style).
    pub fn with_flags(mut self, flags: FilterFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut FilterKind {
        &mut self.kind
    }

    pub fn flags(&self) -> FilterFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FilterFlags) {
        self.flags = flags;
    }

    pub fn choice(&self) -> FilterChoice {
        match &self.kind {
            FilterKind::And(_) => FilterChoice::And,
            FilterKind::Or(_) => FilterChoice::Or,
            FilterKind::Not(_) => FilterChoice::Not,
            FilterKind::Equality(_) => FilterChoice::Equality,
            FilterKind::Approx(_) => FilterChoice::Approx,
            FilterKind::Ge(_) => FilterChoice::Ge,
            FilterKind::Le(_) => FilterChoice::Le,
            FilterKind::Present(_) => FilterChoice::Present,
            FilterKind::Substrings(_) => FilterChoice::Substrings,
            FilterKind::Extensible(_) => FilterChoice::Extensible,
        }
    }

    /// True for assertions on a single attribute (not AND, OR or NOT).
    pub fn is_simple(&self) -> bool {
        !self.choice().is_complex()
    }

    /// The asserted attribute type of a simple filter.
    pub fn attribute(&self) -> Option<&str> {
        match &self.kind {
            FilterKind::Equality(ava)
            | FilterKind::Approx(ava)
            | FilterKind::Ge(ava)
            | FilterKind::Le(ava) => Some(&ava.attr),
            FilterKind::Present(attr) => Some(attr),
            FilterKind::Substrings(sub) => Some(&sub.attr),
            FilterKind::Extensible(ext) => ext.attr.as_deref(),
            FilterKind::And(_) | FilterKind::Or(_) | FilterKind::Not(_) => None,
        }
    }

    /// Type and value of an equality, approx, GE or LE assertion.
    pub fn get_ava(&self) -> FilterResult<(&str, &str)> {
        match &self.kind {
            FilterKind::Equality(ava)
            | FilterKind::Approx(ava)
            | FilterKind::Ge(ava)
            | FilterKind::Le(ava) => {
                if ava.attr.is_empty() {
                    return Err(FilterError::MissingAttribute);
                }
                Ok((&ava.attr, &ava.value))
            }
            _ => Err(FilterError::WrongChoice {
                expected: FilterChoice::Equality,
                found: self.choice(),
            }),
        }
    }

    /// Type of a presence assertion.
    pub fn get_type(&self) -> FilterResult<&str> {
        match &self.kind {
            FilterKind::Present(attr) if attr.is_empty() => Err(FilterError::MissingAttribute),
            FilterKind::Present(attr) => Ok(attr),
            _ => Err(FilterError::WrongChoice {
                expected: FilterChoice::Present,
                found: self.choice(),
            }),
        }
    }

    /// Substring assertion, which must name an attribute and at least one piece.
    pub fn get_subfilt(&self) -> FilterResult<&SubstringAssertion> {
        match &self.kind {
            FilterKind::Substrings(sub) => {
                if sub.attr.is_empty() {
                    Err(FilterError::MissingAttribute)
                } else if sub.has_no_pieces() {
                    Err(FilterError::EmptySubstring(sub.attr.clone()))
                } else {
                    Ok(sub)
                }
            }
            _ => Err(FilterError::WrongChoice {
                expected: FilterChoice::Substrings,
                found: self.choice(),
            }),
        }
    }

    // ==================
    // Children
    // ==================

    /// Direct children: list members, the negated filter, or none.
    pub fn children(&self) -> &[Filter] {
        match &self.kind {
            FilterKind::And(children) | FilterKind::Or(children) => children,
            FilterKind::Not(child) => std::slice::from_ref(child.as_ref()),
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Filter>> {
        match &mut self.kind {
            FilterKind::And(children) | FilterKind::Or(children) => Some(children),
            _ => None,
        }
    }

    /// Mutable access to the child at `index` of a list or NOT node.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut Filter> {
        match &mut self.kind {
            FilterKind::And(children) | FilterKind::Or(children) => children.get_mut(index),
            FilterKind::Not(child) if index == 0 => Some(child.as_mut()),
            _ => None,
        }
    }

    fn list_children(&mut self, op: &str) -> &mut Vec<Filter> {
        let choice = self.choice();
        match self.children_mut() {
            Some(children) => children,
            None => panic!("{}: not a list filter ({:?})", op, choice),
        }
    }

    /// Removes and returns the child at `index`, preserving sibling order.
    ///
    /// # Panics
    ///
    /// Panics if this is not a list node or `index` is out of bounds.
    pub fn detach_child(&mut self, index: usize) -> Filter {
        let children = self.list_children("detach_child");
        assert!(
            index < children.len(),
            "detach_child: index {} out of bounds for {} children",
            index,
            children.len()
        );
        children.remove(index)
    }

    /// Inserts `child` at `index`, shifting later siblings right.
    ///
    /// # Panics
    ///
    /// Panics if this is not a list node or `index` is past the end.
    pub fn insert_child(&mut self, index: usize, child: Filter) {
        let children = self.list_children("insert_child");
        assert!(
            index <= children.len(),
            "insert_child: index {} out of bounds for {} children",
            index,
            children.len()
        );
        children.insert(index, child);
    }

    /// Appends `child` to a list node.
    pub fn push_child(&mut self, child: Filter) {
        self.list_children("push_child").push(child);
    }

    /// Replaces the child at `index`, returning the previous child.
    ///
    /// # Panics
    ///
    /// Panics if this is not a list or NOT node, or `index` is out of bounds.
    pub fn replace_child(&mut self, index: usize, child: Filter) -> Filter {
        let choice = self.choice();
        match self.child_mut(index) {
            Some(slot) => std::mem::replace(slot, child),
            None => panic!(
                "replace_child: no child at index {} ({:?} filter)",
                index, choice
            ),
        }
    }

    /// Replaces the list child at `index` with that child's own children,
    /// in order. Returns how many children were spliced in.
    ///
    /// # Panics
    ///
    /// Panics if this node or the child at `index` is not a list node.
    pub fn splice_children_into(&mut self, index: usize) -> usize {
        let mut child = self.detach_child(index);
        let grandchildren = std::mem::take(child.list_children("splice_children_into"));
        let count = grandchildren.len();
        let children = self.list_children("splice_children_into");
        children.splice(index..index, grandchildren);
        count
    }

    /// All simple (leaf) nodes in left-to-right order.
    pub fn leaves(&self) -> Vec<&Filter> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Filter>) {
        if self.is_simple() {
            out.push(self);
        } else {
            for child in self.children() {
                child.collect_leaves(out);
            }
        }
    }

    // ==================
    // Decoders
    // ==================

    pub fn decoders(&self) -> &DecoderChain {
        &self.decoders
    }

    pub(crate) fn decoders_mut(&mut self) -> &mut DecoderChain {
        &mut self.decoders
    }

    pub(crate) fn set_decoders(&mut self, decoders: DecoderChain) {
        self.decoders = decoders;
    }

    pub fn has_decoder(&self) -> bool {
        !self.decoders.is_empty()
    }

    /// Clears decoder slots on this node and every descendant.
    pub fn release_decoders(&mut self) {
        self.decoders.clear();
        match &mut self.kind {
            FilterKind::And(children) | FilterKind::Or(children) => {
                for child in children {
                    child.release_decoders();
                }
            }
            FilterKind::Not(child) => child.release_decoders(),
            _ => {}
        }
    }

    /// True if no node in the tree holds a decoder.
    pub fn is_released(&self) -> bool {
        !self.has_decoder() && self.children().iter().all(Filter::is_released)
    }
}
