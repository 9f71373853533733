//! Filter rendering
//!
//! Output re-parses to an equal filter.

use std::fmt;

use super::ast::{Filter, FilterKind};

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            FilterKind::And(children) => write_list(f, '&', children),
            FilterKind::Or(children) => write_list(f, '|', children),
            FilterKind::Not(child) => write!(f, "(!{})", child),
            FilterKind::Equality(ava) => write!(f, "({}={})", ava.attr, Escaped(&ava.value)),
            FilterKind::Approx(ava) => write!(f, "({}~={})", ava.attr, Escaped(&ava.value)),
            FilterKind::Ge(ava) => write!(f, "({}>={})", ava.attr, Escaped(&ava.value)),
            FilterKind::Le(ava) => write!(f, "({}<={})", ava.attr, Escaped(&ava.value)),
            FilterKind::Present(attr) => write!(f, "({}=*)", attr),
            FilterKind::Substrings(sub) => {
                write!(f, "({}=", sub.attr)?;
                if sub.has_no_pieces() {
                    // a single '*' would read back as presence
                    return write!(f, "**)");
                }
                if let Some(initial) = &sub.initial {
                    write!(f, "{}", Escaped(initial))?;
                }
                write!(f, "*")?;
                for any in &sub.any {
                    write!(f, "{}*", Escaped(any))?;
                }
                if let Some(final_) = &sub.final_ {
                    write!(f, "{}", Escaped(final_))?;
                }
                write!(f, ")")
            }
            FilterKind::Extensible(ext) => {
                write!(f, "(")?;
                if let Some(attr) = &ext.attr {
                    write!(f, "{}", attr)?;
                }
                if ext.dn_attrs {
                    write!(f, ":dn")?;
                }
                if let Some(rule) = &ext.rule {
                    write!(f, ":{}", rule)?;
                }
                write!(f, ":={})", Escaped(&ext.value))
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, op: char, children: &[Filter]) -> fmt::Result {
    write!(f, "({}", op)?;
    for child in children {
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}

/// Assertion value with filter metacharacters hex-escaped.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '*' => f.write_str("\\2a")?,
                '(' => f.write_str("\\28")?,
                ')' => f.write_str("\\29")?,
                '\\' => f.write_str("\\5c")?,
                '\0' => f.write_str("\\00")?,
                c => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}
