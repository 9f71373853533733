//! Distinguished names
//!
//! DNs are compared in normalized form: RDNs trimmed, attribute types and
//! values lowercased, no whitespace around separators.

use std::fmt;

/// A normalized distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Dn {
    normalized: String,
}

impl Dn {
    /// Parses and normalizes a DN string.
    pub fn new(dn: &str) -> Self {
        let rdns: Vec<String> = split_rdns(dn)
            .into_iter()
            .map(|rdn| normalize_rdn(&rdn))
            .filter(|rdn| !rdn.is_empty())
            .collect();
        Self {
            normalized: rdns.join(","),
        }
    }

    /// The root DN (empty).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.normalized.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Number of RDN components.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            split_rdns(&self.normalized).len()
        }
    }

    /// True if this DN equals `suffix` or lies beneath it.
    pub fn is_within(&self, suffix: &Dn) -> bool {
        if suffix.is_root() || self == suffix {
            return true;
        }
        self.normalized.len() > suffix.normalized.len()
            && self.normalized.ends_with(&suffix.normalized)
            && self.normalized.as_bytes()[self.normalized.len() - suffix.normalized.len() - 1]
                == b','
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl From<&str> for Dn {
    fn from(dn: &str) -> Self {
        Self::new(dn)
    }
}

/// Splits on unescaped commas.
fn split_rdns(dn: &str) -> Vec<String> {
    let mut rdns = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in dn.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escaped = true;
            }
            ',' => rdns.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    rdns.push(current);
    rdns
}

fn normalize_rdn(rdn: &str) -> String {
    match rdn.split_once('=') {
        Some((attr, value)) => format!(
            "{}={}",
            attr.trim().to_lowercase(),
            value.trim().to_lowercase()
        ),
        None => rdn.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(Dn::new("OU=People, DC=Example ,dc=com").as_str(), "ou=people,dc=example,dc=com");
        assert_eq!(Dn::new("dc=example,dc=com"), Dn::new(" DC=example, DC=COM "));
    }

    #[test]
    fn test_is_within() {
        let suffix = Dn::new("dc=example,dc=com");
        assert!(Dn::new("uid=a,ou=people,dc=example,dc=com").is_within(&suffix));
        assert!(suffix.is_within(&suffix));
        assert!(!Dn::new("dc=otherexample,dc=com").is_within(&suffix));
        assert!(suffix.is_within(&Dn::root()));
    }

    #[test]
    fn test_escaped_comma() {
        let dn = Dn::new("cn=Smith\\, John,dc=example");
        assert_eq!(dn.depth(), 2);
    }
}
