//! Backend selection by DN

use crate::dn::Dn;

/// Maps a DN to the suffix of the backend that holds it.
pub trait BackendResolver: Send + Sync {
    /// Suffix of the serving backend, or `None` when only the default
    /// (catch-all) backend would answer.
    fn select(&self, dn: &Dn) -> Option<Dn>;
}

/// Longest-suffix match over a fixed set of backend suffixes.
#[derive(Debug, Clone, Default)]
pub struct SuffixResolver {
    suffixes: Vec<Dn>,
}

impl SuffixResolver {
    pub fn new(suffixes: impl IntoIterator<Item = Dn>) -> Self {
        Self {
            suffixes: suffixes.into_iter().filter(|s| !s.is_root()).collect(),
        }
    }

    pub fn suffixes(&self) -> &[Dn] {
        &self.suffixes
    }
}

impl BackendResolver for SuffixResolver {
    fn select(&self, dn: &Dn) -> Option<Dn> {
        self.suffixes
            .iter()
            .filter(|suffix| dn.is_within(suffix))
            .max_by_key(|suffix| suffix.depth())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_suffix_wins() {
        let resolver = SuffixResolver::new([
            Dn::new("dc=example,dc=com"),
            Dn::new("ou=people,dc=example,dc=com"),
        ]);
        assert_eq!(
            resolver.select(&Dn::new("uid=a,ou=people,dc=example,dc=com")),
            Some(Dn::new("ou=people,dc=example,dc=com"))
        );
        assert_eq!(
            resolver.select(&Dn::new("ou=groups,dc=example,dc=com")),
            Some(Dn::new("dc=example,dc=com"))
        );
    }

    #[test]
    fn test_unserved_dn_selects_default() {
        let resolver = SuffixResolver::new([Dn::new("dc=example,dc=com")]);
        assert_eq!(resolver.select(&Dn::new("dc=other")), None);
        assert_eq!(resolver.select(&Dn::root()), None);
    }
}
