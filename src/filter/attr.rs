//! Attribute type helpers
//!
//! Attribute types compare case-insensitively on their base type; options
//! after `;` (language tags, binary) are subtypes.

/// The base type, without options.
pub fn base_type(attr_type: &str) -> &str {
    match attr_type.find(';') {
        Some(pos) => &attr_type[..pos],
        None => attr_type,
    }
}

/// True if the type carries a subtype option (e.g. `cn;lang-fr`).
pub fn has_subtype(attr_type: &str) -> bool {
    attr_type
        .find(';')
        .is_some_and(|pos| pos + 1 < attr_type.len())
}

/// Schema-equivalence of two attribute types: same base type, ignoring case.
pub fn types_equivalent(a: &str, b: &str) -> bool {
    base_type(a).eq_ignore_ascii_case(base_type(b))
}

/// Exact comparison of full types (options included), ignoring case.
pub fn types_exact(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("cn;lang-fr"), "cn");
        assert_eq!(base_type("mail"), "mail");
    }

    #[test]
    fn test_has_subtype() {
        assert!(has_subtype("cn;lang-fr"));
        assert!(!has_subtype("cn"));
        assert!(!has_subtype("cn;"));
    }

    #[test]
    fn test_equivalence() {
        assert!(types_equivalent("CN", "cn"));
        assert!(types_equivalent("cn;lang-fr", "cn"));
        assert!(!types_equivalent("cn", "sn"));
        assert!(!types_exact("cn;lang-fr", "cn"));
    }
}
