//! Storage index error types
//!
//! Error codes:
//! - DIR_STORE_UNAVAILABLE (ERROR)
//! - DIR_STORE_CORRUPTION (FATAL)

use thiserror::Error;

/// Result type for storage index operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage index read failures.
///
/// A missing index is not an error; stores report it through
/// `IndexRead::unindexed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Index exists but cannot be read right now
    #[error("Index {attr}.{kind} unavailable: {reason}")]
    Unavailable {
        attr: String,
        kind: String,
        reason: String,
    },

    /// Index data failed validation
    #[error("Index {attr}.{kind} corrupted: {reason}")]
    Corruption {
        attr: String,
        kind: String,
        reason: String,
    },
}

impl StoreError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "DIR_STORE_UNAVAILABLE",
            StoreError::Corruption { .. } => "DIR_STORE_CORRUPTION",
        }
    }

    /// Returns true if the backend must stop serving
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Corruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = StoreError::Unavailable {
            attr: "cn".into(),
            kind: "eq".into(),
            reason: "locked".into(),
        };
        assert_eq!(err.code(), "DIR_STORE_UNAVAILABLE");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Index cn.eq unavailable: locked");
    }
}
