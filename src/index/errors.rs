//! Index registry error types
//!
//! Error codes:
//! - DIR_INDEX_UNKNOWN_PLUGIN (REJECT)
//! - DIR_INDEX_INVALID_DESCRIPTOR (REJECT)
//! - DIR_INDEX_UNSUPPORTED_DESCRIPTOR (REJECT)
//! - DIR_INDEX_NAMESPACE_NOT_SERVED (REJECT)
//!
//! Registration validates everything before touching the registry, so any
//! of these leaves it unchanged.

use thiserror::Error;

use crate::filter::FilterError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registration failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No plugin registered under this id
    #[error("Unknown index plugin '{0}'")]
    UnknownPlugin(String),

    /// Descriptor does not parse as a filter
    #[error("Invalid index descriptor '{descriptor}': {source}")]
    InvalidDescriptor {
        descriptor: String,
        #[source]
        source: FilterError,
    },

    /// Descriptor parses but is not `(a=*)`, `(a=**)` or `(a=?*)`
    #[error("Unsupported index descriptor '{0}'")]
    UnsupportedDescriptor(String),

    /// Namespace resolves to no backend (or only the default backend)
    #[error("No backend serves namespace '{0}'")]
    NamespaceNotServed(String),
}

impl RegistryError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::UnknownPlugin(_) => "DIR_INDEX_UNKNOWN_PLUGIN",
            RegistryError::InvalidDescriptor { .. } => "DIR_INDEX_INVALID_DESCRIPTOR",
            RegistryError::UnsupportedDescriptor(_) => "DIR_INDEX_UNSUPPORTED_DESCRIPTOR",
            RegistryError::NamespaceNotServed(_) => "DIR_INDEX_NAMESPACE_NOT_SERVED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RegistryError::UnknownPlugin("x".into()).code(),
            "DIR_INDEX_UNKNOWN_PLUGIN"
        );
        assert_eq!(
            RegistryError::NamespaceNotServed("dc=x".into()).to_string(),
            "No backend serves namespace 'dc=x'"
        );
    }
}
