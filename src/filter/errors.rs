//! Filter error types
//!
//! Error codes:
//! - DIR_FILTER_PARSE (REJECT)
//! - DIR_FILTER_MISSING_ATTRIBUTE (REJECT)
//! - DIR_FILTER_EMPTY_SUBSTRING (REJECT)
//! - DIR_FILTER_WRONG_CHOICE (REJECT)

use thiserror::Error;

use super::ast::FilterChoice;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter parse and extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Filter string is not well-formed
    #[error("Invalid filter at offset {position}: {reason}")]
    Parse { position: usize, reason: String },

    /// Simple filter has no attribute type
    #[error("Filter has no attribute type")]
    MissingAttribute,

    /// Substring filter has no initial, any or final piece
    #[error("Substring filter on '{0}' has no substring pieces")]
    EmptySubstring(String),

    /// Accessor used on a filter of another type
    #[error("Expected {expected:?} filter, found {found:?}")]
    WrongChoice {
        expected: FilterChoice,
        found: FilterChoice,
    },
}

impl FilterError {
    pub(crate) fn parse(position: usize, reason: impl Into<String>) -> Self {
        FilterError::Parse {
            position,
            reason: reason.into(),
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::Parse { .. } => "DIR_FILTER_PARSE",
            FilterError::MissingAttribute => "DIR_FILTER_MISSING_ATTRIBUTE",
            FilterError::EmptySubstring(_) => "DIR_FILTER_EMPTY_SUBSTRING",
            FilterError::WrongChoice { .. } => "DIR_FILTER_WRONG_CHOICE",
        }
    }
}
