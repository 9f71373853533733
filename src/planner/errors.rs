//! Planner error types
//!
//! Error codes:
//! - DIR_SEARCH_ABANDONED (ABANDON)
//! - DIR_INDEX_READ_FAILED (ERROR)
//! - DIR_CONFIG_INVALID (REJECT)
//!
//! Unindexed evaluation is never an error; it surfaces as ALLIDS plus the
//! unindexed note on the search context.

use thiserror::Error;

use crate::storage::StoreError;

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Candidate evaluation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    /// Client abandoned the operation mid-evaluation
    #[error("Search abandoned")]
    Abandoned,

    /// Storage index read failed
    #[error("Index read failed: {0}")]
    Storage(#[from] StoreError),

    /// Backend built with an invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PlannerError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::Abandoned => "DIR_SEARCH_ABANDONED",
            PlannerError::Storage(_) => "DIR_INDEX_READ_FAILED",
            PlannerError::Config(_) => "DIR_CONFIG_INVALID",
        }
    }
}

/// Configuration load and validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}
