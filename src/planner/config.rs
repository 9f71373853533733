//! Planner configuration
//!
//! Loaded from JSON; every field is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::context::SearchContext;
use super::errors::{ConfigError, ConfigResult};

/// Candidate evaluation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Stop evaluating an AND once the running intersection has at most
    /// this many IDs (0 disables)
    #[serde(default = "default_filter_test_threshold")]
    pub filter_test_threshold: usize,

    /// Per-key ID count above which the store answers ALLIDS
    #[serde(default = "default_allids_threshold")]
    pub allids_threshold: usize,

    /// Paged-search override of `allids_threshold` (0 = not set)
    #[serde(default)]
    pub paged_allids_threshold: usize,

    /// Consult VLV indexes before classic evaluation
    #[serde(default = "default_use_vlv")]
    pub use_vlv: bool,

    /// Record per-key lookup statistics on the search context
    #[serde(default)]
    pub record_key_stats: bool,

    /// Attributes whose presence index is too coarse; ALLIDS from it is
    /// retried as an equality range scan
    #[serde(default = "default_presence_range_fallback")]
    pub presence_range_fallback: Vec<String>,
}

fn default_filter_test_threshold() -> usize {
    10
}
fn default_allids_threshold() -> usize {
    4000
}
fn default_use_vlv() -> bool {
    true
}
fn default_presence_range_fallback() -> Vec<String> {
    vec!["nscpentrydn".to_string()]
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            filter_test_threshold: default_filter_test_threshold(),
            allids_threshold: default_allids_threshold(),
            paged_allids_threshold: 0,
            use_vlv: default_use_vlv(),
            record_key_stats: false,
            presence_range_fallback: default_presence_range_fallback(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

        let config: PlannerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.allids_threshold == 0 {
            return Err(ConfigError::invalid("allids_threshold must be > 0"));
        }

        if let Some(pos) = self.presence_range_fallback.iter().position(|a| a.trim().is_empty()) {
            return Err(ConfigError::invalid(format!(
                "presence_range_fallback[{}] is empty",
                pos
            )));
        }

        Ok(())
    }

    /// ALLIDS limit for one search: the per-connection override if set,
    /// else the configured threshold, with the paged override taking
    /// precedence for paged searches.
    pub fn allids_limit(&self, ctx: &SearchContext) -> usize {
        let mut limit = ctx.allids_limit_override().unwrap_or(self.allids_threshold);
        if ctx.is_paged() && self.paged_allids_threshold > 0 {
            limit = self.paged_allids_threshold;
        }
        limit
    }
}
