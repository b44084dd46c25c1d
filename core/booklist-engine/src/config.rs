//! FILENAME: core/booklist-engine/src/config.rs
//! Builder settings.

use booklist_style::ConfigError;
use catalogue_store::validate_identifier;
use serde::{Deserialize, Serialize};

/// How header rows are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeStrategy {
    /// Insert every leaf, then derive each level's headers from the level below.
    #[default]
    Rollup,
    /// Stream leaves in sort order and insert headers as group keys change.
    Incremental,
}

/// Expansion state a freshly built list starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildState {
    /// Restore the saved state of each top-level node.
    #[default]
    Preserved,
    AlwaysExpanded,
    /// Show top-level nodes only and forget the saved state.
    AlwaysCollapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub strategy: MaterializeStrategy,
    /// Default for callers that do not pick an initial state themselves.
    pub rebuild_state: RebuildState,
    /// Collation used for sorting and grouping text columns.
    pub collation: String,
    /// Value of date groups when the date cannot be parsed.
    pub unknown_label: String,
    pub local_time_dates: bool,
    pub window_size: usize,
    pub mru_capacity: usize,
    pub eviction_distance: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            strategy: MaterializeStrategy::Rollup,
            rebuild_state: RebuildState::Preserved,
            collation: "NOCASE".to_string(),
            unknown_label: "UNKNOWN".to_string(),
            local_time_dates: true,
            window_size: 20,
            mru_capacity: 8,
            eviction_distance: 3,
        }
    }
}

impl BuilderConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BuilderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: MaterializeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = collation.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if validate_identifier(&self.collation).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "collation '{}'",
                self.collation
            )));
        }
        if self.window_size == 0 {
            return Err(ConfigError::InvalidValue("window_size must be positive".into()));
        }
        if self.mru_capacity == 0 {
            return Err(ConfigError::InvalidValue("mru_capacity must be positive".into()));
        }
        Ok(())
    }
}
