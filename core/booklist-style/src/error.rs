//! FILENAME: core/booklist-style/src/error.rs

use thiserror::Error;

/// Invalid or conflicting style, level or column configuration.
/// These are caller bugs: they are raised before any table is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("A style needs at least one level")]
    EmptyStyle,

    #[error("Unknown group kind: '{0}'")]
    UnknownKind(String),

    #[error("Unknown group kind id: {0}")]
    UnknownKindId(u32),

    #[error("Group kind '{0}' appears more than once")]
    DuplicateKind(String),

    #[error("Group kind '{kind}' is missing required field '{field}'")]
    MissingFields { kind: String, field: String },

    #[error("Group kind '{kind}': display field '{display}' must be the first grouped and sorted column (found '{first}')")]
    DisplayFieldMismatch {
        kind: String,
        display: String,
        first: String,
    },

    #[error("Group kind '{kind}' does not take attribute '{attribute}'")]
    UnsupportedAttribute { kind: String, attribute: String },

    #[error("Column '{column}' registered with expression '{requested}' but already defined as '{existing}'")]
    ConflictingExpression {
        column: String,
        existing: String,
        requested: String,
    },

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid style definition: {0}")]
    InvalidDefinition(String),

    #[error("The list has not been built yet")]
    NotBuilt,

    #[error("Builder {0} has been closed")]
    Closed(u32),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::InvalidDefinition(err.to_string())
    }
}
