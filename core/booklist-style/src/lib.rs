//! FILENAME: core/booklist-style/src/lib.rs
//! Booklist Style
//!
//! Describes WHAT a book list looks like: which levels it groups by, how the
//! value of each level is derived, and which books it shows.
//!
//! Layers:
//! - `kinds`: The fixed set of group kinds and their persisted ids
//! - `columns`: Columns of the materialized list table
//! - `level`: Per-kind level descriptors (columns, expressions, flags)
//! - `style`: Validated level sequences with filters and display options
//! - `definition`: Serializable style definitions
//! - `builtin`: Built-in styles

pub mod builtin;
pub mod columns;
pub mod definition;
pub mod error;
pub mod kinds;
pub mod level;
pub mod style;

pub use definition::{LevelDefinition, StyleDefinition};
pub use error::ConfigError;
pub use kinds::{all_kinds, GroupKind, BOOK_ROW_KIND, MAX_KIND_ID};
pub use level::{author_name_expression, ColumnFlags, ExpressionContext, Level, LevelColumn, LevelExpr};
pub use style::{DisplayOptions, Style, StyleFilters, TriState};
