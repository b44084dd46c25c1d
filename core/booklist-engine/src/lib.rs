//! FILENAME: core/booklist-engine/src/lib.rs
//! Booklist Engine
//!
//! Materializes a style over the catalogue into a flat, sorted table of
//! header and book rows, and serves collapsible navigation and windowed
//! cursors over it.
//!
//! Layers:
//! - `summary`: Output columns, sort order and the SQL fragments built from them
//! - `criteria`: Caller filters and the WHERE clause
//! - `materialize`: Rollup and incremental filling of the list table
//! - `navigation`: Visibility and expansion state per row
//! - `plan`: The saved statements of one build
//! - `builder`: The public entry point tying it together
//! - `cursor`: Windowed reads of visible rows
//! - `flattened`: Books in display order for previous/next navigation

pub mod logging;

pub mod builder;
pub mod config;
pub mod criteria;
pub mod cursor;
pub mod error;
pub mod flattened;
pub mod materialize;
pub mod navigation;
pub mod plan;
pub mod registry;
pub mod summary;

pub use builder::BooklistBuilder;
pub use config::{BuilderConfig, MaterializeStrategy, RebuildState};
pub use criteria::{build_where, cleanup_fts_criterion, BuildCriteria, WhereClause};
pub use cursor::{BooklistCursor, BooklistRow, CursorSettings, ABSOLUTE_POSITION};
pub use error::{BooklistError, BooklistResult};
pub use flattened::FlattenedBookList;
pub use materialize::{HeaderTracker, KeyColumn, MaterializeStats, PlanStatement};
pub use navigation::BookRowInfo;
pub use plan::{BuildPlan, BuildStats, RequiredColumn};
pub use registry::BuilderRegistry;
pub use summary::{Collation, RenderedSummary, SummaryBuilder, SummaryColumn};
