//! FILENAME: core/catalogue-store/src/lib.rs
//! Catalogue Store
//!
//! SQLite storage for the book catalogue that the booklist engine reads from.
//!
//! Layers:
//! - `definitions`: Column, table and join descriptions (HOW SQL is generated)
//! - `schema`: The fixed entity graph (WHAT is stored)
//! - `db`: Shared connection handle and transactions
//! - `records`: Seeding books, authors, series, shelves and loans
//! - `node_state`: Persisted expansion state of list nodes

pub mod db;
pub mod definitions;
pub mod error;
pub mod node_state;
pub mod records;
pub mod schema;

pub use db::{analyze, CatalogueDb};
pub use definitions::{validate_identifier, ColumnDef, ForeignKey, Joiner, SqlType, TableDef, TempTable};
pub use error::{StoreError, StoreResult};
pub use records::{refresh_fts, BookRecord, SeriesEntry};
pub use schema::create_schema;

/// Re-exported so dependent crates bind values with the same rusqlite version.
pub use rusqlite;
