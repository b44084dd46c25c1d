//! FILENAME: core/catalogue-store/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No relation between tables '{child}' and '{parent}'")]
    NoRelation { child: String, parent: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown record: {0}")]
    UnknownRecord(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
