//! FILENAME: core/booklist-engine/src/error.rs

use booklist_style::ConfigError;
use catalogue_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BooklistError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type BooklistResult<T> = Result<T, BooklistError>;
