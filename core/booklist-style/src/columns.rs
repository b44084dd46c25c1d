//! FILENAME: core/booklist-style/src/columns.rs
//! Columns of the materialized list table.
//!
//! Group levels contribute the columns they group and sort by; the builder
//! adds the fixed bookkeeping columns and the leaf display columns.

use catalogue_store::{ColumnDef, SqlType};

// ============================================================================
// BOOKKEEPING
// ============================================================================

pub const ID: ColumnDef = ColumnDef::primary_key("_id");
pub const LEVEL: ColumnDef = ColumnDef::integer("level").with_constraint("NOT NULL");
pub const ROW_KIND: ColumnDef = ColumnDef::integer("row_kind").with_constraint("NOT NULL");
pub const ROOT_KEY: ColumnDef = ColumnDef::text("root_key");
pub const BOOK_ID: ColumnDef = ColumnDef::integer("book_id");
pub const BOOK_COUNT: ColumnDef = ColumnDef::integer("book_count");
pub const SELECTED: ColumnDef = ColumnDef::new("selected", SqlType::Boolean);

// ============================================================================
// LEAF COLUMNS
// ============================================================================

pub const BOOK_UUID: ColumnDef = ColumnDef::text("book_uuid");
pub const TITLE: ColumnDef = ColumnDef::text("title");
pub const READ: ColumnDef = ColumnDef::new("read", SqlType::Boolean);
pub const LAST_UPDATE_DATE: ColumnDef = ColumnDef::text("last_update_date");

pub const EXTRA_AUTHOR: ColumnDef = ColumnDef::text("extra_author");
pub const EXTRA_PUBLISHER: ColumnDef = ColumnDef::text("extra_publisher");
pub const EXTRA_FORMAT: ColumnDef = ColumnDef::text("extra_format");
pub const EXTRA_LOCATION: ColumnDef = ColumnDef::text("extra_location");
pub const EXTRA_BOOKSHELVES: ColumnDef = ColumnDef::text("extra_bookshelves");
pub const EXTRA_ISBN: ColumnDef = ColumnDef::text("extra_isbn");

// ============================================================================
// AUTHOR AND SERIES
// ============================================================================

pub const AUTHOR_FORMATTED: ColumnDef = ColumnDef::text("author_formatted");
pub const AUTHOR_SORT: ColumnDef = ColumnDef::text("author_sort");
pub const AUTHOR_ID: ColumnDef = ColumnDef::integer("author_id");
pub const AUTHOR_IS_COMPLETE: ColumnDef = ColumnDef::new("author_is_complete", SqlType::Boolean);

pub const SERIES_NAME: ColumnDef = ColumnDef::text("series_name");
pub const SERIES_ID: ColumnDef = ColumnDef::integer("series_id");
pub const SERIES_IS_COMPLETE: ColumnDef = ColumnDef::new("series_is_complete", SqlType::Boolean);
pub const SERIES_POSITION: ColumnDef = ColumnDef::integer("series_position");
pub const SERIES_NUM_FLOAT: ColumnDef = ColumnDef::real("series_num_float");
pub const SERIES_NUM: ColumnDef = ColumnDef::text("series_num");
pub const PRIMARY_SERIES_COUNT: ColumnDef = ColumnDef::integer("primary_series_count");

// ============================================================================
// SIMPLE GROUPS
// ============================================================================

pub const GENRE: ColumnDef = ColumnDef::text("genre");
pub const PUBLISHER: ColumnDef = ColumnDef::text("publisher");
pub const READ_STATUS: ColumnDef = ColumnDef::integer("read_status");
pub const LOANED_TO: ColumnDef = ColumnDef::text("loaned_to");
pub const LOANED_TO_SORT: ColumnDef = ColumnDef::integer("loaned_to_sort");
pub const TITLE_LETTER: ColumnDef = ColumnDef::text("title_letter");
pub const FORMAT: ColumnDef = ColumnDef::text("format");
pub const LOCATION: ColumnDef = ColumnDef::text("location");
pub const LANGUAGE: ColumnDef = ColumnDef::text("language");
pub const RATING: ColumnDef = ColumnDef::integer("rating");
pub const BOOKSHELF: ColumnDef = ColumnDef::text("bookshelf");

// ============================================================================
// DATE GROUPS
// ============================================================================

pub const PUBLICATION_YEAR: ColumnDef = ColumnDef::text("publication_year");
pub const PUBLICATION_MONTH: ColumnDef = ColumnDef::text("publication_month");
pub const FIRST_PUBLICATION_YEAR: ColumnDef = ColumnDef::text("first_publication_year");
pub const FIRST_PUBLICATION_MONTH: ColumnDef = ColumnDef::text("first_publication_month");
pub const ADDED_YEAR: ColumnDef = ColumnDef::text("added_year");
pub const ADDED_MONTH: ColumnDef = ColumnDef::text("added_month");
pub const ADDED_DAY: ColumnDef = ColumnDef::text("added_day");
pub const READ_YEAR: ColumnDef = ColumnDef::text("read_year");
pub const READ_MONTH: ColumnDef = ColumnDef::text("read_month");
pub const READ_DAY: ColumnDef = ColumnDef::text("read_day");
pub const UPDATE_YEAR: ColumnDef = ColumnDef::text("update_year");
pub const UPDATE_MONTH: ColumnDef = ColumnDef::text("update_month");
pub const UPDATE_DAY: ColumnDef = ColumnDef::text("update_day");
pub const ACQUIRED_YEAR: ColumnDef = ColumnDef::text("acquired_year");
pub const ACQUIRED_MONTH: ColumnDef = ColumnDef::text("acquired_month");
pub const ACQUIRED_DAY: ColumnDef = ColumnDef::text("acquired_day");
