//! FILENAME: core/booklist-engine/src/flattened.rs
//! The books of a built list in display order, without headers, for
//! previous/next book navigation.

use catalogue_store::{CatalogueDb, ColumnDef, TempTable};
use rusqlite::{params, OptionalExtension};

use crate::error::{BooklistError, BooklistResult};
use crate::logging::{self, log_debug, log_warn};

const FLAT_ID: ColumnDef = ColumnDef::primary_key("_id");
const NAV_ID: ColumnDef = ColumnDef::integer("nav_id").with_constraint("NOT NULL");
const BOOK_ID: ColumnDef = ColumnDef::integer("book_id").with_constraint("NOT NULL");

#[derive(Debug)]
pub struct FlattenedBookList {
    db: CatalogueDb,
    table: TempTable,
    closed: bool,
}

impl FlattenedBookList {
    /// Copies every leaf of `list`, in `nav` order, into `book_list_flat_<id>`.
    pub fn create(
        db: CatalogueDb,
        flat_id: u32,
        list: &str,
        nav: &str,
        book_level: i64,
    ) -> BooklistResult<Self> {
        let mut table = TempTable::new(format!("book_list_flat_{}", flat_id))?;
        table.add_column(FLAT_ID).add_column(NAV_ID).add_column(BOOK_ID);

        let inserted = db.with_transaction(|tx| {
            table.recreate(tx)?;
            let inserted = tx.execute(
                &format!(
                    "INSERT INTO {flat} (nav_id, book_id) SELECT n._id, l.book_id \
                     FROM {nav} n JOIN {list} l ON l._id = n.real_row_id \
                     WHERE l.level = ?1 ORDER BY n._id",
                    flat = table.name(),
                    nav = nav,
                    list = list
                ),
                params![book_level],
            )?;
            tx.execute_batch(&format!(
                "CREATE INDEX {flat}_IX1 ON {flat} (book_id)",
                flat = table.name()
            ))?;
            Ok::<_, BooklistError>(inserted)
        })?;
        log_debug!(logging::NAV, "{} holds {} books", table.name(), inserted);

        Ok(FlattenedBookList {
            db,
            table,
            closed: false,
        })
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn len(&self) -> BooklistResult<usize> {
        let count: i64 = self.db.with_connection(|conn| {
            conn.prepare_cached(&format!("SELECT COUNT(*) FROM {}", self.table.name()))?
                .query_row([], |r| r.get(0))
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> BooklistResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Book at a 0-based index.
    pub fn book_id_at(&self, index: usize) -> BooklistResult<Option<i64>> {
        let id = index as i64 + 1;
        let book = self.db.with_connection(|conn| {
            conn.prepare_cached(&format!("SELECT book_id FROM {} WHERE _id = ?1", self.table.name()))?
                .query_row(params![id], |r| r.get(0))
                .optional()
        })?;
        Ok(book)
    }

    /// Index of the book's first occurrence.
    pub fn index_of(&self, book_id: i64) -> BooklistResult<Option<usize>> {
        let id: Option<i64> = self.db.with_connection(|conn| {
            conn.prepare_cached(&format!(
                "SELECT MIN(_id) FROM {} WHERE book_id = ?1",
                self.table.name()
            ))?
            .query_row(params![book_id], |r| r.get(0))
        })?;
        Ok(id.and_then(|id| usize::try_from(id - 1).ok()))
    }

    /// First other book after the book's first occurrence.
    pub fn next_book(&self, book_id: i64) -> BooklistResult<Option<i64>> {
        self.neighbour(book_id, ">", "ASC")
    }

    /// Last other book before the book's first occurrence.
    pub fn previous_book(&self, book_id: i64) -> BooklistResult<Option<i64>> {
        self.neighbour(book_id, "<", "DESC")
    }

    fn neighbour(&self, book_id: i64, op: &str, direction: &str) -> BooklistResult<Option<i64>> {
        let sql = format!(
            "SELECT book_id FROM {flat} WHERE _id {op} \
             (SELECT MIN(_id) FROM {flat} WHERE book_id = ?1) AND book_id <> ?1 \
             ORDER BY _id {direction} LIMIT 1",
            flat = self.table.name(),
            op = op,
            direction = direction
        );
        let book = self.db.with_connection(|conn| {
            conn.prepare_cached(&sql)?
                .query_row(params![book_id], |r| r.get(0))
                .optional()
        })?;
        Ok(book)
    }

    /// Drops the table. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.db.with_connection(|conn| self.table.drop(conn)) {
            log_warn!(logging::STORE, "dropping {} failed: {}", self.table.name(), e);
        }
    }
}

impl Drop for FlattenedBookList {
    fn drop(&mut self) {
        self.close();
    }
}
