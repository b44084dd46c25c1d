//! FILENAME: core/catalogue-store/src/records.rs
//! Minimal write access to the catalogue: enough to seed a database with
//! books, authors, series, shelves and loans, and keep the FTS index in step.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::CatalogueDb;
use crate::error::{StoreError, StoreResult};
use crate::schema::BOOKS_FTS;

/// A series membership of a book; `number` is free text such as `"3"` or `"3.1"`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesEntry {
    pub series_id: i64,
    pub number: Option<String>,
}

/// Everything needed to insert one book. Author, series and shelf order is
/// significant: the first entry is the primary one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRecord {
    pub title: String,
    pub isbn: Option<String>,
    pub uuid: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub location: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub date_published: Option<String>,
    pub first_publication: Option<String>,
    pub date_added: Option<String>,
    pub date_acquired: Option<String>,
    pub last_update_date: Option<String>,
    pub read: bool,
    pub read_end: Option<String>,
    pub signed: bool,
    pub anthology_mask: i64,
    pub rating: f64,
    pub authors: Vec<i64>,
    pub series: Vec<SeriesEntry>,
    pub bookshelves: Vec<i64>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>) -> Self {
        BookRecord {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn by(mut self, author_id: i64) -> Self {
        self.authors.push(author_id);
        self
    }

    pub fn in_series(mut self, series_id: i64, number: Option<&str>) -> Self {
        self.series.push(SeriesEntry {
            series_id,
            number: number.map(str::to_string),
        });
        self
    }

    pub fn on_shelf(mut self, bookshelf_id: i64) -> Self {
        self.bookshelves.push(bookshelf_id);
        self
    }
}

impl CatalogueDb {
    pub fn insert_author(&self, family_name: &str, given_names: &str) -> StoreResult<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO authors (family_name, given_names) VALUES (?1, ?2)",
            params![family_name, given_names],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_author_complete(&self, author_id: i64, complete: bool) -> StoreResult<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE authors SET is_complete = ?1 WHERE _id = ?2",
            params![complete, author_id],
        )?;
        expect_changed(changed, "author", author_id)
    }

    pub fn insert_series(&self, name: &str) -> StoreResult<i64> {
        let conn = self.lock();
        conn.execute("INSERT INTO series (series_name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_bookshelf(&self, name: &str) -> StoreResult<i64> {
        let conn = self.lock();
        conn.execute("INSERT INTO bookshelf (bookshelf) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Inserts the book with its author, series and shelf links and its FTS row.
    pub fn insert_book(&self, book: &BookRecord) -> StoreResult<i64> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO books (title, isbn, book_uuid, publisher, genre, language, location,
                    format, description, notes, date_published, first_publication,
                    date_added, date_acquired, last_update_date, read, read_end, signed,
                    anthology_mask, rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    Coalesce(?13, current_timestamp), ?14, Coalesce(?15, current_timestamp),
                    ?16, ?17, ?18, ?19, ?20)",
                params![
                    book.title,
                    book.isbn,
                    book.uuid,
                    book.publisher,
                    book.genre,
                    book.language,
                    book.location,
                    book.format,
                    book.description,
                    book.notes,
                    book.date_published,
                    book.first_publication,
                    book.date_added,
                    book.date_acquired,
                    book.last_update_date,
                    book.read,
                    book.read_end,
                    book.signed,
                    book.anthology_mask,
                    book.rating,
                ],
            )?;
            let book_id = tx.last_insert_rowid();

            for (index, author_id) in book.authors.iter().enumerate() {
                tx.execute(
                    "INSERT INTO book_author (book, author, author_position) VALUES (?1, ?2, ?3)",
                    params![book_id, author_id, index as i64 + 1],
                )?;
            }
            for (index, entry) in book.series.iter().enumerate() {
                tx.execute(
                    "INSERT INTO book_series (book, series, series_num, series_position)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![book_id, entry.series_id, entry.number, index as i64 + 1],
                )?;
            }
            for shelf_id in &book.bookshelves {
                tx.execute(
                    "INSERT INTO book_bookshelf (book, bookshelf) VALUES (?1, ?2)",
                    params![book_id, shelf_id],
                )?;
            }
            refresh_fts(tx, book_id)?;
            Ok(book_id)
        })
    }

    /// Records a loan, replacing any current one.
    pub fn lend_book(&self, book_id: i64, loaned_to: &str) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO loan (book, loaned_to) VALUES (?1, ?2)
             ON CONFLICT(book) DO UPDATE SET loaned_to = excluded.loaned_to",
            params![book_id, loaned_to],
        )?;
        Ok(())
    }

    pub fn return_book(&self, book_id: i64) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM loan WHERE book = ?1", params![book_id])?;
        Ok(())
    }

    pub fn delete_book(&self, book_id: i64) -> StoreResult<()> {
        self.with_transaction(|tx| {
            tx.execute(&format!("DELETE FROM {} WHERE rowid = ?1", BOOKS_FTS), params![book_id])?;
            let changed = tx.execute("DELETE FROM books WHERE _id = ?1", params![book_id])?;
            expect_changed(changed, "book", book_id)
        })
    }

    pub fn loanee_of(&self, book_id: i64) -> StoreResult<Option<String>> {
        let conn = self.lock();
        let loanee = conn
            .query_row(
                "SELECT loaned_to FROM loan WHERE book = ?1",
                params![book_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(loanee)
    }
}

/// Rewrites the FTS row of one book from the base tables.
pub fn refresh_fts(conn: &Connection, book_id: i64) -> StoreResult<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE rowid = ?1", BOOKS_FTS),
        params![book_id],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO {} (rowid, author_name, title, description, notes, publisher, genre,
                location, isbn)
             SELECT b._id,
                (SELECT group_concat(a.given_names || ' ' || a.family_name, ' ')
                   FROM book_author ba JOIN authors a ON a._id = ba.author
                  WHERE ba.book = b._id),
                b.title, b.description, b.notes, b.publisher, b.genre, b.location, b.isbn
             FROM books b WHERE b._id = ?1",
            BOOKS_FTS
        ),
        params![book_id],
    )?;
    Ok(())
}

fn expect_changed(changed: usize, what: &str, id: i64) -> StoreResult<()> {
    if changed == 0 {
        Err(StoreError::UnknownRecord(format!("{} {}", what, id)))
    } else {
        Ok(())
    }
}
