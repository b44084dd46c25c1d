//! FILENAME: core/catalogue-store/src/schema.rs
//! The fixed catalogue schema: books and the entities hanging off them.

use rusqlite::Connection;

use crate::definitions::{ColumnDef, ForeignKey, SqlType, TableDef};
use crate::error::StoreResult;

/// Primary key column shared by every base table.
pub const PK_ID: &str = "_id";

// ============================================================================
// BOOKS
// ============================================================================

pub mod books {
    pub const TITLE: &str = "title";
    pub const ISBN: &str = "isbn";
    pub const UUID: &str = "book_uuid";
    pub const PUBLISHER: &str = "publisher";
    pub const GENRE: &str = "genre";
    pub const LANGUAGE: &str = "language";
    pub const LOCATION: &str = "location";
    pub const FORMAT: &str = "format";
    pub const DESCRIPTION: &str = "description";
    pub const NOTES: &str = "notes";
    pub const DATE_PUBLISHED: &str = "date_published";
    pub const FIRST_PUBLICATION: &str = "first_publication";
    pub const DATE_ADDED: &str = "date_added";
    pub const DATE_ACQUIRED: &str = "date_acquired";
    pub const LAST_UPDATE_DATE: &str = "last_update_date";
    pub const READ: &str = "read";
    pub const READ_END: &str = "read_end";
    pub const SIGNED: &str = "signed";
    pub const ANTHOLOGY_MASK: &str = "anthology_mask";
    pub const RATING: &str = "rating";
}

pub static BOOKS: TableDef = TableDef {
    name: "books",
    alias: "b",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::text(books::TITLE).with_constraint("NOT NULL"),
        ColumnDef::text(books::ISBN),
        ColumnDef::text(books::UUID),
        ColumnDef::text(books::PUBLISHER),
        ColumnDef::text(books::GENRE),
        ColumnDef::text(books::LANGUAGE),
        ColumnDef::text(books::LOCATION),
        ColumnDef::text(books::FORMAT),
        ColumnDef::text(books::DESCRIPTION),
        ColumnDef::text(books::NOTES),
        ColumnDef::text(books::DATE_PUBLISHED),
        ColumnDef::text(books::FIRST_PUBLICATION),
        ColumnDef::text(books::DATE_ADDED).with_constraint("DEFAULT current_timestamp"),
        ColumnDef::text(books::DATE_ACQUIRED),
        ColumnDef::text(books::LAST_UPDATE_DATE).with_constraint("DEFAULT current_timestamp"),
        ColumnDef::new(books::READ, SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0"),
        ColumnDef::text(books::READ_END),
        ColumnDef::new(books::SIGNED, SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0"),
        ColumnDef::integer(books::ANTHOLOGY_MASK).with_constraint("NOT NULL DEFAULT 0"),
        ColumnDef::real(books::RATING).with_constraint("NOT NULL DEFAULT 0"),
    ],
    foreign_keys: &[],
};

// ============================================================================
// AUTHORS
// ============================================================================

pub mod authors {
    pub const FAMILY_NAME: &str = "family_name";
    pub const GIVEN_NAMES: &str = "given_names";
    pub const IS_COMPLETE: &str = "is_complete";
}

pub static AUTHORS: TableDef = TableDef {
    name: "authors",
    alias: "a",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::text(authors::FAMILY_NAME).with_constraint("NOT NULL"),
        ColumnDef::text(authors::GIVEN_NAMES).with_constraint("NOT NULL DEFAULT ''"),
        ColumnDef::new(authors::IS_COMPLETE, SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0"),
    ],
    foreign_keys: &[],
};

pub mod book_author {
    pub const BOOK: &str = "book";
    pub const AUTHOR: &str = "author";
    pub const POSITION: &str = "author_position";
}

pub static BOOK_AUTHOR: TableDef = TableDef {
    name: "book_author",
    alias: "ba",
    columns: &[
        ColumnDef::integer(book_author::BOOK)
            .with_constraint("NOT NULL REFERENCES books ON DELETE CASCADE"),
        ColumnDef::integer(book_author::AUTHOR)
            .with_constraint("NOT NULL REFERENCES authors ON DELETE CASCADE"),
        ColumnDef::integer(book_author::POSITION).with_constraint("NOT NULL"),
    ],
    foreign_keys: &[
        ForeignKey { parent: "books", column: book_author::BOOK, parent_column: PK_ID },
        ForeignKey { parent: "authors", column: book_author::AUTHOR, parent_column: PK_ID },
    ],
};

// ============================================================================
// SERIES
// ============================================================================

pub mod series {
    pub const NAME: &str = "series_name";
    pub const IS_COMPLETE: &str = "is_complete";
}

pub static SERIES: TableDef = TableDef {
    name: "series",
    alias: "s",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::text(series::NAME).with_constraint("NOT NULL"),
        ColumnDef::new(series::IS_COMPLETE, SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0"),
    ],
    foreign_keys: &[],
};

pub mod book_series {
    pub const BOOK: &str = "book";
    pub const SERIES: &str = "series";
    pub const NUM: &str = "series_num";
    pub const POSITION: &str = "series_position";
}

pub static BOOK_SERIES: TableDef = TableDef {
    name: "book_series",
    alias: "bs",
    columns: &[
        ColumnDef::integer(book_series::BOOK)
            .with_constraint("NOT NULL REFERENCES books ON DELETE CASCADE"),
        ColumnDef::integer(book_series::SERIES)
            .with_constraint("NOT NULL REFERENCES series ON DELETE CASCADE"),
        ColumnDef::text(book_series::NUM),
        ColumnDef::integer(book_series::POSITION).with_constraint("NOT NULL"),
    ],
    foreign_keys: &[
        ForeignKey { parent: "books", column: book_series::BOOK, parent_column: PK_ID },
        ForeignKey { parent: "series", column: book_series::SERIES, parent_column: PK_ID },
    ],
};

// ============================================================================
// BOOKSHELVES AND LOANS
// ============================================================================

pub mod bookshelf {
    pub const NAME: &str = "bookshelf";
}

pub static BOOKSHELF: TableDef = TableDef {
    name: "bookshelf",
    alias: "bsh",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::text(bookshelf::NAME).with_constraint("NOT NULL"),
    ],
    foreign_keys: &[],
};

pub mod book_bookshelf {
    pub const BOOK: &str = "book";
    pub const BOOKSHELF: &str = "bookshelf";
}

pub static BOOK_BOOKSHELF: TableDef = TableDef {
    name: "book_bookshelf",
    alias: "bbsh",
    columns: &[
        ColumnDef::integer(book_bookshelf::BOOK)
            .with_constraint("NOT NULL REFERENCES books ON DELETE CASCADE"),
        ColumnDef::integer(book_bookshelf::BOOKSHELF)
            .with_constraint("NOT NULL REFERENCES bookshelf ON DELETE CASCADE"),
    ],
    foreign_keys: &[
        ForeignKey { parent: "books", column: book_bookshelf::BOOK, parent_column: PK_ID },
        ForeignKey {
            parent: "bookshelf",
            column: book_bookshelf::BOOKSHELF,
            parent_column: PK_ID,
        },
    ],
};

pub mod loan {
    pub const BOOK: &str = "book";
    pub const LOANED_TO: &str = "loaned_to";
}

pub static LOAN: TableDef = TableDef {
    name: "loan",
    alias: "l",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::integer(loan::BOOK)
            .with_constraint("NOT NULL UNIQUE REFERENCES books ON DELETE CASCADE"),
        ColumnDef::text(loan::LOANED_TO).with_constraint("NOT NULL"),
    ],
    foreign_keys: &[ForeignKey { parent: "books", column: loan::BOOK, parent_column: PK_ID }],
};

// ============================================================================
// LIST STATE
// ============================================================================

pub mod node_settings {
    pub const ROW_KIND: &str = "row_kind";
    pub const ROOT_KEY: &str = "root_key";
}

/// Expanded level-1 nodes, keyed by the row kind of the style's first level.
pub static BOOK_LIST_NODE_SETTINGS: TableDef = TableDef {
    name: "book_list_node_settings",
    alias: "bln",
    columns: &[
        ColumnDef::primary_key(PK_ID),
        ColumnDef::integer(node_settings::ROW_KIND).with_constraint("NOT NULL"),
        ColumnDef::text(node_settings::ROOT_KEY).with_constraint("NOT NULL"),
    ],
    foreign_keys: &[],
};

// ============================================================================
// FULL TEXT SEARCH
// ============================================================================

/// FTS5 index over the searchable text of a book; `rowid` is the book id.
pub const BOOKS_FTS: &str = "books_fts";

pub mod books_fts {
    pub const AUTHOR_NAME: &str = "author_name";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const NOTES: &str = "notes";
    pub const PUBLISHER: &str = "publisher";
    pub const GENRE: &str = "genre";
    pub const LOCATION: &str = "location";
    pub const ISBN: &str = "isbn";
}

// ============================================================================
// CREATION
// ============================================================================

pub static BASE_TABLES: [&TableDef; 9] = [
    &BOOKS,
    &AUTHORS,
    &BOOK_AUTHOR,
    &SERIES,
    &BOOK_SERIES,
    &BOOKSHELF,
    &BOOK_BOOKSHELF,
    &LOAN,
    &BOOK_LIST_NODE_SETTINGS,
];

const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS book_author_pk ON book_author (book, author)",
    "CREATE INDEX IF NOT EXISTS book_author_author ON book_author (author, book)",
    "CREATE UNIQUE INDEX IF NOT EXISTS book_series_pk ON book_series (book, series)",
    "CREATE INDEX IF NOT EXISTS book_series_series ON book_series (series, book)",
    "CREATE UNIQUE INDEX IF NOT EXISTS book_bookshelf_pk ON book_bookshelf (book, bookshelf)",
    "CREATE INDEX IF NOT EXISTS book_bookshelf_shelf ON book_bookshelf (bookshelf, book)",
    "CREATE INDEX IF NOT EXISTS book_list_node_settings_ix1 ON book_list_node_settings (row_kind, root_key)",
];

/// Creates every base table, index and the FTS table if missing.
pub fn create_schema(conn: &Connection) -> StoreResult<()> {
    let mut sql = String::from("PRAGMA foreign_keys = ON;\n");
    for table in BASE_TABLES.iter() {
        sql.push_str(&table.create_sql());
        sql.push_str(";\n");
    }
    for index in INDEXES {
        sql.push_str(index);
        sql.push_str(";\n");
    }
    sql.push_str(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5({}, {}, {}, {}, {}, {}, {}, {});\n",
        BOOKS_FTS,
        books_fts::AUTHOR_NAME,
        books_fts::TITLE,
        books_fts::DESCRIPTION,
        books_fts::NOTES,
        books_fts::PUBLISHER,
        books_fts::GENRE,
        books_fts::LOCATION,
        books_fts::ISBN,
    ));
    conn.execute_batch(&sql)?;
    log::debug!(target: "STORE", "schema created ({} base tables)", BASE_TABLES.len());
    Ok(())
}
