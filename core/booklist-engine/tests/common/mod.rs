//! FILENAME: core/booklist-engine/tests/common/mod.rs
//! Test harness and fixtures for booklist engine integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use booklist_engine::{BooklistBuilder, BuilderConfig, BuilderRegistry};
use booklist_style::Style;
use catalogue_store::rusqlite::types::Value;
use catalogue_store::{BookRecord, CatalogueDb};

/// Installs `env_logger` once; `RUST_LOG=debug` shows the generated SQL.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ids of the sample catalogue rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleIds {
    pub banks: i64,
    pub le_guin: i64,
    pub culture: i64,
    pub living_room: i64,
    pub attic: i64,
    pub phlebas: i64,
    pub player: i64,
    pub dispossessed: i64,
}

/// One generated book, as indexes into the fixture pools.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBook {
    pub title: usize,
    pub author: usize,
    pub second_author: Option<usize>,
    pub series: Option<usize>,
    pub genre: usize,
    pub read: bool,
    pub rating: u8,
}

pub const TITLES: [&str; 5] = ["Dune", "dune", "Emma", "Zen", "consider"];
pub const AUTHORS: [(&str, &str); 5] = [
    ("Banks", "Iain M."),
    ("banks", "iain m."),
    ("Le Guin", "Ursula K."),
    ("Herbert", "Frank"),
    ("Smith", ""),
];
pub const SERIES: [&str; 3] = ["Culture", "Dune", "culture"];
pub const GENRES: [Option<&str>; 5] = [Some("SF"), Some("sf"), Some("Fantasy"), None, Some("fantasy ")];

/// Test harness owning a catalogue and a builder registry.
pub struct TestHarness {
    pub db: CatalogueDb,
    pub registry: Arc<BuilderRegistry>,
    pub ids: SampleIds,
}

impl TestHarness {
    /// Empty in-memory catalogue.
    pub fn new() -> Self {
        init_logging();
        TestHarness {
            db: CatalogueDb::open_in_memory().unwrap(),
            registry: Arc::new(BuilderRegistry::new()),
            ids: SampleIds::default(),
        }
    }

    /// Catalogue in a database file; reopening the same path sees the same data.
    pub fn open(path: &Path) -> Self {
        init_logging();
        TestHarness {
            db: CatalogueDb::open(path).unwrap(),
            registry: Arc::new(BuilderRegistry::new()),
            ids: SampleIds::default(),
        }
    }

    /// Three books by two authors; two of them in one series.
    ///
    /// ```text
    /// Banks, Iain M.     Culture #1  Consider Phlebas     SF   read    shelf: living room
    /// Banks, Iain M.     Culture #2  The Player of Games  sf   unread  shelves: both, lent to Alice
    /// Le Guin, Ursula K. -           The Dispossessed     SF   unread  shelf: attic
    /// ```
    pub fn with_sample_data() -> Self {
        let mut harness = Self::new();
        harness.populate_sample_data();
        harness
    }

    pub fn populate_sample_data(&mut self) {
        let db = &self.db;
        let banks = db.insert_author("Banks", "Iain M.").unwrap();
        let le_guin = db.insert_author("Le Guin", "Ursula K.").unwrap();
        let culture = db.insert_series("Culture").unwrap();
        let living_room = db.insert_bookshelf("Living room").unwrap();
        let attic = db.insert_bookshelf("Attic").unwrap();

        let phlebas = db
            .insert_book(&BookRecord {
                genre: Some("SF".into()),
                read: true,
                rating: 4.0,
                publisher: Some("Macmillan".into()),
                date_published: Some("1987-04-23".into()),
                ..BookRecord::new("Consider Phlebas")
                    .by(banks)
                    .in_series(culture, Some("1"))
                    .on_shelf(living_room)
            })
            .unwrap();
        let player = db
            .insert_book(&BookRecord {
                genre: Some("sf".into()),
                rating: 5.0,
                date_published: Some("1988".into()),
                ..BookRecord::new("The Player of Games")
                    .by(banks)
                    .in_series(culture, Some("2"))
                    .on_shelf(living_room)
                    .on_shelf(attic)
            })
            .unwrap();
        let dispossessed = db
            .insert_book(&BookRecord {
                genre: Some("SF".into()),
                rating: 4.0,
                date_published: Some("1974-05".into()),
                ..BookRecord::new("The Dispossessed").by(le_guin).on_shelf(attic)
            })
            .unwrap();
        db.lend_book(player, "Alice").unwrap();

        self.ids = SampleIds {
            banks,
            le_guin,
            culture,
            living_room,
            attic,
            phlebas,
            player,
            dispossessed,
        };
    }

    /// Catalogue built from generated books.
    pub fn with_generated(books: &[GeneratedBook]) -> Self {
        let harness = Self::new();
        let authors: Vec<i64> = AUTHORS
            .iter()
            .map(|(family, given)| harness.db.insert_author(family, given).unwrap())
            .collect();
        let series: Vec<i64> = SERIES
            .iter()
            .map(|name| harness.db.insert_series(name).unwrap())
            .collect();

        for (i, book) in books.iter().enumerate() {
            let mut record = BookRecord {
                genre: GENRES[book.genre].map(str::to_string),
                read: book.read,
                rating: f64::from(book.rating),
                ..BookRecord::new(TITLES[book.title]).by(authors[book.author])
            };
            if let Some(second) = book.second_author.filter(|&a| a != book.author) {
                record = record.by(authors[second]);
            }
            if let Some(s) = book.series {
                let number = (i % 4).to_string();
                record = record.in_series(series[s], Some(number.as_str()));
            }
            harness.db.insert_book(&record).unwrap();
        }
        harness
    }

    pub fn builder(&self, style: Style) -> BooklistBuilder {
        self.builder_with(style, BuilderConfig::default())
    }

    pub fn builder_with(&self, style: Style, config: BuilderConfig) -> BooklistBuilder {
        BooklistBuilder::new(&self.registry, self.db.clone(), style, config).unwrap()
    }

    /// Every list row in display order, without `_id`.
    pub fn list_rows(&self, builder: &BooklistBuilder) -> Vec<Vec<Value>> {
        let sql = format!(
            "SELECT l.* FROM {} l JOIN {} n ON n.real_row_id = l._id ORDER BY n._id",
            builder.list_table_name(),
            builder.nav_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let width = stmt.column_count();
                let rows = stmt
                    .query_map([], |row| {
                        (1..width)
                            .map(|i| row.get::<_, Value>(i))
                            .collect::<Result<Vec<_>, _>>()
                    })?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }

    /// (level, visible, expanded) per nav row, in nav order.
    pub fn nav_flags(&self, builder: &BooklistBuilder) -> Vec<(i64, bool, bool)> {
        let sql = format!(
            "SELECT level, visible, expanded FROM {} ORDER BY _id",
            builder.nav_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }

    /// Visible rows read in one query, as the cursor should see them.
    pub fn visible_reference(&self, builder: &BooklistBuilder) -> Vec<Vec<Value>> {
        let sql = format!(
            "SELECT l.*, n._id - 1 FROM {} n JOIN {} l ON l._id = n.real_row_id \
             WHERE n.visible = 1 ORDER BY n._id",
            builder.nav_table_name(),
            builder.list_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let width = stmt.column_count();
                let rows = stmt
                    .query_map([], |row| {
                        (0..width)
                            .map(|i| row.get::<_, Value>(i))
                            .collect::<Result<Vec<_>, _>>()
                    })?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }

    /// Named list columns per row, in display order.
    pub fn nav_columns(&self, builder: &BooklistBuilder, names: &[&str]) -> Vec<Vec<Value>> {
        let selected: Vec<String> = names.iter().map(|n| format!("l.{}", n)).collect();
        let sql = format!(
            "SELECT {} FROM {} l JOIN {} n ON n.real_row_id = l._id ORDER BY n._id",
            selected.join(", "),
            builder.list_table_name(),
            builder.nav_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        (0..names.len())
                            .map(|i| row.get::<_, Value>(i))
                            .collect::<Result<Vec<_>, _>>()
                    })?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }

    /// Text of one list column per row, in display order.
    pub fn column_texts(&self, builder: &BooklistBuilder, column: &str) -> Vec<Option<String>> {
        let sql = format!(
            "SELECT l.{} FROM {} l JOIN {} n ON n.real_row_id = l._id ORDER BY n._id",
            column,
            builder.list_table_name(),
            builder.nav_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |r| r.get::<_, Option<String>>(0))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }

    /// Book ids of the leaf rows, in display order.
    pub fn leaf_book_ids(&self, builder: &BooklistBuilder) -> Vec<i64> {
        let sql = format!(
            "SELECT l.book_id FROM {} l JOIN {} n ON n.real_row_id = l._id \
             WHERE l.book_id IS NOT NULL ORDER BY n._id",
            builder.list_table_name(),
            builder.nav_table_name()
        );
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |r| r.get::<_, i64>(0))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            })
            .unwrap()
    }
}
