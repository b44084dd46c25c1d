//! FILENAME: core/booklist-style/tests/test_style.rs
//! PURPOSE: Level expressions evaluated against a real catalogue database.

use booklist_style::{all_kinds, builtin, ExpressionContext, GroupKind, Level, StyleDefinition};
use catalogue_store::schema::{AUTHORS, BOOKS, BOOKSHELF, BOOK_AUTHOR, BOOK_BOOKSHELF, BOOK_SERIES, LOAN, SERIES};
use catalogue_store::rusqlite::types::Value;
use catalogue_store::{BookRecord, CatalogueDb, Joiner};

fn create_test_db() -> CatalogueDb {
    let db = CatalogueDb::open_in_memory().unwrap();
    let author = db.insert_author("Banks", "Iain M.").unwrap();
    let series = db.insert_series("Culture").unwrap();
    let shelf = db.insert_bookshelf("Science Fiction").unwrap();

    let mut book = BookRecord::new("excession")
        .by(author)
        .in_series(series, Some("5"))
        .on_shelf(shelf);
    book.genre = Some("SF".into());
    book.date_published = Some("1996-07-04".into());
    book.date_added = Some("2021-11-03 08:15:00".into());
    book.read_end = Some("2022-1-9".into());
    book.rating = 4.5;
    let book_id = db.insert_book(&book).unwrap();
    db.lend_book(book_id, "Zakalwe").unwrap();
    db
}

/// Every table a level expression may reference.
fn full_join() -> String {
    let mut join = Joiner::new(&BOOKS);
    join.join(&BOOK_AUTHOR).unwrap();
    join.join(&AUTHORS).unwrap();
    join.left_outer_join_from(&BOOKS, &BOOK_SERIES).unwrap();
    join.left_outer_join(&SERIES).unwrap();
    join.left_outer_join_from(&BOOKS, &LOAN).unwrap();
    join.left_outer_join_from(&BOOKS, &BOOK_BOOKSHELF).unwrap();
    join.left_outer_join(&BOOKSHELF).unwrap();
    join.sql().to_string()
}

fn evaluate(db: &CatalogueDb, expression: &str) -> Value {
    let sql = format!("SELECT {} FROM {}", expression, full_join());
    db.with_connection(|c| c.query_row(&sql, [], |r| r.get(0)))
        .unwrap_or_else(|e| panic!("{}: {}", sql, e))
}

fn text(db: &CatalogueDb, kind: GroupKind) -> String {
    let level = Level::for_kind(kind);
    let sql = level.columns[0].expression.to_sql(&ExpressionContext {
        local_time_dates: false,
        ..ExpressionContext::default()
    });
    match evaluate(db, &sql) {
        Value::Text(s) => s,
        Value::Integer(n) => n.to_string(),
        other => panic!("unexpected value {:?}", other),
    }
}

// ============================================================================
// INTEGRATION TESTS - Expressions
// ============================================================================

#[test]
fn test_every_level_expression_is_valid_sql() {
    let db = create_test_db();
    let ctx = ExpressionContext::default();
    for kind in all_kinds() {
        let level = Level::for_kind(kind);
        for column in &level.columns {
            evaluate(&db, &column.expression.to_sql(&ctx));
        }
        let root_key = level.root_key_expression(&ctx).unwrap();
        evaluate(&db, &root_key);
    }
}

#[test]
fn test_display_values() {
    let db = create_test_db();
    assert_eq!(text(&db, GroupKind::author()), "Banks, Iain M.");
    assert_eq!(
        text(&db, GroupKind::Author { show_all: false, given_first: true }),
        "Iain M. Banks"
    );
    assert_eq!(text(&db, GroupKind::series()), "Culture");
    assert_eq!(text(&db, GroupKind::Genre), "SF");
    assert_eq!(text(&db, GroupKind::TitleLetter), "E");
    assert_eq!(text(&db, GroupKind::Loaned), "Zakalwe");
    assert_eq!(text(&db, GroupKind::Bookshelf), "Science Fiction");
    assert_eq!(text(&db, GroupKind::Rating), "4");
}

#[test]
fn test_date_globs() {
    let db = create_test_db();
    assert_eq!(text(&db, GroupKind::PublicationYear), "1996");
    assert_eq!(text(&db, GroupKind::PublicationMonth), "07");
    assert_eq!(text(&db, GroupKind::AddedDay), "03");
    assert_eq!(text(&db, GroupKind::ReadMonth), "1");
    assert_eq!(text(&db, GroupKind::ReadDay), "9");
    assert_eq!(text(&db, GroupKind::AcquiredYear), "UNKNOWN");
}

#[test]
fn test_root_key_value() {
    let db = create_test_db();
    let ctx = ExpressionContext::default();
    let key = Level::for_kind(GroupKind::Genre).root_key_expression(&ctx).unwrap();
    assert_eq!(
        evaluate(&db, &key),
        Value::Text("g/SF".into())
    );
}

// ============================================================================
// INTEGRATION TESTS - Definitions
// ============================================================================

#[test]
fn test_builtin_definitions_round_trip_through_json() {
    for style in builtin::all() {
        let json = StyleDefinition::from(&style).to_json().unwrap();
        let again = StyleDefinition::from_json(&json).unwrap().compose().unwrap();
        assert_eq!(again, style, "style {}", style.name());
    }
}
