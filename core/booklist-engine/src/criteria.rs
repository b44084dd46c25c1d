//! FILENAME: core/booklist-engine/src/criteria.rs
//! Caller criteria and the WHERE clause built from them.

use booklist_style::Style;
use catalogue_store::schema::{
    authors, book_author, book_bookshelf, books, loan, series, AUTHORS, BOOKS, BOOKSHELF,
    BOOKS_FTS, BOOK_AUTHOR, BOOK_BOOKSHELF, LOAN, PK_ID, SERIES,
};
use rusqlite::types::Value;

/// What to select and what to mark. Blank strings and empty lists are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildCriteria {
    /// Book flagged `selected` in the list.
    pub mark_book_id: Option<i64>,
    pub bookshelf_id: Option<i64>,
    /// Raw SQL condition over the author tables.
    pub author_where: Option<String>,
    /// Raw SQL condition over the book table.
    pub book_where: Option<String>,
    /// Exact name of the person the book is lent to.
    pub loanee: Option<String>,
    pub author_name: Option<String>,
    pub title: Option<String>,
    pub series_name: Option<String>,
    /// Full-text search over the FTS index.
    pub search_text: Option<String>,
    pub book_ids: Vec<i64>,
}

impl BuildCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(mut self, book_id: i64) -> Self {
        self.mark_book_id = Some(book_id);
        self
    }

    pub fn bookshelf(mut self, bookshelf_id: i64) -> Self {
        self.bookshelf_id = Some(bookshelf_id);
        self
    }

    pub fn author_where(mut self, sql: impl Into<String>) -> Self {
        self.author_where = Some(sql.into());
        self
    }

    pub fn book_where(mut self, sql: impl Into<String>) -> Self {
        self.book_where = Some(sql.into());
        self
    }

    pub fn loanee(mut self, name: impl Into<String>) -> Self {
        self.loanee = Some(name.into());
        self
    }

    pub fn author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn series_name(mut self, name: impl Into<String>) -> Self {
        self.series_name = Some(name.into());
        self
    }

    pub fn search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn book_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.book_ids = ids.into_iter().collect();
        self
    }

    /// A bookshelf filter pulls the shelf tables into the join.
    pub fn has_bookshelf(&self) -> bool {
        self.bookshelf_id.is_some()
    }
}

/// A rendered WHERE clause; `sql` is empty when nothing filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn like(value: &str) -> Value {
    Value::Text(format!("%{}%", value))
}

/// Conditions in a fixed order (bookshelf, raw author and book SQL, loanee,
/// author name, title, series, full text, ids, style filters), AND-ed together.
pub fn build_where(criteria: &BuildCriteria, style: &Style) -> WhereClause {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    let book_pk = BOOKS.dot(PK_ID);

    if let Some(shelf) = criteria.bookshelf_id {
        if style.has_bookshelf_level() {
            // the level lists every shelf of the selected books
            conditions.push(format!(
                "EXISTS(SELECT NULL FROM {t} bbsh2 WHERE bbsh2.{shelf}=? AND bbsh2.{book}={pk})",
                t = BOOK_BOOKSHELF.name,
                shelf = book_bookshelf::BOOKSHELF,
                book = book_bookshelf::BOOK,
                pk = book_pk
            ));
        } else {
            conditions.push(format!("{}=?", BOOKSHELF.dot(PK_ID)));
        }
        params.push(Value::Integer(shelf));
    }

    if let Some(sql) = non_blank(&criteria.author_where) {
        conditions.push(format!("({})", sql));
    }
    if let Some(sql) = non_blank(&criteria.book_where) {
        conditions.push(format!("({})", sql));
    }

    if let Some(loanee) = non_blank(&criteria.loanee) {
        conditions.push(format!(
            "EXISTS(SELECT NULL FROM {t} l2 WHERE l2.{to}=? AND l2.{book}={pk})",
            t = LOAN.name,
            to = loan::LOANED_TO,
            book = loan::BOOK,
            pk = book_pk
        ));
        params.push(Value::Text(loanee.to_string()));
    }

    if let Some(name) = non_blank(&criteria.author_name) {
        conditions.push(format!(
            "EXISTS(SELECT NULL FROM {ba} ba2 JOIN {a} a2 ON a2.{id}=ba2.{author} \
             WHERE ba2.{book}={pk} AND (a2.{family} LIKE ? OR a2.{given} LIKE ?))",
            ba = BOOK_AUTHOR.name,
            a = AUTHORS.name,
            id = PK_ID,
            author = book_author::AUTHOR,
            book = book_author::BOOK,
            pk = book_pk,
            family = authors::FAMILY_NAME,
            given = authors::GIVEN_NAMES
        ));
        params.push(like(name));
        params.push(like(name));
    }

    if let Some(title) = non_blank(&criteria.title) {
        conditions.push(format!("{} LIKE ?", BOOKS.dot(books::TITLE)));
        params.push(like(title));
    }

    if let Some(name) = non_blank(&criteria.series_name) {
        conditions.push(format!("{} LIKE ?", SERIES.dot(series::NAME)));
        params.push(like(name));
    }

    if let Some(text) = non_blank(&criteria.search_text) {
        let query = cleanup_fts_criterion(&text.to_lowercase());
        if !query.is_empty() {
            conditions.push(format!(
                "{} IN (SELECT rowid FROM {fts} WHERE {fts} MATCH ?)",
                book_pk,
                fts = BOOKS_FTS
            ));
            params.push(Value::Text(query));
        }
    }

    if !criteria.book_ids.is_empty() {
        let placeholders = vec!["?"; criteria.book_ids.len()].join(",");
        conditions.push(format!("{} IN ({})", book_pk, placeholders));
        params.extend(criteria.book_ids.iter().map(|&id| Value::Integer(id)));
    }

    conditions.extend(style.filters.conditions());

    WhereClause {
        sql: conditions.join("\n AND "),
        params,
    }
}

/// Reduces free text to FTS5 prefix tokens: letters and digits are kept and
/// everything else separates tokens.
pub fn cleanup_fts_criterion(search: &str) -> String {
    search
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| format!("{}*", token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use booklist_style::{builtin, StyleFilters, TriState};

    #[test]
    fn test_empty_criteria() {
        let clause = build_where(&BuildCriteria::new(), &builtin::author_series());
        assert!(clause.sql.is_empty());
        assert!(clause.params.is_empty());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let criteria = BuildCriteria::new().title("  ").loanee("").book_ids(Vec::new());
        let clause = build_where(&criteria, &builtin::author_series());
        assert!(clause.sql.is_empty());
    }

    #[test]
    fn test_condition_order_and_params() {
        let criteria = BuildCriteria::new()
            .bookshelf(3)
            .title("dune")
            .author_name("herb")
            .book_ids([7, 9]);
        let style = builtin::unread();
        let clause = build_where(&criteria, &style);
        let parts: Vec<&str> = clause.sql.split("\n AND ").collect();
        assert_eq!(parts[0], "bsh._id=?");
        assert!(parts[1].starts_with("EXISTS(SELECT NULL FROM book_author ba2"));
        assert_eq!(parts[2], "b.title LIKE ?");
        assert_eq!(parts[3], "b._id IN (?,?)");
        assert_eq!(parts[4], "b.read=0");
        assert_eq!(
            clause.params,
            vec![
                Value::Integer(3),
                Value::Text("%herb%".into()),
                Value::Text("%herb%".into()),
                Value::Text("%dune%".into()),
                Value::Integer(7),
                Value::Integer(9),
            ]
        );
    }

    #[test]
    fn test_bookshelf_level_uses_exists() {
        let clause = build_where(&BuildCriteria::new().bookshelf(1), &builtin::bookshelf());
        assert!(clause.sql.starts_with("EXISTS(SELECT NULL FROM book_bookshelf bbsh2"));
    }

    #[test]
    fn test_style_filters_are_appended() {
        let style = builtin::author_series().with_filters(StyleFilters {
            signed: TriState::Yes,
            ..StyleFilters::default()
        });
        let clause = build_where(&BuildCriteria::new().search_text("Dune"), &style);
        assert_eq!(
            clause.sql,
            "b._id IN (SELECT rowid FROM books_fts WHERE books_fts MATCH ?)\n AND b.signed=1"
        );
        assert_eq!(clause.params, vec![Value::Text("dune*".into())]);
    }

    #[test]
    fn test_cleanup_fts_criterion() {
        assert_eq!(cleanup_fts_criterion("frank herbert"), "frank* herbert*");
        assert_eq!(cleanup_fts_criterion("dune -messiah"), "dune* messiah*");
        assert_eq!(cleanup_fts_criterion("\"o'brien\"  "), "o* brien*");
        assert_eq!(cleanup_fts_criterion("*:()"), "");
        assert_eq!(cleanup_fts_criterion(""), "");
    }
}
