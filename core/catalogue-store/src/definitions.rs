//! FILENAME: core/catalogue-store/src/definitions.rs
//! Column and table definitions used to generate SQL.
//!
//! Base tables are `'static` definitions (see `schema`). Per-builder
//! temporary tables are `TempTable` values whose column list is only known
//! once a style has been processed.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

// ============================================================================
// COLUMNS
// ============================================================================

/// Storage class of a column, as used in CREATE TABLE statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Boolean,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Column constraint text appended after the type, e.g. `NOT NULL DEFAULT 0`.
    pub constraint: &'static str,
    pub primary_key: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        ColumnDef {
            name,
            sql_type,
            constraint: "",
            primary_key: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, SqlType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, SqlType::Real)
    }

    pub const fn primary_key(name: &'static str) -> Self {
        ColumnDef {
            name,
            sql_type: SqlType::Integer,
            constraint: "",
            primary_key: true,
        }
    }

    pub const fn with_constraint(mut self, constraint: &'static str) -> Self {
        self.constraint = constraint;
        self
    }

    /// Text columns are compared with the configured collation.
    pub fn is_text(&self) -> bool {
        self.sql_type == SqlType::Text
    }

    fn create_fragment(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if !self.constraint.is_empty() {
            sql.push(' ');
            sql.push_str(self.constraint);
        }
        sql
    }
}

// ============================================================================
// BASE TABLES
// ============================================================================

/// A foreign key from the owning table to `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub parent: &'static str,
    pub column: &'static str,
    pub parent_column: &'static str,
}

/// A fixed table of the catalogue schema.
#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub alias: &'static str,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableDef {
    /// Qualified column reference, e.g. `b.title`.
    pub fn dot(&self, column: &str) -> String {
        format!("{}.{}", self.alias, column)
    }

    /// Table reference with alias, for FROM/JOIN clauses.
    pub fn reference(&self) -> String {
        format!("{} {}", self.name, self.alias)
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.create_fragment()).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    /// Join condition between this table and `other`, in either direction.
    pub fn fk_match(&self, other: &TableDef) -> StoreResult<String> {
        if let Some(fk) = self.foreign_keys.iter().find(|fk| fk.parent == other.name) {
            return Ok(format!(
                "{}={}",
                self.dot(fk.column),
                other.dot(fk.parent_column)
            ));
        }
        if let Some(fk) = other.foreign_keys.iter().find(|fk| fk.parent == self.name) {
            return Ok(format!(
                "{}={}",
                other.dot(fk.column),
                self.dot(fk.parent_column)
            ));
        }
        Err(StoreError::NoRelation {
            child: self.name.to_string(),
            parent: other.name.to_string(),
        })
    }
}

// ============================================================================
// TEMPORARY TABLES
// ============================================================================

/// A per-session table created with `CREATE TEMPORARY TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempTable {
    name: String,
    columns: Vec<ColumnDef>,
}

impl TempTable {
    /// `name` is interpolated into SQL and must be a plain identifier.
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(TempTable {
            name,
            columns: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Adds a column unless one with the same name is already present.
    pub fn add_column(&mut self, column: ColumnDef) -> &mut Self {
        if !self.columns.iter().any(|c| c.name == column.name) {
            self.columns.push(column);
        }
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn clear_columns(&mut self) {
        self.columns.clear();
    }

    pub fn dot(&self, column: &str) -> String {
        format!("{}.{}", self.name, column)
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.create_fragment()).collect();
        format!(
            "CREATE TEMPORARY TABLE {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS temp.{}", self.name)
    }

    /// Drop-if-exists followed by create.
    pub fn recreate(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(&format!("{};\n{};", self.drop_sql(), self.create_sql()))?;
        Ok(())
    }

    pub fn drop(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(&self.drop_sql())?;
        Ok(())
    }
}

/// Accepts ASCII letters, digits and underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

// ============================================================================
// JOINER
// ============================================================================

/// Builds a FROM clause by chaining joins along foreign keys.
///
/// Each join is matched against the most recently joined table unless a
/// parent is named explicitly.
#[derive(Debug)]
pub struct Joiner {
    sql: String,
    last: &'static TableDef,
}

impl Joiner {
    pub fn new(root: &'static TableDef) -> Self {
        Joiner {
            sql: root.reference(),
            last: root,
        }
    }

    pub fn join(&mut self, to: &'static TableDef) -> StoreResult<&mut Self> {
        let parent = self.last;
        self.join_from(parent, to)
    }

    pub fn join_from(
        &mut self,
        parent: &'static TableDef,
        to: &'static TableDef,
    ) -> StoreResult<&mut Self> {
        self.push("JOIN", parent, to)
    }

    pub fn left_outer_join(&mut self, to: &'static TableDef) -> StoreResult<&mut Self> {
        let parent = self.last;
        self.left_outer_join_from(parent, to)
    }

    pub fn left_outer_join_from(
        &mut self,
        parent: &'static TableDef,
        to: &'static TableDef,
    ) -> StoreResult<&mut Self> {
        self.push("LEFT OUTER JOIN", parent, to)
    }

    /// Appends raw text to the most recent join condition.
    pub fn append(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn push(
        &mut self,
        kind: &str,
        parent: &'static TableDef,
        to: &'static TableDef,
    ) -> StoreResult<&mut Self> {
        let on = to.fk_match(parent)?;
        self.sql
            .push_str(&format!("\n {} {} ON ({})", kind, to.reference(), on));
        self.last = to;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AUTHORS, BOOKS, BOOK_AUTHOR, BOOK_SERIES, SERIES};

    #[test]
    fn test_dot_uses_alias() {
        assert_eq!(BOOKS.dot("title"), "b.title");
        assert_eq!(BOOKS.reference(), "books b");
    }

    #[test]
    fn test_fk_match_either_direction() {
        let forward = BOOK_AUTHOR.fk_match(&BOOKS).unwrap();
        let backward = BOOKS.fk_match(&BOOK_AUTHOR).unwrap();
        assert_eq!(forward, "ba.book=b._id");
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_fk_match_unrelated_tables() {
        let err = AUTHORS.fk_match(&SERIES).unwrap_err();
        assert!(matches!(err, StoreError::NoRelation { .. }));
    }

    #[test]
    fn test_joiner_chains_from_last_table() {
        let mut join = Joiner::new(&BOOKS);
        join.join(&BOOK_AUTHOR).unwrap();
        join.append(" AND ba.author_position=1");
        join.join(&AUTHORS).unwrap();
        join.left_outer_join_from(&BOOKS, &BOOK_SERIES).unwrap();
        join.left_outer_join(&SERIES).unwrap();

        let sql = join.sql();
        assert!(sql.starts_with("books b"));
        assert!(sql.contains("JOIN book_author ba ON (ba.book=b._id) AND ba.author_position=1"));
        assert!(sql.contains("JOIN authors a ON (ba.author=a._id)"));
        assert!(sql.contains("LEFT OUTER JOIN book_series bs ON (bs.book=b._id)"));
        assert!(sql.contains("LEFT OUTER JOIN series s ON (bs.series=s._id)"));
    }

    #[test]
    fn test_temp_table_ignores_duplicate_columns() {
        let mut table = TempTable::new("book_list_tmp_1").unwrap();
        table
            .add_column(ColumnDef::primary_key("_id"))
            .add_column(ColumnDef::text("title"))
            .add_column(ColumnDef::text("title"));
        assert_eq!(table.columns().len(), 2);
        assert_eq!(
            table.create_sql(),
            "CREATE TEMPORARY TABLE book_list_tmp_1 (_id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT)"
        );
    }

    #[test]
    fn test_temp_table_rejects_bad_names() {
        assert!(TempTable::new("list; DROP TABLE books").is_err());
        assert!(TempTable::new("1list").is_err());
        assert!(TempTable::new("_list_2").is_ok());
    }

    #[test]
    fn test_temp_table_recreate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let mut table = TempTable::new("scratch").unwrap();
        table.add_column(ColumnDef::integer("n"));
        table.recreate(&conn).unwrap();
        conn.execute("INSERT INTO scratch (n) VALUES (1)", []).unwrap();
        table.recreate(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM scratch", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
        table.drop(&conn).unwrap();
        table.drop(&conn).unwrap();
    }
}
