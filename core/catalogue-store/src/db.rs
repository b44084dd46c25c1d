//! FILENAME: core/catalogue-store/src/db.rs
//! Shared handle to the catalogue database.
//!
//! The connection lives behind `Arc<Mutex<..>>` so a handle can be cloned
//! into every builder and cursor. Each operation holds the lock for its whole
//! duration, which serializes writers and keeps readers out of open
//! transactions.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::definitions::validate_identifier;
use crate::error::StoreResult;
use crate::schema::create_schema;

#[derive(Clone)]
pub struct CatalogueDb {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for CatalogueDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueDb").finish_non_exhaustive()
    }
}

impl CatalogueDb {
    /// Opens (or creates) a database file and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        create_schema(&conn)?;
        Ok(CatalogueDb {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks the connection. A poisoned lock is recovered: SQLite rolls back
    /// any transaction a panicking holder left open.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` inside an immediate transaction; commits on `Ok`, rolls back
    /// on `Err` (the transaction is dropped without commit).
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` with the locked connection, outside any transaction.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Whether `collation` distinguishes upper and lower case.
    pub fn is_collation_case_sensitive(&self, collation: &str) -> StoreResult<bool> {
        validate_identifier(collation)?;
        let conn = self.lock();
        let sql = format!(
            "SELECT CASE WHEN 'a' = 'A' COLLATE {} THEN 0 ELSE 1 END",
            collation
        );
        let sensitive: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(sensitive != 0)
    }

    /// Drops every cached prepared statement on the connection.
    pub fn flush_statement_cache(&self) {
        self.lock().flush_prepared_statement_cache();
    }
}

/// Refreshes planner statistics for one table.
pub fn analyze(conn: &Connection, table: &str) -> StoreResult<()> {
    validate_identifier(table)?;
    conn.execute_batch(&format!("ANALYZE {}", table))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_nocase_is_case_insensitive() {
        let db = CatalogueDb::open_in_memory().unwrap();
        assert!(!db.is_collation_case_sensitive("NOCASE").unwrap());
        assert!(db.is_collation_case_sensitive("BINARY").unwrap());
    }

    #[test]
    fn test_collation_name_is_validated() {
        let db = CatalogueDb::open_in_memory().unwrap();
        let err = db.is_collation_case_sensitive("NOCASE; DROP TABLE books").unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = CatalogueDb::open_in_memory().unwrap();
        let result: Result<(), StoreError> = db.with_transaction(|tx| {
            tx.execute("INSERT INTO books (title) VALUES ('Lost')", [])?;
            Err(StoreError::UnknownRecord("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_connection(|c| c.query_row("SELECT COUNT(*) FROM books", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let db = CatalogueDb::open_in_memory().unwrap();
        db.with_transaction::<_, StoreError, _>(|tx| {
            tx.execute("INSERT INTO books (title) VALUES ('Kept')", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = db
            .with_connection(|c| c.query_row("SELECT COUNT(*) FROM books", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_clones_share_the_connection() {
        let db = CatalogueDb::open_in_memory().unwrap();
        let other = db.clone();
        db.with_connection(|c| c.execute_batch("CREATE TEMP TABLE t (n INTEGER)"))
            .unwrap();
        let exists: i64 = other
            .with_connection(|c| {
                c.query_row(
                    "SELECT COUNT(*) FROM sqlite_temp_master WHERE name='t'",
                    [],
                    |r| r.get(0),
                )
            })
            .unwrap();
        assert_eq!(exists, 1);
    }
}
