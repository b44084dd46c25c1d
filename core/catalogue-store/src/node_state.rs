//! FILENAME: core/catalogue-store/src/node_state.rs
//! Persisted expansion state of top-level list nodes.
//!
//! One row per expanded node, keyed by `(row_kind, root_key)` where
//! `row_kind` is the kind of the style's outermost level.

use rusqlite::{params, Connection};

use crate::error::StoreResult;

pub fn save(conn: &Connection, row_kind: u32, root_key: &str) -> StoreResult<()> {
    conn.prepare_cached(
        "INSERT INTO book_list_node_settings (row_kind, root_key) VALUES (?1, ?2)",
    )?
    .execute(params![row_kind, root_key])?;
    Ok(())
}

pub fn delete(conn: &Connection, row_kind: u32, root_key: &str) -> StoreResult<()> {
    conn.prepare_cached(
        "DELETE FROM book_list_node_settings WHERE row_kind = ?1 AND root_key = ?2",
    )?
    .execute(params![row_kind, root_key])?;
    Ok(())
}

/// Forgets every node of one kind.
pub fn delete_kind(conn: &Connection, row_kind: u32) -> StoreResult<usize> {
    let removed = conn
        .prepare_cached("DELETE FROM book_list_node_settings WHERE row_kind = ?1")?
        .execute(params![row_kind])?;
    Ok(removed)
}

pub fn is_saved(conn: &Connection, row_kind: u32, root_key: &str) -> StoreResult<bool> {
    let found: i64 = conn
        .prepare_cached(
            "SELECT COUNT(*) FROM book_list_node_settings WHERE row_kind = ?1 AND root_key = ?2",
        )?
        .query_row(params![row_kind, root_key], |row| row.get(0))?;
    Ok(found > 0)
}

/// Root keys of every saved node of one kind, sorted.
pub fn saved_root_keys(conn: &Connection, row_kind: u32) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT root_key FROM book_list_node_settings WHERE row_kind = ?1 ORDER BY root_key",
    )?;
    let keys = stmt
        .query_map(params![row_kind], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}
