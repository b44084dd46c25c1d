//! FILENAME: core/booklist-engine/src/navigation.rs
//! The navigation table: one row per list row, in display order, carrying
//! the visibility and expansion state of that row.
//!
//! A nav row's `_id` is its absolute position plus one. Collapsing a node
//! hides every deeper row up to the next row at the same or an outer level.

use booklist_style::columns;
use catalogue_store::schema::{node_settings, BOOK_LIST_NODE_SETTINGS};
use catalogue_store::{node_state, ColumnDef, SqlType, StoreResult, TempTable};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::config::RebuildState;
use crate::error::BooklistResult;
use crate::logging::{self, log_debug};
use crate::materialize::PlanStatement;
use crate::summary::Collation;

// ============================================================================
// TABLE
// ============================================================================

pub const NAV_ID: ColumnDef = ColumnDef::primary_key("_id");
pub const REAL_ROW_ID: ColumnDef = ColumnDef::integer("real_row_id").with_constraint("NOT NULL");
pub const VISIBLE: ColumnDef =
    ColumnDef::new("visible", SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0");
pub const EXPANDED: ColumnDef =
    ColumnDef::new("expanded", SqlType::Boolean).with_constraint("NOT NULL DEFAULT 0");

pub fn nav_table(name: &str) -> StoreResult<TempTable> {
    let mut table = TempTable::new(name)?;
    table
        .add_column(NAV_ID)
        .add_column(REAL_ROW_ID)
        .add_column(columns::LEVEL)
        .add_column(columns::ROOT_KEY)
        .add_column(VISIBLE)
        .add_column(EXPANDED);
    Ok(table)
}

/// Fills the nav table from the list table in list order.
pub fn nav_insert(
    nav: &str,
    list: &str,
    state: RebuildState,
    top_kind: u32,
    list_order_by: &str,
    collation: &Collation,
) -> PlanStatement {
    let head = format!(
        "INSERT INTO {} (real_row_id, level, root_key, visible, expanded)",
        nav
    );
    match state {
        RebuildState::Preserved => PlanStatement::with_params(
            format!(
                "{head}\nSELECT l._id, l.level, l.root_key,\n  \
                 CASE WHEN l.level = 1 OR s.saved THEN 1 ELSE 0 END,\n  \
                 CASE WHEN s.saved THEN 1 ELSE 0 END\n\
                 FROM {list} l\n\
                 JOIN (SELECT _id, EXISTS(SELECT NULL FROM {settings} bln \
                 WHERE bln.{kind} = ?1 AND bln.{key} = l2.root_key COLLATE {c}) AS saved \
                 FROM {list} l2) s ON s._id = l._id\n\
                 ORDER BY {order}",
                head = head,
                list = list,
                settings = BOOK_LIST_NODE_SETTINGS.name,
                kind = node_settings::ROW_KIND,
                key = node_settings::ROOT_KEY,
                c = collation.name(),
                order = list_order_by
            ),
            vec![Value::Integer(i64::from(top_kind))],
        ),
        RebuildState::AlwaysExpanded => PlanStatement::new(format!(
            "{}\nSELECT l._id, l.level, l.root_key, 1, 1 FROM {} l\nORDER BY {}",
            head, list, list_order_by
        )),
        RebuildState::AlwaysCollapsed => PlanStatement::new(format!(
            "{}\nSELECT l._id, l.level, l.root_key, CASE WHEN l.level = 1 THEN 1 ELSE 0 END, 0 \
             FROM {} l\nORDER BY {}",
            head, list, list_order_by
        )),
    }
}

pub fn nav_indexes(nav: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE INDEX {nav}_IX1 ON {nav} (level, expanded, root_key)",
            nav = nav
        ),
        format!("CREATE UNIQUE INDEX {nav}_IX2 ON {nav} (real_row_id)", nav = nav),
    ]
}

// ============================================================================
// NAVIGATOR
// ============================================================================

/// A list row holding a given book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookRowInfo {
    pub absolute_position: i64,
    pub visible: bool,
    /// Position among the visible rows; see `Navigator::get_position`.
    pub list_position: i64,
}

/// Operations on a built nav table. Callers own the transaction.
pub struct Navigator<'a> {
    conn: &'a Connection,
    list: &'a str,
    nav: &'a str,
    top_kind: u32,
}

impl<'a> Navigator<'a> {
    pub fn new(conn: &'a Connection, list: &'a str, nav: &'a str, top_kind: u32) -> Self {
        Navigator {
            conn,
            list,
            nav,
            top_kind,
        }
    }

    /// Flips the expansion of one node. Returns the new state, or `None`
    /// if there is no such row.
    pub fn toggle(&self, nav_id: i64) -> BooklistResult<Option<bool>> {
        let row: Option<(i64, bool, Option<String>)> = self
            .conn
            .prepare_cached(&format!(
                "SELECT level, expanded, root_key FROM {} WHERE _id = ?1",
                self.nav
            ))?
            .query_row(params![nav_id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .optional()?;
        let Some((level, expanded, root_key)) = row else {
            return Ok(None);
        };
        let new_state = !expanded;

        let next: Option<i64> = self
            .conn
            .prepare_cached(&format!(
                "SELECT MIN(_id) FROM {} WHERE _id > ?1 AND level <= ?2",
                self.nav
            ))?
            .query_row(params![nav_id, level], |r| r.get(0))?;
        let next = next.unwrap_or(i64::MAX);

        self.conn
            .prepare_cached(&format!(
                "UPDATE {} SET visible = ?1, expanded = ?1 \
                 WHERE _id > ?2 AND _id < ?3 AND level > ?4",
                self.nav
            ))?
            .execute(params![new_state, nav_id, next, level])?;
        self.conn
            .prepare_cached(&format!("UPDATE {} SET expanded = ?1 WHERE _id = ?2", self.nav))?
            .execute(params![new_state, nav_id])?;

        // persisted state belongs to the level-1 node the row sits under
        let root = if level == 1 {
            root_key.map(|key| (key, new_state))
        } else {
            self.root_of(nav_id)?
        };
        if let Some((root_key, root_expanded)) = root {
            node_state::delete(self.conn, self.top_kind, &root_key)?;
            if root_expanded {
                node_state::save(self.conn, self.top_kind, &root_key)?;
            }
        }

        log_debug!(
            logging::NAV,
            "toggle {} {} level={} next={}",
            self.nav,
            nav_id,
            level,
            next
        );
        Ok(Some(new_state))
    }

    pub fn expand_all(&self, expand: bool) -> BooklistResult<()> {
        if expand {
            self.conn
                .execute(&format!("UPDATE {} SET expanded = 1, visible = 1", self.nav), [])?;
            node_state::delete_kind(self.conn, self.top_kind)?;
            let keys = self
                .conn
                .prepare_cached(&format!(
                    "SELECT DISTINCT root_key FROM {} WHERE level = 1 AND root_key IS NOT NULL",
                    self.nav
                ))?
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            for key in &keys {
                node_state::save(self.conn, self.top_kind, key)?;
            }
        } else {
            self.conn.execute(
                &format!("UPDATE {} SET expanded = 0, visible = 0 WHERE level > 1", self.nav),
                [],
            )?;
            self.conn
                .execute(&format!("UPDATE {} SET expanded = 0 WHERE level = 1", self.nav), [])?;
            node_state::delete_kind(self.conn, self.top_kind)?;
        }
        log_debug!(logging::NAV, "expand_all {} {}", self.nav, expand);
        Ok(())
    }

    /// Expands every collapsed ancestor of the row, outermost first.
    /// Returns `false` if there is no such row.
    pub fn ensure_visible(&self, nav_id: i64) -> BooklistResult<bool> {
        let Some(level) = self.level_of(nav_id)? else {
            return Ok(false);
        };
        for ancestor_level in 1..level {
            let ancestor: Option<(i64, bool)> = self
                .conn
                .prepare_cached(&format!(
                    "SELECT _id, expanded FROM {} WHERE level = ?1 AND _id < ?2 \
                     ORDER BY _id DESC LIMIT 1",
                    self.nav
                ))?
                .query_row(params![ancestor_level, nav_id], |r| Ok((r.get(0)?, r.get(1)?)))
                .optional()?;
            if let Some((ancestor_id, false)) = ancestor {
                self.toggle(ancestor_id)?;
            }
        }
        Ok(true)
    }

    /// Number of visible rows above the row; one less when the row itself is
    /// hidden, so the caller lands on the closest visible row above it.
    pub fn get_position(&self, nav_id: i64) -> BooklistResult<i64> {
        let visible: Option<bool> = self
            .conn
            .prepare_cached(&format!("SELECT visible FROM {} WHERE _id = ?1", self.nav))?
            .query_row(params![nav_id], |r| r.get(0))
            .optional()?;
        let before: i64 = self
            .conn
            .prepare_cached(&format!(
                "SELECT COUNT(*) FROM {} WHERE visible = 1 AND _id < ?1",
                self.nav
            ))?
            .query_row(params![nav_id], |r| r.get(0))?;
        Ok(match visible {
            Some(false) => (before - 1).max(0),
            _ => before,
        })
    }

    pub fn positions_of_book(&self, book_id: i64) -> BooklistResult<Vec<BookRowInfo>> {
        let rows = self
            .conn
            .prepare_cached(&format!(
                "SELECT n._id, n.visible FROM {list} l JOIN {nav} n ON n.real_row_id = l._id \
                 WHERE l.book_id = ?1 ORDER BY n._id",
                list = self.list,
                nav = self.nav
            ))?
            .query_map(params![book_id], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, bool>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(nav_id, visible)| {
                Ok(BookRowInfo {
                    absolute_position: nav_id - 1,
                    visible,
                    list_position: self.get_position(nav_id)?,
                })
            })
            .collect()
    }

    pub fn visible_count(&self) -> BooklistResult<i64> {
        let count = self
            .conn
            .prepare_cached(&format!("SELECT COUNT(*) FROM {} WHERE visible = 1", self.nav))?
            .query_row([], |r| r.get(0))?;
        Ok(count)
    }

    pub fn book_count(&self, book_level: i64) -> BooklistResult<i64> {
        let count = self
            .conn
            .prepare_cached(&format!("SELECT COUNT(*) FROM {} WHERE level = ?1", self.list))?
            .query_row(params![book_level], |r| r.get(0))?;
        Ok(count)
    }

    pub fn distinct_book_count(&self) -> BooklistResult<i64> {
        let count = self
            .conn
            .prepare_cached(&format!("SELECT COUNT(DISTINCT book_id) FROM {}", self.list))?
            .query_row([], |r| r.get(0))?;
        Ok(count)
    }

    fn root_of(&self, nav_id: i64) -> BooklistResult<Option<(String, bool)>> {
        let root = self
            .conn
            .prepare_cached(&format!(
                "SELECT root_key, expanded FROM {} WHERE level = 1 AND _id <= ?1 \
                 AND root_key IS NOT NULL ORDER BY _id DESC LIMIT 1",
                self.nav
            ))?
            .query_row(params![nav_id], |r| Ok((r.get(0)?, r.get(1)?)))
            .optional()?;
        Ok(root)
    }

    fn level_of(&self, nav_id: i64) -> BooklistResult<Option<i64>> {
        let level = self
            .conn
            .prepare_cached(&format!("SELECT level FROM {} WHERE _id = ?1", self.nav))?
            .query_row(params![nav_id], |r| r.get(0))
            .optional()?;
        Ok(level)
    }
}
