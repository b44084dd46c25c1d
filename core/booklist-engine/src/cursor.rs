//! FILENAME: core/booklist-engine/src/cursor.rs
//! Read-only cursor over the visible rows of a built list.
//!
//! Rows are fetched in fixed-size windows. Recently used windows stay on an
//! MRU ring; windows off the ring are dropped once they are far from the
//! current one, so only a bounded number of rows is ever held in memory.

use std::collections::VecDeque;
use std::sync::Arc;

use booklist_style::{columns, ConfigError, GroupKind, Style};
use catalogue_store::CatalogueDb;
use rusqlite::params;
use rusqlite::types::Value;
use rustc_hash::FxHashMap;

use crate::error::BooklistResult;
use crate::logging::{self, log_debug};

/// Name of the position column every cursor row carries after the list columns.
pub const ABSOLUTE_POSITION: &str = "absolute_position";

// ============================================================================
// ROWS
// ============================================================================

/// Column names shared by every row of one cursor.
#[derive(Debug)]
pub struct RowLayout {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl RowLayout {
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        RowLayout { names, index }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// One visible row of the list.
#[derive(Debug, Clone)]
pub struct BooklistRow {
    layout: Arc<RowLayout>,
    values: Vec<Value>,
}

impl PartialEq for BooklistRow {
    fn eq(&self, other: &Self) -> bool {
        self.layout.names == other.layout.names && self.values == other.values
    }
}

impl BooklistRow {
    pub fn new(layout: Arc<RowLayout>, values: Vec<Value>) -> Self {
        BooklistRow { layout, values }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.layout.position(column).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn column_names(&self) -> &[String] {
        self.layout.names()
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(n) => Some(*n),
            Value::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn level(&self) -> i64 {
        self.integer(columns::LEVEL.name).unwrap_or(0)
    }

    pub fn row_kind(&self) -> u32 {
        self.integer(columns::ROW_KIND.name)
            .and_then(|k| u32::try_from(k).ok())
            .unwrap_or(0)
    }

    /// `None` on header rows.
    pub fn book_id(&self) -> Option<i64> {
        self.integer(columns::BOOK_ID.name)
    }

    pub fn root_key(&self) -> Option<&str> {
        self.text(columns::ROOT_KEY.name)
    }

    pub fn absolute_position(&self) -> i64 {
        self.integer(ABSOLUTE_POSITION).unwrap_or(-1)
    }

    pub fn is_header(&self) -> bool {
        self.book_id().is_none()
    }

    /// Text to show for the row: the title for books, the level's display
    /// column for headers.
    pub fn display_text(&self, style: &Style) -> String {
        let level = usize::try_from(self.level()).unwrap_or(0);
        let Some(descriptor) = style.level(level) else {
            return self.text(columns::TITLE.name).unwrap_or_default().to_string();
        };
        let value = self.get(descriptor.display_field).unwrap_or(&Value::Null);
        match descriptor.kind {
            GroupKind::ReadStatus => match value {
                Value::Integer(0) => "Unread".to_string(),
                Value::Integer(_) => "Read".to_string(),
                other => value_text(other),
            },
            GroupKind::Loaned => match value {
                Value::Text(s) if s.is_empty() => "Available".to_string(),
                other => value_text(other),
            },
            _ => value_text(value),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Blob(_) => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// Window and cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSettings {
    pub window_size: usize,
    pub mru_capacity: usize,
    pub eviction_distance: usize,
}

#[derive(Debug)]
pub struct BooklistCursor {
    db: CatalogueDb,
    builder_id: u32,
    fetch_sql: String,
    count_sql: String,
    layout: Arc<RowLayout>,
    settings: CursorSettings,
    windows: FxHashMap<i64, Vec<BooklistRow>>,
    mru: VecDeque<i64>,
    position: Option<i64>,
    count: Option<i64>,
    closed: bool,
}

impl BooklistCursor {
    pub fn new(
        db: CatalogueDb,
        builder_id: u32,
        list: &str,
        nav: &str,
        list_columns: Vec<String>,
        settings: CursorSettings,
    ) -> Self {
        let selected: Vec<String> = list_columns.iter().map(|c| format!("l.{}", c)).collect();
        let fetch_sql = format!(
            "SELECT {}, (n._id - 1) AS {} FROM {} l JOIN {} n ON n.real_row_id = l._id \
             WHERE n.visible = 1 ORDER BY n._id LIMIT ?1 OFFSET ?2",
            selected.join(", "),
            ABSOLUTE_POSITION,
            list,
            nav
        );
        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE visible = 1", nav);

        let mut names = list_columns;
        names.push(ABSOLUTE_POSITION.to_string());

        BooklistCursor {
            db,
            builder_id,
            fetch_sql,
            count_sql,
            layout: Arc::new(RowLayout::new(names)),
            settings,
            windows: FxHashMap::default(),
            mru: VecDeque::with_capacity(settings.mru_capacity),
            position: None,
            count: None,
            closed: false,
        }
    }

    /// Number of visible rows, queried once and then cached.
    pub fn count(&mut self) -> BooklistResult<i64> {
        self.ensure_open()?;
        if let Some(count) = self.count {
            return Ok(count);
        }
        let count: i64 = self
            .db
            .with_connection(|conn| conn.query_row(&self.count_sql, [], |r| r.get(0)))?;
        self.count = Some(count);
        Ok(count)
    }

    /// Moves to a visible-row position. Out of range leaves the cursor
    /// without a current row and returns `false`.
    pub fn seek(&mut self, position: i64) -> BooklistResult<bool> {
        let count = self.count()?;
        if position < 0 || position >= count {
            self.position = None;
            return Ok(false);
        }

        let window_id = position / self.settings.window_size as i64;
        if self.windows.contains_key(&window_id) {
            self.touch(window_id);
        } else {
            let rows = self.fetch_window(window_id)?;
            self.windows.insert(window_id, rows);
            self.mru.push_front(window_id);
            if self.mru.len() > self.settings.mru_capacity {
                self.mru.pop_back();
            }
            self.evict(window_id);
        }
        self.position = Some(position);
        Ok(true)
    }

    pub fn current(&self) -> Option<&BooklistRow> {
        let position = self.position?;
        let size = self.settings.window_size as i64;
        let window = self.windows.get(&(position / size))?;
        window.get((position % size) as usize)
    }

    pub fn position(&self) -> Option<i64> {
        self.position
    }

    pub fn column_names(&self) -> &[String] {
        self.layout.names()
    }

    /// Forgets cached rows and the count, then returns to the current position.
    pub fn requery(&mut self) -> BooklistResult<bool> {
        self.ensure_open()?;
        self.windows.clear();
        self.mru.clear();
        self.count = None;
        match self.position {
            Some(position) => self.seek(position),
            None => Ok(false),
        }
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.windows.clear();
        self.mru.clear();
        self.position = None;
        self.count = None;
        self.closed = true;
        log_debug!(logging::CURSOR, "cursor of builder {} closed", self.builder_id);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn cached_window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn cached_row_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    fn ensure_open(&self) -> BooklistResult<()> {
        if self.closed {
            return Err(ConfigError::Closed(self.builder_id).into());
        }
        Ok(())
    }

    fn touch(&mut self, window_id: i64) {
        if let Some(at) = self.mru.iter().position(|&id| id == window_id) {
            self.mru.remove(at);
        }
        self.mru.push_front(window_id);
        if self.mru.len() > self.settings.mru_capacity {
            self.mru.pop_back();
        }
    }

    fn evict(&mut self, current: i64) {
        let distance = self.settings.eviction_distance as i64;
        let mru = &self.mru;
        self.windows
            .retain(|id, _| mru.contains(id) || (id - current).abs() <= distance);

        // windows near the current one may still push the cache past the ring size
        while self.windows.len() > self.settings.mru_capacity {
            let farthest = self
                .windows
                .keys()
                .filter(|id| !self.mru.contains(*id))
                .max_by_key(|id| (**id - current).abs())
                .copied();
            match farthest {
                Some(id) => {
                    self.windows.remove(&id);
                }
                None => break,
            }
        }
    }

    fn fetch_window(&self, window_id: i64) -> BooklistResult<Vec<BooklistRow>> {
        let size = self.settings.window_size as i64;
        let width = self.layout.names().len();
        let rows = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&self.fetch_sql)?;
            let rows = stmt
                .query_map(params![size, window_id * size], |row| {
                    (0..width)
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<rusqlite::Result<Vec<Value>>>()
                })?
                .collect::<Result<Vec<Vec<Value>>, rusqlite::Error>>()?;
            Ok::<_, rusqlite::Error>(rows)
        })?;
        log_debug!(
            logging::CURSOR,
            "window {} fetched {} rows, {} cached",
            window_id,
            rows.len(),
            self.windows.len()
        );
        Ok(rows
            .into_iter()
            .map(|values| BooklistRow::new(Arc::clone(&self.layout), values))
            .collect())
    }
}
