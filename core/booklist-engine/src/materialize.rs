//! FILENAME: core/booklist-engine/src/materialize.rs
//! Fills the list table with leaf rows and the header rows above them.
//!
//! Rollup inserts the leaves in sort order with one statement, then derives
//! each level's headers from the level below, innermost first. Incremental
//! streams the leaves in sort order and inserts headers whenever a
//! `HeaderTracker` sees a group key change. Both take a header's values from
//! the first leaf of its group, so the two produce the same rows. Both finish
//! by copying each level-1 header's root key onto the rows below it, since
//! leaves merged into one group by the collation may carry differently
//! cased keys.

use catalogue_store::ColumnDef;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use smallvec::SmallVec;

use crate::error::BooklistResult;
use crate::summary::Collation;

// ============================================================================
// PLAN STATEMENTS
// ============================================================================

/// One SQL statement of a build plan with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl PlanStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        PlanStatement {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        PlanStatement {
            sql: sql.into(),
            params,
        }
    }

    pub fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(&self.sql, params_from_iter(self.params.iter()))
    }
}

/// Row counts of one materialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub leaves: usize,
    pub headers: usize,
}

/// What one header level carries, as registered in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    /// 1-based level number.
    pub level: i64,
    pub row_kind: u32,
    /// Grouped columns of this level and every outer level.
    pub group_columns: Vec<ColumnDef>,
    /// Grouped columns of this level alone.
    pub own_columns: Vec<ColumnDef>,
}

/// The list-building part of a plan, by strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization {
    Rollup(RollupPlan),
    Incremental(IncrementalPlan),
}

impl Materialization {
    pub fn run(&self, conn: &Connection) -> BooklistResult<MaterializeStats> {
        match self {
            Materialization::Rollup(plan) => run_rollup(conn, plan),
            Materialization::Incremental(plan) => run_incremental(conn, plan),
        }
    }
}

// ============================================================================
// ROLLUP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RollupPlan {
    pub leaf_insert: PlanStatement,
    /// Header inserts, innermost level first.
    pub header_inserts: Vec<String>,
    pub root_key_update: Option<String>,
}

impl RollupPlan {
    /// `leaf_select` must produce the list columns in `destinations` order
    /// followed by the root key, sorted in list order.
    pub fn new(
        list: &str,
        destinations: &[&'static str],
        leaf_select: PlanStatement,
        headers: &[HeaderSpec],
        collation: &Collation,
    ) -> Self {
        let leaf_insert = PlanStatement::with_params(
            format!(
                "INSERT INTO {} ({}, root_key)\n{}",
                list,
                destinations.join(", "),
                leaf_select.sql
            ),
            leaf_select.params,
        );

        let header_inserts = headers
            .iter()
            .rev()
            .map(|spec| rollup_header_sql(list, spec, collation))
            .collect();

        RollupPlan {
            leaf_insert,
            header_inserts,
            root_key_update: headers
                .first()
                .map(|root| root_key_update_sql(list, root, collation)),
        }
    }
}

fn rollup_header_sql(list: &str, spec: &HeaderSpec, collation: &Collation) -> String {
    let names: Vec<&str> = spec.group_columns.iter().map(|c| c.name).collect();
    let mut group_by: Vec<String> = spec
        .group_columns
        .iter()
        .map(|c| collation.group_term(c.name, c.is_text()))
        .collect();
    group_by.push(collation.group_term("root_key", true));

    // the first row of each group, in insertion (= sort) order, supplies the values
    format!(
        "INSERT INTO {list} (level, row_kind, {cols}, root_key)\n\
         SELECT {level}, {kind}, {cols}, root_key FROM {list}\n\
         WHERE _id IN (SELECT MIN(_id) FROM {list} WHERE level = {child} GROUP BY {group_by})\n\
         ORDER BY _id",
        list = list,
        cols = names.join(", "),
        level = spec.level,
        kind = spec.row_kind,
        child = spec.level + 1,
        group_by = group_by.join(", ")
    )
}

/// Sets the root key of every row below level 1 to that of its level-1
/// header, matched on the level-1 grouped columns under the collation.
fn root_key_update_sql(list: &str, root: &HeaderSpec, collation: &Collation) -> String {
    let matches: Vec<String> = root
        .own_columns
        .iter()
        .map(|c| {
            let equal = format!("h.{n} = {list}.{n}", n = c.name, list = list);
            let equal = if c.is_text() {
                format!("{} COLLATE {}", equal, collation.name())
            } else {
                equal
            };
            format!(
                "({} OR (h.{n} IS NULL AND {list}.{n} IS NULL))",
                equal,
                n = c.name,
                list = list
            )
        })
        .collect();
    let condition = if matches.is_empty() {
        String::new()
    } else {
        format!(" AND {}", matches.join(" AND "))
    };

    format!(
        "UPDATE {list} SET root_key = Coalesce(\n\
         (SELECT h.root_key FROM {list} h WHERE h.level = 1{condition} ORDER BY h._id LIMIT 1),\n\
         root_key)\n\
         WHERE level > 1",
        list = list,
        condition = condition
    )
}

fn run_root_key_update(conn: &Connection, sql: Option<&String>) -> BooklistResult<()> {
    if let Some(sql) = sql {
        conn.execute(sql, [])?;
    }
    Ok(())
}

fn run_rollup(conn: &Connection, plan: &RollupPlan) -> BooklistResult<MaterializeStats> {
    let leaves = plan.leaf_insert.execute(conn)?;
    let mut headers = 0;
    for sql in &plan.header_inserts {
        headers += conn.execute(sql, [])?;
    }
    run_root_key_update(conn, plan.root_key_update.as_ref())?;
    Ok(MaterializeStats { leaves, headers })
}

// ============================================================================
// INCREMENTAL
// ============================================================================

/// A column of a leaf row that takes part in a level's group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumn {
    pub position: usize,
    pub is_text: bool,
}

/// Key columns of one level; most levels group on one to four columns.
pub type LevelKey = SmallVec<[KeyColumn; 4]>;

/// Last-seen group key per level. `on_row_inserted` reports the outermost
/// level whose key changed; that level and every deeper one start new groups.
#[derive(Debug, Clone)]
pub struct HeaderTracker {
    levels: Vec<LevelKey>,
    last_keys: Vec<Option<Vec<Value>>>,
    collation: Collation,
}

impl HeaderTracker {
    pub fn new(levels: Vec<LevelKey>, collation: Collation) -> Self {
        let last_keys = vec![None; levels.len()];
        HeaderTracker {
            levels,
            last_keys,
            collation,
        }
    }

    /// Index (0 = outermost) of the first level needing a new header for
    /// `row`, or `None` if the row belongs to the current groups.
    pub fn on_row_inserted(&mut self, row: &[Value]) -> Option<usize> {
        let changed = (0..self.levels.len()).find(|&level| !self.same_group(level, row))?;
        for level in changed..self.levels.len() {
            self.last_keys[level] = Some(self.key_of(level, row));
        }
        Some(changed)
    }

    pub fn reset(&mut self) {
        self.last_keys.iter_mut().for_each(|k| *k = None);
    }

    fn key_of(&self, level: usize, row: &[Value]) -> Vec<Value> {
        self.levels[level]
            .iter()
            .map(|k| row.get(k.position).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn same_group(&self, level: usize, row: &[Value]) -> bool {
        let Some(last) = &self.last_keys[level] else {
            return false;
        };
        self.levels[level].iter().zip(last).all(|(key, previous)| {
            let current = row.get(key.position).unwrap_or(&Value::Null);
            values_equal(previous, current, key.is_text, &self.collation)
        })
    }
}

/// Equality as GROUP BY sees it: NULLs group together, integers and reals
/// compare numerically, text compares under the collation.
fn values_equal(a: &Value, b: &Value, is_text: bool, collation: &Collation) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Real(x), Value::Real(y)) => x == y,
        (Value::Integer(x), Value::Real(y)) | (Value::Real(y), Value::Integer(x)) => {
            (*x as f64) == *y
        }
        (Value::Text(x), Value::Text(y)) => {
            if is_text {
                collation.text_eq(x, y)
            } else {
                x == y
            }
        }
        (Value::Blob(x), Value::Blob(y)) => x == y,
        _ => false,
    }
}

/// Header insert for one level: values are copied from the leaf row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInsert {
    pub sql: String,
    /// Leaf-row positions bound to the statement, root key last.
    pub positions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalPlan {
    pub leaf_select: PlanStatement,
    pub leaf_insert: String,
    /// One per level, outermost first.
    pub headers: Vec<HeaderInsert>,
    pub keys: Vec<LevelKey>,
    pub collation: Collation,
    pub root_key_update: Option<String>,
}

impl IncrementalPlan {
    /// `leaf_select` has the layout described on `RollupPlan::new`.
    pub fn new(
        list: &str,
        destinations: &[&'static str],
        leaf_select: PlanStatement,
        headers: &[HeaderSpec],
        collation: &Collation,
    ) -> Self {
        let root_key_position = destinations.len();
        let position_of = |name: &str| destinations.iter().position(|d| *d == name);

        let leaf_insert = format!(
            "INSERT INTO {} ({}, root_key) VALUES ({})",
            list,
            destinations.join(", "),
            vec!["?"; destinations.len() + 1].join(", ")
        );

        let header_inserts = headers
            .iter()
            .map(|spec| {
                let names: Vec<&str> = spec.group_columns.iter().map(|c| c.name).collect();
                let mut positions: Vec<usize> =
                    names.iter().filter_map(|n| position_of(n)).collect();
                positions.push(root_key_position);
                HeaderInsert {
                    sql: format!(
                        "INSERT INTO {} (level, row_kind, {}, root_key) VALUES ({}, {}, {})",
                        list,
                        names.join(", "),
                        spec.level,
                        spec.row_kind,
                        vec!["?"; names.len() + 1].join(", ")
                    ),
                    positions,
                }
            })
            .collect();

        let keys = headers
            .iter()
            .map(|spec| {
                spec.own_columns
                    .iter()
                    .filter_map(|c| {
                        position_of(c.name).map(|position| KeyColumn {
                            position,
                            is_text: c.is_text(),
                        })
                    })
                    .collect()
            })
            .collect();

        IncrementalPlan {
            leaf_select,
            leaf_insert,
            headers: header_inserts,
            keys,
            collation: collation.clone(),
            root_key_update: headers
                .first()
                .map(|root| root_key_update_sql(list, root, collation)),
        }
    }
}

fn run_incremental(conn: &Connection, plan: &IncrementalPlan) -> BooklistResult<MaterializeStats> {
    let mut tracker = HeaderTracker::new(plan.keys.clone(), plan.collation.clone());
    let mut stats = MaterializeStats::default();

    let mut select = conn.prepare(&plan.leaf_select.sql)?;
    let column_count = select.column_count();
    let mut leaf_insert = conn.prepare(&plan.leaf_insert)?;
    let mut header_inserts = plan
        .headers
        .iter()
        .map(|h| conn.prepare(&h.sql))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = select.query(params_from_iter(plan.leaf_select.params.iter()))?;
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|i| row.get::<_, Value>(i))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(first) = tracker.on_row_inserted(&values) {
            for (header, stmt) in plan.headers.iter().zip(header_inserts.iter_mut()).skip(first) {
                let bound = header.positions.iter().map(|&p| &values[p]);
                stmt.execute(params_from_iter(bound))?;
                stats.headers += 1;
            }
        }
        leaf_insert.execute(params_from_iter(values.iter()))?;
        stats.leaves += 1;
    }
    run_root_key_update(conn, plan.root_key_update.as_ref())?;
    Ok(stats)
}
