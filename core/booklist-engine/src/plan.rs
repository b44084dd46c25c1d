//! FILENAME: core/booklist-engine/src/plan.rs
//! Turns a style, criteria and settings into the statements of one build.
//!
//! Everything that can fail on configuration fails here, before a
//! transaction is opened. The resulting `BuildPlan` is executed by `build()`
//! and replayed unchanged by `rebuild()`.

use booklist_style::{author_name_expression, columns, ColumnFlags, Style, BOOK_ROW_KIND};
use catalogue_store::schema::{
    book_author, book_bookshelf, book_series, bookshelf, books, AUTHORS, BOOKS, BOOKSHELF,
    BOOK_AUTHOR, BOOK_BOOKSHELF, BOOK_SERIES, LOAN, PK_ID, SERIES,
};
use catalogue_store::{analyze, node_state, ColumnDef, Joiner, StoreResult, TempTable};
use rusqlite::Connection;

use crate::config::{BuilderConfig, MaterializeStrategy, RebuildState};
use crate::criteria::{build_where, BuildCriteria};
use crate::error::BooklistResult;
use crate::logging::{self, log_debug};
use crate::materialize::{
    HeaderSpec, IncrementalPlan, MaterializeStats, Materialization, PlanStatement, RollupPlan,
};
use crate::navigation::{nav_indexes, nav_insert, nav_table};
use crate::summary::{Collation, SummaryBuilder};

/// A caller column added to every leaf row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredColumn {
    pub column: ColumnDef,
    pub expression: String,
    pub sorted: bool,
}

/// Everything a build needs, fixed at plan time.
pub struct PlanInputs<'a> {
    pub style: &'a Style,
    pub config: &'a BuilderConfig,
    pub collation: &'a Collation,
    pub criteria: &'a BuildCriteria,
    pub required: &'a [RequiredColumn],
    pub list_name: &'a str,
    pub nav_name: &'a str,
    pub initial_state: RebuildState,
}

/// The saved statements of one build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub list: TempTable,
    pub nav: TempTable,
    pub strategy: MaterializeStrategy,
    pub materialization: Materialization,
    /// Run after the list is filled (sort index).
    pub list_indexes: Vec<String>,
    pub initial_state: RebuildState,
    pub nav_insert: PlanStatement,
    pub nav_indexes: Vec<String>,
    /// Kind of the outermost level; keys the persisted node state.
    pub top_kind: u32,
    pub book_level: i64,
}

/// Row counts of one executed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub leaves: usize,
    pub headers: usize,
    pub nav_rows: usize,
}

impl BuildPlan {
    pub fn prepare(inputs: &PlanInputs<'_>) -> BooklistResult<BuildPlan> {
        let style = inputs.style;
        let collation = inputs.collation;
        let ctx = style.expression_context(
            &inputs.config.unknown_label,
            inputs.config.local_time_dates,
        );
        let book_level = style.book_level();

        // ---- columns ----
        let mut summary = SummaryBuilder::new();
        summary.add_column(columns::LEVEL, Some(&book_level.to_string()), ColumnFlags::NONE)?;
        summary.add_column(
            columns::ROW_KIND,
            Some(&BOOK_ROW_KIND.to_string()),
            ColumnFlags::NONE,
        )?;
        summary.add_column(columns::BOOK_ID, Some(&BOOKS.dot(PK_ID)), ColumnFlags::NONE)?;
        summary.add_column(columns::BOOK_COUNT, Some("1"), ColumnFlags::NONE)?;

        let mut headers = Vec::with_capacity(style.level_count());
        for (index, level) in style.levels().iter().enumerate() {
            for column in &level.columns {
                summary.add_column(
                    column.column,
                    Some(&column.expression.to_sql(&ctx)),
                    column.flags,
                )?;
            }
            headers.push(HeaderSpec {
                level: index as i64 + 1,
                row_kind: level.kind.id(),
                group_columns: summary.snapshot_group_columns(),
                own_columns: level
                    .columns
                    .iter()
                    .filter(|c| c.flags.is_grouped())
                    .map(|c| c.column)
                    .collect(),
            });
        }

        summary.add_column(columns::BOOK_UUID, Some(&BOOKS.dot(books::UUID)), ColumnFlags::NONE)?;
        if let Some(mark) = inputs.criteria.mark_book_id {
            summary.add_column(
                columns::SELECTED,
                Some(&format!("{}={}", BOOKS.dot(PK_ID), mark)),
                ColumnFlags::NONE,
            )?;
        }
        add_display_extras(&mut summary, style)?;
        summary.add_column(columns::TITLE, Some(&BOOKS.dot(books::TITLE)), ColumnFlags::SORTED)?;
        summary.add_column(columns::READ, Some(&BOOKS.dot(books::READ)), ColumnFlags::NONE)?;
        summary.add_column(columns::BOOK_ID, Some(&BOOKS.dot(PK_ID)), ColumnFlags::SORTED)?;
        for required in inputs.required {
            let flags = if required.sorted {
                ColumnFlags::SORTED
            } else {
                ColumnFlags::NONE
            };
            summary.add_column(required.column, Some(&required.expression), flags)?;
        }

        let rendered = summary.render(&style.levels()[0], &ctx, collation)?;

        // ---- source select ----
        let join = join_clause(style, inputs.criteria)?;
        let clause = build_where(inputs.criteria, style);
        let where_sql = if clause.sql.is_empty() {
            String::new()
        } else {
            format!("\nWHERE {}", clause.sql)
        };
        let leaf_select = PlanStatement::with_params(
            format!(
                "SELECT {}, {} AS root_key\nFROM {}{}\nORDER BY {}",
                rendered.selects.join(", "),
                rendered.root_key,
                join,
                where_sql,
                rendered.leaf_order_by
            ),
            clause.params,
        );

        let list = summary.list_table(inputs.list_name)?;
        let materialization = match inputs.config.strategy {
            MaterializeStrategy::Rollup => Materialization::Rollup(RollupPlan::new(
                list.name(),
                &rendered.destinations,
                leaf_select,
                &headers,
                collation,
            )),
            MaterializeStrategy::Incremental => Materialization::Incremental(IncrementalPlan::new(
                list.name(),
                &rendered.destinations,
                leaf_select,
                &headers,
                collation,
            )),
        };

        // a case-sensitive collation sorts on lower() terms an index cannot carry
        let list_indexes = if collation.is_case_sensitive() {
            Vec::new()
        } else {
            vec![format!(
                "CREATE INDEX {list}_IX1 ON {list} ({})",
                rendered.index_columns,
                list = list.name()
            )]
        };

        let nav = nav_table(inputs.nav_name)?;
        let top_kind = style.top_level_kind().id();
        let nav_insert = nav_insert(
            nav.name(),
            list.name(),
            inputs.initial_state,
            top_kind,
            &rendered.list_order_by,
            collation,
        );
        let nav_indexes = nav_indexes(nav.name());

        Ok(BuildPlan {
            list,
            nav,
            strategy: inputs.config.strategy,
            materialization,
            list_indexes,
            initial_state: inputs.initial_state,
            nav_insert,
            nav_indexes,
            top_kind,
            book_level,
        })
    }

    /// Recreates both tables and fills them. The caller supplies the transaction.
    pub fn execute(&self, conn: &Connection) -> BooklistResult<BuildStats> {
        self.nav.drop(conn)?;
        self.list.recreate(conn)?;

        let MaterializeStats { leaves, headers } = self.materialization.run(conn)?;
        for sql in &self.list_indexes {
            conn.execute_batch(sql)?;
        }
        analyze(conn, self.list.name())?;

        self.nav.recreate(conn)?;
        if self.initial_state == RebuildState::AlwaysCollapsed {
            node_state::delete_kind(conn, self.top_kind)?;
        }
        let nav_rows = self.nav_insert.execute(conn)?;
        for sql in &self.nav_indexes {
            conn.execute_batch(sql)?;
        }
        analyze(conn, self.nav.name())?;

        Ok(BuildStats {
            leaves,
            headers,
            nav_rows,
        })
    }

    /// Names of the list table's columns, in table order.
    pub fn list_columns(&self) -> Vec<String> {
        self.list.columns().iter().map(|c| c.name.to_string()).collect()
    }

    pub fn log_statements(&self) {
        match &self.materialization {
            Materialization::Rollup(plan) => {
                log_debug!(logging::BUILD, "leaf insert: {}", plan.leaf_insert.sql);
                for sql in &plan.header_inserts {
                    log_debug!(logging::BUILD, "header insert: {}", sql);
                }
            }
            Materialization::Incremental(plan) => {
                log_debug!(logging::BUILD, "leaf select: {}", plan.leaf_select.sql);
            }
        }
        log_debug!(logging::BUILD, "nav insert: {}", self.nav_insert.sql);
    }
}

fn add_display_extras(summary: &mut SummaryBuilder, style: &Style) -> BooklistResult<()> {
    let display = &style.display;
    if display.show_author {
        summary.add_column(
            columns::EXTRA_AUTHOR,
            Some(&author_name_expression(style.sort_author_given_first)),
            ColumnFlags::NONE,
        )?;
    }
    let simple = [
        (display.show_publisher, columns::EXTRA_PUBLISHER, books::PUBLISHER),
        (display.show_format, columns::EXTRA_FORMAT, books::FORMAT),
        (display.show_location, columns::EXTRA_LOCATION, books::LOCATION),
        (display.show_isbn, columns::EXTRA_ISBN, books::ISBN),
    ];
    for (shown, column, field) in simple {
        if shown {
            summary.add_column(column, Some(&BOOKS.dot(field)), ColumnFlags::NONE)?;
        }
    }
    if display.show_bookshelves {
        let shelves = format!(
            "(SELECT GROUP_CONCAT(bsh2.{name}, ', ') FROM {link} bbsh2 \
             JOIN {shelf} bsh2 ON bsh2.{id}=bbsh2.{link_shelf} WHERE bbsh2.{link_book}={pk})",
            name = bookshelf::NAME,
            link = BOOK_BOOKSHELF.name,
            shelf = BOOKSHELF.name,
            id = PK_ID,
            link_shelf = book_bookshelf::BOOKSHELF,
            link_book = book_bookshelf::BOOK,
            pk = BOOKS.dot(PK_ID)
        );
        summary.add_column(columns::EXTRA_BOOKSHELVES, Some(&shelves), ColumnFlags::NONE)?;
    }
    Ok(())
}

/// FROM clause for the leaf select.
fn join_clause(style: &Style, criteria: &BuildCriteria) -> StoreResult<String> {
    let mut joiner = if criteria.has_bookshelf() || style.has_bookshelf_level() {
        let mut joiner = Joiner::new(&BOOKSHELF);
        joiner.join(&BOOK_BOOKSHELF)?.join(&BOOKS)?;
        joiner
    } else {
        Joiner::new(&BOOKS)
    };

    if style.has_loaned_level() {
        joiner.left_outer_join_from(&BOOKS, &LOAN)?;
    }

    joiner.join_from(&BOOKS, &BOOK_AUTHOR)?;
    if !style.shows_all_authors() {
        joiner.append(&format!(" AND {}=1", BOOK_AUTHOR.dot(book_author::POSITION)));
    }
    joiner.join(&AUTHORS)?;

    joiner.left_outer_join_from(&BOOKS, &BOOK_SERIES)?;
    if !style.shows_all_series() {
        joiner.append(&format!(" AND {}=1", BOOK_SERIES.dot(book_series::POSITION)));
    }
    joiner.left_outer_join(&SERIES)?;

    Ok(joiner.sql().to_string())
}
