//! FILENAME: core/booklist-engine/src/builder.rs
//! `BooklistBuilder`: builds one list for one style and serves navigation
//! and cursors over it until closed.

use std::sync::Arc;
use std::time::Instant;

use booklist_style::{ConfigError, Style};
use catalogue_store::{CatalogueDb, ColumnDef};

use crate::config::{BuilderConfig, RebuildState};
use crate::criteria::BuildCriteria;
use crate::cursor::{BooklistCursor, CursorSettings};
use crate::error::BooklistResult;
use crate::flattened::FlattenedBookList;
use crate::logging::{self, log_enter, log_error, log_exit, log_info, log_warn};
use crate::navigation::{BookRowInfo, Navigator};
use crate::plan::{BuildPlan, BuildStats, PlanInputs, RequiredColumn};
use crate::registry::BuilderRegistry;
use crate::summary::Collation;

pub struct BooklistBuilder {
    id: u32,
    registry: Arc<BuilderRegistry>,
    db: CatalogueDb,
    style: Style,
    config: BuilderConfig,
    collation: Collation,
    list_name: String,
    nav_name: String,
    required: Vec<RequiredColumn>,
    plan: Option<BuildPlan>,
    closed: bool,
}

impl std::fmt::Debug for BooklistBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooklistBuilder")
            .field("id", &self.id)
            .field("style", &self.style.name())
            .field("built", &self.plan.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl BooklistBuilder {
    pub fn new(
        registry: &Arc<BuilderRegistry>,
        db: CatalogueDb,
        style: Style,
        config: BuilderConfig,
    ) -> BooklistResult<Self> {
        config.validate()?;
        let case_sensitive = db.is_collation_case_sensitive(&config.collation)?;
        let collation = Collation::new(config.collation.clone(), case_sensitive);

        let id = registry.allocate_builder_id();
        log_info!(
            logging::BUILD,
            "builder {} created for style '{}' ({}, case_sensitive={})",
            id,
            style.name(),
            collation.name(),
            case_sensitive
        );

        Ok(BooklistBuilder {
            id,
            registry: Arc::clone(registry),
            db,
            style,
            config,
            collation,
            list_name: format!("book_list_tmp_{}", id),
            nav_name: format!("book_list_tmp_row_pos_{}", id),
            required: Vec::new(),
            plan: None,
            closed: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn list_table_name(&self) -> &str {
        &self.list_name
    }

    pub fn nav_table_name(&self) -> &str {
        &self.nav_name
    }

    pub fn is_built(&self) -> bool {
        self.plan.is_some()
    }

    /// Adds a caller column to every leaf row of the next build.
    pub fn require_column(
        &mut self,
        column: ColumnDef,
        expression: &str,
        sorted: bool,
    ) -> BooklistResult<()> {
        self.ensure_open()?;
        if let Some(existing) = self.required.iter_mut().find(|r| r.column.name == column.name) {
            if !existing.expression.eq_ignore_ascii_case(expression) {
                return Err(ConfigError::ConflictingExpression {
                    column: column.name.to_string(),
                    existing: existing.expression.clone(),
                    requested: expression.to_string(),
                }
                .into());
            }
            existing.sorted |= sorted;
            return Ok(());
        }
        self.required.push(RequiredColumn {
            column,
            expression: expression.to_string(),
            sorted,
        });
        Ok(())
    }

    // ========================================================================
    // BUILD
    // ========================================================================

    pub fn build(
        &mut self,
        initial_state: RebuildState,
        criteria: &BuildCriteria,
    ) -> BooklistResult<()> {
        self.ensure_open()?;
        log_enter!(
            logging::BUILD,
            "build",
            "builder={} style='{}' strategy={:?} state={:?}",
            self.id,
            self.style.name(),
            self.config.strategy,
            initial_state
        );
        let started = Instant::now();

        let plan = BuildPlan::prepare(&PlanInputs {
            style: &self.style,
            config: &self.config,
            collation: &self.collation,
            criteria,
            required: &self.required,
            list_name: &self.list_name,
            nav_name: &self.nav_name,
            initial_state,
        })?;
        plan.log_statements();

        let stats = self
            .db
            .with_transaction(|tx| plan.execute(tx))
            .map_err(|e| {
                log_error!(logging::BUILD, "builder {} build failed: {}", self.id, e);
                e
            })?;
        self.plan = Some(plan);

        self.log_stats("build", stats, started);
        Ok(())
    }

    /// Builds starting from the configured `rebuild_state`.
    pub fn build_default(&mut self, criteria: &BuildCriteria) -> BooklistResult<()> {
        self.build(self.config.rebuild_state, criteria)
    }

    /// Re-runs the statements of the last build.
    pub fn rebuild(&mut self) -> BooklistResult<()> {
        self.ensure_open()?;
        log_enter!(logging::BUILD, "rebuild", "builder={}", self.id);
        let started = Instant::now();
        let plan = self.plan.as_ref().ok_or(ConfigError::NotBuilt)?;
        let stats = self
            .db
            .with_transaction(|tx| plan.execute(tx))
            .map_err(|e| {
                log_error!(logging::BUILD, "builder {} rebuild failed: {}", self.id, e);
                e
            })?;
        self.log_stats("rebuild", stats, started);
        Ok(())
    }

    fn log_stats(&self, func: &str, stats: BuildStats, started: Instant) {
        log_exit!(
            logging::BUILD,
            func,
            "builder={} leaves={} headers={} nav_rows={} elapsed={:?}",
            self.id,
            stats.leaves,
            stats.headers,
            stats.nav_rows,
            started.elapsed()
        );
    }

    // ========================================================================
    // READING
    // ========================================================================

    pub fn get_list(&self) -> BooklistResult<BooklistCursor> {
        let plan = self.built()?;
        Ok(BooklistCursor::new(
            self.db.clone(),
            self.id,
            plan.list.name(),
            plan.nav.name(),
            plan.list_columns(),
            CursorSettings {
                window_size: self.config.window_size,
                mru_capacity: self.config.mru_capacity,
                eviction_distance: self.config.eviction_distance,
            },
        ))
    }

    /// Number of visible rows.
    pub fn get_count(&self) -> BooklistResult<i64> {
        self.read(|nav| nav.visible_count())
    }

    /// Number of book rows; a book listed under several authors counts once per row.
    pub fn get_book_count(&self) -> BooklistResult<i64> {
        let book_level = self.built()?.book_level;
        self.read(|nav| nav.book_count(book_level))
    }

    pub fn get_distinct_book_count(&self) -> BooklistResult<i64> {
        self.read(|nav| nav.distinct_book_count())
    }

    pub fn get_position(&self, absolute_position: i64) -> BooklistResult<i64> {
        self.read(|nav| nav.get_position(absolute_position + 1))
    }

    pub fn get_positions_of_book(&self, book_id: i64) -> BooklistResult<Vec<BookRowInfo>> {
        self.read(|nav| nav.positions_of_book(book_id))
    }

    pub fn create_flattened_book_list(&self) -> BooklistResult<FlattenedBookList> {
        let plan = self.built()?;
        FlattenedBookList::create(
            self.db.clone(),
            self.registry.allocate_flat_id(),
            plan.list.name(),
            plan.nav.name(),
            plan.book_level,
        )
    }

    // ========================================================================
    // EXPANSION
    // ========================================================================

    /// Flips the node at a position; `None` if there is no row there.
    pub fn toggle_expand(&mut self, absolute_position: i64) -> BooklistResult<Option<bool>> {
        self.write(|nav| nav.toggle(absolute_position + 1))
    }

    pub fn expand_all(&mut self, expand: bool) -> BooklistResult<()> {
        self.write(|nav| nav.expand_all(expand))
    }

    /// Expands whatever hides the row; `false` if there is no row there.
    pub fn ensure_visible(&mut self, absolute_position: i64) -> BooklistResult<bool> {
        self.write(|nav| nav.ensure_visible(absolute_position + 1))
    }

    fn built(&self) -> BooklistResult<&BuildPlan> {
        self.ensure_open()?;
        self.plan
            .as_ref()
            .ok_or_else(|| ConfigError::NotBuilt.into())
    }

    fn read<T>(&self, f: impl FnOnce(&Navigator<'_>) -> BooklistResult<T>) -> BooklistResult<T> {
        let plan = self.built()?;
        self.db.with_connection(|conn| {
            f(&Navigator::new(conn, plan.list.name(), plan.nav.name(), plan.top_kind))
        })
    }

    fn write<T>(&self, f: impl FnOnce(&Navigator<'_>) -> BooklistResult<T>) -> BooklistResult<T> {
        let plan = self.built()?;
        self.db.with_transaction(|tx| {
            f(&Navigator::new(tx, plan.list.name(), plan.nav.name(), plan.top_kind))
        })
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    fn ensure_open(&self) -> BooklistResult<()> {
        if self.closed {
            return Err(ConfigError::Closed(self.id).into());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drops the builder's tables and cached statements. Safe to call more
    /// than once; failures are logged, not returned.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let names = [self.nav_name.as_str(), self.list_name.as_str()];
        let dropped = self.db.with_connection(|conn| {
            for name in names {
                conn.execute_batch(&format!("DROP TABLE IF EXISTS temp.{}", name))?;
            }
            Ok::<_, rusqlite::Error>(())
        });
        if let Err(e) = dropped {
            log_warn!(logging::STORE, "builder {} could not drop its tables: {}", self.id, e);
        }
        self.db.flush_statement_cache();
        self.registry.release_builder();
        log_info!(logging::BUILD, "builder {} closed", self.id);
    }
}

impl Drop for BooklistBuilder {
    fn drop(&mut self) {
        self.close();
    }
}
