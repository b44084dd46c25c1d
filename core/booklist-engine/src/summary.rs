//! FILENAME: core/booklist-engine/src/summary.rs
//! Accumulates the columns of the list table and renders the SQL fragments
//! that fill and order it.
//!
//! Columns are kept in registration order, which is the order of the insert
//! and select lists. The sort order puts every grouped column first, in the
//! order the columns became grouped, then the sorted-only columns in the
//! order they became sorted. A level's sort-only column (a series number)
//! therefore never splits the groups of a deeper level.

use booklist_style::{columns, ColumnFlags, ConfigError, ExpressionContext, Level};
use catalogue_store::{ColumnDef, StoreResult, TempTable};
use rustc_hash::FxHashMap;

// ============================================================================
// COLLATION
// ============================================================================

/// The collation applied to text columns, with its detected case sensitivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    name: String,
    case_sensitive: bool,
}

impl Collation {
    pub fn new(name: impl Into<String>, case_sensitive: bool) -> Self {
        Collation {
            name: name.into(),
            case_sensitive,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// ORDER BY terms for one operand. Case-sensitive collations sort on
    /// `lower()` first and then on the raw value so equal groups stay adjacent.
    pub fn sort_terms(&self, operand: &str, is_text: bool, descending: bool) -> Vec<String> {
        let direction = if descending { " DESC NULLS FIRST" } else { "" };
        if !is_text {
            return vec![format!("{}{}", operand, direction)];
        }
        let raw = format!("{} COLLATE {}{}", operand, self.name, direction);
        if self.case_sensitive {
            vec![
                format!("lower({}) COLLATE {}{}", operand, self.name, direction),
                raw,
            ]
        } else {
            vec![raw]
        }
    }

    /// Index column term; indexes take neither `lower()` nor NULLS ordering.
    pub fn index_term(&self, operand: &str, is_text: bool, descending: bool) -> String {
        let direction = if descending { " DESC" } else { "" };
        if is_text {
            format!("{} COLLATE {}{}", operand, self.name, direction)
        } else {
            format!("{}{}", operand, direction)
        }
    }

    /// GROUP BY term.
    pub fn group_term(&self, operand: &str, is_text: bool) -> String {
        if is_text {
            format!("{} COLLATE {}", operand, self.name)
        } else {
            operand.to_string()
        }
    }

    /// Text equality as the collation sees it, for the built-in collations.
    pub fn text_eq(&self, a: &str, b: &str) -> bool {
        if self.name.eq_ignore_ascii_case("RTRIM") {
            a.trim_end_matches(' ') == b.trim_end_matches(' ')
        } else if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

impl Default for Collation {
    fn default() -> Self {
        Collation::new("NOCASE", false)
    }
}

// ============================================================================
// SUMMARY BUILDER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryColumn {
    pub column: ColumnDef,
    pub expression: Option<String>,
    pub flags: ColumnFlags,
}

impl SummaryColumn {
    fn normalized_expression(&self) -> &str {
        self.expression.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    columns: Vec<SummaryColumn>,
    by_name: FxHashMap<&'static str, usize>,
    sort_order: Vec<usize>,
    group_order: Vec<usize>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an output column. Re-registering with the same expression
    /// (ignoring case) merges the flags; a different expression is an error.
    pub fn add_column(
        &mut self,
        column: ColumnDef,
        expression: Option<&str>,
        flags: ColumnFlags,
    ) -> Result<(), ConfigError> {
        let requested = expression.unwrap_or("");
        let index = match self.by_name.get(column.name) {
            Some(&index) => {
                let existing = self.columns[index].normalized_expression();
                if !existing.eq_ignore_ascii_case(requested) {
                    return Err(ConfigError::ConflictingExpression {
                        column: column.name.to_string(),
                        existing: existing.to_string(),
                        requested: requested.to_string(),
                    });
                }
                self.columns[index].flags |= flags;
                index
            }
            None => {
                let index = self.columns.len();
                self.columns.push(SummaryColumn {
                    column,
                    expression: expression.filter(|e| !e.is_empty()).map(str::to_string),
                    flags,
                });
                self.by_name.insert(column.name, index);
                index
            }
        };

        let flags = self.columns[index].flags;
        if flags.is_sorted() && !self.sort_order.contains(&index) {
            self.sort_order.push(index);
        }
        if flags.is_grouped() && !self.group_order.contains(&index) {
            self.group_order.push(index);
        }
        Ok(())
    }

    /// Grouped columns registered so far, as a copy.
    pub fn snapshot_group_columns(&self) -> Vec<ColumnDef> {
        self.group_order.iter().map(|&i| self.columns[i].column).collect()
    }

    pub fn columns(&self) -> &[SummaryColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&SummaryColumn> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// Grouped columns, then sorted columns that are not grouped.
    pub fn sort_columns(&self) -> impl Iterator<Item = &SummaryColumn> {
        let sorted_only = self
            .sort_order
            .iter()
            .filter(move |&&i| !self.columns[i].flags.is_grouped());
        self.group_order
            .iter()
            .chain(sorted_only)
            .map(move |&i| &self.columns[i])
    }

    /// The list table: id, every registered column, then the root key.
    pub fn list_table(&self, name: &str) -> StoreResult<TempTable> {
        let mut table = TempTable::new(name)?;
        table.add_column(columns::ID);
        for column in &self.columns {
            table.add_column(column.column);
        }
        table.add_column(columns::ROOT_KEY);
        Ok(table)
    }

    /// Renders every fragment the materializer needs. `root_level` is the
    /// style's outermost level.
    pub fn render(
        &self,
        root_level: &Level,
        ctx: &ExpressionContext,
        collation: &Collation,
    ) -> Result<RenderedSummary, ConfigError> {
        let root_key = root_level
            .root_key_expression(ctx)
            .ok_or_else(|| ConfigError::MissingFields {
                kind: root_level.kind.name().to_string(),
                field: "key_fields".to_string(),
            })?;

        let selected: Vec<&SummaryColumn> =
            self.columns.iter().filter(|c| c.expression.is_some()).collect();
        let destinations = selected.iter().map(|c| c.column.name).collect();
        let selects = selected
            .iter()
            .map(|c| format!("{} AS {}", c.normalized_expression(), c.column.name))
            .collect();

        let mut leaf_order = Vec::new();
        let mut list_order = Vec::new();
        let mut index_columns = Vec::new();
        for column in self.sort_columns() {
            let is_text = column.column.is_text();
            let descending = column.flags.is_descending();
            if let Some(expression) = &column.expression {
                leaf_order.extend(collation.sort_terms(
                    &format!("({})", expression),
                    is_text,
                    descending,
                ));
            }
            list_order.extend(collation.sort_terms(
                &format!("l.{}", column.column.name),
                is_text,
                descending,
            ));
            index_columns.push(collation.index_term(column.column.name, is_text, descending));
        }
        list_order.push(format!("l.{}", columns::LEVEL.name));
        index_columns.push(columns::LEVEL.name.to_string());

        Ok(RenderedSummary {
            destinations,
            selects,
            root_key,
            leaf_order_by: leaf_order.join(", "),
            list_order_by: list_order.join(", "),
            index_columns: index_columns.join(", "),
        })
    }
}

/// SQL fragments rendered from a `SummaryBuilder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSummary {
    /// Insert column names, in registration order (root key excluded).
    pub destinations: Vec<&'static str>,
    /// `expression AS name` for each destination.
    pub selects: Vec<String>,
    pub root_key: String,
    /// Leaf order over source expressions.
    pub leaf_order_by: String,
    /// Full list order over list columns aliased `l`, ending with the level.
    pub list_order_by: String,
    pub index_columns: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use booklist_style::GroupKind;

    fn create_test_summary() -> SummaryBuilder {
        let mut summary = SummaryBuilder::new();
        summary
            .add_column(columns::BOOK_ID, Some("b._id"), ColumnFlags::NONE)
            .unwrap();
        summary
            .add_column(
                columns::GENRE,
                Some("b.genre"),
                ColumnFlags::GROUPED | ColumnFlags::SORTED,
            )
            .unwrap();
        summary
            .add_column(
                columns::RATING,
                Some("CAST(b.rating AS INTEGER)"),
                ColumnFlags::GROUPED | ColumnFlags::SORTED | ColumnFlags::SORT_DESCENDING,
            )
            .unwrap();
        summary
            .add_column(columns::BOOK_ID, Some("B._ID"), ColumnFlags::SORTED)
            .unwrap();
        summary
    }

    #[test]
    fn test_conflicting_expression() {
        let mut summary = create_test_summary();
        let err = summary
            .add_column(columns::GENRE, Some("b.language"), ColumnFlags::NONE)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ConflictingExpression {
                column: "genre".into(),
                existing: "b.genre".into(),
                requested: "b.language".into(),
            }
        );
    }

    #[test]
    fn test_none_and_empty_expressions_match() {
        let mut summary = SummaryBuilder::new();
        summary.add_column(columns::SELECTED, None, ColumnFlags::NONE).unwrap();
        summary
            .add_column(columns::SELECTED, Some(""), ColumnFlags::SORTED)
            .unwrap();
        assert!(summary.column("selected").unwrap().flags.is_sorted());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut summary = create_test_summary();
        let snapshot = summary.snapshot_group_columns();
        summary
            .add_column(columns::FORMAT, Some("b.format"), ColumnFlags::GROUPED)
            .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(summary.snapshot_group_columns().len(), 3);
    }

    #[test]
    fn test_late_sort_flag_sorts_last() {
        let summary = create_test_summary();
        let order: Vec<&str> = summary.sort_columns().map(|c| c.column.name).collect();
        assert_eq!(order, vec!["genre", "rating", "book_id"]);
    }

    #[test]
    fn test_sort_only_columns_follow_deeper_groups() {
        let mut summary = SummaryBuilder::new();
        summary
            .add_column(
                columns::SERIES_NAME,
                Some("s.series_name"),
                ColumnFlags::GROUPED | ColumnFlags::SORTED,
            )
            .unwrap();
        summary
            .add_column(columns::SERIES_NUM, Some("bs.series_num"), ColumnFlags::SORTED)
            .unwrap();
        summary
            .add_column(columns::AUTHOR_ID, Some("ba.author"), ColumnFlags::GROUPED)
            .unwrap();
        summary
            .add_column(columns::TITLE, Some("b.title"), ColumnFlags::SORTED)
            .unwrap();
        let order: Vec<&str> = summary.sort_columns().map(|c| c.column.name).collect();
        assert_eq!(order, vec!["series_name", "author_id", "series_num", "title"]);
    }

    #[test]
    fn test_render_case_insensitive() {
        let summary = create_test_summary();
        let level = Level::for_kind(GroupKind::Genre);
        let rendered = summary
            .render(&level, &ExpressionContext::default(), &Collation::default())
            .unwrap();
        assert_eq!(rendered.destinations, vec!["book_id", "genre", "rating"]);
        assert_eq!(rendered.selects[1], "b.genre AS genre");
        assert_eq!(rendered.root_key, "'g/'||Coalesce(b.genre,'')");
        assert_eq!(
            rendered.list_order_by,
            "l.genre COLLATE NOCASE, l.rating DESC NULLS FIRST, l.book_id, l.level"
        );
        assert_eq!(
            rendered.leaf_order_by,
            "(b.genre) COLLATE NOCASE, (CAST(b.rating AS INTEGER)) DESC NULLS FIRST, (b._id)"
        );
        assert_eq!(
            rendered.index_columns,
            "genre COLLATE NOCASE, rating DESC, book_id, level"
        );
    }

    #[test]
    fn test_render_case_sensitive_sorts_on_lower_first() {
        let summary = create_test_summary();
        let level = Level::for_kind(GroupKind::Genre);
        let rendered = summary
            .render(&level, &ExpressionContext::default(), &Collation::new("BINARY", true))
            .unwrap();
        assert!(rendered
            .list_order_by
            .starts_with("lower(l.genre) COLLATE BINARY, l.genre COLLATE BINARY, "));
    }

    #[test]
    fn test_collation_text_eq() {
        assert!(Collation::default().text_eq("Tolkien", "TOLKIEN"));
        assert!(!Collation::new("BINARY", true).text_eq("Tolkien", "TOLKIEN"));
        assert!(Collation::new("RTRIM", true).text_eq("Tolkien  ", "Tolkien"));
    }
}
