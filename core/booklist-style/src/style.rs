//! FILENAME: core/booklist-style/src/style.rs
//! A style: the ordered group levels of a list plus its book filters and
//! display options.
//!
//! Styles are validated once, by `Style::compose`, and are read-only
//! afterwards; a builder takes its own clone.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use catalogue_store::schema::{books, loan, BOOKS, LOAN, PK_ID};

use crate::error::ConfigError;
use crate::kinds::GroupKind;
use crate::level::{ExpressionContext, Level};

// ============================================================================
// FILTERS
// ============================================================================

/// A yes / no / don't-care book filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    #[default]
    Any,
    Yes,
    No,
}

impl TriState {
    pub fn is_active(&self) -> bool {
        *self != TriState::Any
    }

    fn pick(&self, yes: String, no: String) -> Option<String> {
        match self {
            TriState::Any => None,
            TriState::Yes => Some(yes),
            TriState::No => Some(no),
        }
    }
}

/// Book-level filters carried by a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleFilters {
    pub read: TriState,
    pub signed: TriState,
    pub anthology: TriState,
    pub loaned: TriState,
}

impl StyleFilters {
    /// SQL conditions of every active filter, in a fixed order.
    pub fn conditions(&self) -> Vec<String> {
        let read = BOOKS.dot(books::READ);
        let signed = BOOKS.dot(books::SIGNED);
        let anthology = BOOKS.dot(books::ANTHOLOGY_MASK);
        let on_loan = format!(
            "EXISTS(SELECT NULL FROM {} WHERE {}={})",
            LOAN.reference(),
            LOAN.dot(loan::BOOK),
            BOOKS.dot(PK_ID)
        );

        [
            self.read.pick(format!("{}=1", read), format!("{}=0", read)),
            self.signed.pick(format!("{}=1", signed), format!("{}=0", signed)),
            self.anthology
                .pick(format!("{}<>0", anthology), format!("{}=0", anthology)),
            self.loaned
                .pick(on_loan.clone(), format!("NOT {}", on_loan)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ============================================================================
// DISPLAY OPTIONS
// ============================================================================

/// Extra book details shown on leaf rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub show_thumbnails: bool,
    pub show_author: bool,
    pub show_publisher: bool,
    pub show_format: bool,
    pub show_location: bool,
    pub show_bookshelves: bool,
    pub show_isbn: bool,
}

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    name: String,
    id: Option<i64>,
    levels: Vec<Level>,
    pub filters: StyleFilters,
    pub display: DisplayOptions,
    /// Sort authors by "Given Family" rather than "Family, Given".
    pub sort_author_given_first: bool,
}

impl Style {
    /// Validates the levels and builds a style with no filters and default
    /// display options.
    pub fn compose(name: impl Into<String>, levels: Vec<Level>) -> Result<Style, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyStyle);
        }

        let mut seen = FxHashSet::default();
        for level in &levels {
            validate_level(level)?;
            if !seen.insert(level.kind.id()) {
                return Err(ConfigError::DuplicateKind(level.kind.name().to_string()));
            }
        }

        Ok(Style {
            name: name.into(),
            id: None,
            levels,
            filters: StyleFilters::default(),
            display: DisplayOptions::default(),
            sort_author_given_first: false,
        })
    }

    /// Shorthand for composing from kinds with standard descriptors.
    pub fn from_kinds(name: impl Into<String>, kinds: &[GroupKind]) -> Result<Style, ConfigError> {
        Style::compose(name, kinds.iter().map(|k| Level::for_kind(*k)).collect())
    }

    /// Standard descriptors for distinct kinds always compose; used for the
    /// built-in styles.
    pub(crate) fn from_standard_kinds(id: i64, name: &str, kinds: &[GroupKind]) -> Style {
        Style {
            name: name.to_string(),
            id: Some(id),
            levels: kinds.iter().map(|k| Level::for_kind(*k)).collect(),
            filters: StyleFilters::default(),
            display: DisplayOptions::default(),
            sort_author_given_first: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_filters(mut self, filters: StyleFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Level `n`, 1-based as in the list table. Leaf rows have no level descriptor.
    pub fn level(&self, n: usize) -> Option<&Level> {
        n.checked_sub(1).and_then(|i| self.levels.get(i))
    }

    /// Level number of leaf (book) rows.
    pub fn book_level(&self) -> i64 {
        self.levels.len() as i64 + 1
    }

    /// Kind of the outermost level; persisted node state is keyed by it.
    pub fn top_level_kind(&self) -> GroupKind {
        // compose guarantees at least one level
        self.levels[0].kind
    }

    pub fn has_kind(&self, kind_id: u32) -> bool {
        self.levels.iter().any(|l| l.kind.id() == kind_id)
    }

    pub fn author_level(&self) -> Option<&Level> {
        self.levels
            .iter()
            .find(|l| matches!(l.kind, GroupKind::Author { .. }))
    }

    pub fn series_level(&self) -> Option<&Level> {
        self.levels
            .iter()
            .find(|l| matches!(l.kind, GroupKind::Series { .. }))
    }

    /// Author joins are restricted to the primary author unless an author
    /// level asks for all of them.
    pub fn shows_all_authors(&self) -> bool {
        self.levels
            .iter()
            .any(|l| matches!(l.kind, GroupKind::Author { show_all: true, .. }))
    }

    pub fn shows_all_series(&self) -> bool {
        self.levels
            .iter()
            .any(|l| matches!(l.kind, GroupKind::Series { show_all: true }))
    }

    pub fn has_bookshelf_level(&self) -> bool {
        self.levels.iter().any(|l| l.kind.is_bookshelf())
    }

    pub fn has_loaned_level(&self) -> bool {
        self.levels.iter().any(|l| l.kind.is_loaned())
    }

    /// Expression context for this style with the given builder settings.
    pub fn expression_context(&self, unknown_label: &str, local_time_dates: bool) -> ExpressionContext {
        ExpressionContext {
            unknown_label: unknown_label.to_string(),
            local_time_dates,
            sort_author_given_first: self.sort_author_given_first,
        }
    }
}

fn validate_level(level: &Level) -> Result<(), ConfigError> {
    let kind = level.kind.name();
    let missing = |field: &str| ConfigError::MissingFields {
        kind: kind.to_string(),
        field: field.to_string(),
    };

    if level.key_prefix.is_empty() {
        return Err(missing("key_prefix"));
    }
    if level.key_fields.is_empty() {
        return Err(missing("key_fields"));
    }
    if level.display_field.is_empty() {
        return Err(missing("display_field"));
    }

    let first = level
        .columns
        .iter()
        .find(|c| c.flags.is_grouped() && c.flags.is_sorted())
        .ok_or_else(|| missing("grouped and sorted column"))?;
    if first.column.name != level.display_field {
        return Err(ConfigError::DisplayFieldMismatch {
            kind: kind.to_string(),
            display: level.display_field.to_string(),
            first: first.column.name.to_string(),
        });
    }

    for key in &level.key_fields {
        let grouped = level
            .columns
            .iter()
            .any(|c| c.column.name == *key && c.flags.is_grouped());
        if !grouped {
            return Err(missing(key));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::ColumnFlags;

    fn create_test_style() -> Style {
        Style::from_kinds("Authors", &[GroupKind::author(), GroupKind::series()]).unwrap()
    }

    #[test]
    fn test_compose_author_series() {
        let style = create_test_style();
        assert_eq!(style.level_count(), 2);
        assert_eq!(style.book_level(), 3);
        assert_eq!(style.top_level_kind().id(), 1);
        assert_eq!(style.level(1).unwrap().display_field, "author_formatted");
        assert_eq!(style.level(2).unwrap().display_field, "series_name");
        assert!(style.level(0).is_none());
        assert!(style.level(3).is_none());
    }

    #[test]
    fn test_compose_rejects_empty() {
        assert_eq!(Style::compose("x", vec![]), Err(ConfigError::EmptyStyle));
    }

    #[test]
    fn test_compose_rejects_duplicate_kinds() {
        let err = Style::from_kinds(
            "x",
            &[GroupKind::author(), GroupKind::Author { show_all: true, given_first: false }],
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateKind("author".into()));
    }

    #[test]
    fn test_compose_rejects_missing_key_fields() {
        let mut level = Level::for_kind(GroupKind::Genre);
        level.key_fields.clear();
        let err = Style::compose("x", vec![level]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFields { ref field, .. } if field == "key_fields"));
    }

    #[test]
    fn test_compose_rejects_ungrouped_key() {
        let mut level = Level::for_kind(GroupKind::Genre);
        level.key_fields[0] = "title";
        let err = Style::compose("x", vec![level]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFields { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_compose_rejects_display_mismatch() {
        let mut level = Level::for_kind(GroupKind::Author {
            show_all: false,
            given_first: false,
        });
        level.columns[0].flags = ColumnFlags::GROUPED;
        let err = Style::compose("x", vec![level]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DisplayFieldMismatch {
                kind: "author".into(),
                display: "author_formatted".into(),
                first: "author_sort".into(),
            }
        );
    }

    #[test]
    fn test_show_all_flags() {
        let style = Style::from_kinds(
            "x",
            &[
                GroupKind::Author { show_all: true, given_first: false },
                GroupKind::series(),
            ],
        )
        .unwrap();
        assert!(style.shows_all_authors());
        assert!(!style.shows_all_series());
        assert!(!style.has_bookshelf_level());
    }

    #[test]
    fn test_filter_conditions() {
        let filters = StyleFilters {
            read: TriState::No,
            signed: TriState::Any,
            anthology: TriState::Yes,
            loaned: TriState::No,
        };
        assert_eq!(
            filters.conditions(),
            vec![
                "b.read=0".to_string(),
                "b.anthology_mask<>0".to_string(),
                "NOT EXISTS(SELECT NULL FROM loan l WHERE l.book=b._id)".to_string(),
            ]
        );
        assert!(StyleFilters::default().conditions().is_empty());
    }
}
