//! FILENAME: core/booklist-style/src/level.rs
//! Level descriptors: the columns one grouping level contributes to the
//! list table and how each one is derived from the joined base tables.
//!
//! For every kind, the first column that is both grouped and sorted is the
//! one displayed on that level's header rows.

use std::ops::{BitOr, BitOrAssign};

use catalogue_store::schema::{
    authors, book_author, book_series, books, bookshelf, loan, series, AUTHORS, BOOKS,
    BOOKSHELF, BOOK_AUTHOR, BOOK_SERIES, LOAN, SERIES,
};
use catalogue_store::ColumnDef;
use smallvec::{smallvec, SmallVec};

use crate::columns;
use crate::kinds::GroupKind;

// ============================================================================
// COLUMN FLAGS
// ============================================================================

/// How a column takes part in grouping and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColumnFlags(u8);

impl ColumnFlags {
    pub const NONE: ColumnFlags = ColumnFlags(0);
    pub const SORTED: ColumnFlags = ColumnFlags(1);
    pub const GROUPED: ColumnFlags = ColumnFlags(1 << 1);
    pub const SORT_DESCENDING: ColumnFlags = ColumnFlags(1 << 3);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        ColumnFlags(bits & (1 | 1 << 1 | 1 << 3))
    }

    pub const fn contains(&self, other: ColumnFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_sorted(&self) -> bool {
        self.contains(Self::SORTED)
    }

    pub const fn is_grouped(&self) -> bool {
        self.contains(Self::GROUPED)
    }

    pub const fn is_descending(&self) -> bool {
        self.contains(Self::SORT_DESCENDING)
    }
}

impl BitOr for ColumnFlags {
    type Output = ColumnFlags;

    fn bitor(self, rhs: ColumnFlags) -> ColumnFlags {
        ColumnFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColumnFlags {
    fn bitor_assign(&mut self, rhs: ColumnFlags) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Settings that change how level expressions are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionContext {
    /// Value of date groups when the date cannot be parsed.
    pub unknown_label: String,
    /// Convert timestamps (dates carrying a time part) from UTC to local time.
    pub local_time_dates: bool,
    /// Author name form used for sorting when a column does not fix one.
    pub sort_author_given_first: bool,
}

impl Default for ExpressionContext {
    fn default() -> Self {
        ExpressionContext {
            unknown_label: "UNKNOWN".to_string(),
            local_time_dates: true,
            sort_author_given_first: false,
        }
    }
}

/// Source expression of a level column, rendered against an `ExpressionContext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelExpr {
    Sql(String),
    /// Formatted author name; `None` follows the style's sort preference.
    AuthorName { given_first: Option<bool> },
    Year { field: String, local: bool },
    Month { field: String, local: bool },
    Day { field: String, local: bool },
}

impl LevelExpr {
    pub fn sql(expr: impl Into<String>) -> Self {
        LevelExpr::Sql(expr.into())
    }

    pub fn to_sql(&self, ctx: &ExpressionContext) -> String {
        match self {
            LevelExpr::Sql(sql) => sql.clone(),
            LevelExpr::AuthorName { given_first } => {
                author_name_expression(given_first.unwrap_or(ctx.sort_author_given_first))
            }
            LevelExpr::Year { field, local } => year_glob(&date_field(field, *local, ctx), ctx),
            LevelExpr::Month { field, local } => month_glob(&date_field(field, *local, ctx), ctx),
            LevelExpr::Day { field, local } => day_glob(&date_field(field, *local, ctx)),
        }
    }
}

/// "Family, Given" or "Given Family"; the family name alone when there are no given names.
pub fn author_name_expression(given_first: bool) -> String {
    let family = AUTHORS.dot(authors::FAMILY_NAME);
    let given = AUTHORS.dot(authors::GIVEN_NAMES);
    if given_first {
        format!(
            "CASE WHEN {given}='' THEN {family} ELSE {given} || ' ' || {family} END",
            given = given,
            family = family
        )
    } else {
        format!(
            "CASE WHEN {given}='' THEN {family} ELSE {family} || ', ' || {given} END",
            given = given,
            family = family
        )
    }
}

/// Timestamps are stored in UTC; date-only values are taken as they are.
fn date_field(field: &str, local: bool, ctx: &ExpressionContext) -> String {
    if local && ctx.local_time_dates {
        format!(
            "(CASE WHEN {f} glob '*-*-* *' THEN datetime({f}, 'localtime') ELSE {f} END)",
            f = field
        )
    } else {
        field.to_string()
    }
}

fn quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

const D: &str = "[0123456789]";

fn year_glob(field: &str, ctx: &ExpressionContext) -> String {
    format!(
        "CASE WHEN {f} glob '{d}{d}{d}{d}*' THEN substr({f}, 1, 4) ELSE {unknown} END",
        f = field,
        d = D,
        unknown = quoted(&ctx.unknown_label)
    )
}

fn month_glob(field: &str, ctx: &ExpressionContext) -> String {
    format!(
        "CASE WHEN {f} glob '{d}{d}{d}{d}-{d}{d}*' THEN substr({f}, 6, 2) \
         WHEN {f} glob '{d}{d}{d}{d}-{d}*' THEN substr({f}, 6, 1) \
         ELSE {unknown} END",
        f = field,
        d = D,
        unknown = quoted(&ctx.unknown_label)
    )
}

fn day_glob(field: &str) -> String {
    format!(
        "CASE WHEN {f} glob '{d}{d}{d}{d}-{d}{d}-{d}{d}*' THEN substr({f}, 9, 2) \
         WHEN {f} glob '{d}{d}{d}{d}-{d}-{d}{d}*' THEN substr({f}, 8, 2) \
         WHEN {f} glob '{d}{d}{d}{d}-{d}{d}-{d}*' THEN substr({f}, 9, 1) \
         WHEN {f} glob '{d}{d}{d}{d}-{d}-{d}*' THEN substr({f}, 8, 1) \
         ELSE {f} END",
        f = field,
        d = D
    )
}

// ============================================================================
// LEVEL DESCRIPTOR
// ============================================================================

/// One column contributed by a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelColumn {
    pub column: ColumnDef,
    pub expression: LevelExpr,
    pub flags: ColumnFlags,
}

impl LevelColumn {
    pub fn new(column: ColumnDef, expression: LevelExpr, flags: ColumnFlags) -> Self {
        LevelColumn {
            column,
            expression,
            flags,
        }
    }
}

/// One grouping tier of a style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub kind: GroupKind,
    /// Column shown on this level's header rows.
    pub display_field: &'static str,
    /// Prefix of the root key when this is the outermost level.
    pub key_prefix: &'static str,
    /// Columns identifying a node of this level.
    pub key_fields: SmallVec<[&'static str; 2]>,
    /// Every column this level adds, in registration order.
    pub columns: SmallVec<[LevelColumn; 4]>,
}

const GROUP_SORT: ColumnFlags = ColumnFlags(ColumnFlags::GROUPED.0 | ColumnFlags::SORTED.0);
const GROUP_SORT_DESC: ColumnFlags = ColumnFlags(
    ColumnFlags::GROUPED.0 | ColumnFlags::SORTED.0 | ColumnFlags::SORT_DESCENDING.0,
);

impl Level {
    /// The standard descriptor for a kind.
    pub fn for_kind(kind: GroupKind) -> Self {
        let b = |column: &str| BOOKS.dot(column);
        let cols: SmallVec<[LevelColumn; 4]> = match kind {
            GroupKind::Author { given_first, .. } => smallvec![
                LevelColumn::new(
                    columns::AUTHOR_FORMATTED,
                    LevelExpr::AuthorName { given_first: Some(given_first) },
                    GROUP_SORT,
                ),
                LevelColumn::new(
                    columns::AUTHOR_SORT,
                    LevelExpr::AuthorName { given_first: None },
                    GROUP_SORT,
                ),
                LevelColumn::new(
                    columns::AUTHOR_ID,
                    LevelExpr::sql(BOOK_AUTHOR.dot(book_author::AUTHOR)),
                    ColumnFlags::GROUPED,
                ),
                LevelColumn::new(
                    columns::AUTHOR_IS_COMPLETE,
                    LevelExpr::sql(AUTHORS.dot(authors::IS_COMPLETE)),
                    ColumnFlags::GROUPED,
                ),
            ],
            GroupKind::Series { .. } => smallvec![
                LevelColumn::new(
                    columns::SERIES_NAME,
                    LevelExpr::sql(SERIES.dot(series::NAME)),
                    GROUP_SORT,
                ),
                // two series can share a name
                LevelColumn::new(
                    columns::SERIES_ID,
                    LevelExpr::sql(BOOK_SERIES.dot(book_series::SERIES)),
                    ColumnFlags::GROUPED,
                ),
                LevelColumn::new(
                    columns::SERIES_IS_COMPLETE,
                    LevelExpr::sql(SERIES.dot(series::IS_COMPLETE)),
                    ColumnFlags::GROUPED,
                ),
                LevelColumn::new(
                    columns::SERIES_POSITION,
                    LevelExpr::sql(BOOK_SERIES.dot(book_series::POSITION)),
                    ColumnFlags::NONE,
                ),
                // "3.1" and "3|Omnibus" sort numerically on their leading number
                LevelColumn::new(
                    columns::SERIES_NUM_FLOAT,
                    LevelExpr::sql(format!("CAST({} AS REAL)", BOOK_SERIES.dot(book_series::NUM))),
                    ColumnFlags::SORTED,
                ),
                LevelColumn::new(
                    columns::SERIES_NUM,
                    LevelExpr::sql(BOOK_SERIES.dot(book_series::NUM)),
                    ColumnFlags::SORTED,
                ),
                LevelColumn::new(
                    columns::PRIMARY_SERIES_COUNT,
                    LevelExpr::sql(format!(
                        "CASE WHEN Coalesce({},1)==1 THEN 1 ELSE 0 END",
                        BOOK_SERIES.dot(book_series::POSITION)
                    )),
                    ColumnFlags::NONE,
                ),
            ],
            GroupKind::Loaned => smallvec![
                LevelColumn::new(
                    columns::LOANED_TO,
                    LevelExpr::sql(format!("Coalesce({},'')", LOAN.dot(loan::LOANED_TO))),
                    GROUP_SORT,
                ),
                LevelColumn::new(
                    columns::LOANED_TO_SORT,
                    LevelExpr::sql(format!(
                        "CASE WHEN {} IS NULL THEN 1 ELSE 0 END",
                        LOAN.dot(loan::LOANED_TO)
                    )),
                    GROUP_SORT,
                ),
            ],
            GroupKind::ReadStatus => smallvec![
                LevelColumn::new(columns::READ_STATUS, LevelExpr::sql(b(books::READ)), GROUP_SORT),
                LevelColumn::new(columns::READ, LevelExpr::sql(b(books::READ)), ColumnFlags::NONE),
            ],
            GroupKind::Genre => simple(columns::GENRE, b(books::GENRE)),
            GroupKind::Publisher => simple(columns::PUBLISHER, b(books::PUBLISHER)),
            GroupKind::Language => simple(columns::LANGUAGE, b(books::LANGUAGE)),
            GroupKind::Location => simple(columns::LOCATION, b(books::LOCATION)),
            GroupKind::Format => simple(columns::FORMAT, b(books::FORMAT)),
            GroupKind::TitleLetter => simple(
                columns::TITLE_LETTER,
                format!("upper(SUBSTR({},1,1))", b(books::TITLE)),
            ),
            GroupKind::Bookshelf => simple(columns::BOOKSHELF, BOOKSHELF.dot(bookshelf::NAME)),
            GroupKind::Rating => smallvec![LevelColumn::new(
                columns::RATING,
                LevelExpr::sql(format!("CAST({} AS INTEGER)", b(books::RATING))),
                GROUP_SORT_DESC,
            )],
            GroupKind::PublicationYear => year(columns::PUBLICATION_YEAR, books::DATE_PUBLISHED, false, false),
            GroupKind::PublicationMonth => month(columns::PUBLICATION_MONTH, books::DATE_PUBLISHED, false, false),
            GroupKind::FirstPublicationYear => {
                year(columns::FIRST_PUBLICATION_YEAR, books::FIRST_PUBLICATION, false, false)
            }
            GroupKind::FirstPublicationMonth => {
                month(columns::FIRST_PUBLICATION_MONTH, books::FIRST_PUBLICATION, false, false)
            }
            GroupKind::ReadYear => year(columns::READ_YEAR, books::READ_END, false, false),
            GroupKind::ReadMonth => month(columns::READ_MONTH, books::READ_END, false, false),
            GroupKind::ReadDay => day(columns::READ_DAY, books::READ_END, false, false),
            GroupKind::AcquiredYear => year(columns::ACQUIRED_YEAR, books::DATE_ACQUIRED, true, false),
            GroupKind::AcquiredMonth => month(columns::ACQUIRED_MONTH, books::DATE_ACQUIRED, true, false),
            GroupKind::AcquiredDay => day(columns::ACQUIRED_DAY, books::DATE_ACQUIRED, true, false),
            GroupKind::AddedYear => year(columns::ADDED_YEAR, books::DATE_ADDED, true, true),
            GroupKind::AddedMonth => month(columns::ADDED_MONTH, books::DATE_ADDED, true, true),
            GroupKind::AddedDay => day(columns::ADDED_DAY, books::DATE_ADDED, true, true),
            GroupKind::UpdateYear => {
                with_update_date(year(columns::UPDATE_YEAR, books::LAST_UPDATE_DATE, true, true))
            }
            GroupKind::UpdateMonth => {
                with_update_date(month(columns::UPDATE_MONTH, books::LAST_UPDATE_DATE, true, true))
            }
            GroupKind::UpdateDay => {
                with_update_date(day(columns::UPDATE_DAY, books::LAST_UPDATE_DATE, true, true))
            }
        };

        let display_field = cols[0].column.name;
        let key_fields: SmallVec<[&'static str; 2]> = match kind {
            GroupKind::Author { .. } => smallvec![columns::AUTHOR_ID.name],
            GroupKind::Series { .. } => smallvec![columns::SERIES_ID.name],
            _ => smallvec![display_field],
        };

        Level {
            kind,
            display_field,
            key_prefix: kind.key_prefix(),
            key_fields,
            columns: cols,
        }
    }

    /// Names of the grouped columns, in registration order.
    pub fn group_fields(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.flags.is_grouped())
            .map(|c| c.column.name)
            .collect()
    }

    /// Names of the sorted columns, in registration order.
    pub fn sort_fields(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.flags.is_sorted())
            .map(|c| c.column.name)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&LevelColumn> {
        self.columns.iter().find(|c| c.column.name == name)
    }

    /// Root key expression built from this level's key fields, e.g.
    /// `'a/'||Coalesce(ba.author,'')`. `None` if a key field has no column.
    pub fn root_key_expression(&self, ctx: &ExpressionContext) -> Option<String> {
        let mut parts = Vec::with_capacity(self.key_fields.len());
        for field in &self.key_fields {
            let column = self.column(field)?;
            parts.push(format!("Coalesce({},'')", column.expression.to_sql(ctx)));
        }
        Some(format!(
            "{}||{}",
            quoted(&format!("{}/", self.key_prefix)),
            parts.join("||'/'||")
        ))
    }
}

fn simple(column: ColumnDef, expr: String) -> SmallVec<[LevelColumn; 4]> {
    smallvec![LevelColumn::new(column, LevelExpr::Sql(expr), GROUP_SORT)]
}

fn date_flags(descending: bool) -> ColumnFlags {
    if descending {
        GROUP_SORT_DESC
    } else {
        GROUP_SORT
    }
}

fn year(column: ColumnDef, field: &str, local: bool, descending: bool) -> SmallVec<[LevelColumn; 4]> {
    let expr = LevelExpr::Year { field: BOOKS.dot(field), local };
    smallvec![LevelColumn::new(column, expr, date_flags(descending))]
}

fn month(column: ColumnDef, field: &str, local: bool, descending: bool) -> SmallVec<[LevelColumn; 4]> {
    let expr = LevelExpr::Month { field: BOOKS.dot(field), local };
    smallvec![LevelColumn::new(column, expr, date_flags(descending))]
}

fn day(column: ColumnDef, field: &str, local: bool, descending: bool) -> SmallVec<[LevelColumn; 4]> {
    let expr = LevelExpr::Day { field: BOOKS.dot(field), local };
    smallvec![LevelColumn::new(column, expr, date_flags(descending))]
}

/// Update-date groups also order their books by the full timestamp, newest first.
fn with_update_date(mut cols: SmallVec<[LevelColumn; 4]>) -> SmallVec<[LevelColumn; 4]> {
    cols.push(LevelColumn::new(
        columns::LAST_UPDATE_DATE,
        LevelExpr::sql(BOOKS.dot(books::LAST_UPDATE_DATE)),
        ColumnFlags::SORTED | ColumnFlags::SORT_DESCENDING,
    ));
    cols
}
