//! FILENAME: core/booklist-style/src/builtin.rs
//! Built-in styles. Ids are negative so they never collide with user styles.

use crate::kinds::GroupKind;
use crate::style::{DisplayOptions, Style, StyleFilters, TriState};

pub const AUTHOR_SERIES_ID: i64 = -1;
pub const UNREAD_ID: i64 = -2;
pub const COMPACT_ID: i64 = -3;
pub const TITLE_LETTER_ID: i64 = -4;
pub const SERIES_ID: i64 = -5;
pub const GENRE_ID: i64 = -6;
pub const LOANED_ID: i64 = -7;
pub const READ_AND_UNREAD_ID: i64 = -8;
pub const PUBLICATION_DATE_ID: i64 = -9;
pub const ADDED_DATE_ID: i64 = -10;
pub const ACQUIRED_DATE_ID: i64 = -11;
pub const AUTHOR_YEAR_ID: i64 = -12;
pub const FORMAT_ID: i64 = -13;
pub const READ_DATE_ID: i64 = -14;
pub const LOCATION_ID: i64 = -15;
pub const LANGUAGE_ID: i64 = -16;
pub const RATING_ID: i64 = -17;
pub const BOOKSHELF_ID: i64 = -18;
pub const UPDATE_DATE_ID: i64 = -19;

/// The default style.
pub fn author_series() -> Style {
    Style::from_standard_kinds(
        AUTHOR_SERIES_ID,
        "Author - Series",
        &[GroupKind::author(), GroupKind::series()],
    )
}

pub fn unread() -> Style {
    Style::from_standard_kinds(
        UNREAD_ID,
        "Unread",
        &[GroupKind::author(), GroupKind::series()],
    )
    .with_filters(StyleFilters {
        read: TriState::No,
        ..StyleFilters::default()
    })
}

pub fn compact() -> Style {
    Style::from_standard_kinds(COMPACT_ID, "Compact", &[GroupKind::author()]).with_display(
        DisplayOptions {
            show_thumbnails: false,
            ..DisplayOptions::default()
        },
    )
}

pub fn title_letter() -> Style {
    Style::from_standard_kinds(TITLE_LETTER_ID, "Title", &[GroupKind::TitleLetter])
}

pub fn series() -> Style {
    Style::from_standard_kinds(SERIES_ID, "Series", &[GroupKind::series()])
}

pub fn genre() -> Style {
    Style::from_standard_kinds(
        GENRE_ID,
        "Genre",
        &[GroupKind::Genre, GroupKind::author(), GroupKind::series()],
    )
}

pub fn loaned() -> Style {
    Style::from_standard_kinds(
        LOANED_ID,
        "Loaned",
        &[GroupKind::Loaned, GroupKind::author(), GroupKind::series()],
    )
}

pub fn read_and_unread() -> Style {
    Style::from_standard_kinds(
        READ_AND_UNREAD_ID,
        "Read & Unread",
        &[GroupKind::ReadStatus, GroupKind::author(), GroupKind::series()],
    )
}

pub fn publication_date() -> Style {
    Style::from_standard_kinds(
        PUBLICATION_DATE_ID,
        "Publication Date",
        &[
            GroupKind::PublicationYear,
            GroupKind::PublicationMonth,
            GroupKind::author(),
            GroupKind::series(),
        ],
    )
}

pub fn added_date() -> Style {
    Style::from_standard_kinds(
        ADDED_DATE_ID,
        "Added Date",
        &[
            GroupKind::AddedYear,
            GroupKind::AddedMonth,
            GroupKind::AddedDay,
            GroupKind::author(),
        ],
    )
}

pub fn acquired_date() -> Style {
    Style::from_standard_kinds(
        ACQUIRED_DATE_ID,
        "Acquired Date",
        &[
            GroupKind::AcquiredYear,
            GroupKind::AcquiredMonth,
            GroupKind::AcquiredDay,
            GroupKind::author(),
        ],
    )
}

pub fn author_year() -> Style {
    Style::from_standard_kinds(
        AUTHOR_YEAR_ID,
        "Author - Publication Year",
        &[GroupKind::author(), GroupKind::PublicationYear, GroupKind::series()],
    )
}

pub fn format() -> Style {
    Style::from_standard_kinds(FORMAT_ID, "Format", &[GroupKind::Format])
}

pub fn read_date() -> Style {
    Style::from_standard_kinds(
        READ_DATE_ID,
        "Read Date",
        &[GroupKind::ReadYear, GroupKind::ReadMonth, GroupKind::author()],
    )
}

pub fn location() -> Style {
    Style::from_standard_kinds(
        LOCATION_ID,
        "Location",
        &[GroupKind::Location, GroupKind::author(), GroupKind::series()],
    )
}

pub fn language() -> Style {
    Style::from_standard_kinds(
        LANGUAGE_ID,
        "Language",
        &[GroupKind::Language, GroupKind::author(), GroupKind::series()],
    )
}

pub fn rating() -> Style {
    Style::from_standard_kinds(
        RATING_ID,
        "Rating",
        &[GroupKind::Rating, GroupKind::author(), GroupKind::series()],
    )
}

pub fn bookshelf() -> Style {
    Style::from_standard_kinds(
        BOOKSHELF_ID,
        "Bookshelf",
        &[GroupKind::Bookshelf, GroupKind::author(), GroupKind::series()],
    )
}

pub fn update_date() -> Style {
    Style::from_standard_kinds(
        UPDATE_DATE_ID,
        "Update Date",
        &[
            GroupKind::UpdateYear,
            GroupKind::UpdateMonth,
            GroupKind::UpdateDay,
        ],
    )
}

/// Every built-in style, default first.
pub fn all() -> Vec<Style> {
    vec![
        author_series(),
        unread(),
        compact(),
        title_letter(),
        series(),
        genre(),
        loaned(),
        read_and_unread(),
        publication_date(),
        added_date(),
        acquired_date(),
        author_year(),
        format(),
        read_date(),
        location(),
        language(),
        rating(),
        bookshelf(),
        update_date(),
    ]
}

/// Built-in style by id; unknown ids fall back to the default style.
pub fn by_id(id: i64) -> Style {
    all()
        .into_iter()
        .find(|s| s.id() == Some(id))
        .unwrap_or_else(author_series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_pass_validation() {
        for style in all() {
            let levels = style.levels().to_vec();
            let composed = Style::compose(style.name(), levels);
            assert!(composed.is_ok(), "style {} failed: {:?}", style.name(), composed);
        }
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let mut ids: Vec<i64> = all().iter().filter_map(|s| s.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 19);
    }

    #[test]
    fn test_by_id_falls_back_to_default() {
        assert_eq!(by_id(GENRE_ID).name(), "Genre");
        assert_eq!(by_id(42).id(), Some(AUTHOR_SERIES_ID));
    }

    #[test]
    fn test_unread_filters_on_read() {
        assert_eq!(unread().filters.read, TriState::No);
        assert!(loaned().has_loaned_level());
        assert!(bookshelf().has_bookshelf_level());
    }
}
