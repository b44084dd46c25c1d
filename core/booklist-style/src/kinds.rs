//! FILENAME: core/booklist-style/src/kinds.rs
//! Group kinds: what a level of the list groups by.
//!
//! Kind ids are persisted (node state rows, header `row_kind` values) and
//! must never be renumbered.

use crate::error::ConfigError;

/// Row kind of leaf (book) rows.
pub const BOOK_ROW_KIND: u32 = 0;

/// Highest valid group kind id.
pub const MAX_KIND_ID: u32 = 28;

/// A grouping kind. Author and series carry their own attributes; every
/// other kind is fully described by its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Author {
        /// List the book under every author, not only the primary one.
        show_all: bool,
        /// Display "Given Family" instead of "Family, Given".
        given_first: bool,
    },
    Series {
        /// List the book under every series, not only the primary one.
        show_all: bool,
    },
    Genre,
    Publisher,
    ReadStatus,
    Loaned,
    PublicationYear,
    PublicationMonth,
    TitleLetter,
    AddedYear,
    AddedMonth,
    AddedDay,
    Format,
    ReadYear,
    ReadMonth,
    ReadDay,
    Location,
    Language,
    UpdateYear,
    UpdateMonth,
    UpdateDay,
    Rating,
    Bookshelf,
    AcquiredYear,
    AcquiredMonth,
    AcquiredDay,
    FirstPublicationYear,
    FirstPublicationMonth,
}

/// (id, name, key prefix) for every group kind, in id order.
static KIND_TABLE: [(u32, &str, &str); MAX_KIND_ID as usize] = [
    (1, "author", "a"),
    (2, "series", "s"),
    (3, "genre", "g"),
    (4, "publisher", "p"),
    (5, "read_status", "r"),
    (6, "loaned", "l"),
    (7, "publication_year", "yrp"),
    (8, "publication_month", "mnp"),
    (9, "title_letter", "t"),
    (10, "added_year", "yra"),
    (11, "added_month", "mna"),
    (12, "added_day", "dya"),
    (13, "format", "fmt"),
    (14, "read_year", "yrr"),
    (15, "read_month", "mnr"),
    (16, "read_day", "dyr"),
    (17, "location", "loc"),
    (18, "language", "lang"),
    (19, "update_year", "yru"),
    (20, "update_month", "mnu"),
    (21, "update_day", "dyu"),
    (22, "rating", "rat"),
    (23, "bookshelf", "shelf"),
    (24, "acquired_year", "yrac"),
    (25, "acquired_month", "mnac"),
    (26, "acquired_day", "dyac"),
    (27, "first_publication_year", "yrfp"),
    (28, "first_publication_month", "mnfp"),
];

impl GroupKind {
    /// Author level listing primary authors, family name first.
    pub fn author() -> Self {
        GroupKind::Author {
            show_all: false,
            given_first: false,
        }
    }

    /// Series level listing primary series only.
    pub fn series() -> Self {
        GroupKind::Series { show_all: false }
    }

    pub fn id(&self) -> u32 {
        match self {
            GroupKind::Author { .. } => 1,
            GroupKind::Series { .. } => 2,
            GroupKind::Genre => 3,
            GroupKind::Publisher => 4,
            GroupKind::ReadStatus => 5,
            GroupKind::Loaned => 6,
            GroupKind::PublicationYear => 7,
            GroupKind::PublicationMonth => 8,
            GroupKind::TitleLetter => 9,
            GroupKind::AddedYear => 10,
            GroupKind::AddedMonth => 11,
            GroupKind::AddedDay => 12,
            GroupKind::Format => 13,
            GroupKind::ReadYear => 14,
            GroupKind::ReadMonth => 15,
            GroupKind::ReadDay => 16,
            GroupKind::Location => 17,
            GroupKind::Language => 18,
            GroupKind::UpdateYear => 19,
            GroupKind::UpdateMonth => 20,
            GroupKind::UpdateDay => 21,
            GroupKind::Rating => 22,
            GroupKind::Bookshelf => 23,
            GroupKind::AcquiredYear => 24,
            GroupKind::AcquiredMonth => 25,
            GroupKind::AcquiredDay => 26,
            GroupKind::FirstPublicationYear => 27,
            GroupKind::FirstPublicationMonth => 28,
        }
    }

    /// Kind for a persisted id; author and series get default attributes.
    pub fn from_id(id: u32) -> Result<Self, ConfigError> {
        let kind = match id {
            1 => GroupKind::author(),
            2 => GroupKind::series(),
            3 => GroupKind::Genre,
            4 => GroupKind::Publisher,
            5 => GroupKind::ReadStatus,
            6 => GroupKind::Loaned,
            7 => GroupKind::PublicationYear,
            8 => GroupKind::PublicationMonth,
            9 => GroupKind::TitleLetter,
            10 => GroupKind::AddedYear,
            11 => GroupKind::AddedMonth,
            12 => GroupKind::AddedDay,
            13 => GroupKind::Format,
            14 => GroupKind::ReadYear,
            15 => GroupKind::ReadMonth,
            16 => GroupKind::ReadDay,
            17 => GroupKind::Location,
            18 => GroupKind::Language,
            19 => GroupKind::UpdateYear,
            20 => GroupKind::UpdateMonth,
            21 => GroupKind::UpdateDay,
            22 => GroupKind::Rating,
            23 => GroupKind::Bookshelf,
            24 => GroupKind::AcquiredYear,
            25 => GroupKind::AcquiredMonth,
            26 => GroupKind::AcquiredDay,
            27 => GroupKind::FirstPublicationYear,
            28 => GroupKind::FirstPublicationMonth,
            other => return Err(ConfigError::UnknownKindId(other)),
        };
        Ok(kind)
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let wanted = name.trim();
        KIND_TABLE
            .iter()
            .find(|(_, kind_name, _)| kind_name.eq_ignore_ascii_case(wanted))
            .map(|(id, _, _)| GroupKind::from_id(*id))
            .unwrap_or_else(|| Err(ConfigError::UnknownKind(name.to_string())))
    }

    pub fn name(&self) -> &'static str {
        self.table_entry().1
    }

    pub fn key_prefix(&self) -> &'static str {
        self.table_entry().2
    }

    /// Bookshelf levels change how the bookshelf filter is expressed.
    pub fn is_bookshelf(&self) -> bool {
        matches!(self, GroupKind::Bookshelf)
    }

    /// Loaned levels pull the loan table into the join.
    pub fn is_loaned(&self) -> bool {
        matches!(self, GroupKind::Loaned)
    }

    fn table_entry(&self) -> &'static (u32, &'static str, &'static str) {
        // ids are 1-based and dense
        &KIND_TABLE[(self.id() - 1) as usize]
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every group kind with default attributes, in id order.
pub fn all_kinds() -> impl Iterator<Item = GroupKind> {
    (1..=MAX_KIND_ID).filter_map(|id| GroupKind::from_id(id).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for kind in all_kinds() {
            assert_eq!(GroupKind::from_id(kind.id()).unwrap(), kind);
            assert_eq!(GroupKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(all_kinds().count(), MAX_KIND_ID as usize);
    }

    #[test]
    fn test_book_id_is_not_a_group() {
        assert_eq!(
            GroupKind::from_id(BOOK_ROW_KIND),
            Err(ConfigError::UnknownKindId(0))
        );
        assert_eq!(
            GroupKind::from_id(29),
            Err(ConfigError::UnknownKindId(29))
        );
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(
            GroupKind::from_name("colour"),
            Err(ConfigError::UnknownKind("colour".into()))
        );
        assert_eq!(GroupKind::from_name(" Author ").unwrap(), GroupKind::author());
    }

    #[test]
    fn test_key_prefixes_are_unique() {
        let mut prefixes: Vec<&str> = all_kinds().map(|k| k.key_prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), MAX_KIND_ID as usize);
    }

    #[test]
    fn test_payload_does_not_change_identity() {
        let all = GroupKind::Author {
            show_all: true,
            given_first: true,
        };
        assert_eq!(all.id(), 1);
        assert_eq!(all.key_prefix(), "a");
        assert_eq!(all.to_string(), "author");
    }
}
