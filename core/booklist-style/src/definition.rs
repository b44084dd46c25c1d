//! FILENAME: core/booklist-style/src/definition.rs
//! Serializable style definitions.
//!
//! A definition names its levels by kind name; `compose` resolves the names,
//! applies the per-kind attributes and validates the result.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kinds::GroupKind;
use crate::level::Level;
use crate::style::{DisplayOptions, Style, StyleFilters};

/// One level as written in a definition, e.g. `{"kind": "author", "show_all": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_first: Option<bool>,
}

impl LevelDefinition {
    pub fn new(kind: impl Into<String>) -> Self {
        LevelDefinition {
            kind: kind.into(),
            show_all: None,
            given_first: None,
        }
    }

    pub fn resolve(&self) -> Result<GroupKind, ConfigError> {
        let kind = GroupKind::from_name(&self.kind)?;
        let unsupported = |attribute: &str| ConfigError::UnsupportedAttribute {
            kind: kind.name().to_string(),
            attribute: attribute.to_string(),
        };

        match kind {
            GroupKind::Author { .. } => Ok(GroupKind::Author {
                show_all: self.show_all.unwrap_or(false),
                given_first: self.given_first.unwrap_or(false),
            }),
            GroupKind::Series { .. } => {
                if self.given_first.is_some() {
                    return Err(unsupported("given_first"));
                }
                Ok(GroupKind::Series {
                    show_all: self.show_all.unwrap_or(false),
                })
            }
            other => {
                if self.show_all.is_some() {
                    return Err(unsupported("show_all"));
                }
                if self.given_first.is_some() {
                    return Err(unsupported("given_first"));
                }
                Ok(other)
            }
        }
    }
}

impl From<GroupKind> for LevelDefinition {
    fn from(kind: GroupKind) -> Self {
        let mut def = LevelDefinition::new(kind.name());
        match kind {
            GroupKind::Author { show_all, given_first } => {
                def.show_all = Some(show_all);
                def.given_first = Some(given_first);
            }
            GroupKind::Series { show_all } => def.show_all = Some(show_all),
            _ => {}
        }
        def
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub levels: Vec<LevelDefinition>,
    #[serde(default)]
    pub filters: StyleFilters,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default)]
    pub sort_author_given_first: bool,
}

impl StyleDefinition {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn compose(&self) -> Result<Style, ConfigError> {
        let levels = self
            .levels
            .iter()
            .map(|l| l.resolve().map(Level::for_kind))
            .collect::<Result<Vec<_>, _>>()?;

        let mut style = Style::compose(self.name.clone(), levels)?
            .with_filters(self.filters)
            .with_display(self.display);
        style.sort_author_given_first = self.sort_author_given_first;
        if let Some(id) = self.id {
            style = style.with_id(id);
        }
        Ok(style)
    }
}

impl From<&Style> for StyleDefinition {
    fn from(style: &Style) -> Self {
        StyleDefinition {
            name: style.name().to_string(),
            id: style.id(),
            levels: style.levels().iter().map(|l| l.kind.into()).collect(),
            filters: style.filters,
            display: style.display,
            sort_author_given_first: style.sort_author_given_first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TriState;

    #[test]
    fn test_compose_from_json() {
        let json = r#"{
            "name": "Unread by author",
            "id": 4,
            "levels": [
                {"kind": "author", "given_first": true},
                {"kind": "series", "show_all": true}
            ],
            "filters": {"read": "no"},
            "display": {"show_isbn": true}
        }"#;
        let style = StyleDefinition::from_json(json).unwrap().compose().unwrap();
        assert_eq!(style.name(), "Unread by author");
        assert_eq!(style.id(), Some(4));
        assert_eq!(
            style.levels()[0].kind,
            GroupKind::Author { show_all: false, given_first: true }
        );
        assert!(style.shows_all_series());
        assert_eq!(style.filters.read, TriState::No);
        assert_eq!(style.filters.loaned, TriState::Any);
        assert!(style.display.show_isbn);
    }

    #[test]
    fn test_unknown_kind_name() {
        let def = StyleDefinition {
            name: "x".into(),
            id: None,
            levels: vec![LevelDefinition::new("colour")],
            filters: StyleFilters::default(),
            display: DisplayOptions::default(),
            sort_author_given_first: false,
        };
        assert_eq!(def.compose(), Err(ConfigError::UnknownKind("colour".into())));
    }

    #[test]
    fn test_attribute_on_wrong_kind() {
        let mut level = LevelDefinition::new("genre");
        level.show_all = Some(true);
        assert_eq!(
            level.resolve(),
            Err(ConfigError::UnsupportedAttribute {
                kind: "genre".into(),
                attribute: "show_all".into(),
            })
        );

        let mut series = LevelDefinition::new("series");
        series.given_first = Some(false);
        assert!(matches!(
            series.resolve(),
            Err(ConfigError::UnsupportedAttribute { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = StyleDefinition::from_json("{\"name\": 3}").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefinition(_)));
    }

    #[test]
    fn test_style_to_definition_and_back() {
        let style = Style::from_kinds(
            "Shelves",
            &[GroupKind::Bookshelf, GroupKind::Author { show_all: true, given_first: false }],
        )
        .unwrap();
        let json = StyleDefinition::from(&style).to_json().unwrap();
        let again = StyleDefinition::from_json(&json).unwrap().compose().unwrap();
        assert_eq!(again, style);
    }
}
