//! Core field and entity types for custom fields.
//!
//! All types serialize to/from YAML via serde. A field definition declares a
//! typed attribute to be added to a host entity; an entity definition is a
//! template listing which fields belong to a given entity type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::category::CategoryItems;
use crate::error::{FieldsError, Result};

/// The kind of a custom field. Selects which behavior bundle it installs.
///
/// Parsing is case-insensitive, so `"Category"` and `"category"` are the same
/// kind. Kinds always serialize lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKind {
    String,
    Text,
    Boolean,
    Date,
    Category,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Category => "category",
        }
    }
}

impl FromStr for FieldKind {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(FieldKind::String),
            "text" => Ok(FieldKind::Text),
            "boolean" => Ok(FieldKind::Boolean),
            "date" => Ok(FieldKind::Date),
            "category" => Ok(FieldKind::Category),
            _ => Err(FieldsError::UnknownFieldKind { kind: s.to_string() }),
        }
    }
}

impl TryFrom<String> for FieldKind {
    type Error = FieldsError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom field definition.
///
/// `label` is the human-facing name and derives the accessor name; `name` is
/// the storage attribute on the host record that physically holds the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub id: Ulid,
    pub label: String,
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default, skip_serializing_if = "CategoryItems::is_empty")]
    pub category_items: CategoryItems,
}

impl FieldDef {
    /// Create a definition with a fresh id and no category items.
    pub fn new(label: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: Ulid::new(),
            label: label.into(),
            name: name.into(),
            kind,
            hint: None,
            required: false,
            position: 0,
            category_items: CategoryItems::new(),
        }
    }

    /// Whether this field is a category field.
    pub fn is_category(&self) -> bool {
        self.kind == FieldKind::Category
    }

    /// Accessor name derived from the label: lowercased, with every run of
    /// non-alphanumeric characters collapsed to a single `_`.
    pub fn accessor_name(&self) -> String {
        let mut out = String::with_capacity(self.label.len());
        let mut separate = false;
        for c in self.label.chars() {
            if c.is_alphanumeric() {
                if separate && !out.is_empty() {
                    out.push('_');
                }
                separate = false;
                out.extend(c.to_lowercase());
            } else {
                separate = true;
            }
        }
        out
    }

    /// Check the definition can be installed on a host type.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| FieldsError::ValidationFailed {
            field: self.label.clone(),
            message: message.to_string(),
        };

        if self.accessor_name().is_empty() {
            return Err(fail("label must contain at least one letter or digit"));
        }
        if self.name.trim().is_empty() {
            return Err(fail("storage name cannot be empty"));
        }
        if self.is_category()
            && self
                .category_items
                .iter()
                .any(|item| item.name.trim().is_empty())
        {
            return Err(fail("category item name cannot be empty"));
        }
        Ok(())
    }
}

/// An entity definition: a template declaring which fields belong to an entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDef {
    pub name: String,
    /// Accessor names of the member fields, in order.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ItemId;

    fn category_field() -> FieldDef {
        let mut field = FieldDef::new("global_category", "field_1", FieldKind::Category);
        field
            .category_items
            .build("Development", ItemId::from(Ulid(41)), 2);
        field.category_items.build("Design", ItemId::from(Ulid(42)), 1);
        field
            .category_items
            .build("Maintenance", ItemId::from(Ulid(43)), 0);
        field
    }

    #[test]
    fn category_predicate_matches_kind() {
        let mut field = FieldDef::new("global_category", "field_1", FieldKind::String);
        assert!(!field.is_category());

        field.kind = "category".parse().unwrap();
        assert!(field.is_category());

        field.kind = "Category".parse().unwrap();
        assert!(field.is_category());

        field.kind = "string".parse().unwrap();
        assert!(!field.is_category());
    }

    #[test]
    fn field_kind_parse_is_case_insensitive() {
        assert_eq!("CATEGORY".parse::<FieldKind>().unwrap(), FieldKind::Category);
        assert_eq!("Date".parse::<FieldKind>().unwrap(), FieldKind::Date);
        assert!(matches!(
            "file".parse::<FieldKind>(),
            Err(FieldsError::UnknownFieldKind { .. })
        ));
    }

    #[test]
    fn field_kind_serializes_lowercase() {
        let yaml = serde_yaml_ng::to_string(&FieldKind::Category).unwrap();
        assert_eq!(yaml.trim(), "category");
        let parsed: FieldKind = serde_yaml_ng::from_str("Category").unwrap();
        assert_eq!(parsed, FieldKind::Category);
    }

    #[test]
    fn accessor_name_from_label() {
        let mut field = FieldDef::new("global_category", "field_1", FieldKind::Category);
        assert_eq!(field.accessor_name(), "global_category");

        field.label = "Global Category".into();
        assert_eq!(field.accessor_name(), "global_category");

        field.label = "  Project -- Phase (2) ".into();
        assert_eq!(field.accessor_name(), "project_phase_2");
    }

    #[test]
    fn category_field_yaml_round_trip() {
        let field = category_field();
        let yaml = serde_yaml_ng::to_string(&field).unwrap();
        assert!(yaml.contains("kind: category"));
        let parsed: FieldDef = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(field, parsed);
        assert_eq!(
            parsed.category_items.ordered_names(),
            vec!["Maintenance", "Design", "Development"]
        );
    }

    #[test]
    fn non_category_field_omits_items() {
        let field = FieldDef::new("Summary", "field_2", FieldKind::Text);
        let yaml = serde_yaml_ng::to_string(&field).unwrap();
        assert!(!yaml.contains("category_items"));
        assert!(!yaml.contains("hint"));
    }

    #[test]
    fn field_def_from_yaml_accepts_capitalized_kind() {
        let yaml_input = r#"
id: 00000000000000000000000001
label: global_category
name: field_1
kind: Category
category_items:
  - name: Development
    id: 0000000000000000000000001A
    position: 2
  - name: Design
    id: 0000000000000000000000001B
    position: 1
"#;
        let field: FieldDef = serde_yaml_ng::from_str(yaml_input).unwrap();
        assert!(field.is_category());
        assert!(!field.required);
        assert_eq!(
            field.category_items.ordered_names(),
            vec!["Design", "Development"]
        );
    }

    #[test]
    fn validate_accepts_well_formed_category() {
        assert!(category_field().validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_item_name() {
        let mut field = category_field();
        field.category_items.build("  ", ItemId::new(), 3);
        let err = field.validate().unwrap_err();
        assert!(err.to_string().contains("category item name"));
    }

    #[test]
    fn validate_rejects_missing_label_or_storage() {
        let field = FieldDef::new("--", "field_1", FieldKind::String);
        assert!(field.validate().is_err());

        let field = FieldDef::new("Summary", "", FieldKind::String);
        assert!(field.validate().is_err());
    }

    #[test]
    fn blank_item_names_ignored_for_non_category() {
        let mut field = FieldDef::new("Summary", "field_2", FieldKind::String);
        field.category_items.build("", ItemId::new(), 0);
        assert!(field.validate().is_ok());
    }

    #[test]
    fn entity_def_yaml_round_trip() {
        let entity = EntityDef {
            name: "project".into(),
            fields: vec!["global_category".into(), "summary".into()],
        };
        let yaml = serde_yaml_ng::to_string(&entity).unwrap();
        let parsed: EntityDef = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(entity, parsed);
    }
}
