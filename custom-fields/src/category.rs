//! Category items: the ordered name/identifier pairs of a category field.
//!
//! A category field stores an opaque [`ItemId`] on the record and exposes the
//! matching item name to callers. [`CategoryItems`] keeps its items sorted by
//! `position` at all times, so every traversal (names listing, lookups,
//! grouping) sees the same order.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Identifier stored on a record for a chosen category item.
///
/// Opaque to this crate: hosts may use ULIDs, BSON object ids or any other
/// string token. Identifiers match by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh ULID-backed identifier
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an identifier out of a stored attribute value.
    ///
    /// Strings are taken verbatim and integers by their decimal form. Null,
    /// booleans and structured values yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// The attribute value written to a record's storage attribute
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Ulid> for ItemId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single named choice of a category field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryItem {
    pub name: String,
    pub id: ItemId,
    #[serde(default)]
    pub position: i32,
}

/// Items of a category field, always ordered by ascending `position`.
///
/// Items sharing a position keep their insertion order. Names and ids are
/// not required to be unique; lookups return the first match in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryItems {
    items: Vec<CategoryItem>,
}

impl CategoryItems {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Construct an item and add it to the collection.
    pub fn build(&mut self, name: impl Into<String>, id: ItemId, position: i32) -> &CategoryItem {
        self.push(CategoryItem {
            name: name.into(),
            id,
            position,
        })
    }

    /// Add an existing item, placing it after every item with a position
    /// less than or equal to its own.
    pub fn push(&mut self, item: CategoryItem) -> &CategoryItem {
        let idx = self.items.partition_point(|i| i.position <= item.position);
        self.items.insert(idx, item);
        &self.items[idx]
    }

    /// Items in position order.
    pub fn iter(&self) -> std::slice::Iter<'_, CategoryItem> {
        self.items.iter()
    }

    /// Item names in position order.
    pub fn ordered_names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }

    /// Identifier of the first item whose name matches exactly.
    pub fn id_for_name(&self, name: &str) -> Option<&ItemId> {
        self.items.iter().find(|i| i.name == name).map(|i| &i.id)
    }

    /// Name of the first item carrying this identifier.
    pub fn name_for_id(&self, id: &ItemId) -> Option<&str> {
        self.index_of(id).map(|idx| self.items[idx].name.as_str())
    }

    /// Position-order index of the first item carrying this identifier.
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a CategoryItems {
    type Item = &'a CategoryItem;
    type IntoIter = std::slice::Iter<'a, CategoryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<CategoryItem> for CategoryItems {
    fn from_iter<T: IntoIterator<Item = CategoryItem>>(iter: T) -> Self {
        let mut items: Vec<CategoryItem> = iter.into_iter().collect();
        // stable, so equal positions keep their incoming order
        items.sort_by_key(|i| i.position);
        Self { items }
    }
}

impl<'de> Deserialize<'de> for CategoryItems {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<CategoryItem>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
