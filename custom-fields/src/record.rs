//! Host record protocol.
//!
//! Custom fields never own host records. They read and write a single
//! storage attribute through [`Record`], and obtain instances to group from a
//! [`RecordSource`] selected by scope name. [`Entity`] and [`EntitySet`] are
//! in-memory implementations for hosts without their own record type.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::FieldsError;

/// Scope used when grouping without an explicit enumerator name.
pub const DEFAULT_SCOPE: &str = "all";

/// A host record with named, dynamically typed attributes.
pub trait Record {
    /// Current value of an attribute, if any.
    fn attribute(&self, name: &str) -> Option<&Value>;

    /// Overwrite an attribute.
    fn set_attribute(&mut self, name: &str, value: Value);
}

/// The host's enumerator capability.
///
/// `scope` names the enumerator to use (`"all"`, `"ordered"`, ...). It is
/// forwarded untouched; an unsupported scope is reported through the source's
/// own error type.
pub trait RecordSource {
    type Record: Record;
    type Error;

    fn fetch(&self, scope: &str) -> Result<Vec<Self::Record>, Self::Error>;
}

/// In-memory record backed by an insertion-ordered attribute map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    attributes: IndexMap<String, Value>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attribute as a string slice, `None` if absent or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.shift_remove(name)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.attributes.iter()
    }
}

impl Record for Entity {
    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }
}

type ScopeFn = Box<dyn Fn(&[Entity]) -> Vec<Entity> + Send + Sync>;

/// In-memory [`RecordSource`] over a list of entities.
///
/// The `"all"` scope returns every entity in insertion order. Additional
/// scopes are registered with [`EntitySet::with_scope`].
#[derive(Default)]
pub struct EntitySet {
    entities: Vec<Entity>,
    scopes: HashMap<String, ScopeFn>,
}

impl EntitySet {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            scopes: HashMap::new(),
        }
    }

    /// Register a named enumerator.
    pub fn with_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&[Entity]) -> Vec<Entity> + Send + Sync + 'static,
    {
        self.scopes.insert(name.into(), Box::new(scope));
        self
    }

    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }
}

impl fmt::Debug for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySet")
            .field("entities", &self.entities)
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RecordSource for EntitySet {
    type Record = Entity;
    type Error = FieldsError;

    fn fetch(&self, scope: &str) -> Result<Vec<Entity>, FieldsError> {
        if let Some(f) = self.scopes.get(scope) {
            let records = f(&self.entities);
            debug!(scope, count = records.len(), "fetched entities");
            return Ok(records);
        }
        if scope == DEFAULT_SCOPE {
            return Ok(self.entities.clone());
        }
        Err(FieldsError::UnknownScope {
            scope: scope.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects() -> Vec<Entity> {
        vec![
            Entity::new().with("name", "Locomotive CMS"),
            Entity::new().with("name", "Ruby on Rails"),
            Entity::new().with("name", "Dribble"),
        ]
    }

    #[test]
    fn entity_attributes() {
        let mut entity = Entity::new().with("name", "Dribble");
        assert_eq!(entity.get_str("name"), Some("Dribble"));
        assert_eq!(entity.get("missing"), None);

        entity.set_attribute("field_1", Value::from("x"));
        assert_eq!(entity.attribute("field_1"), Some(&Value::from("x")));

        assert_eq!(entity.remove("field_1"), Some(Value::from("x")));
        assert_eq!(entity.attribute("field_1"), None);
    }

    #[test]
    fn entity_serializes_as_plain_map() {
        let entity = Entity::new().with("name", "Dribble").with("field_1", Value::Null);
        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(json, r#"{"name":"Dribble","field_1":null}"#);
    }

    #[test]
    fn all_scope_returns_everything_in_order() {
        let set = EntitySet::new(projects());
        let names: Vec<_> = set
            .fetch(DEFAULT_SCOPE)
            .unwrap()
            .iter()
            .map(|e| e.get_str("name").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Locomotive CMS", "Ruby on Rails", "Dribble"]);
    }

    #[test]
    fn custom_scope_is_used() {
        let set = EntitySet::new(projects()).with_scope("ordered", |all| {
            let mut sorted = all.to_vec();
            sorted.sort_by(|a, b| a.get_str("name").cmp(&b.get_str("name")));
            sorted
        });
        let first = set.fetch("ordered").unwrap();
        assert_eq!(first[0].get_str("name"), Some("Dribble"));
    }

    #[test]
    fn unknown_scope_errors() {
        let set = EntitySet::new(projects());
        let err = set.fetch("archived").unwrap_err();
        assert!(matches!(err, FieldsError::UnknownScope { ref scope } if scope == "archived"));
    }
}
