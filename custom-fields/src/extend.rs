//! Behavior bundles installed on host types by custom field definitions.
//!
//! Each [`FieldKind`] turns a [`FieldDef`] into a [`FieldBehavior`]: a set of
//! named operations the host registers on its record type. A [`Klass`] is
//! the host type descriptor holding those registrations.
//!
//! Category fields expose items by name while storing item ids:
//!
//! ```rust,ignore
//! let mut klass = Klass::new("project");
//! klass.apply(&field);
//!
//! let category = klass.category("global_category").unwrap();
//! category.set(&mut project, "Design");
//! assert_eq!(category.get(&project), Some("Design"));
//!
//! let groups = category.group_by(&projects)?;
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

use crate::category::{CategoryItems, ItemId};
use crate::record::{Record, RecordSource, DEFAULT_SCOPE};
use crate::types::{FieldDef, FieldKind};

impl FieldKind {
    /// Build the behavior bundle this kind contributes for `field`.
    pub fn install_on(self, field: &FieldDef) -> FieldBehavior {
        match self {
            FieldKind::Category => FieldBehavior::Category(CategoryAccessor::for_field(field)),
            FieldKind::String | FieldKind::Text | FieldKind::Boolean | FieldKind::Date => {
                FieldBehavior::Plain(PlainAccessor::for_field(field))
            }
        }
    }
}

/// Operations a field definition contributes to a host type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBehavior {
    Plain(PlainAccessor),
    Category(CategoryAccessor),
}

impl FieldBehavior {
    pub fn accessor_name(&self) -> &str {
        match self {
            FieldBehavior::Plain(a) => &a.accessor,
            FieldBehavior::Category(a) => &a.accessor,
        }
    }

    pub fn storage_name(&self) -> &str {
        match self {
            FieldBehavior::Plain(a) => &a.storage,
            FieldBehavior::Category(a) => &a.storage,
        }
    }

    pub fn as_category(&self) -> Option<&CategoryAccessor> {
        match self {
            FieldBehavior::Category(a) => Some(a),
            FieldBehavior::Plain(_) => None,
        }
    }

    /// Whether this bundle defines a method with the given name.
    pub fn responds_to(&self, method: &str) -> bool {
        match self {
            FieldBehavior::Plain(a) => {
                method == a.accessor || method.strip_suffix('=') == Some(a.accessor.as_str())
            }
            FieldBehavior::Category(a) => a.methods().contains(method),
        }
    }
}

/// Pass-through accessor: reads and writes the storage attribute as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainAccessor {
    accessor: String,
    storage: String,
}

impl PlainAccessor {
    pub fn for_field(field: &FieldDef) -> Self {
        Self {
            accessor: field.accessor_name(),
            storage: field.name.clone(),
        }
    }

    pub fn get<'r, R: Record + ?Sized>(&self, record: &'r R) -> Option<&'r Value> {
        record.attribute(&self.storage)
    }

    pub fn set<R: Record + ?Sized>(&self, record: &mut R, value: Value) {
        record.set_attribute(&self.storage, value);
    }
}

/// Method names a category field adds to its host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMethods {
    /// `<label>`
    pub getter: String,
    /// `<label>=`
    pub setter: String,
    /// `<label>_names`
    pub names: String,
    /// `group_by_<label>`
    pub group_by: String,
    /// Attribute the accessors delegate to
    pub storage: String,
}

impl CategoryMethods {
    pub fn contains(&self, method: &str) -> bool {
        [&self.getter, &self.setter, &self.names, &self.group_by]
            .iter()
            .any(|m| m.as_str() == method)
    }
}

/// One bucket of a category grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<R> {
    pub name: String,
    pub items: Vec<R>,
}

/// Name-based accessors over an id-valued storage attribute.
///
/// Holds its own copy of the field's items, so a changed definition must be
/// applied again to take effect.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAccessor {
    accessor: String,
    storage: String,
    items: CategoryItems,
}

impl CategoryAccessor {
    /// Extend for a category field. Any other kind yields `None`.
    pub fn install(field: &FieldDef) -> Option<Self> {
        field.is_category().then(|| Self::for_field(field))
    }

    fn for_field(field: &FieldDef) -> Self {
        Self {
            accessor: field.accessor_name(),
            storage: field.name.clone(),
            items: field.category_items.clone(),
        }
    }

    pub fn accessor_name(&self) -> &str {
        &self.accessor
    }

    pub fn storage_name(&self) -> &str {
        &self.storage
    }

    pub fn items(&self) -> &CategoryItems {
        &self.items
    }

    pub fn methods(&self) -> CategoryMethods {
        CategoryMethods {
            getter: self.accessor.clone(),
            setter: format!("{}=", self.accessor),
            names: format!("{}_names", self.accessor),
            group_by: format!("group_by_{}", self.accessor),
            storage: self.storage.clone(),
        }
    }

    /// Name of the item stored on `record`.
    ///
    /// `None` when the attribute is absent, null, not an id, or an id no
    /// item carries.
    pub fn get<R: Record + ?Sized>(&self, record: &R) -> Option<&str> {
        let id = record.attribute(&self.storage).and_then(ItemId::from_value)?;
        self.items.name_for_id(&id)
    }

    /// Store the id of the item called `name` on `record`.
    ///
    /// Returns `false` and leaves the storage attribute untouched when no
    /// item has that name.
    pub fn set<R: Record + ?Sized>(&self, record: &mut R, name: &str) -> bool {
        match self.items.id_for_name(name) {
            Some(id) => {
                record.set_attribute(&self.storage, id.to_value());
                true
            }
            None => {
                debug!(
                    field = %self.accessor,
                    name,
                    "ignoring unknown category name"
                );
                false
            }
        }
    }

    /// Item names in position order.
    pub fn names(&self) -> Vec<&str> {
        self.items.ordered_names()
    }

    /// Group every record from the `"all"` scope by category.
    pub fn group_by<S>(&self, source: &S) -> Result<Vec<Group<S::Record>>, S::Error>
    where
        S: RecordSource + ?Sized,
        S::Record: Clone,
    {
        self.group_by_scope(source, DEFAULT_SCOPE)
    }

    /// Group the records returned by `scope` by category.
    ///
    /// Yields exactly one group per item, in position order, keeping empty
    /// groups. Records keep their fetched order inside a group. A record
    /// joins the group of every item carrying its stored id, so items that
    /// share an id receive the same records. Records whose stored id matches
    /// no item are left out.
    pub fn group_by_scope<S>(
        &self,
        source: &S,
        scope: &str,
    ) -> Result<Vec<Group<S::Record>>, S::Error>
    where
        S: RecordSource + ?Sized,
        S::Record: Clone,
    {
        let records = source.fetch(scope)?;
        let total = records.len();

        let mut slots: HashMap<&ItemId, Vec<usize>> = HashMap::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            slots.entry(&item.id).or_default().push(idx);
        }

        let mut groups: Vec<Group<S::Record>> = self
            .items
            .iter()
            .map(|item| Group {
                name: item.name.clone(),
                items: Vec::new(),
            })
            .collect();

        let mut ungrouped = 0usize;
        for record in records {
            let targets = record
                .attribute(&self.storage)
                .and_then(ItemId::from_value)
                .and_then(|id| slots.get(&id));
            let Some((&last, rest)) = targets.and_then(|t| t.split_last()) else {
                ungrouped += 1;
                continue;
            };
            for &idx in rest {
                groups[idx].items.push(record.clone());
            }
            groups[last].items.push(record);
        }

        debug!(
            field = %self.accessor,
            scope,
            total,
            ungrouped,
            groups = groups.len(),
            "grouped records by category"
        );
        Ok(groups)
    }
}

/// Descriptor of a host type extended with custom fields.
///
/// Behaviors are keyed by field id, so applying an edited definition replaces
/// the previous installation instead of adding a second one.
#[derive(Debug, Clone, Default)]
pub struct Klass {
    name: String,
    behaviors: IndexMap<Ulid, FieldBehavior>,
}

impl Klass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviors: IndexMap::new(),
        }
    }

    /// A type with every given field applied in order.
    pub fn with_custom_fields<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = &'a FieldDef>,
    ) -> Self {
        let mut klass = Self::new(name);
        for field in fields {
            klass.apply(field);
        }
        klass
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install (or regenerate) the behavior of `field`.
    ///
    /// A different field already using the same accessor name is displaced.
    pub fn apply(&mut self, field: &FieldDef) {
        let behavior = field.kind.install_on(field);

        match self.behaviors.get(&field.id) {
            Some(existing) if *existing == behavior => {
                debug!(klass = %self.name, field = %behavior.accessor_name(), "custom field unchanged");
                return;
            }
            Some(existing) => {
                debug!(
                    klass = %self.name,
                    from = %existing.accessor_name(),
                    to = %behavior.accessor_name(),
                    "regenerating custom field"
                );
            }
            None => {
                debug!(
                    klass = %self.name,
                    field = %behavior.accessor_name(),
                    kind = %field.kind,
                    storage = %field.name,
                    "installing custom field"
                );
            }
        }

        let accessor = behavior.accessor_name().to_string();
        self.behaviors
            .retain(|id, b| *id == field.id || b.accessor_name() != accessor);
        self.behaviors.insert(field.id, behavior);
    }

    /// Remove the behavior installed for a field id.
    pub fn remove(&mut self, field_id: &Ulid) -> Option<FieldBehavior> {
        self.behaviors.shift_remove(field_id)
    }

    pub fn behavior(&self, accessor: &str) -> Option<&FieldBehavior> {
        self.behaviors
            .values()
            .find(|b| b.accessor_name() == accessor)
    }

    /// Category accessors installed under `accessor`.
    pub fn category(&self, accessor: &str) -> Option<&CategoryAccessor> {
        self.behavior(accessor).and_then(FieldBehavior::as_category)
    }

    /// Accessor names in installation order.
    pub fn accessor_names(&self) -> Vec<&str> {
        self.behaviors.values().map(|b| b.accessor_name()).collect()
    }

    /// Whether any installed behavior defines `method`.
    pub fn responds_to(&self, method: &str) -> bool {
        self.behaviors.values().any(|b| b.responds_to(method))
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}
