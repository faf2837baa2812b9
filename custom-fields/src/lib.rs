//! Custom fields for host data models
//!
//! `custom-fields` lets a host entity type be extended at configuration time
//! with typed fields. Each field kind contributes a behavior bundle; the
//! category kind maps item names onto ids stored in a single attribute and
//! groups host records by item.
//!
//! # Architecture
//!
//! - **Dispatch by kind**: `FieldKind::install_on` turns a `FieldDef` into a `FieldBehavior`
//! - **Explicit registration**: a `Klass` holds the behaviors installed on one host type
//! - **Host-owned records**: values are read and written through the `Record` trait,
//!   instances are enumerated through a `RecordSource` chosen by scope name
//! - **YAML on disk**: `FieldsContext` persists one `.yaml` file per field definition,
//!   keyed by an accessor name no two fields may share

pub mod category;
pub mod context;
pub mod error;
pub mod extend;
pub mod record;
pub mod types;

pub use category::{CategoryItem, CategoryItems, ItemId};
pub use context::FieldsContext;
pub use error::{FieldsError, Result};
pub use extend::{CategoryAccessor, CategoryMethods, FieldBehavior, Group, Klass, PlainAccessor};
pub use record::{Entity, EntitySet, Record, RecordSource, DEFAULT_SCOPE};
pub use types::{EntityDef, FieldDef, FieldKind};
