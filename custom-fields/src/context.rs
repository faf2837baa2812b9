//! On-disk registry of custom field definitions and entity templates.
//!
//! Each field lives in `definitions/<accessor>.yaml` and each entity template
//! in `entities/<name>.yaml`. An accessor name belongs to at most one field:
//! it names the file on disk and the methods a [`Klass`] synthesizes, so a
//! second field claiming it is rejected rather than allowed to shadow the first.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::extend::Klass;
use crate::types::{EntityDef, FieldDef};

const DEFINITIONS: &str = "definitions";
const ENTITIES: &str = "entities";

/// Field definitions and entity templates backed by a directory of YAML files.
///
/// ```text
/// <root>/
///   definitions/    one .yaml per field, named by accessor
///   entities/       one .yaml per entity template
/// ```
#[derive(Debug)]
pub struct FieldsContext {
    root: PathBuf,
    fields: IndexMap<Ulid, FieldDef>,
    entities: IndexMap<String, EntityDef>,
}

impl FieldsContext {
    /// Open a registry directory, creating it if needed, and load its contents.
    ///
    /// Files are read in path order. Unparseable or invalid definitions are
    /// skipped with a warning, as is any definition whose id or accessor name
    /// was already claimed by an earlier file.
    ///
    /// ```rust,ignore
    /// let ctx = FieldsContext::load(path).await?;
    /// let project = ctx.klass_for_entity("project")?;
    /// ```
    pub async fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(DEFINITIONS)).await?;
        fs::create_dir_all(root.join(ENTITIES)).await?;

        let mut ctx = Self {
            root,
            fields: IndexMap::new(),
            entities: IndexMap::new(),
        };

        for (path, def) in read_yaml_dir::<FieldDef>(&ctx.root.join(DEFINITIONS)).await? {
            if ctx.fields.contains_key(&def.id) {
                warn!(?path, id = %def.id, "skipping field definition with duplicate id");
                continue;
            }
            if let Err(e) = def.validate().and_then(|()| ctx.ensure_unclaimed(&def)) {
                warn!(?path, %e, "skipping field definition");
                continue;
            }
            ctx.fields.insert(def.id, def);
        }
        for (_, def) in read_yaml_dir::<EntityDef>(&ctx.root.join(ENTITIES)).await? {
            ctx.entities.insert(def.name.clone(), def);
        }

        debug!(
            root = ?ctx.root,
            fields = ctx.fields.len(),
            entities = ctx.entities.len(),
            "fields context loaded"
        );
        Ok(ctx)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a field definition by accessor name.
    pub fn field(&self, accessor: &str) -> Result<&FieldDef> {
        self.holder(accessor)
            .ok_or_else(|| FieldsError::FieldNotFound {
                name: accessor.to_string(),
            })
    }

    pub fn field_by_id(&self, id: &Ulid) -> Option<&FieldDef> {
        self.fields.get(id)
    }

    /// All field definitions, in load then write order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// Validate and persist a field definition, creating or replacing it by id.
    ///
    /// Fails with [`FieldsError::DuplicateFieldName`] when a different field
    /// already holds the accessor name; nothing is written in that case. A
    /// relabeled field moves to its new file.
    pub async fn write_field(&mut self, def: &FieldDef) -> Result<()> {
        def.validate()?;
        self.ensure_unclaimed(def)?;

        let accessor = def.accessor_name();
        let yaml = serde_yaml_ng::to_string(def)?;
        atomic_write(&self.definition_path(&accessor), yaml.as_bytes()).await?;

        if let Some(previous) = self.fields.insert(def.id, def.clone()) {
            let previous_accessor = previous.accessor_name();
            if previous_accessor != accessor {
                remove_if_present(&self.definition_path(&previous_accessor)).await?;
                debug!(from = %previous_accessor, to = %accessor, "relabeled field");
            }
        } else {
            debug!(field = %accessor, id = %def.id, "added field");
        }
        Ok(())
    }

    /// Remove a field definition and its file, returning the removed definition.
    pub async fn remove_field(&mut self, id: &Ulid) -> Result<FieldDef> {
        let def = self
            .fields
            .shift_remove(id)
            .ok_or_else(|| FieldsError::FieldNotFoundById { id: id.to_string() })?;
        remove_if_present(&self.definition_path(&def.accessor_name())).await?;
        debug!(field = %def.accessor_name(), %id, "removed field");
        Ok(def)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    /// Persist an entity template, creating or replacing it by name.
    pub async fn write_entity(&mut self, def: &EntityDef) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(def)?;
        atomic_write(&self.entity_path(&def.name), yaml.as_bytes()).await?;
        self.entities.insert(def.name.clone(), def.clone());
        Ok(())
    }

    /// Build the host type descriptor for an entity template.
    ///
    /// Every member accessor must resolve to a registered field.
    pub fn klass_for_entity(&self, name: &str) -> Result<Klass> {
        let entity = self
            .entities
            .get(name)
            .ok_or_else(|| FieldsError::EntityNotFound {
                name: name.to_string(),
            })?;
        let fields = entity
            .fields
            .iter()
            .map(|accessor| self.field(accessor))
            .collect::<Result<Vec<_>>>()?;
        Ok(Klass::with_custom_fields(name, fields))
    }

    fn holder(&self, accessor: &str) -> Option<&FieldDef> {
        self.fields
            .values()
            .find(|field| field.accessor_name() == accessor)
    }

    fn ensure_unclaimed(&self, def: &FieldDef) -> Result<()> {
        let accessor = def.accessor_name();
        match self.holder(&accessor) {
            Some(other) if other.id != def.id => {
                Err(FieldsError::DuplicateFieldName { name: accessor })
            }
            _ => Ok(()),
        }
    }

    fn definition_path(&self, accessor: &str) -> PathBuf {
        self.root.join(DEFINITIONS).join(format!("{accessor}.yaml"))
    }

    fn entity_path(&self, name: &str) -> PathBuf {
        self.root.join(ENTITIES).join(format!("{name}.yaml"))
    }
}

/// Parse every `.yaml` file in a directory, sorted by path.
async fn read_yaml_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(PathBuf, T)>> {
    let mut paths = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "yaml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut parsed = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path).await?;
        match serde_yaml_ng::from_str(&content) {
            Ok(value) => parsed.push((path, value)),
            Err(e) => warn!(?path, %e, "skipping unreadable yaml"),
        }
    }
    Ok(parsed)
}

/// Write to a sibling temp file, then rename over the target.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
