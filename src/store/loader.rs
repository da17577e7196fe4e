//! YAML data files for the in-memory store.
//!
//! ```yaml
//! computed:
//!   User:
//!     post_count: { count: posts }
//! records:
//!   - class: User
//!     id: 1
//!     attributes: { name: John User, email: john@example.com }
//!     links:
//!       posts: [1, "BlogPost#2"]
//!   - class: Post
//!     id: 1
//!     attributes: { title: Hello World! }
//!     links:
//!       user: 1
//! ```
//!
//! Link targets are ids of the association's target class, or `Class#id`
//! for records of a subclass.

use crate::schema::{Cardinality, Schema};
use crate::store::computed::Derivation;
use crate::store::memory::{Link, MemoryStore, Record, RecordKey};
use crate::store::StoreError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    pub class: String,
    pub id: YamlValue,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub links: IndexMap<String, YamlValue>,
}

/// Parsed data file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataFile {
    /// Derivations are written as single-key maps, e.g. `{ count: posts }`
    #[serde(default, deserialize_with = "serde_yaml::with::singleton_map_recursive::deserialize")]
    pub computed: IndexMap<String, IndexMap<String, Derivation>>,
    #[serde(default)]
    pub records: Vec<RecordDecl>,
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_reference(value: &YamlValue, target_class: &str) -> Result<RecordKey, StoreError> {
    let text = scalar_to_string(value)
        .ok_or_else(|| StoreError::Parse(format!("Invalid record reference: {:?}", value)))?;
    Ok(match text.split_once('#') {
        Some((class, id)) => RecordKey::new(class, id),
        None => RecordKey::new(target_class, text),
    })
}

impl DataFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StoreError> {
        serde_yaml::from_str(yaml).map_err(|e| StoreError::Parse(e.to_string()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    /// Build a store from this file: insert every record, register the
    /// declared derivations and check that all links resolve.
    pub fn into_store(self, schema: Arc<Schema>) -> Result<MemoryStore, StoreError> {
        let mut store = MemoryStore::new(schema.clone());

        for decl in self.records {
            let record = Self::to_record(&schema, decl)?;
            store.insert(record)?;
        }

        for (class, derivations) in self.computed {
            if !schema.contains(&class) {
                return Err(StoreError::UnknownClass(class));
            }
            for (name, derivation) in derivations {
                if !schema.has_computed(&class, &name) {
                    return Err(StoreError::UnknownField { class, field: name });
                }
                store.register_computed(class.clone(), name, derivation.into_fn());
            }
        }

        store.check_links()?;
        tracing::debug!("Loaded {} records", store.len());
        Ok(store)
    }

    fn to_record(schema: &Schema, decl: RecordDecl) -> Result<Record, StoreError> {
        let id = scalar_to_string(&decl.id)
            .ok_or_else(|| StoreError::Parse(format!("Invalid id for {}: {:?}", decl.class, decl.id)))?;
        let mut record = Record::new(decl.class.clone(), id);
        record.attributes = decl.attributes;

        for (name, value) in &decl.links {
            let association = schema.association(&decl.class, name).ok_or_else(|| {
                StoreError::UnknownField {
                    class: decl.class.clone(),
                    field: name.clone(),
                }
            })?;
            let link = match value {
                YamlValue::Null => match association.cardinality {
                    Cardinality::One => Link::One(None),
                    Cardinality::Many => Link::Many(Vec::new()),
                },
                YamlValue::Sequence(items) => Link::Many(
                    items
                        .iter()
                        .map(|item| parse_reference(item, &association.target))
                        .collect::<Result<_, _>>()?,
                ),
                other => Link::One(Some(parse_reference(other, &association.target)?)),
            };
            record.links.insert(name.clone(), link);
        }

        Ok(record)
    }
}

impl MemoryStore {
    /// Load records and derivations from a YAML data file
    pub fn load_from_file<P: AsRef<Path>>(schema: Arc<Schema>, path: P) -> Result<Self, StoreError> {
        DataFile::load_from_file(path)?.into_store(schema)
    }
}
