//! In-memory records implementing the [`Entity`] collaborator.

use crate::entity::{Association, Entity, EntityError, EntityRef};
use crate::schema::{Cardinality, Schema};
use crate::store::computed::{ComputedFn, ComputedRegistry};
use crate::store::StoreError;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Identity of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub class: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(class: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.id)
    }
}

/// Stored association targets
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    One(Option<RecordKey>),
    Many(Vec<RecordKey>),
}

impl Link {
    fn targets(&self) -> Vec<&RecordKey> {
        match self {
            Link::One(target) => target.iter().collect(),
            Link::Many(targets) => targets.iter().collect(),
        }
    }
}

/// A stored instance: attribute values plus association links
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: RecordKey,
    pub attributes: IndexMap<String, Value>,
    pub links: IndexMap<String, Link>,
}

impl Record {
    pub fn new(class: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: RecordKey::new(class, id),
            attributes: IndexMap::new(),
            links: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_one(mut self, association: impl Into<String>, target: Option<RecordKey>) -> Self {
        self.links.insert(association.into(), Link::One(target));
        self
    }

    pub fn with_many(mut self, association: impl Into<String>, targets: Vec<RecordKey>) -> Self {
        self.links.insert(association.into(), Link::Many(targets));
        self
    }
}

/// Record store keyed by (class, id).
///
/// Built mutably, then frozen with [`into_shared`](Self::into_shared); entities
/// handed out hold an `Arc` back to the store so cyclic association graphs
/// need no ownership juggling.
pub struct MemoryStore {
    schema: Arc<Schema>,
    records: IndexMap<RecordKey, Record>,
    computed: ComputedRegistry,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            records: IndexMap::new(),
            computed: ComputedRegistry::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Add a record. Its class, attribute names and link names must exist in
    /// the schema, and link cardinality must match the association.
    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        let class = record.key.class.as_str();
        if !self.schema.contains(class) {
            return Err(StoreError::UnknownClass(class.to_string()));
        }
        for name in record.attributes.keys() {
            if name != "id" && !self.schema.has_attribute(class, name) {
                return Err(StoreError::UnknownField {
                    class: class.to_string(),
                    field: name.clone(),
                });
            }
        }
        for (name, link) in &record.links {
            let association = self.schema.association(class, name).ok_or_else(|| {
                StoreError::UnknownField {
                    class: class.to_string(),
                    field: name.clone(),
                }
            })?;
            let matches = matches!(
                (association.cardinality, link),
                (Cardinality::One, Link::One(_)) | (Cardinality::Many, Link::Many(_))
            );
            if !matches {
                return Err(StoreError::CardinalityMismatch {
                    class: class.to_string(),
                    association: name.clone(),
                });
            }
            for target in link.targets() {
                if !self.schema.is_kind_of(&target.class, &association.target) {
                    return Err(StoreError::WrongTarget {
                        class: class.to_string(),
                        association: name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        if self.records.contains_key(&record.key) {
            return Err(StoreError::DuplicateRecord(record.key.to_string()));
        }

        self.records.insert(record.key.clone(), record);
        Ok(())
    }

    pub fn register_computed(
        &mut self,
        class: impl Into<String>,
        name: impl Into<String>,
        func: Box<dyn ComputedFn>,
    ) {
        self.computed.register(class, name, func);
    }

    /// Report the first link pointing at a record that does not exist
    pub fn check_links(&self) -> Result<(), StoreError> {
        for record in self.records.values() {
            for link in record.links.values() {
                for target in link.targets() {
                    if !self.records.contains_key(target) {
                        return Err(StoreError::DanglingLink {
                            from: record.key.to_string(),
                            to: target.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys of records whose class is `class` or one of its subclasses, in
    /// insertion order
    pub fn keys_of(&self, class: &str) -> Vec<&RecordKey> {
        self.records
            .keys()
            .filter(|key| self.schema.is_kind_of(&key.class, class))
            .collect()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Entity handle for a stored record
    pub fn entity(self: &Arc<Self>, key: &RecordKey) -> Result<EntityRef, EntityError> {
        if !self.records.contains_key(key) {
            return Err(EntityError::RecordNotFound {
                class: key.class.clone(),
                id: key.id.clone(),
            });
        }
        Ok(Arc::new(StoredEntity {
            store: self.clone(),
            key: key.clone(),
        }))
    }

    /// Entity handles for every record of `class` (subclasses included)
    pub fn entities_of(self: &Arc<Self>, class: &str) -> Result<Vec<EntityRef>, EntityError> {
        self.keys_of(class)
            .into_iter()
            .map(|key| self.entity(key))
            .collect()
    }
}

/// [`Entity`] view of one stored record
pub struct StoredEntity {
    store: Arc<MemoryStore>,
    key: RecordKey,
}

impl StoredEntity {
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    fn record(&self) -> Result<&Record, EntityError> {
        self.store.record(&self.key).ok_or_else(|| EntityError::RecordNotFound {
            class: self.key.class.clone(),
            id: self.key.id.clone(),
        })
    }
}

impl Entity for StoredEntity {
    fn class_name(&self) -> &str {
        &self.key.class
    }

    /// Unset attributes known to the schema read as null; `id` falls back
    /// to the record key.
    fn attribute(&self, name: &str) -> Result<Value, EntityError> {
        let record = self.record()?;
        if let Some(value) = record.attributes.get(name) {
            return Ok(value.clone());
        }
        if name == "id" {
            return Ok(Value::String(self.key.id.clone()));
        }
        if self.store.schema.has_attribute(&self.key.class, name) {
            Ok(Value::Null)
        } else {
            Err(EntityError::UnknownAttribute {
                class: self.key.class.clone(),
                attribute: name.to_string(),
            })
        }
    }

    fn association(&self, name: &str) -> Result<Association, EntityError> {
        let definition = self
            .store
            .schema
            .association(&self.key.class, name)
            .ok_or_else(|| EntityError::UnknownAssociation {
                class: self.key.class.clone(),
                association: name.to_string(),
            })?;

        match (self.record()?.links.get(name), definition.cardinality) {
            (Some(Link::One(Some(target))), _) => Ok(Association::One(self.store.entity(target)?)),
            (Some(Link::Many(targets)), _) => targets
                .iter()
                .map(|target| self.store.entity(target))
                .collect::<Result<Vec<_>, _>>()
                .map(Association::Many),
            (Some(Link::One(None)), _) | (None, Cardinality::One) => Ok(Association::Null),
            (None, Cardinality::Many) => Ok(Association::Many(Vec::new())),
        }
    }

    fn computed(&self, name: &str) -> Result<Value, EntityError> {
        self.store.computed.call(&self.store.schema, self, name)
    }
}

impl fmt::Debug for StoredEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredEntity({})", self.key)
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("models", &self.schema.len())
            .field("records", &self.records.keys().map(ToString::to_string).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
