//! Serialization entry point.
//!
//! [`Serializer`] ties the registry, resolver and expander together:
//! it resolves the rules for the instance's class and requested flavor and
//! expands the instance with the configured depth budget.

use crate::config::SerializerConfig;
use crate::entity::{Entity, EntityError, EntityRef};
use crate::expander::GraphExpander;
use crate::flavor::Flavor;
use crate::projector::Document;
use crate::resolver::Resolver;
use crate::rules::{self, RuleRegistry};
use std::io::Write;
use std::sync::Arc;

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    Entity(EntityError),
    JsonError(serde_json::Error),
    IoError(std::io::Error),
    NoGlobalRegistry,
}

impl From<EntityError> for SerializationError {
    fn from(err: EntityError) -> Self {
        SerializationError::Entity(err)
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::Entity(e) => write!(f, "Entity error: {}", e),
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
            SerializationError::NoGlobalRegistry => write!(f, "No global rule registry installed"),
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::Entity(e) => Some(e),
            SerializationError::JsonError(e) => Some(e),
            SerializationError::IoError(e) => Some(e),
            SerializationError::NoGlobalRegistry => None,
        }
    }
}

/// Projects entities into nested documents according to declared flavors.
///
/// Cheap to clone; the registry is shared and never mutated.
#[derive(Debug, Clone)]
pub struct Serializer {
    registry: Arc<RuleRegistry>,
    config: SerializerConfig,
}

impl Serializer {
    pub fn new(registry: Arc<RuleRegistry>, config: SerializerConfig) -> Self {
        Self { registry, config }
    }

    /// Serializer over the registry installed with [`rules::install_global`]
    pub fn global(config: SerializerConfig) -> Result<Self, SerializationError> {
        let registry = rules::global().ok_or(SerializationError::NoGlobalRegistry)?;
        Ok(Self::new(registry, config))
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serialize one entity under `flavor`
    pub fn serialize(
        &self,
        entity: &dyn Entity,
        flavor: impl Into<Flavor>,
    ) -> Result<Document, SerializationError> {
        let flavor = flavor.into();
        let resolution = Resolver::new(&self.registry).resolve(entity.class_name(), &flavor);
        let expander = GraphExpander::new(&self.registry, &self.config);
        let document = expander.expand(entity, &resolution.rules, &flavor, self.config.max_depth)?;
        Ok(document)
    }

    /// Serialize several entities, keeping their order
    pub fn serialize_all(
        &self,
        entities: &[EntityRef],
        flavor: impl Into<Flavor>,
    ) -> Result<Vec<Document>, SerializationError> {
        let flavor = flavor.into();
        entities
            .iter()
            .map(|entity| self.serialize(entity.as_ref(), flavor.clone()))
            .collect()
    }

    pub fn to_json(&self, entity: &dyn Entity, flavor: impl Into<Flavor>) -> Result<String, SerializationError> {
        let document = self.serialize(entity, flavor)?;
        Ok(serde_json::to_string(&document)?)
    }

    pub fn to_json_pretty(
        &self,
        entity: &dyn Entity,
        flavor: impl Into<Flavor>,
    ) -> Result<String, SerializationError> {
        let document = self.serialize(entity, flavor)?;
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes one serialized document per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    /// Create a new NDJSON writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single document as an NDJSON line
    pub fn write(&mut self, document: &Document) -> Result<(), SerializationError> {
        let json = serde_json::to_string(document)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Serialize each entity with `serializer` and write it as a line
    pub fn write_all(
        &mut self,
        serializer: &Serializer,
        entities: &[EntityRef],
        flavor: &Flavor,
    ) -> Result<usize, SerializationError> {
        for entity in entities {
            let document = serializer.serialize(entity.as_ref(), flavor.clone())?;
            self.write(&document)?;
        }
        Ok(entities.len())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}
