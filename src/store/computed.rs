//! Computed value registry for the in-memory store.
//!
//! Computed values are registered per class and looked up along the class's
//! ancestor chain, so a subclass shares its parent's derivations unless it
//! registers its own under the same name.

use crate::entity::{Entity, EntityError};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A zero-argument derivation over an entity
pub trait ComputedFn: Send + Sync {
    fn compute(&self, entity: &dyn Entity) -> Result<Value, EntityError>;
}

impl<F> ComputedFn for F
where
    F: Fn(&dyn Entity) -> Result<Value, EntityError> + Send + Sync,
{
    fn compute(&self, entity: &dyn Entity) -> Result<Value, EntityError> {
        self(entity)
    }
}

/// Declarative derivations usable from data files.
///
/// Data files spell these as single-key maps (`{ count: posts }`), read
/// through `serde_yaml::with::singleton_map`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Number of entities behind an association
    Count(String),
    /// Value of another attribute
    Attribute(String),
    /// A fixed value
    Constant(Value),
}

impl Derivation {
    pub fn into_fn(self) -> Box<dyn ComputedFn> {
        match self {
            Derivation::Count(association) => {
                Box::new(move |entity: &dyn Entity| -> Result<Value, EntityError> {
                    let count = entity.association(&association)?.len();
                    Ok(Value::from(count))
                })
            }
            Derivation::Attribute(name) => {
                Box::new(move |entity: &dyn Entity| entity.attribute(&name))
            }
            Derivation::Constant(value) => {
                Box::new(move |_: &dyn Entity| -> Result<Value, EntityError> { Ok(value.clone()) })
            }
        }
    }
}

/// Registry of computed value functions, keyed by class then name
#[derive(Default)]
pub struct ComputedRegistry {
    functions: HashMap<String, HashMap<String, Box<dyn ComputedFn>>>,
}

impl ComputedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a computed value function
    ///
    /// # Example
    ///
    /// ```
    /// use flavorset::store::ComputedRegistry;
    /// use flavorset::{Entity, EntityError};
    /// use serde_json::Value;
    ///
    /// let mut registry = ComputedRegistry::new();
    /// registry.register("User", "display_name", Box::new(|user: &dyn Entity| -> Result<Value, EntityError> {
    ///     let name = user.attribute("name")?;
    ///     Ok(Value::String(format!("@{}", name.as_str().unwrap_or_default())))
    /// }));
    /// assert!(registry.has_computed("User", "display_name"));
    /// ```
    pub fn register(&mut self, class: impl Into<String>, name: impl Into<String>, func: Box<dyn ComputedFn>) {
        self.functions
            .entry(class.into())
            .or_default()
            .insert(name.into(), func);
    }

    /// Invoke `name` for `entity`, searching the entity's class and then its
    /// ancestors.
    pub fn call(&self, schema: &Schema, entity: &dyn Entity, name: &str) -> Result<Value, EntityError> {
        let class = entity.class_name();
        let func = schema
            .ancestors(class)
            .into_iter()
            .find_map(|c| self.functions.get(c).and_then(|fns| fns.get(name)))
            .ok_or_else(|| EntityError::UnknownComputed {
                class: class.to_string(),
                name: name.to_string(),
            })?;

        func.compute(entity)
    }

    /// Check if `class` itself registers `name`
    pub fn has_computed(&self, class: &str, name: &str) -> bool {
        self.functions
            .get(class)
            .is_some_and(|fns| fns.contains_key(name))
    }

    /// Names registered directly on `class`
    pub fn list_computed(&self, class: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .get(class)
            .map(|fns| fns.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
