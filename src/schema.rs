//! Model class catalogue.
//!
//! The schema describes the model classes whose instances get serialized:
//! their attributes, associations, computed value names and single-parent
//! inheritance. The resolver walks [`Schema::ancestors`] to find inherited
//! rules, and the projector asks it for attribute sets and polymorphism.
//!
//! ```yaml
//! models:
//!   - name: Post
//!     attributes: [id, title, content]
//!     associations:
//!       - name: user
//!         target: User
//!         cardinality: one
//!   - name: BlogPost
//!     parent: Post
//! ```

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Error type for schema construction and loading
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    Io(String),
    Parse(String),
    InvalidName { kind: &'static str, name: String },
    DuplicateModel(String),
    UnknownParent { model: String, parent: String },
    InheritanceCycle(Vec<String>),
    UnknownTarget { model: String, association: String, target: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io(msg) => write!(f, "IO error: {}", msg),
            SchemaError::Parse(msg) => write!(f, "Failed to parse schema: {}", msg),
            SchemaError::InvalidName { kind, name } => {
                write!(f, "Invalid {} name '{}'", kind, name)
            }
            SchemaError::DuplicateModel(name) => write!(f, "Model '{}' is defined twice", name),
            SchemaError::UnknownParent { model, parent } => {
                write!(f, "Model '{}' extends undefined model '{}'", model, parent)
            }
            SchemaError::InheritanceCycle(models) => {
                write!(f, "Inheritance cycle detected involving models: {:?}", models)
            }
            SchemaError::UnknownTarget { model, association, target } => write!(
                f,
                "Association '{}.{}' targets undefined model '{}'",
                model, association, target
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// How many entities an association yields
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one entity (belongs_to / has_one)
    #[serde(alias = "single")]
    One,
    /// An ordered sequence of entities (has_many)
    #[serde(alias = "collection")]
    Many,
}

/// A named association from one model to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AssociationDef {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
}

/// Definition of one model class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
    #[serde(default)]
    pub computed: Vec<String>,
    /// Instances of this model (and its subclasses) carry a type tag
    #[serde(default)]
    pub polymorphic: bool,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            attributes: Vec::new(),
            associations: Vec::new(),
            computed: Vec::new(),
            polymorphic: false,
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_computed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.computed.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn has_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_association(name, target, Cardinality::One)
    }

    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.with_association(name, target, Cardinality::Many)
    }

    pub fn with_association(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.associations.push(AssociationDef {
            name: name.into(),
            target: target.into(),
            cardinality,
        });
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    models: Vec<ModelDef>,
}

// Model, attribute, computed and association names; constant pattern
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

fn check_name(kind: &'static str, name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName { kind, name: name.to_string() })
    }
}

/// Validated catalogue of model classes
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: IndexMap<String, ModelDef>,
}

impl Schema {
    /// Build a schema, checking names, parents, inheritance cycles and
    /// association targets.
    pub fn from_models(models: Vec<ModelDef>) -> Result<Self, SchemaError> {
        let mut by_name = IndexMap::new();

        for model in models {
            check_name("model", &model.name)?;
            for attribute in &model.attributes {
                check_name("attribute", attribute)?;
            }
            for computed in &model.computed {
                check_name("computed value", computed)?;
            }
            for association in &model.associations {
                check_name("association", &association.name)?;
            }
            if by_name.contains_key(&model.name) {
                return Err(SchemaError::DuplicateModel(model.name));
            }
            by_name.insert(model.name.clone(), model);
        }

        let schema = Self { models: by_name };
        schema.check_references()?;
        Ok(schema)
    }

    /// Load a schema from a YAML file with a top-level `models` list.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| SchemaError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile =
            serde_yaml::from_str(yaml).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_models(file.models)
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        for model in self.models.values() {
            if let Some(parent) = &model.parent {
                if !self.models.contains_key(parent) {
                    return Err(SchemaError::UnknownParent {
                        model: model.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            for association in &model.associations {
                if !self.models.contains_key(&association.target) {
                    return Err(SchemaError::UnknownTarget {
                        model: model.name.clone(),
                        association: association.name.clone(),
                        target: association.target.clone(),
                    });
                }
            }
        }

        for name in self.models.keys() {
            let mut seen = HashSet::new();
            let mut current = Some(name.as_str());
            while let Some(class) = current {
                if !seen.insert(class) {
                    let mut involved: Vec<String> = seen.into_iter().map(String::from).collect();
                    involved.sort();
                    return Err(SchemaError::InheritanceCycle(involved));
                }
                current = self.models.get(class).and_then(|m| m.parent.as_deref());
            }
        }

        Ok(())
    }

    pub fn model(&self, name: &str) -> Option<&ModelDef> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Model names in declaration order
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The class followed by its parent, grandparent, and so on.
    ///
    /// Unknown classes yield a chain containing only themselves.
    pub fn ancestors<'a>(&'a self, class: &'a str) -> Vec<&'a str> {
        let mut chain = vec![class];
        let mut current = self.models.get(class).and_then(|m| m.parent.as_deref());
        while let Some(parent) = current {
            chain.push(parent);
            current = self.models.get(parent).and_then(|m| m.parent.as_deref());
        }
        chain
    }

    /// True when `class` is `ancestor` or inherits from it
    pub fn is_kind_of(&self, class: &str, ancestor: &str) -> bool {
        self.ancestors(class).contains(&ancestor)
    }

    /// Full attribute set: inherited attributes first, then the class's own.
    pub fn attribute_names(&self, class: &str) -> IndexSet<String> {
        let mut names = IndexSet::new();
        for model in self.lineage(class) {
            names.extend(model.attributes.iter().cloned());
        }
        names
    }

    /// Find an association declared on the class or an ancestor
    pub fn association(&self, class: &str, name: &str) -> Option<&AssociationDef> {
        self.ancestors(class)
            .into_iter()
            .filter_map(|c| self.models.get(c))
            .find_map(|m| m.associations.iter().find(|a| a.name == name))
    }

    pub fn has_attribute(&self, class: &str, name: &str) -> bool {
        self.lineage(class).any(|m| m.attributes.iter().any(|a| a == name))
    }

    pub fn has_computed(&self, class: &str, name: &str) -> bool {
        self.lineage(class).any(|m| m.computed.iter().any(|c| c == name))
    }

    /// A class takes part in a polymorphic hierarchy when it or an ancestor
    /// is declared polymorphic.
    pub fn is_polymorphic(&self, class: &str) -> bool {
        self.lineage(class).any(|m| m.polymorphic)
    }

    /// Known models from the root ancestor down to `class`
    fn lineage<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ModelDef> + 'a {
        self.ancestors(class)
            .into_iter()
            .rev()
            .filter_map(move |c| self.models.get(c))
    }
}
