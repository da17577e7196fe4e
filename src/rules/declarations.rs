//! YAML rule declarations.
//!
//! A declaration file maps class names to flavors to rule blocks:
//!
//! ```yaml
//! User:
//!   default:
//!     methods: [post_count]
//!     includes: [posts]
//!     except: [email]
//!   with_comments:
//!     includes:
//!       - posts:
//!           includes: [comments]
//! ```
//!
//! Every block goes through [`RuleRegistry::register`], so file declarations
//! get the same validation as declarations made in code.

use crate::flavor::Flavor;
use crate::rules::registry::{RuleError, RuleRegistry};
use crate::rules::rule_set::RuleSetBuilder;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One declared rule block
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    #[serde(default)]
    pub only: Option<Vec<String>>,
    #[serde(default)]
    pub except: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub includes: Vec<IncludeDecl>,
    #[serde(default)]
    pub dasherize: Option<bool>,
    #[serde(default)]
    pub skip_types: Option<bool>,
}

/// An include list item: a bare association name, or a single-key map from
/// association name to inline rules
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IncludeDecl {
    Bare(String),
    Nested(IndexMap<String, RuleDecl>),
}

/// Whole declaration file: class -> flavor -> rules
pub type Declarations = IndexMap<String, IndexMap<Flavor, RuleDecl>>;

impl RuleDecl {
    /// Replay this declaration against a builder
    pub fn apply(&self, builder: &mut RuleSetBuilder) {
        if let Some(only) = &self.only {
            builder.only(only.iter().cloned());
        }
        builder
            .except(self.except.iter().cloned())
            .methods(self.methods.iter().cloned());
        for include in &self.includes {
            match include {
                IncludeDecl::Bare(name) => {
                    builder.includes([name.clone()]);
                }
                IncludeDecl::Nested(nested) => {
                    for (name, decl) in nested {
                        builder.include_with(name.clone(), |b| decl.apply(b));
                    }
                }
            }
        }
        if let Some(dasherize) = self.dasherize {
            builder.dasherize(dasherize);
        }
        if let Some(skip_types) = self.skip_types {
            builder.skip_types(skip_types);
        }
    }
}

pub fn parse_declarations(yaml: &str) -> Result<Declarations, RuleError> {
    serde_yaml::from_str(yaml).map_err(|e| RuleError::Parse(e.to_string()))
}

impl RuleRegistry {
    /// Register every block of a parsed declaration file.
    ///
    /// Returns the number of (class, flavor) blocks registered. Stops at the
    /// first invalid block.
    pub fn register_all(&mut self, declarations: &Declarations) -> Result<usize, RuleError> {
        let mut count = 0;
        for (class, flavors) in declarations {
            for (flavor, decl) in flavors {
                self.register(class, flavor.clone(), |b| decl.apply(b))?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn load_yaml_str(&mut self, yaml: &str) -> Result<usize, RuleError> {
        let declarations = parse_declarations(yaml)?;
        self.register_all(&declarations)
    }

    /// Load declarations from a YAML file.
    ///
    /// # Example
    /// ```ignore
    /// let schema = Arc::new(Schema::load_from_file("config/examples/blog/schema.yaml")?);
    /// let mut registry = RuleRegistry::new(schema);
    /// registry.load_from_file("config/examples/blog/rules.yaml")?;
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, RuleError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| RuleError::Io(format!("{}: {}", path.display(), e)))?;
        let count = self.load_yaml_str(&contents)?;
        tracing::debug!("Loaded {} rule declarations from {}", count, path.display());
        Ok(count)
    }
}
