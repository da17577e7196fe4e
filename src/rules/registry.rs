//! Rule registry: (class, flavor) -> frozen rules.
//!
//! Populated during bootstrap, then shared read-only. Registration checks each
//! declaration against the [`Schema`] so that misspelled attribute, computed
//! or association names fail before anything is serialized.

use crate::flavor::Flavor;
use crate::rules::rule_set::{RuleSet, RuleSetBuilder};
use crate::schema::Schema;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Error type for rule declarations
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    UnknownClass(String),
    UnknownAttribute {
        class: String,
        flavor: Flavor,
        attribute: String,
    },
    UnknownComputed {
        class: String,
        flavor: Flavor,
        name: String,
    },
    UnknownAssociation {
        class: String,
        flavor: Flavor,
        association: String,
    },
    Io(String),
    Parse(String),
    AlreadyInstalled,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::UnknownClass(class) => write!(f, "Rules declared for undefined model '{}'", class),
            RuleError::UnknownAttribute { class, flavor, attribute } => write!(
                f,
                "Flavor '{}' of '{}' names unknown attribute '{}'",
                flavor, class, attribute
            ),
            RuleError::UnknownComputed { class, flavor, name } => write!(
                f,
                "Flavor '{}' of '{}' names unknown computed value '{}'",
                flavor, class, name
            ),
            RuleError::UnknownAssociation { class, flavor, association } => write!(
                f,
                "Flavor '{}' of '{}' includes unknown association '{}'",
                flavor, class, association
            ),
            RuleError::Io(msg) => write!(f, "IO error: {}", msg),
            RuleError::Parse(msg) => write!(f, "Failed to parse rule declarations: {}", msg),
            RuleError::AlreadyInstalled => write!(f, "A global rule registry is already installed"),
        }
    }
}

impl std::error::Error for RuleError {}

/// Registry of declared rules, keyed by class then flavor
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    schema: Arc<Schema>,
    rules: IndexMap<String, IndexMap<Flavor, Arc<RuleSet>>>,
}

impl RuleRegistry {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rules: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Declare the rules of `flavor` for `class`.
    ///
    /// The block receives a fresh builder. A second registration for the same
    /// (class, flavor) replaces the first.
    ///
    /// ```
    /// use flavorset::{ModelDef, RuleRegistry, Schema};
    /// use std::sync::Arc;
    ///
    /// let schema = Schema::from_models(vec![
    ///     ModelDef::new("CheckIn").with_attributes(["id", "code_name"]),
    /// ])
    /// .unwrap();
    ///
    /// let mut registry = RuleRegistry::new(Arc::new(schema));
    /// registry
    ///     .register("CheckIn", "deep", |r| {
    ///         r.only(["code_name"]);
    ///     })
    ///     .unwrap();
    /// assert!(registry.contains("CheckIn", &"deep".into()));
    /// ```
    pub fn register<F>(
        &mut self,
        class: &str,
        flavor: impl Into<Flavor>,
        block: F,
    ) -> Result<(), RuleError>
    where
        F: FnOnce(&mut RuleSetBuilder),
    {
        let mut builder = RuleSetBuilder::new();
        block(&mut builder);
        self.insert(class, flavor, builder.build())
    }

    /// Store already-built rules under (class, flavor) after validating them
    pub fn insert(
        &mut self,
        class: &str,
        flavor: impl Into<Flavor>,
        rules: RuleSet,
    ) -> Result<(), RuleError> {
        let flavor = flavor.into();
        if !self.schema.contains(class) {
            return Err(RuleError::UnknownClass(class.to_string()));
        }
        validate(&self.schema, class, &flavor, &rules)?;

        tracing::debug!("Registered flavor '{}' for {}: {}", flavor, class, rules);
        let previous = self
            .rules
            .entry(class.to_string())
            .or_default()
            .insert(flavor.clone(), Arc::new(rules));
        if previous.is_some() {
            tracing::debug!("Flavor '{}' for {} replaced an earlier declaration", flavor, class);
        }
        Ok(())
    }

    /// Exact lookup; does not consult ancestors
    pub fn lookup(&self, class: &str, flavor: &Flavor) -> Option<&Arc<RuleSet>> {
        self.rules.get(class).and_then(|flavors| flavors.get(flavor))
    }

    pub fn contains(&self, class: &str, flavor: &Flavor) -> bool {
        self.lookup(class, flavor).is_some()
    }

    /// Flavors declared directly on `class`, in registration order
    pub fn flavors_for(&self, class: &str) -> Vec<&Flavor> {
        self.rules
            .get(class)
            .map(|flavors| flavors.keys().collect())
            .unwrap_or_default()
    }

    /// All registrations as (class, flavor, rules)
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Flavor, &Arc<RuleSet>)> {
        self.rules.iter().flat_map(|(class, flavors)| {
            flavors
                .iter()
                .map(move |(flavor, rules)| (class.as_str(), flavor, rules))
        })
    }

    /// Number of (class, flavor) registrations
    pub fn len(&self) -> usize {
        self.rules.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate(schema: &Schema, class: &str, flavor: &Flavor, rules: &RuleSet) -> Result<(), RuleError> {
    let attributes = rules
        .only_attributes()
        .into_iter()
        .flatten()
        .chain(rules.except_attributes());
    for attribute in attributes {
        if !schema.has_attribute(class, attribute) {
            return Err(RuleError::UnknownAttribute {
                class: class.to_string(),
                flavor: flavor.clone(),
                attribute: attribute.clone(),
            });
        }
    }

    for name in rules.computed_names() {
        if !schema.has_computed(class, name) {
            return Err(RuleError::UnknownComputed {
                class: class.to_string(),
                flavor: flavor.clone(),
                name: name.clone(),
            });
        }
    }

    for entry in rules.includes() {
        let association = schema
            .association(class, entry.association())
            .ok_or_else(|| RuleError::UnknownAssociation {
                class: class.to_string(),
                flavor: flavor.clone(),
                association: entry.association().to_string(),
            })?;
        if let Some(nested) = entry.override_rules() {
            validate(schema, &association.target, flavor, nested)?;
        }
    }

    Ok(())
}

static GLOBAL: OnceLock<Arc<RuleRegistry>> = OnceLock::new();

/// Freeze `registry` into the process-wide slot.
///
/// Meant to be called once during application bootstrap; a second call fails
/// with [`RuleError::AlreadyInstalled`].
pub fn install_global(registry: RuleRegistry) -> Result<Arc<RuleRegistry>, RuleError> {
    let registry = Arc::new(registry);
    GLOBAL
        .set(registry.clone())
        .map_err(|_| RuleError::AlreadyInstalled)?;
    tracing::debug!("Installed global rule registry with {} declarations", registry.len());
    Ok(registry)
}

/// The process-wide registry, if one was installed
pub fn global() -> Option<Arc<RuleRegistry>> {
    GLOBAL.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelDef;

    fn registry() -> RuleRegistry {
        let schema = Schema::from_models(vec![
            ModelDef::new("User")
                .with_attributes(["id", "name", "email"])
                .with_computed(["post_count"])
                .has_many("posts", "Post"),
            ModelDef::new("Post")
                .with_attributes(["id", "title", "content"])
                .has_one("user", "User")
                .has_many("comments", "Comment"),
            ModelDef::new("Comment").with_attributes(["id", "content"]),
        ])
        .unwrap();
        RuleRegistry::new(Arc::new(schema))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = registry();
        registry
            .register("User", Flavor::Default, |r| {
                r.methods(["post_count"]).includes(["posts"]).except(["email"]);
            })
            .unwrap();

        let rules = registry.lookup("User", &Flavor::Default).unwrap();
        assert_eq!(rules.computed_names(), ["post_count"]);
        assert!(registry.lookup("User", &Flavor::named("deep")).is_none());
        assert!(registry.lookup("Post", &Flavor::Default).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = registry();
        registry
            .register("Post", Flavor::Default, |r| {
                r.only(["title"]);
            })
            .unwrap();
        registry
            .register("Post", Flavor::Default, |r| {
                r.only(["content"]);
            })
            .unwrap();

        let rules = registry.lookup("Post", &Flavor::Default).unwrap();
        let only: Vec<&String> = rules.only_attributes().unwrap().iter().collect();
        assert_eq!(only, vec!["content"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_names_fail_fast() {
        let mut registry = registry();

        let err = registry
            .register("Post", "deep", |r| {
                r.only(["headline"]);
            })
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownAttribute { ref attribute, .. } if attribute == "headline"));

        let err = registry
            .register("Post", "deep", |r| {
                r.methods(["word_count"]);
            })
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownComputed { .. }));

        let err = registry
            .register("Post", "deep", |r| {
                r.includes(["tags"]);
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Flavor 'deep' of 'Post' includes unknown association 'tags'"
        );

        let err = registry.register("Tag", "deep", |_| {}).unwrap_err();
        assert_eq!(err, RuleError::UnknownClass("Tag".to_string()));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_override_validated_against_target_class() {
        let mut registry = registry();

        registry
            .register("User", "with_comments", |r| {
                r.include_with("posts", |posts| {
                    posts.includes(["comments"]);
                });
            })
            .unwrap();

        let err = registry
            .register("User", "broken", |r| {
                r.include_with("posts", |posts| {
                    posts.methods(["post_count"]);
                });
            })
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownComputed { ref class, .. } if class == "Post"));
    }

    #[test]
    fn test_flavors_and_entries_keep_registration_order() {
        let mut registry = registry();
        registry.register("User", "with_email", |_| {}).unwrap();
        registry.register("User", Flavor::Default, |_| {}).unwrap();
        registry.register("Comment", "deep", |_| {}).unwrap();

        assert_eq!(
            registry.flavors_for("User"),
            vec![&Flavor::named("with_email"), &Flavor::Default]
        );
        assert!(registry.flavors_for("Post").is_empty());

        let entries: Vec<(&str, String)> = registry
            .entries()
            .map(|(class, flavor, _)| (class, flavor.to_string()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("User", "with_email".to_string()),
                ("User", "default".to_string()),
                ("Comment", "deep".to_string()),
            ]
        );
    }
}
