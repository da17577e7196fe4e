//! Inheritance-aware rule resolution.
//!
//! Lookup order is the class itself, then its parent, then the parent's
//! parent. The first class with a declaration for the requested flavor wins
//! and its rules are used verbatim. Nothing is merged across ancestors.

use crate::flavor::Flavor;
use crate::rules::{RuleRegistry, RuleSet};
use std::sync::Arc;

/// Where resolved rules came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Declared on the class itself or on the named ancestor
    Declared { class: String },
    /// Nothing declared in the hierarchy for this flavor
    Default,
}

/// Effective rules for a (class, flavor) pair
#[derive(Debug, Clone)]
pub struct Resolution {
    pub rules: Arc<RuleSet>,
    pub origin: Origin,
}

impl Resolution {
    pub fn is_declared(&self) -> bool {
        matches!(self.origin, Origin::Declared { .. })
    }
}

pub struct Resolver<'a> {
    registry: &'a RuleRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the effective rules. Never fails: an undeclared flavor yields
    /// the default rules (all attributes, nothing else). A class missing from
    /// the schema resolves the same way; projecting it is what fails.
    pub fn resolve(&self, class: &str, flavor: &Flavor) -> Resolution {
        for ancestor in self.registry.schema().ancestors(class) {
            if let Some(rules) = self.registry.lookup(ancestor, flavor) {
                tracing::debug!("Resolved flavor '{}' of {} from {}", flavor, class, ancestor);
                return Resolution {
                    rules: rules.clone(),
                    origin: Origin::Declared {
                        class: ancestor.to_string(),
                    },
                };
            }
        }

        tracing::debug!("No flavor '{}' declared for {}; using default rules", flavor, class);
        Resolution {
            rules: Arc::new(RuleSet::default()),
            origin: Origin::Default,
        }
    }

    /// Shorthand for `resolve(..).rules`
    pub fn rules_for(&self, class: &str, flavor: &Flavor) -> Arc<RuleSet> {
        self.resolve(class, flavor).rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ModelDef, Schema};

    fn registry() -> RuleRegistry {
        let schema = Schema::from_models(vec![
            ModelDef::new("User").with_attributes(["id", "name"]),
            ModelDef::new("Post")
                .with_attributes(["id", "title", "content"])
                .has_one("user", "User")
                .has_many("comments", "Comment"),
            ModelDef::new("BlogPost").extends("Post"),
            ModelDef::new("PinnedBlogPost").extends("BlogPost"),
            ModelDef::new("Comment").with_attributes(["id", "content"]),
        ])
        .unwrap();

        let mut registry = RuleRegistry::new(Arc::new(schema));
        registry
            .register("Post", Flavor::Default, |r| {
                r.only(["title"]).includes(["user", "comments"]);
            })
            .unwrap();
        registry
            .register("Post", "with_email", |r| {
                r.includes(["user", "comments"]);
            })
            .unwrap();
        registry
            .register("BlogPost", "with_email", |r| {
                r.includes(["user"]);
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_exact_match() {
        let registry = registry();
        let resolution = Resolver::new(&registry).resolve("Post", &Flavor::Default);
        assert_eq!(resolution.origin, Origin::Declared { class: "Post".to_string() });
        assert_eq!(resolution.rules.includes().len(), 2);
    }

    #[test]
    fn test_subclass_inherits_undeclared_flavor() {
        let registry = registry();
        let resolver = Resolver::new(&registry);

        let inherited = resolver.resolve("PinnedBlogPost", &Flavor::Default);
        assert_eq!(inherited.origin, Origin::Declared { class: "Post".to_string() });
        assert_eq!(inherited.rules, resolver.rules_for("Post", &Flavor::Default));
    }

    #[test]
    fn test_subclass_declaration_replaces_ancestor() {
        let registry = registry();
        let resolver = Resolver::new(&registry);

        let rules = resolver.rules_for("BlogPost", &Flavor::named("with_email"));
        let includes: Vec<&str> = rules.includes().iter().map(|e| e.association()).collect();
        assert_eq!(includes, vec!["user"]);
        assert_eq!(
            *rules,
            **registry.lookup("BlogPost", &Flavor::named("with_email")).unwrap()
        );

        // nearest declaring ancestor wins for deeper subclasses
        let nearest = resolver.resolve("PinnedBlogPost", &Flavor::named("with_email"));
        assert_eq!(nearest.origin, Origin::Declared { class: "BlogPost".to_string() });
    }

    #[test]
    fn test_missing_flavor_falls_back_to_default_rules() {
        let registry = registry();
        let resolver = Resolver::new(&registry);

        for class in ["User", "Comment", "BlogPost", "Unknown"] {
            let resolution = resolver.resolve(class, &Flavor::named("deep"));
            assert_eq!(resolution.origin, Origin::Default);
            assert!(!resolution.is_declared());
            assert_eq!(*resolution.rules, RuleSet::default());
        }
    }
}
