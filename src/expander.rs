//! Association expansion.
//!
//! The expander projects an entity and then walks its rule set's include
//! list. For every include it picks the nested rules:
//!
//! 1. the inline override declared at the include site, if any;
//! 2. otherwise the nested class's own rules for the same flavor, with their
//!    includes dropped so bare includes expand exactly one level.
//!
//! Under a named flavor, a nested class that declares that flavor itself
//! keeps its includes (when `propagate_named_flavors` is on), which is how
//! chains such as `Post(deep) -> User(deep) -> CheckIn` are authored. A class
//! already expanded further up the same branch never propagates again, so
//! mutually including flavors stop after one round trip.
//!
//! Nested rules that leave `dasherize` or `skip_types` unset take them from
//! the including entity's rules.
//!
//! Every level consumes one unit of the depth budget; at zero, associations
//! are left out.

use crate::config::SerializerConfig;
use crate::entity::{Association, Entity, EntityError};
use crate::flavor::Flavor;
use crate::projector::{Document, Projector};
use crate::resolver::{Resolution, Resolver};
use crate::rules::{IncludeEntry, RuleRegistry, RuleSet};
use serde_json::Value;
use std::sync::Arc;

pub struct GraphExpander<'a> {
    registry: &'a RuleRegistry,
    config: &'a SerializerConfig,
    projector: Projector<'a>,
}

impl<'a> GraphExpander<'a> {
    pub fn new(registry: &'a RuleRegistry, config: &'a SerializerConfig) -> Self {
        Self {
            registry,
            config,
            projector: Projector::new(registry.schema(), config),
        }
    }

    /// Project `entity` with `rules` and expand its includes.
    pub fn expand(
        &self,
        entity: &dyn Entity,
        rules: &RuleSet,
        flavor: &Flavor,
        depth: usize,
    ) -> Result<Document, EntityError> {
        let mut branch = vec![entity.class_name().to_string()];
        self.expand_branch(entity, rules, flavor, depth, &mut branch)
    }

    /// `branch` holds the classes from the root down to `entity`
    fn expand_branch(
        &self,
        entity: &dyn Entity,
        rules: &RuleSet,
        flavor: &Flavor,
        depth: usize,
        branch: &mut Vec<String>,
    ) -> Result<Document, EntityError> {
        let mut document = self.projector.project(entity, rules)?;
        if rules.includes().is_empty() {
            return Ok(document);
        }
        if depth == 0 {
            tracing::warn!(
                "Depth budget exhausted at {}; omitting {} association(s)",
                entity.class_name(),
                rules.includes().len()
            );
            return Ok(document);
        }

        for entry in rules.includes() {
            tracing::trace!("Expanding {}.{} (depth {})", entity.class_name(), entry.association(), depth);
            let value = match entity.association(entry.association())? {
                Association::Null => Value::Null,
                Association::One(target) => Value::Object(self.expand_nested(
                    target.as_ref(),
                    rules,
                    entry,
                    flavor,
                    depth - 1,
                    branch,
                )?),
                Association::Many(members) => {
                    let mut items = Vec::with_capacity(members.len());
                    for member in &members {
                        items.push(Value::Object(self.expand_nested(
                            member.as_ref(),
                            rules,
                            entry,
                            flavor,
                            depth - 1,
                            branch,
                        )?));
                    }
                    Value::Array(items)
                }
            };
            // casing follows the outer rules, not the nested class
            document.insert(self.projector.output_key(rules, entry.association()), value);
        }

        Ok(document)
    }

    fn expand_nested(
        &self,
        target: &dyn Entity,
        outer: &RuleSet,
        entry: &IncludeEntry,
        flavor: &Flavor,
        depth: usize,
        branch: &mut Vec<String>,
    ) -> Result<Document, EntityError> {
        let rules = self.nested_rules(target, entry, flavor, branch).inherit_toggles(outer);
        branch.push(target.class_name().to_string());
        let result = self.expand_branch(target, &rules, flavor, depth, branch);
        branch.pop();
        result
    }

    /// Rules used for an entity reached through `entry`, given the classes
    /// already on the current branch
    pub fn nested_rules(
        &self,
        target: &dyn Entity,
        entry: &IncludeEntry,
        flavor: &Flavor,
        branch: &[String],
    ) -> Arc<RuleSet> {
        if let Some(rules) = entry.override_rules() {
            return rules.clone();
        }

        let resolution = Resolver::new(self.registry).resolve(target.class_name(), flavor);
        if resolution.rules.includes().is_empty() {
            return resolution.rules;
        }
        if self.propagates(flavor, &resolution) {
            if !branch.iter().any(|class| class == target.class_name()) {
                return resolution.rules;
            }
            tracing::debug!(
                "{} already expanded with flavor '{}' on this branch; dropping its includes",
                target.class_name(),
                flavor
            );
        }
        Arc::new(resolution.rules.without_includes())
    }

    fn propagates(&self, flavor: &Flavor, resolution: &Resolution) -> bool {
        self.config.propagate_named_flavors && !flavor.is_default() && resolution.is_declared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ModelDef, Schema};
    use crate::store::{MemoryStore, Record, RecordKey};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::from_models(vec![
                ModelDef::new("Node")
                    .with_attributes(["id", "label"])
                    .has_one("next", "Node")
                    .has_many("children", "Node")
                    .has_one("owner", "Owner"),
                ModelDef::new("Owner")
                    .with_attributes(["id", "name"])
                    .has_one("lead", "Node"),
            ])
            .unwrap(),
        )
    }

    /// a -> b -> a (cycle through `next`), a has children [b, c],
    /// a is owned by o and o's lead is a
    fn store(schema: Arc<Schema>) -> Arc<MemoryStore> {
        let key = |id: &str| RecordKey::new("Node", id);
        let mut store = MemoryStore::new(schema);
        store
            .insert(
                Record::new("Node", "a")
                    .with_attribute("label", json!("A"))
                    .with_one("next", Some(key("b")))
                    .with_many("children", vec![key("b"), key("c")])
                    .with_one("owner", Some(RecordKey::new("Owner", "o"))),
            )
            .unwrap();
        store
            .insert(
                Record::new("Node", "b")
                    .with_attribute("label", json!("B"))
                    .with_one("next", Some(key("a"))),
            )
            .unwrap();
        store
            .insert(Record::new("Node", "c").with_attribute("label", json!("C")))
            .unwrap();
        store
            .insert(
                Record::new("Owner", "o")
                    .with_attribute("name", json!("O"))
                    .with_one("lead", Some(key("a"))),
            )
            .unwrap();
        store.into_shared()
    }

    /// Node and Owner include each other under "chain"
    fn chain_registry(schema: Arc<Schema>) -> RuleRegistry {
        let mut registry = RuleRegistry::new(schema);
        registry
            .register("Node", "chain", |r| {
                r.only(["label"]).includes(["owner"]);
            })
            .unwrap();
        registry
            .register("Owner", "chain", |r| {
                r.only(["name"]).includes(["lead"]);
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_bare_include_stops_after_one_level() {
        let schema = schema();
        let store = store(schema.clone());
        let mut registry = RuleRegistry::new(schema);
        registry
            .register("Node", Flavor::Default, |r| {
                r.only(["label"]).includes(["next"]);
            })
            .unwrap();
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let rules = registry.lookup("Node", &Flavor::Default).unwrap().clone();
        let document = expander.expand(a.as_ref(), &rules, &Flavor::Default, 8).unwrap();

        assert_eq!(json!(document), json!({"label": "A", "next": {"label": "B"}}));
    }

    #[test]
    fn test_named_flavor_propagates_once_per_branch() {
        let schema = schema();
        let store = store(schema.clone());
        let registry = chain_registry(schema);
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let flavor = Flavor::named("chain");
        let rules = registry.lookup("Node", &flavor).unwrap().clone();
        let document = expander.expand(a.as_ref(), &rules, &flavor, 8).unwrap();

        // Owner keeps its includes; Node is already on the branch, so the
        // lead comes back without them
        assert_eq!(
            json!(document),
            json!({"label": "A", "owner": {"name": "O", "lead": {"label": "A"}}})
        );
    }

    #[test]
    fn test_self_including_flavor_does_not_recurse() {
        let schema = schema();
        let store = store(schema.clone());
        let mut registry = RuleRegistry::new(schema);
        registry
            .register("Node", "chain", |r| {
                r.only(["label"]).includes(["next"]);
            })
            .unwrap();
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let flavor = Flavor::named("chain");
        let rules = registry.lookup("Node", &flavor).unwrap().clone();
        let document = expander.expand(a.as_ref(), &rules, &flavor, 8).unwrap();

        assert_eq!(json!(document), json!({"label": "A", "next": {"label": "B"}}));
    }

    #[test]
    fn test_budget_cuts_propagated_chain() {
        let schema = schema();
        let store = store(schema.clone());
        let registry = chain_registry(schema);
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let flavor = Flavor::named("chain");
        let rules = registry.lookup("Node", &flavor).unwrap().clone();
        let document = expander.expand(a.as_ref(), &rules, &flavor, 1).unwrap();

        assert_eq!(json!(document), json!({"label": "A", "owner": {"name": "O"}}));
    }

    #[test]
    fn test_propagation_can_be_disabled() {
        let schema = schema();
        let store = store(schema.clone());
        let registry = chain_registry(schema);
        let config = SerializerConfig {
            propagate_named_flavors: false,
            ..SerializerConfig::default()
        };
        let expander = GraphExpander::new(&registry, &config);

        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let flavor = Flavor::named("chain");
        let rules = registry.lookup("Node", &flavor).unwrap().clone();
        let document = expander.expand(a.as_ref(), &rules, &flavor, 8).unwrap();

        assert_eq!(json!(document), json!({"label": "A", "owner": {"name": "O"}}));
    }

    #[test]
    fn test_outer_toggles_reach_nested_entities() {
        let schema = Arc::new(
            Schema::from_models(vec![
                ModelDef::new("Shape")
                    .with_attributes(["id", "display_name"])
                    .has_many("parts", "Part")
                    .polymorphic(),
                ModelDef::new("Part").extends("Shape"),
            ])
            .unwrap(),
        );
        let mut store = MemoryStore::new(schema.clone());
        store
            .insert(
                Record::new("Shape", "s")
                    .with_attribute("display_name", json!("Outer"))
                    .with_many("parts", vec![RecordKey::new("Part", "p")]),
            )
            .unwrap();
        store
            .insert(Record::new("Part", "p").with_attribute("display_name", json!("Inner")))
            .unwrap();
        let store = store.into_shared();
        let shape = store.entity(&RecordKey::new("Shape", "s")).unwrap();
        let config = SerializerConfig::default().with_key_case(crate::KeyCase::Kebab);

        let mut quiet = RuleSet::builder();
        quiet
            .only(["display_name"])
            .includes(["parts"])
            .dasherize(false)
            .skip_types(true);
        let quiet = quiet.build();

        let mut registry = RuleRegistry::new(schema.clone());
        let document = GraphExpander::new(&registry, &config)
            .expand(shape.as_ref(), &quiet, &Flavor::Default, 8)
            .unwrap();
        assert_eq!(
            json!(document),
            json!({"display_name": "Outer", "parts": [{"id": "p", "display_name": "Inner"}]})
        );

        // a toggle the nested class declares itself wins
        registry
            .register("Part", Flavor::Default, |r| {
                r.only(["display_name"]).dasherize(true);
            })
            .unwrap();
        let expander = GraphExpander::new(&registry, &config);
        let document = expander.expand(shape.as_ref(), &quiet, &Flavor::Default, 8).unwrap();
        assert_eq!(
            json!(document),
            json!({"display_name": "Outer", "parts": [{"display-name": "Inner"}]})
        );

        let mut loud = RuleSet::builder();
        loud.only(["display_name"]).includes(["parts"]);
        let document = expander.expand(shape.as_ref(), &loud.build(), &Flavor::Default, 8).unwrap();
        assert_eq!(
            json!(document),
            json!({
                "display-name": "Outer",
                "type": "Shape",
                "parts": [{"display-name": "Inner", "type": "Part"}]
            })
        );
    }

    #[test]
    fn test_zero_budget_omits_associations() {
        let schema = schema();
        let store = store(schema.clone());
        let registry = RuleRegistry::new(schema);
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let mut builder = RuleSet::builder();
        builder.only(["label"]).includes(["next", "children"]);
        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let document = expander.expand(a.as_ref(), &builder.build(), &Flavor::Default, 0).unwrap();

        assert_eq!(json!(document), json!({"label": "A"}));
    }

    #[test]
    fn test_collections_keep_order_and_null_links_stay_null() {
        let schema = schema();
        let store = store(schema.clone());
        let registry = RuleRegistry::new(schema);
        let config = SerializerConfig::default();
        let expander = GraphExpander::new(&registry, &config);

        let mut builder = RuleSet::builder();
        builder.only(["label"]).include_with("children", |c| {
            c.only(["label"]).includes(["next"]);
        });
        let a = store.entity(&RecordKey::new("Node", "a")).unwrap();
        let document = expander.expand(a.as_ref(), &builder.build(), &Flavor::Default, 8).unwrap();

        assert_eq!(
            json!(document),
            json!({
                "label": "A",
                "children": [
                    {"label": "B", "next": {"id": "a", "label": "A"}},
                    {"label": "C", "next": null}
                ]
            })
        );
    }
}
