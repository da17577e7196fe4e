//! Attribute and computed-value projection (no association traversal).

use crate::config::SerializerConfig;
use crate::entity::{Entity, EntityError};
use crate::rules::RuleSet;
use crate::schema::Schema;
use serde_json::{Map, Value};

/// Ordered output mapping; insertion order is preserved
pub type Document = Map<String, Value>;

pub struct Projector<'a> {
    schema: &'a Schema,
    config: &'a SerializerConfig,
}

impl<'a> Projector<'a> {
    pub fn new(schema: &'a Schema, config: &'a SerializerConfig) -> Self {
        Self { schema, config }
    }

    /// Output key for `name` under `rules`' key casing toggle
    pub fn output_key(&self, rules: &RuleSet, name: &str) -> String {
        if rules.emits_key_casing() {
            self.config.key_case.apply(name)
        } else {
            name.to_string()
        }
    }

    /// Build the attribute and computed-value portion of an entity's output.
    ///
    /// Order: selected attributes, then computed values in declaration order,
    /// then the type tag for polymorphic classes. Classes missing from the
    /// schema are rejected, since their attribute set is unknown.
    pub fn project(&self, entity: &dyn Entity, rules: &RuleSet) -> Result<Document, EntityError> {
        let class = entity.class_name();
        if !self.schema.contains(class) {
            return Err(EntityError::UnknownClass(class.to_string()));
        }
        let mut document = Document::new();

        let attributes = rules.select_attributes(&self.schema.attribute_names(class));
        for name in &attributes {
            let value = entity.attribute(name)?;
            document.insert(self.output_key(rules, name), value);
        }

        for name in rules.computed_names() {
            let value = entity.computed(name)?;
            document.insert(self.output_key(rules, name), value);
        }

        if rules.emits_type_tag() && self.schema.is_polymorphic(class) {
            document.insert(self.config.type_field.clone(), Value::String(class.to_string()));
        }

        Ok(document)
    }
}
