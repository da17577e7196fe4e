//! # flavorset: flavor-based object graph projection
//!
//! Model classes declare named serialization profiles ("flavors") that decide
//! which attributes, computed values and associated entities appear when an
//! instance is turned into a nested JSON-ready document.
//!
//! ## Features
//!
//! - **Declarative rules**: `only`, `except`, `methods`, `includes` (with
//!   inline overrides), `dasherize` and `skip_types`, declared in code or YAML
//! - **Inheritance-aware lookup**: a subclass inherits its ancestors' flavors
//!   and replaces them wholesale when it declares its own
//! - **Bounded expansion**: bare includes expand one level, named flavors can
//!   chain explicitly, and a depth budget guarantees termination on cycles
//! - **Pluggable data access**: anything implementing [`Entity`] can be
//!   serialized; [`store::MemoryStore`] is a ready-made implementation
//!
//! ## Example: declaring flavors
//!
//! ```yaml
//! User:
//!   default:
//!     methods: [post_count]
//!     includes: [posts]
//!     except: [email]
//!   deep:
//!     includes: [check_ins]
//! Post:
//!   default:
//!     only: [title]
//!     includes: [user, comments]
//! ```
//!
//! ## Example: serializing
//!
//! ```ignore
//! let schema = Arc::new(Schema::load_from_file("config/examples/blog/schema.yaml")?);
//! let mut registry = RuleRegistry::new(schema.clone());
//! registry.load_from_file("config/examples/blog/rules.yaml")?;
//!
//! let serializer = Serializer::new(Arc::new(registry), SerializerConfig::default());
//! let document = serializer.serialize(user.as_ref(), "deep")?;
//! ```

// Core modules
pub mod entity;
pub mod flavor;
pub mod schema;
pub mod rules;

// Resolution and expansion
pub mod resolver;
pub mod projector;
pub mod expander;
pub mod serialization;

pub mod config;

// In-memory data collaborator
pub mod store;

// Re-export key types
pub use entity::{Association, Entity, EntityError, EntityRef};
pub use flavor::Flavor;
pub use schema::{AssociationDef, Cardinality, ModelDef, Schema, SchemaError};
pub use rules::{
    global, install_global, IncludeEntry, RuleError, RuleRegistry, RuleSet, RuleSetBuilder,
};
pub use resolver::{Origin, Resolution, Resolver};
pub use projector::{Document, Projector};
pub use expander::GraphExpander;
pub use serialization::{NdjsonWriter, SerializationError, Serializer};
pub use config::{ConfigError, KeyCase, SerializerConfig};
