//! Entity collaborator trait.
//!
//! The projection engine never owns data. Everything it knows about an
//! instance comes through [`Entity`]: attribute reads, association fetches
//! and computed values. Failures raised here are passed through to the caller
//! of `serialize` untouched.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an entity; association graphs may be cyclic
pub type EntityRef = Arc<dyn Entity>;

/// Error type for entity access
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    /// The instance's class is not in the schema
    UnknownClass(String),
    UnknownAttribute {
        class: String,
        attribute: String,
    },
    UnknownAssociation {
        class: String,
        association: String,
    },
    UnknownComputed {
        class: String,
        name: String,
    },
    RecordNotFound {
        class: String,
        id: String,
    },
    ComputeFailed {
        name: String,
        reason: String,
    },
    Access(String),
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::UnknownClass(class) => write!(f, "Undefined model '{}'", class),
            EntityError::UnknownAttribute { class, attribute } => {
                write!(f, "'{}' has no attribute '{}'", class, attribute)
            }
            EntityError::UnknownAssociation { class, association } => {
                write!(f, "'{}' has no association '{}'", class, association)
            }
            EntityError::UnknownComputed { class, name } => {
                write!(f, "'{}' has no computed value '{}'", class, name)
            }
            EntityError::RecordNotFound { class, id } => {
                write!(f, "Record {}#{} not found", class, id)
            }
            EntityError::ComputeFailed { name, reason } => {
                write!(f, "Failed to compute '{}': {}", name, reason)
            }
            EntityError::Access(msg) => write!(f, "Access error: {}", msg),
        }
    }
}

impl std::error::Error for EntityError {}

/// Result of fetching an association
#[derive(Clone)]
pub enum Association {
    /// A single-valued association with no target
    Null,
    One(EntityRef),
    /// Members in source order
    Many(Vec<EntityRef>),
}

impl Association {
    pub fn is_null(&self) -> bool {
        matches!(self, Association::Null)
    }

    /// Number of associated entities (0 for `Null`)
    pub fn len(&self) -> usize {
        match self {
            Association::Null => 0,
            Association::One(_) => 1,
            Association::Many(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Association::Null => write!(f, "Null"),
            Association::One(entity) => write!(f, "One({})", entity.class_name()),
            Association::Many(members) => f
                .debug_list()
                .entries(members.iter().map(|m| m.class_name()))
                .finish(),
        }
    }
}

/// An instance of a model class, as seen by the projection engine.
///
/// # Example
///
/// ```
/// use flavorset::{Association, Entity, EntityError};
/// use serde_json::{json, Value};
///
/// struct Comment {
///     content: String,
/// }
///
/// impl Entity for Comment {
///     fn class_name(&self) -> &str {
///         "Comment"
///     }
///
///     fn attribute(&self, name: &str) -> Result<Value, EntityError> {
///         match name {
///             "content" => Ok(json!(self.content)),
///             _ => Err(EntityError::UnknownAttribute {
///                 class: "Comment".to_string(),
///                 attribute: name.to_string(),
///             }),
///         }
///     }
///
///     fn association(&self, name: &str) -> Result<Association, EntityError> {
///         Err(EntityError::UnknownAssociation {
///             class: "Comment".to_string(),
///             association: name.to_string(),
///         })
///     }
///
///     fn computed(&self, name: &str) -> Result<Value, EntityError> {
///         Err(EntityError::UnknownComputed {
///             class: "Comment".to_string(),
///             name: name.to_string(),
///         })
///     }
/// }
/// ```
pub trait Entity: Send + Sync {
    /// Name of the concrete model class of this instance
    fn class_name(&self) -> &str;

    /// Read an attribute value
    fn attribute(&self, name: &str) -> Result<Value, EntityError>;

    /// Fetch associated entities
    fn association(&self, name: &str) -> Result<Association, EntityError>;

    /// Invoke a zero-argument computed value
    fn computed(&self, name: &str) -> Result<Value, EntityError>;
}
