//! Reference in-memory data collaborator.
//!
//! The projection engine only needs something implementing
//! [`Entity`](crate::Entity). This module provides one backed by plain
//! records, used by the `flavorset` CLI and the test suites.

pub mod computed;
pub mod loader;
pub mod memory;

pub use computed::{ComputedFn, ComputedRegistry, Derivation};
pub use loader::DataFile;
pub use memory::{Link, MemoryStore, Record, RecordKey, StoredEntity};

use std::fmt;

/// Error type for building and loading a store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Io(String),
    Parse(String),
    UnknownClass(String),
    UnknownField {
        class: String,
        field: String,
    },
    CardinalityMismatch {
        class: String,
        association: String,
    },
    WrongTarget {
        class: String,
        association: String,
        target: String,
    },
    DuplicateRecord(String),
    DanglingLink {
        from: String,
        to: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "IO error: {}", msg),
            StoreError::Parse(msg) => write!(f, "Failed to parse data file: {}", msg),
            StoreError::UnknownClass(class) => write!(f, "Undefined model '{}'", class),
            StoreError::UnknownField { class, field } => {
                write!(f, "'{}' has no attribute or association '{}'", class, field)
            }
            StoreError::CardinalityMismatch { class, association } => write!(
                f,
                "Link '{}.{}' does not match the association's cardinality",
                class, association
            ),
            StoreError::WrongTarget { class, association, target } => write!(
                f,
                "Link '{}.{}' points at {}, which is not a valid target",
                class, association, target
            ),
            StoreError::DuplicateRecord(key) => write!(f, "Record {} is defined twice", key),
            StoreError::DanglingLink { from, to } => {
                write!(f, "{} links to missing record {}", from, to)
            }
        }
    }
}

impl std::error::Error for StoreError {}
