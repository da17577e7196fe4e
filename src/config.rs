//! Serializer configuration.
//!
//! Loaded from YAML (every key optional), then optionally overridden from the
//! environment:
//!
//! ```yaml
//! max_depth: 8
//! key_case: kebab
//! type_field: type
//! propagate_named_flavors: true
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `FLAVORSET_MAX_DEPTH` | `max_depth` |
//! | `FLAVORSET_KEY_CASE` | `key_case` |

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_TYPE_FIELD: &str = "type";

/// Error type for configuration loading
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{}' for {}", value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Output key style applied when a rule set leaves key casing on
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    /// Keys are emitted exactly as declared
    #[default]
    Preserve,
    /// `post_count` -> `post-count`
    #[serde(alias = "dasherize")]
    Kebab,
    /// `post_count` -> `postCount`
    Camel,
    /// `postCount` -> `post_count`
    Snake,
    /// `post_count` -> `PostCount`
    Pascal,
}

impl KeyCase {
    pub fn apply(&self, key: &str) -> String {
        match self {
            KeyCase::Preserve => key.to_string(),
            KeyCase::Kebab => key.to_case(Case::Kebab),
            KeyCase::Camel => key.to_case(Case::Camel),
            KeyCase::Snake => key.to_case(Case::Snake),
            KeyCase::Pascal => key.to_case(Case::Pascal),
        }
    }
}

impl FromStr for KeyCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preserve" | "none" => Ok(KeyCase::Preserve),
            "kebab" | "dasherize" => Ok(KeyCase::Kebab),
            "camel" => Ok(KeyCase::Camel),
            "snake" => Ok(KeyCase::Snake),
            "pascal" => Ok(KeyCase::Pascal),
            _ => Err(ConfigError::InvalidValue {
                key: "key_case".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Settings for [`Serializer`](crate::Serializer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SerializerConfig {
    /// Recursion budget; associations beyond this depth are left out
    pub max_depth: usize,
    pub key_case: KeyCase,
    /// Name of the discriminator field added to polymorphic entities
    pub type_field: String,
    /// Let bare includes under a named flavor carry the nested class's own
    /// declared includes for that flavor
    pub propagate_named_flavors: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            key_case: KeyCase::default(),
            type_field: DEFAULT_TYPE_FIELD.to_string(),
            propagate_named_flavors: true,
        }
    }
}

impl SerializerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `FLAVORSET_*` variables from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(std::env::vars())
    }

    /// Apply `FLAVORSET_*` overrides from arbitrary key/value pairs
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "FLAVORSET_MAX_DEPTH" => {
                    self.max_depth = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                }
                "FLAVORSET_KEY_CASE" => self.key_case = value.parse()?,
                _ => {}
            }
        }
        Ok(self)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }
}
