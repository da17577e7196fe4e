//! Flavor identifiers.
//!
//! A flavor names one serialization profile of a model class. Every class
//! also has an unnamed default flavor, spelled `default` in declaration files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Keyword used for the default flavor in YAML files and on the command line
pub const DEFAULT_FLAVOR: &str = "default";

/// Identifies a serialization profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    /// The unnamed profile used when the caller does not ask for one
    #[default]
    Default,
    /// A named profile (e.g. `deep`, `with_email`)
    Named(String),
}

impl Flavor {
    /// Create a named flavor; `"default"` maps to [`Flavor::Default`]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == DEFAULT_FLAVOR {
            Flavor::Default
        } else {
            Flavor::Named(name)
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Flavor::Default)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Flavor::Default => DEFAULT_FLAVOR,
            Flavor::Named(name) => name,
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Flavor {
    fn from(name: &str) -> Self {
        Flavor::named(name)
    }
}

impl From<String> for Flavor {
    fn from(name: String) -> Self {
        Flavor::named(name)
    }
}

impl From<Option<&str>> for Flavor {
    fn from(name: Option<&str>) -> Self {
        name.map(Flavor::named).unwrap_or_default()
    }
}

impl Serialize for Flavor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Flavor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Flavor::named(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keyword_maps_to_default() {
        assert_eq!(Flavor::named("default"), Flavor::Default);
        assert_eq!(Flavor::from("deep"), Flavor::Named("deep".to_string()));
        assert_eq!(Flavor::from(None::<&str>), Flavor::Default);
    }

    #[test]
    fn test_yaml_round_trip_uses_plain_names() {
        let flavors: Vec<Flavor> = serde_yaml::from_str("[default, deep]").unwrap();
        assert_eq!(flavors, vec![Flavor::Default, Flavor::named("deep")]);

        let yaml = serde_yaml::to_string(&Flavor::named("deep")).unwrap();
        assert_eq!(yaml.trim(), "deep");
    }
}
