//! Frozen projection rules and the builder that produces them.

use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;

/// One association to expand, optionally with inline rules for the nested
/// entity that replace whatever that entity would resolve on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeEntry {
    association: String,
    rules: Option<Arc<RuleSet>>,
}

impl IncludeEntry {
    pub fn bare(association: impl Into<String>) -> Self {
        Self {
            association: association.into(),
            rules: None,
        }
    }

    pub fn with_override(association: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            association: association.into(),
            rules: Some(Arc::new(rules)),
        }
    }

    pub fn association(&self) -> &str {
        &self.association
    }

    /// Inline rules declared at this include site, if any
    pub fn override_rules(&self) -> Option<&Arc<RuleSet>> {
        self.rules.as_ref()
    }
}

/// Projection and inclusion rules for one (class, flavor) pair.
///
/// Built once through [`RuleSetBuilder`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    only: Option<IndexSet<String>>,
    except: IndexSet<String>,
    methods: Vec<String>,
    includes: Vec<IncludeEntry>,
    // unset toggles follow the rules of the entity that included this one
    dasherize: Option<bool>,
    skip_types: Option<bool>,
}

impl Default for RuleSet {
    /// All attributes, no computed values, no includes.
    fn default() -> Self {
        Self {
            only: None,
            except: IndexSet::new(),
            methods: Vec::new(),
            includes: Vec::new(),
            dasherize: None,
            skip_types: None,
        }
    }
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::new()
    }

    pub fn only_attributes(&self) -> Option<&IndexSet<String>> {
        self.only.as_ref()
    }

    pub fn except_attributes(&self) -> &IndexSet<String> {
        &self.except
    }

    pub fn computed_names(&self) -> &[String] {
        &self.methods
    }

    pub fn includes(&self) -> &[IncludeEntry] {
        &self.includes
    }

    pub fn emits_key_casing(&self) -> bool {
        self.dasherize.unwrap_or(true)
    }

    pub fn emits_type_tag(&self) -> bool {
        !self.skip_types.unwrap_or(false)
    }

    /// Fill toggles these rules leave unset from `outer`, the rules of the
    /// including entity. Declared toggles are kept.
    pub fn inherit_toggles(self: &Arc<Self>, outer: &RuleSet) -> Arc<RuleSet> {
        let dasherize = self.dasherize.or(outer.dasherize);
        let skip_types = self.skip_types.or(outer.skip_types);
        if dasherize == self.dasherize && skip_types == self.skip_types {
            return Arc::clone(self);
        }
        Arc::new(RuleSet {
            dasherize,
            skip_types,
            ..RuleSet::clone(self)
        })
    }

    /// Attributes to project given the class's full attribute set.
    ///
    /// `only` wins outright when present; `except` is ignored in that case.
    pub fn select_attributes(&self, all: &IndexSet<String>) -> Vec<String> {
        match &self.only {
            Some(only) => only.iter().cloned().collect(),
            None => all
                .iter()
                .filter(|name| !self.except.contains(name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Same rules with the include list emptied
    pub fn without_includes(&self) -> RuleSet {
        RuleSet {
            includes: Vec::new(),
            ..self.clone()
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(only) = &self.only {
            write!(f, "only={:?} ", only.iter().collect::<Vec<_>>())?;
        } else if !self.except.is_empty() {
            write!(f, "except={:?} ", self.except.iter().collect::<Vec<_>>())?;
        }
        if !self.methods.is_empty() {
            write!(f, "methods={:?} ", self.methods)?;
        }
        let includes: Vec<String> = self
            .includes
            .iter()
            .map(|entry| match entry.override_rules() {
                Some(nested) => format!("{} {{ {}}}", entry.association(), nested),
                None => entry.association().to_string(),
            })
            .collect();
        write!(f, "includes=[{}]", includes.join(", "))?;
        if let Some(dasherize) = self.dasherize {
            write!(f, " dasherize={}", dasherize)?;
        }
        if let Some(skip) = self.skip_types {
            write!(f, " skip_types={}", skip)?;
        }
        Ok(())
    }
}

/// Mutable declaration block, frozen into a [`RuleSet`] by [`build`](Self::build).
///
/// ```
/// use flavorset::RuleSet;
///
/// let mut builder = RuleSet::builder();
/// builder
///     .methods(["post_count"])
///     .includes(["posts"])
///     .except(["email"]);
/// let rules = builder.build();
/// assert_eq!(rules.computed_names(), ["post_count"]);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: RuleSet,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict projected attributes to these names (accumulates across calls)
    pub fn only<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .only
            .get_or_insert_with(IndexSet::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn except<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.except.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn methods<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names.into_iter().map(Into::into) {
            if !self.rules.methods.contains(&name) {
                self.rules.methods.push(name);
            }
        }
        self
    }

    /// Include associations without inline rules
    pub fn includes<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.include_entry(IncludeEntry::bare(name));
        }
        self
    }

    /// Include an association whose nested entity is projected with the
    /// rules declared in `block` instead of its own.
    pub fn include_with<F>(&mut self, association: impl Into<String>, block: F) -> &mut Self
    where
        F: FnOnce(&mut RuleSetBuilder),
    {
        let mut nested = RuleSetBuilder::new();
        block(&mut nested);
        self.include_entry(IncludeEntry::with_override(association, nested.build()))
    }

    /// Add an include entry; a later entry for the same association replaces
    /// the earlier one in place.
    pub fn include_entry(&mut self, entry: IncludeEntry) -> &mut Self {
        match self
            .rules
            .includes
            .iter_mut()
            .find(|existing| existing.association == entry.association)
        {
            Some(existing) => *existing = entry,
            None => self.rules.includes.push(entry),
        }
        self
    }

    pub fn dasherize(&mut self, enabled: bool) -> &mut Self {
        self.rules.dasherize = Some(enabled);
        self
    }

    pub fn skip_types(&mut self, skip: bool) -> &mut Self {
        self.rules.skip_types = Some(skip);
        self
    }

    pub fn build(self) -> RuleSet {
        self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_default_rules() {
        let rules = RuleSet::default();
        assert!(rules.only_attributes().is_none());
        assert!(rules.computed_names().is_empty());
        assert!(rules.includes().is_empty());
        assert!(rules.emits_key_casing());
        assert!(rules.emits_type_tag());
        assert_eq!(
            rules.select_attributes(&attrs(&["id", "name"])),
            vec!["id", "name"]
        );
    }

    #[test]
    fn test_only_makes_except_inert() {
        let mut builder = RuleSet::builder();
        builder.except(["title"]).only(["title", "id"]);
        let rules = builder.build();

        assert_eq!(
            rules.select_attributes(&attrs(&["id", "title", "content"])),
            vec!["title", "id"]
        );
    }

    #[test]
    fn test_except_drops_attributes() {
        let mut builder = RuleSet::builder();
        builder.except(["email"]);
        let rules = builder.build();

        assert_eq!(
            rules.select_attributes(&attrs(&["id", "name", "email"])),
            vec!["id", "name"]
        );
    }

    #[test]
    fn test_include_with_builds_nested_rules() {
        let mut builder = RuleSet::builder();
        builder.include_with("posts", |posts| {
            posts.includes(["comments"]);
        });
        let rules = builder.build();

        let entry = &rules.includes()[0];
        assert_eq!(entry.association(), "posts");
        let nested = entry.override_rules().unwrap();
        assert_eq!(nested.includes()[0].association(), "comments");
        assert!(nested.includes()[0].override_rules().is_none());
    }

    #[test]
    fn test_repeated_include_replaces_in_place() {
        let mut builder = RuleSet::builder();
        builder
            .includes(["user", "comments"])
            .include_with("user", |user| {
                user.only(["name"]);
            });
        let rules = builder.build();

        let names: Vec<&str> = rules.includes().iter().map(|e| e.association()).collect();
        assert_eq!(names, vec!["user", "comments"]);
        assert!(rules.includes()[0].override_rules().is_some());
    }

    #[test]
    fn test_toggles_and_truncation() {
        let mut builder = RuleSet::builder();
        builder
            .includes(["check_ins"])
            .dasherize(false)
            .skip_types(true);
        let rules = builder.build();

        assert!(!rules.emits_key_casing());
        assert!(!rules.emits_type_tag());

        let truncated = rules.without_includes();
        assert!(truncated.includes().is_empty());
        assert!(!truncated.emits_key_casing());
    }

    #[test]
    fn test_inherit_toggles_fills_only_unset() {
        let mut outer = RuleSet::builder();
        outer.dasherize(false).skip_types(true);
        let outer = outer.build();

        let plain = Arc::new(RuleSet::default());
        let inherited = plain.inherit_toggles(&outer);
        assert!(!inherited.emits_key_casing());
        assert!(!inherited.emits_type_tag());

        let mut own = RuleSet::builder();
        own.dasherize(true);
        let own = Arc::new(own.build());
        let inherited = own.inherit_toggles(&outer);
        assert!(inherited.emits_key_casing());
        assert!(!inherited.emits_type_tag());

        let unchanged = plain.inherit_toggles(&RuleSet::default());
        assert!(Arc::ptr_eq(&unchanged, &plain));
    }

    #[test]
    fn test_display_summary() {
        let mut builder = RuleSet::builder();
        builder
            .only(["title"])
            .include_with("comments", |c| {
                c.only(["content"]);
            })
            .skip_types(true);
        let text = builder.build().to_string();
        assert_eq!(
            text,
            "only=[\"title\"] includes=[comments { only=[\"content\"] includes=[]}] skip_types=true"
        );
    }
}
