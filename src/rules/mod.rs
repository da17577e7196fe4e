//! Rule declarations: the frozen [`RuleSet`], its builder, the registry that
//! stores one rule set per (class, flavor), and YAML declaration files.

pub mod declarations;
pub mod registry;
pub mod rule_set;

pub use declarations::{parse_declarations, Declarations, IncludeDecl, RuleDecl};
pub use registry::{global, install_global, RuleError, RuleRegistry};
pub use rule_set::{IncludeEntry, RuleSet, RuleSetBuilder};
