//! Design-rule queries
//!
//! # Submodules
//! - `types` - Constraint values and rule-engine item keys
//! - `source` - Host rule-engine seam and the config-driven `DesignRules`
//! - `resolver` - Memoizing clearance resolver

mod types;
mod source;
mod resolver;

pub use types::{Constraint, ConstraintKind, MinOptMax, RuleItem, Severity};
pub use source::{ConstraintSource, DesignRules, NetClass, NetInfo};
pub use resolver::{MemoizedRuleResolver, RuleResolver};
