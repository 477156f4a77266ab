//! The policy a single check reads.

use std::path::PathBuf;

use super::{PermissionMode, PermissionRule, RuleSet};
use crate::security::SafeZone;

/// Immutable policy inputs for a check.
///
/// Held behind an `Arc` and replaced whole on reload, so a check in progress
/// never observes a half-updated rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub rules: RuleSet,
    pub zone: SafeZone,
    pub plans_dir: PathBuf,
    pub default_mode: PermissionMode,
}

impl PolicySnapshot {
    /// Copy of this snapshot with one more rule.
    pub fn with_rule(&self, rule: PermissionRule) -> Self {
        let mut next = self.clone();
        next.rules.insert(rule);
        next
    }
}
