//! Results of a permission check and the decisions exchanged with the UI.

use serde::{Deserialize, Serialize};

use super::{PermissionMode, PermissionRule};
use crate::tools::ToolName;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    Allow,
    #[default]
    Deny,
}

impl PermissionBehavior {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decision consumed by the tool executor and produced by confirmation answers.
///
/// `new_permission_mode` and `new_permission_rule` only take effect on `allow`,
/// and only ever come from an explicit user choice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    pub behavior: PermissionBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_permission_mode: Option<PermissionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_permission_rule: Option<PermissionRule>,
}

impl PermissionDecision {
    pub fn allow() -> Self {
        Self {
            behavior: PermissionBehavior::Allow,
            ..Default::default()
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            behavior: PermissionBehavior::Deny,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_mode(mut self, mode: PermissionMode) -> Self {
        self.new_permission_mode = Some(mode);
        self
    }

    pub fn with_rule(mut self, rule: PermissionRule) -> Self {
        self.new_permission_rule = Some(rule);
        self
    }

    pub fn is_allowed(&self) -> bool {
        self.behavior.is_allowed()
    }

    pub fn has_side_effects(&self) -> bool {
        self.is_allowed() && (self.new_permission_mode.is_some() || self.new_permission_rule.is_some())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Allowed,
    /// Fall back to interactive confirmation.
    NeedsConfirmation,
    /// Refused outright; no confirmation is offered.
    Blocked,
}

/// What a "don't ask again" answer would apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PermissionUpdate {
    AddRule(PermissionRule),
    SetMode(PermissionMode),
}

#[derive(Clone, Debug)]
pub struct PermissionResult {
    pub status: PermissionStatus,
    pub reason: String,
    pub tool_name: ToolName,
    pub suggestion: Option<PermissionUpdate>,
}

impl PermissionResult {
    pub fn allowed(tool_name: ToolName, reason: impl Into<String>) -> Self {
        Self::with_status(PermissionStatus::Allowed, tool_name, reason)
    }

    pub fn needs_confirmation(tool_name: ToolName, reason: impl Into<String>) -> Self {
        Self::with_status(PermissionStatus::NeedsConfirmation, tool_name, reason)
    }

    pub fn blocked(tool_name: ToolName, reason: impl Into<String>) -> Self {
        Self::with_status(PermissionStatus::Blocked, tool_name, reason)
    }

    fn with_status(status: PermissionStatus, tool_name: ToolName, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            tool_name,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: PermissionUpdate) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self.status, PermissionStatus::Allowed)
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self.status, PermissionStatus::NeedsConfirmation)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.status, PermissionStatus::Blocked)
    }

    /// Wire decision for the executor. Automatic results never carry side effects.
    pub fn to_decision(&self) -> PermissionDecision {
        match self.status {
            PermissionStatus::Allowed => PermissionDecision::allow(),
            PermissionStatus::NeedsConfirmation | PermissionStatus::Blocked => {
                PermissionDecision::deny(self.reason.clone())
            }
        }
    }
}
