//! Permission modes: the session-wide trust posture.

use serde::{Deserialize, Serialize};

/// Permission mode that determines the default behavior for sensitive tools.
///
/// # Modes
///
/// - **Default**: shell commands need a matching rule or the built-in safe list;
///   file edits need confirmation.
///
/// - **AcceptEdits**: file mutations inside the safe zone are approved
///   automatically. Nothing outside the zone ever is.
///
/// - **Plan**: read-only. Only read tools and edits to the session's plan file
///   are allowed; shell execution is blocked.
///
/// - **BypassPermissions**: shell commands and in-zone edits run unprompted.
///   The zone boundary still holds for file mutations.
///
/// # Example
///
/// ```rust
/// use agent_permissions::permissions::PermissionMode;
///
/// let mode = PermissionMode::Default;
/// assert_eq!(mode.next(), PermissionMode::AcceptEdits);
/// assert_eq!(mode.next().next(), PermissionMode::Plan);
/// assert_eq!(mode.next().next().next(), PermissionMode::Default);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    #[default]
    Default,

    AcceptEdits,

    /// ⚠️ Only use in fully trusted environments.
    BypassPermissions,

    Plan,
}

impl PermissionMode {
    pub const ALL: [PermissionMode; 4] = [
        PermissionMode::Default,
        PermissionMode::AcceptEdits,
        PermissionMode::Plan,
        PermissionMode::BypassPermissions,
    ];

    pub fn allows_all(&self) -> bool {
        matches!(self, PermissionMode::BypassPermissions)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, PermissionMode::Plan)
    }

    /// In-zone file mutations run without confirmation.
    pub fn auto_approves_files(&self) -> bool {
        matches!(
            self,
            PermissionMode::AcceptEdits | PermissionMode::BypassPermissions
        )
    }

    pub fn is_default(&self) -> bool {
        matches!(self, PermissionMode::Default)
    }

    /// Keyboard cycle: default → acceptEdits → plan → default.
    ///
    /// Bypass is never entered by cycling; cycling out of it returns to default.
    pub fn next(&self) -> PermissionMode {
        match self {
            PermissionMode::Default => PermissionMode::AcceptEdits,
            PermissionMode::AcceptEdits => PermissionMode::Plan,
            PermissionMode::Plan => PermissionMode::Default,
            PermissionMode::BypassPermissions => PermissionMode::Default,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PermissionMode::Default => "Ask before edits and unrecognised commands",
            PermissionMode::AcceptEdits => "Auto-approve file edits inside the safe zone",
            PermissionMode::BypassPermissions => "Skip confirmation prompts (dangerous)",
            PermissionMode::Plan => "Read-only planning",
        }
    }
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionMode::Default => write!(f, "default"),
            PermissionMode::AcceptEdits => write!(f, "acceptEdits"),
            PermissionMode::BypassPermissions => write!(f, "bypassPermissions"),
            PermissionMode::Plan => write!(f, "plan"),
        }
    }
}

impl std::str::FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(PermissionMode::Default),
            "acceptedits" | "accept-edits" | "accept_edits" => Ok(PermissionMode::AcceptEdits),
            "bypasspermissions" | "bypass-permissions" | "bypass_permissions" | "bypass" => {
                Ok(PermissionMode::BypassPermissions)
            }
            "plan" | "readonly" | "read-only" | "read_only" => Ok(PermissionMode::Plan),
            _ => Err(format!("Unknown permission mode: {}", s)),
        }
    }
}
