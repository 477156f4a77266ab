//! Permission system for controlling tool execution.

mod decision;
mod kernel;
mod matcher;
mod modes;
mod persist;
mod rules;
mod snapshot;
mod state;

pub use decision::{
    PermissionBehavior, PermissionDecision, PermissionResult, PermissionStatus, PermissionUpdate,
};
pub use kernel::{
    Authorization, PermissionContext, PermissionKernel, check_permission, offered_tools,
};
pub use matcher::{BUILTIN_SAFE_COMMANDS, is_builtin_safe, matches};
pub use modes::PermissionMode;
pub use persist::{PersistOutcome, RulePersister};
pub use rules::{PermissionRule, RuleSet};
pub use snapshot::PolicySnapshot;
pub use state::{ModeState, PlanFile};
