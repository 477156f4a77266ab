//! Per-kernel mode state and the session's plan file.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use uuid::Uuid;

use super::{PermissionDecision, PermissionMode};
use crate::security::path::resolve_real;

/// Current permission mode of one kernel instance.
///
/// Never shared across a session tree: a subagent gets its own copy.
#[derive(Debug, Default)]
pub struct ModeState {
    mode: RwLock<PermissionMode>,
}

impl ModeState {
    pub fn new(mode: PermissionMode) -> Self {
        Self {
            mode: RwLock::new(mode),
        }
    }

    pub fn get(&self) -> PermissionMode {
        *self.mode.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the previous mode.
    pub fn set(&self, mode: PermissionMode) -> PermissionMode {
        let mut current = self.mode.write().unwrap_or_else(|e| e.into_inner());
        let previous = *current;
        *current = mode;
        if previous != mode {
            tracing::debug!(from = %previous, to = %mode, "Permission mode changed");
        }
        previous
    }

    /// Advance along default → acceptEdits → plan → default and return the new mode.
    pub fn cycle(&self) -> PermissionMode {
        let mut current = self.mode.write().unwrap_or_else(|e| e.into_inner());
        let next = current.next();
        tracing::debug!(from = %*current, to = %next, "Permission mode cycled");
        *current = next;
        next
    }

    /// Apply the mode carried by an allow decision. Returns the mode now in effect.
    pub fn apply(&self, decision: &PermissionDecision) -> PermissionMode {
        match decision.new_permission_mode {
            Some(mode) if decision.is_allowed() => {
                self.set(mode);
                mode
            }
            _ => self.get(),
        }
    }
}

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "clever", "crisp", "curious", "daring", "eager", "fuzzy",
    "gentle", "glowing", "golden", "happy", "hidden", "humble", "jolly", "keen", "lively",
    "lucky", "mellow", "misty", "nimble", "noble", "patient", "quiet", "rapid", "rustic",
    "shiny", "silent", "swift", "tidy", "vivid",
];

const NOUNS: &[&str] = &[
    "acorn", "badger", "beacon", "brook", "canyon", "cedar", "comet", "falcon", "fern",
    "harbor", "heron", "island", "lantern", "maple", "meadow", "nebula", "otter", "pebble",
    "pine", "planet", "puffin", "quartz", "river", "sparrow", "summit", "thistle", "tiger",
    "tulip", "valley", "walrus", "willow", "zephyr",
];

/// The single file plan mode may edit.
///
/// Its name is derived from the session root id, so every kernel in a session
/// tree (and every resumption of it) agrees on the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFile {
    path: PathBuf,
}

impl PlanFile {
    pub fn for_session(plans_dir: impl AsRef<Path>, session_root_id: &str) -> Self {
        Self {
            path: plans_dir.as_ref().join(plan_slug(session_root_id) + ".md"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `target` (relative to `working_dir`) resolves to this plan file.
    pub fn is_target(&self, target: &Path, working_dir: &Path) -> bool {
        let absolute = if target.is_absolute() {
            target.to_path_buf()
        } else {
            working_dir.join(target)
        };
        resolve_real(&absolute) == resolve_real(&self.path)
    }

    /// Current plan content; a missing file reads as empty.
    pub async fn read(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read plan file");
                String::new()
            }
        }
    }
}

fn plan_slug(session_root_id: &str) -> String {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, session_root_id.as_bytes());
    let bytes = id.as_bytes();
    format!(
        "{}-{}-{}",
        ADJECTIVES[bytes[0] as usize % ADJECTIVES.len()],
        NOUNS[bytes[1] as usize % NOUNS.len()],
        NOUNS[bytes[2] as usize % NOUNS.len()]
    )
}
