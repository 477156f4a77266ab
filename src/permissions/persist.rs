//! Single-writer persistence of allow rules to `settings.local.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use super::PermissionRule;
use crate::config::{ConfigError, ConfigResult};

const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Added,
    AlreadyPresent,
}

struct PersistRequest {
    rule: PermissionRule,
    reply: oneshot::Sender<ConfigResult<PersistOutcome>>,
}

/// Handle to the task that owns writes to one settings file.
///
/// Clones share the same task, so concurrent appends from parallel tool calls
/// and subagents are applied one at a time.
#[derive(Clone, Debug)]
pub struct RulePersister {
    tx: mpsc::Sender<PersistRequest>,
    path: Arc<PathBuf>,
}

impl std::fmt::Debug for PersistRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistRequest").field("rule", &self.rule).finish()
    }
}

impl RulePersister {
    /// Start the writer task. Must be called within a Tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = Arc::new(path.into());
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_writer(Arc::clone(&path), rx));
        Self { tx, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rule` to `permissions.allow` unless it is already there.
    pub async fn persist(&self, rule: PermissionRule) -> ConfigResult<PersistOutcome> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PersistRequest { rule, reply })
            .await
            .map_err(|_| ConfigError::WriterClosed)?;
        response.await.map_err(|_| ConfigError::WriterClosed)?
    }
}

async fn run_writer(path: Arc<PathBuf>, mut rx: mpsc::Receiver<PersistRequest>) {
    while let Some(request) = rx.recv().await {
        let result = append_rule(&path, &request.rule).await;
        match &result {
            Ok(outcome) => {
                tracing::debug!(rule = %request.rule, outcome = ?outcome, path = %path.display(), "Persisted permission rule")
            }
            Err(e) => {
                tracing::warn!(rule = %request.rule, path = %path.display(), error = %e, "Failed to persist permission rule")
            }
        }
        let _ = request.reply.send(result);
    }
    tracing::debug!(path = %path.display(), "Rule writer stopped");
}

/// Read-modify-write of the settings file, preserving unrelated keys.
pub(crate) async fn append_rule(path: &Path, rule: &PermissionRule) -> ConfigResult<PersistOutcome> {
    let mut root = match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Value::Object(Map::new()),
        Ok(content) => serde_json::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(Map::new()),
        Err(e) => return Err(e.into()),
    };

    let allow = allow_list(&mut root)?;
    let exists = allow.iter().any(|entry| {
        entry
            .as_str()
            .and_then(|s| s.parse::<PermissionRule>().ok())
            .is_some_and(|existing| existing == *rule)
    });
    if exists {
        return Ok(PersistOutcome::AlreadyPresent);
    }
    allow.push(Value::String(rule.to_string()));

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut content = serde_json::to_string_pretty(&root)?;
    content.push('\n');

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(PersistOutcome::Added)
}

fn allow_list(root: &mut Value) -> ConfigResult<&mut Vec<Value>> {
    let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    };

    let root = root
        .as_object_mut()
        .ok_or_else(|| invalid("<root>", "expected a JSON object"))?;
    let permissions = root
        .entry("permissions")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| invalid("permissions", "expected an object"))?;
    permissions
        .entry("allow")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| invalid("permissions.allow", "expected an array"))
}
