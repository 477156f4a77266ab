//! The closed set of tool calls subject to authorization.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::input::{
    AskUserQuestionInput, BashInput, ExitPlanModeInput, FileMutationInput, ListInput,
    NotebookEditInput, ReadInput, SearchInput,
};

/// A tool invocation requested by the model.
///
/// Wire form is `{"toolName": "...", "toolInput": {...}}`. A name outside this
/// set fails to deserialize; callers treat that as needing confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "toolName", content = "toolInput")]
pub enum ToolCall {
    Bash(BashInput),
    Write(FileMutationInput),
    Edit(FileMutationInput),
    MultiEdit(FileMutationInput),
    Delete(FileMutationInput),
    NotebookEdit(NotebookEditInput),
    Read(ReadInput),
    Glob(SearchInput),
    Grep(SearchInput),
    #[serde(rename = "LS")]
    Ls(ListInput),
    ExitPlanMode(ExitPlanModeInput),
    AskUserQuestion(AskUserQuestionInput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    Bash,
    Write,
    Edit,
    MultiEdit,
    Delete,
    NotebookEdit,
    Read,
    Glob,
    Grep,
    #[serde(rename = "LS")]
    Ls,
    ExitPlanMode,
    AskUserQuestion,
}

/// Policy family a tool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Shell,
    FileMutation,
    ReadOnly,
    PlanExit,
    Question,
}

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        ToolName::Bash,
        ToolName::Write,
        ToolName::Edit,
        ToolName::MultiEdit,
        ToolName::Delete,
        ToolName::NotebookEdit,
        ToolName::Read,
        ToolName::Glob,
        ToolName::Grep,
        ToolName::Ls,
        ToolName::ExitPlanMode,
        ToolName::AskUserQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Bash => "Bash",
            ToolName::Write => "Write",
            ToolName::Edit => "Edit",
            ToolName::MultiEdit => "MultiEdit",
            ToolName::Delete => "Delete",
            ToolName::NotebookEdit => "NotebookEdit",
            ToolName::Read => "Read",
            ToolName::Glob => "Glob",
            ToolName::Grep => "Grep",
            ToolName::Ls => "LS",
            ToolName::ExitPlanMode => "ExitPlanMode",
            ToolName::AskUserQuestion => "AskUserQuestion",
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ToolName::Bash => ToolKind::Shell,
            ToolName::Write
            | ToolName::Edit
            | ToolName::MultiEdit
            | ToolName::Delete
            | ToolName::NotebookEdit => ToolKind::FileMutation,
            ToolName::Read | ToolName::Glob | ToolName::Grep | ToolName::Ls => ToolKind::ReadOnly,
            ToolName::ExitPlanMode => ToolKind::PlanExit,
            ToolName::AskUserQuestion => ToolKind::Question,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.kind() == ToolKind::ReadOnly
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

impl ToolCall {
    /// Build a call from the loose `toolName`/`toolInput` pair of the boundary.
    pub fn from_parts(tool_name: &str, tool_input: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({
            "toolName": tool_name,
            "toolInput": tool_input,
        }))
    }

    pub fn bash(command: impl Into<String>) -> Self {
        ToolCall::Bash(BashInput {
            command: command.into(),
            description: None,
        })
    }

    pub fn write(file_path: impl AsRef<Path>) -> Self {
        ToolCall::Write(FileMutationInput {
            file_path: file_path.as_ref().to_path_buf(),
            rest: Default::default(),
        })
    }

    pub fn edit(file_path: impl AsRef<Path>) -> Self {
        ToolCall::Edit(FileMutationInput {
            file_path: file_path.as_ref().to_path_buf(),
            rest: Default::default(),
        })
    }

    pub fn delete(file_path: impl AsRef<Path>) -> Self {
        ToolCall::Delete(FileMutationInput {
            file_path: file_path.as_ref().to_path_buf(),
            rest: Default::default(),
        })
    }

    pub fn read(file_path: impl AsRef<Path>) -> Self {
        ToolCall::Read(ReadInput {
            file_path: file_path.as_ref().to_path_buf(),
            offset: None,
            limit: None,
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::Bash(_) => ToolName::Bash,
            ToolCall::Write(_) => ToolName::Write,
            ToolCall::Edit(_) => ToolName::Edit,
            ToolCall::MultiEdit(_) => ToolName::MultiEdit,
            ToolCall::Delete(_) => ToolName::Delete,
            ToolCall::NotebookEdit(_) => ToolName::NotebookEdit,
            ToolCall::Read(_) => ToolName::Read,
            ToolCall::Glob(_) => ToolName::Glob,
            ToolCall::Grep(_) => ToolName::Grep,
            ToolCall::Ls(_) => ToolName::Ls,
            ToolCall::ExitPlanMode(_) => ToolName::ExitPlanMode,
            ToolCall::AskUserQuestion(_) => ToolName::AskUserQuestion,
        }
    }

    pub fn kind(&self) -> ToolKind {
        self.name().kind()
    }

    /// Filesystem path the call targets, if it has one.
    pub fn target_path(&self) -> Option<&Path> {
        match self {
            ToolCall::Write(input)
            | ToolCall::Edit(input)
            | ToolCall::MultiEdit(input)
            | ToolCall::Delete(input) => Some(&input.file_path),
            ToolCall::NotebookEdit(input) => Some(&input.notebook_path),
            ToolCall::Read(input) => Some(&input.file_path),
            ToolCall::Glob(input) | ToolCall::Grep(input) => input.path.as_deref(),
            ToolCall::Ls(input) => Some(&input.path),
            ToolCall::Bash(_) | ToolCall::ExitPlanMode(_) | ToolCall::AskUserQuestion(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_from_parts_bash() {
        let call = ToolCall::from_parts("Bash", json!({"command": "git status"})).unwrap();
        assert_eq!(call, ToolCall::bash("git status"));
        assert_eq!(call.kind(), ToolKind::Shell);
    }

    #[test]
    fn test_from_parts_keeps_extra_fields() {
        let call = ToolCall::from_parts(
            "Edit",
            json!({"file_path": "src/lib.rs", "old_string": "a", "new_string": "b"}),
        )
        .unwrap();
        assert_eq!(call.target_path(), Some(Path::new("src/lib.rs")));
        let ToolCall::Edit(input) = &call else {
            panic!("expected Edit");
        };
        assert_eq!(input.rest.get("old_string"), Some(&json!("a")));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        assert!(ToolCall::from_parts("WebFetch", json!({"url": "https://x"})).is_err());
        assert!(ToolCall::from_parts("Bash", json!({})).is_err());
    }

    #[test]
    fn test_ls_wire_name() {
        let call = ToolCall::from_parts("LS", json!({"path": "."})).unwrap();
        assert_eq!(call.name(), ToolName::Ls);
        assert_eq!(call.name().to_string(), "LS");
        assert_eq!(call.target_path(), Some(Path::new(".")));
    }

    #[test]
    fn test_search_without_path() {
        let call = ToolCall::from_parts("Grep", json!({"pattern": "TODO"})).unwrap();
        assert!(call.target_path().is_none());
        assert!(call.name().is_read_only());

        let call = ToolCall::from_parts("Glob", json!({"pattern": "*.rs", "path": "src"})).unwrap();
        assert_eq!(call.target_path(), Some(PathBuf::from("src").as_path()));
    }

    #[test]
    fn test_serialize_adjacent_tags() {
        let value = serde_json::to_value(ToolCall::bash("ls")).unwrap();
        assert_eq!(value, json!({"toolName": "Bash", "toolInput": {"command": "ls"}}));
    }

    #[test]
    fn test_tool_name_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
        }
        assert!("Unknown".parse::<ToolName>().is_err());
    }
}
