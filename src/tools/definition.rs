//! Tool definitions offered to the model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::call::ToolName;
use super::input::{
    AskUserQuestionInput, BashInput, ExitPlanModeInput, FileMutationInput, ListInput,
    NotebookEditInput, ReadInput, SearchInput,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value =
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));

    if let Some(obj) = value.as_object_mut()
        && !obj.contains_key("properties")
    {
        obj.insert(
            "properties".to_string(),
            serde_json::Value::Object(serde_json::Map::new()),
        );
    }

    value
}

impl ToolName {
    pub fn description(&self) -> &'static str {
        match self {
            ToolName::Bash => "Execute a shell command in the working directory.",
            ToolName::Write => "Write a file, replacing any existing content.",
            ToolName::Edit => "Replace an exact string in a file.",
            ToolName::MultiEdit => "Apply several string replacements to one file.",
            ToolName::Delete => "Delete a file.",
            ToolName::NotebookEdit => "Edit a cell of a Jupyter notebook.",
            ToolName::Read => "Read a file from the filesystem.",
            ToolName::Glob => "Find files matching a glob pattern.",
            ToolName::Grep => "Search file contents with a regular expression.",
            ToolName::Ls => "List a directory.",
            ToolName::ExitPlanMode => {
                "Signal that the plan in the plan file is complete and ask the user to \
                 approve it before implementation starts."
            }
            ToolName::AskUserQuestion => {
                "Ask the user 1-4 questions with 2-4 options each. Users can always \
                 select 'Other' to provide custom input."
            }
        }
    }

    pub fn input_schema(&self) -> serde_json::Value {
        match self {
            ToolName::Bash => schema_of::<BashInput>(),
            ToolName::Write | ToolName::Edit | ToolName::MultiEdit | ToolName::Delete => {
                schema_of::<FileMutationInput>()
            }
            ToolName::NotebookEdit => schema_of::<NotebookEditInput>(),
            ToolName::Read => schema_of::<ReadInput>(),
            ToolName::Glob | ToolName::Grep => schema_of::<SearchInput>(),
            ToolName::Ls => schema_of::<ListInput>(),
            ToolName::ExitPlanMode => schema_of::<ExitPlanModeInput>(),
            ToolName::AskUserQuestion => schema_of::<AskUserQuestionInput>(),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_schema_limits() {
        let schema = ToolName::AskUserQuestion.input_schema();
        let text = schema.to_string();
        assert!(text.contains("questions"));
        assert!(text.contains("multiSelect"));
        assert!(text.contains("\"maxLength\":12"));
    }

    #[test]
    fn test_exit_plan_mode_schema_has_properties() {
        let schema = ToolName::ExitPlanMode.input_schema();
        assert!(schema.get("properties").is_some());
    }

    #[test]
    fn test_definition_name() {
        let def = ToolName::Ls.definition();
        assert_eq!(def.name, "LS");
        assert!(def.input_schema.to_string().contains("path"));
    }
}
