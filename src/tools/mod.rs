//! Tool calls and the definitions offered to the model.

mod call;
mod definition;
mod input;

pub use call::{ToolCall, ToolKind, ToolName};
pub use definition::ToolDefinition;
pub use input::{
    AskUserQuestionInput, BashInput, ExitPlanModeInput, FileMutationInput, ListInput,
    NotebookEditInput, Question, QuestionOption, ReadInput, SearchInput,
};
