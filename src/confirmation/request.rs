//! The generic N-option confirmation primitive.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ConfirmationError;

pub const MAX_PROMPTS: usize = 4;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;
pub const MAX_HEADER_CHARS: usize = 12;

/// Label of the free-text choice every prompt implicitly offers.
pub const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub question: String,
    pub header: String,
    pub options: Vec<ConfirmationOption>,
    #[serde(default)]
    pub multi_select: bool,
}

impl Prompt {
    pub fn new(question: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            header: header.into(),
            options: Vec::new(),
            multi_select: false,
        }
    }

    pub fn option(mut self, label: impl Into<String>) -> Self {
        self.options.push(ConfirmationOption {
            label: label.into(),
            description: None,
        });
        self
    }

    pub fn option_with_description(
        mut self,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.options.push(ConfirmationOption {
            label: label.into(),
            description: Some(description.into()),
        });
        self
    }

    pub fn multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }

    /// Labels to render, including the trailing free-text choice.
    pub fn choices(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .map(|o| o.label.as_str())
            .chain(std::iter::once(OTHER_LABEL))
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|o| o.label == label)
    }

    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.question.trim().is_empty() {
            return Err(ConfirmationError::EmptyQuestion);
        }
        if self.header.chars().count() > MAX_HEADER_CHARS {
            return Err(ConfirmationError::HeaderTooLong {
                header: self.header.clone(),
            });
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&self.options.len()) {
            return Err(ConfirmationError::OptionCount {
                header: self.header.clone(),
                count: self.options.len(),
            });
        }
        Ok(())
    }
}

/// Large context shown alongside the prompt but never sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub title: String,
    pub prompts: Vec<Prompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl ConfirmationRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompts: Vec::new(),
            attachment: None,
        }
    }

    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompts.push(prompt);
        self
    }

    pub fn attachment(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.attachment = Some(Attachment {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.prompts.is_empty() || self.prompts.len() > MAX_PROMPTS {
            return Err(ConfirmationError::PromptCount(self.prompts.len()));
        }
        self.prompts.iter().try_for_each(Prompt::validate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Answer {
    Selected(Vec<String>),
    Other(String),
}

impl Answer {
    pub fn selected(label: impl Into<String>) -> Self {
        Answer::Selected(vec![label.into()])
    }

    /// Display form: labels joined by ", " or the custom text.
    pub fn to_text(&self) -> String {
        match self {
            Answer::Selected(labels) => labels.join(", "),
            Answer::Other(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "answers")]
pub enum ConfirmationOutcome {
    /// Keyed by prompt question text.
    Answered(HashMap<String, Answer>),
    Cancelled,
}

impl ConfirmationOutcome {
    pub fn single(question: impl Into<String>, answer: Answer) -> Self {
        let mut answers = HashMap::new();
        answers.insert(question.into(), answer);
        ConfirmationOutcome::Answered(answers)
    }

    pub fn answer(&self, question: &str) -> Option<&Answer> {
        match self {
            ConfirmationOutcome::Answered(answers) => answers.get(question),
            ConfirmationOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConfirmationOutcome::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yes_no(header: &str) -> Prompt {
        Prompt::new("Proceed?", header).option("Yes").option("No")
    }

    #[test]
    fn test_choices_include_other() {
        let prompt = yes_no("Confirm");
        let choices: Vec<&str> = prompt.choices().collect();
        assert_eq!(choices, vec!["Yes", "No", OTHER_LABEL]);
    }

    #[test]
    fn test_prompt_validation() {
        assert!(yes_no("Confirm").validate().is_ok());
        assert!(matches!(
            yes_no("Much too long header").validate(),
            Err(ConfirmationError::HeaderTooLong { .. })
        ));
        assert!(matches!(
            Prompt::new("Proceed?", "One").option("Yes").validate(),
            Err(ConfirmationError::OptionCount { count: 1, .. })
        ));
        let five = (0..5).fold(Prompt::new("Pick", "Five"), |p, i| p.option(format!("o{}", i)));
        assert!(five.validate().is_err());
    }

    #[test]
    fn test_request_prompt_count() {
        assert!(matches!(
            ConfirmationRequest::new("empty").validate(),
            Err(ConfirmationError::PromptCount(0))
        ));
        let five = (0..5).fold(ConfirmationRequest::new("many"), |r, _| r.prompt(yes_no("H")));
        assert!(matches!(five.validate(), Err(ConfirmationError::PromptCount(5))));
    }

    #[test]
    fn test_answer_text() {
        assert_eq!(
            Answer::Selected(vec!["Logging".into(), "Metrics".into()]).to_text(),
            "Logging, Metrics"
        );
        assert_eq!(Answer::Other("custom".into()).to_text(), "custom");
    }

    #[test]
    fn test_outcome_lookup() {
        let outcome = ConfirmationOutcome::single("Proceed?", Answer::selected("Yes"));
        assert_eq!(outcome.answer("Proceed?"), Some(&Answer::selected("Yes")));
        assert!(ConfirmationOutcome::Cancelled.answer("Proceed?").is_none());
    }
}
