//! AskUserQuestion on top of the confirmation primitive.

use std::collections::BTreeMap;

use super::{
    ConfirmationError, ConfirmationOutcome, ConfirmationRequest, MAX_PROMPTS, Prompt,
};
use crate::tools::AskUserQuestionInput;

/// Validate the tool input and turn each question into a prompt.
pub fn question_request(input: &AskUserQuestionInput) -> Result<ConfirmationRequest, ConfirmationError> {
    if input.questions.is_empty() || input.questions.len() > MAX_PROMPTS {
        return Err(ConfirmationError::PromptCount(input.questions.len()));
    }

    let mut request = ConfirmationRequest::new("Questions from the agent");
    for question in &input.questions {
        let prompt = question.options.iter().fold(
            Prompt::new(&question.question, &question.header).multi_select(question.multi_select),
            |prompt, option| match &option.description {
                Some(description) => prompt.option_with_description(&option.label, description),
                None => prompt.option(&option.label),
            },
        );
        prompt.validate()?;
        request = request.prompt(prompt);
    }
    Ok(request)
}

/// Map each question to its selected labels (comma-joined) or custom text.
pub fn collect_answers(
    input: &AskUserQuestionInput,
    outcome: &ConfirmationOutcome,
) -> Result<BTreeMap<String, String>, ConfirmationError> {
    if outcome.is_cancelled() {
        return Err(ConfirmationError::Cancelled);
    }

    let mut answers = BTreeMap::new();
    for question in &input.questions {
        let answer = outcome
            .answer(&question.question)
            .ok_or_else(|| ConfirmationError::Unanswered(question.question.clone()))?;
        answers.insert(question.question.clone(), answer.to_text());
    }
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::{Answer, OTHER_LABEL};
    use crate::tools::{Question, QuestionOption};
    use std::collections::HashMap;

    fn input() -> AskUserQuestionInput {
        AskUserQuestionInput {
            questions: vec![
                Question::single_choice(
                    "Which auth method?",
                    "Auth",
                    vec![
                        QuestionOption::new("JWT"),
                        QuestionOption::with_description("OAuth", "Use OAuth 2.0"),
                    ],
                ),
                Question::multi_choice(
                    "Which features?",
                    "Features",
                    vec![
                        QuestionOption::new("Logging"),
                        QuestionOption::new("Metrics"),
                        QuestionOption::new("Tracing"),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn test_request_mirrors_questions() {
        let request = question_request(&input()).unwrap();
        assert_eq!(request.prompts.len(), 2);
        assert!(request.prompts[1].multi_select);
        assert_eq!(
            request.prompts[0].options[1].description.as_deref(),
            Some("Use OAuth 2.0")
        );
        assert_eq!(request.prompts[0].choices().last(), Some(OTHER_LABEL));
    }

    #[test]
    fn test_validation_limits() {
        let mut empty = input();
        empty.questions.clear();
        assert!(matches!(
            question_request(&empty),
            Err(ConfirmationError::PromptCount(0))
        ));

        let mut too_many = input();
        let extra = too_many.questions[0].clone();
        too_many.questions.extend(std::iter::repeat_n(extra, 3));
        assert!(matches!(
            question_request(&too_many),
            Err(ConfirmationError::PromptCount(5))
        ));

        let mut long_header = input();
        long_header.questions[0].header = "Authentication".into();
        assert!(matches!(
            question_request(&long_header),
            Err(ConfirmationError::HeaderTooLong { .. })
        ));

        let mut one_option = input();
        one_option.questions[0].options.truncate(1);
        assert!(matches!(
            question_request(&one_option),
            Err(ConfirmationError::OptionCount { count: 1, .. })
        ));
    }

    #[test]
    fn test_collect_answers() {
        let mut answers = HashMap::new();
        answers.insert("Which auth method?".to_string(), Answer::Other("Passkeys".into()));
        answers.insert(
            "Which features?".to_string(),
            Answer::Selected(vec!["Logging".into(), "Tracing".into()]),
        );
        let collected =
            collect_answers(&input(), &ConfirmationOutcome::Answered(answers)).unwrap();

        assert_eq!(collected["Which auth method?"], "Passkeys");
        assert_eq!(collected["Which features?"], "Logging, Tracing");
    }

    #[test]
    fn test_missing_or_cancelled() {
        let partial = ConfirmationOutcome::single("Which auth method?", Answer::selected("JWT"));
        assert!(matches!(
            collect_answers(&input(), &partial),
            Err(ConfirmationError::Unanswered(q)) if q == "Which features?"
        ));
        assert!(matches!(
            collect_answers(&input(), &ConfirmationOutcome::Cancelled),
            Err(ConfirmationError::Cancelled)
        ));
    }
}
