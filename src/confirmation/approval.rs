//! Yes / don't-ask-again / No approvals for calls the kernel could not allow.

use super::{Answer, ConfirmationOutcome, ConfirmationRequest, Prompt};
use crate::permissions::{PermissionDecision, PermissionResult, PermissionUpdate};
use crate::tools::ToolCall;

pub const APPROVAL_QUESTION: &str = "Do you want to proceed?";
pub const YES_LABEL: &str = "Yes";
pub const DONT_ASK_AGAIN_LABEL: &str = "Yes, don't ask again";
pub const NO_LABEL: &str = "No";

pub fn approval_request(call: &ToolCall, result: &PermissionResult) -> ConfirmationRequest {
    let mut prompt = Prompt::new(APPROVAL_QUESTION, call.name().as_str()).option(YES_LABEL);
    if let Some(update) = &result.suggestion {
        prompt = prompt.option_with_description(DONT_ASK_AGAIN_LABEL, describe(update));
    }
    prompt = prompt.option_with_description(NO_LABEL, "Tell the agent what to do instead");

    ConfirmationRequest::new(title(call, result)).prompt(prompt)
}

/// Only the "don't ask again" choice carries a side effect, and only the one
/// that was offered.
pub fn resolve_approval(result: &PermissionResult, outcome: &ConfirmationOutcome) -> PermissionDecision {
    let Some(answer) = outcome.answer(APPROVAL_QUESTION) else {
        return PermissionDecision::deny(format!("{} was cancelled", result.tool_name));
    };
    match answer {
        Answer::Selected(labels) => match labels.as_slice() {
            [label] if label == YES_LABEL => PermissionDecision::allow(),
            [label] if label == DONT_ASK_AGAIN_LABEL => match &result.suggestion {
                Some(PermissionUpdate::AddRule(rule)) => {
                    PermissionDecision::allow().with_rule(rule.clone())
                }
                Some(PermissionUpdate::SetMode(mode)) => PermissionDecision::allow().with_mode(*mode),
                None => PermissionDecision::deny("Unexpected approval choice"),
            },
            _ => PermissionDecision::deny(format!("User rejected {}", result.tool_name)),
        },
        Answer::Other(feedback) => PermissionDecision::deny(format!(
            "User rejected {} with feedback: {}",
            result.tool_name, feedback
        )),
    }
}

fn title(call: &ToolCall, result: &PermissionResult) -> String {
    match call {
        ToolCall::Bash(input) => format!("Run: {}", input.command),
        _ => match call.target_path() {
            Some(path) => format!("{} {}", call.name(), path.display()),
            None => format!("{}: {}", call.name(), result.reason),
        },
    }
}

fn describe(update: &PermissionUpdate) -> String {
    match update {
        PermissionUpdate::AddRule(rule) => format!("Always allow {}", rule),
        PermissionUpdate::SetMode(mode) => format!("Switch to {} mode", mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{PermissionMode, PermissionRule};
    use crate::tools::ToolName;

    fn bash_result(suggest: bool) -> PermissionResult {
        let result = PermissionResult::needs_confirmation(ToolName::Bash, "git push");
        if suggest {
            result.with_suggestion(PermissionUpdate::AddRule(PermissionRule::bash("git push")))
        } else {
            result
        }
    }

    fn choose(label: &str) -> ConfirmationOutcome {
        ConfirmationOutcome::single(APPROVAL_QUESTION, Answer::selected(label))
    }

    #[test]
    fn test_options_depend_on_suggestion() {
        let call = ToolCall::bash("git push");
        let with = approval_request(&call, &bash_result(true));
        let labels: Vec<&str> = with.prompts[0].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec![YES_LABEL, DONT_ASK_AGAIN_LABEL, NO_LABEL]);
        assert_eq!(with.title, "Run: git push");
        assert!(with.validate().is_ok());

        let without = approval_request(&call, &bash_result(false));
        assert!(!without.prompts[0].has_option(DONT_ASK_AGAIN_LABEL));
        assert!(without.validate().is_ok());
    }

    #[test]
    fn test_yes_has_no_side_effects() {
        let decision = resolve_approval(&bash_result(true), &choose(YES_LABEL));
        assert!(decision.is_allowed());
        assert!(!decision.has_side_effects());
    }

    #[test]
    fn test_dont_ask_again_persists_rule() {
        let decision = resolve_approval(&bash_result(true), &choose(DONT_ASK_AGAIN_LABEL));
        assert!(decision.is_allowed());
        assert_eq!(decision.new_permission_rule, Some(PermissionRule::bash("git push")));
    }

    #[test]
    fn test_dont_ask_again_for_edits_switches_mode() {
        let result = PermissionResult::needs_confirmation(ToolName::Edit, "edit")
            .with_suggestion(PermissionUpdate::SetMode(PermissionMode::AcceptEdits));
        let decision = resolve_approval(&result, &choose(DONT_ASK_AGAIN_LABEL));
        assert_eq!(decision.new_permission_mode, Some(PermissionMode::AcceptEdits));
    }

    #[test]
    fn test_unoffered_choice_denied() {
        let decision = resolve_approval(&bash_result(false), &choose(DONT_ASK_AGAIN_LABEL));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_no_feedback_and_cancel() {
        assert!(!resolve_approval(&bash_result(true), &choose(NO_LABEL)).is_allowed());
        let feedback = ConfirmationOutcome::single(
            APPROVAL_QUESTION,
            Answer::Other("use --dry-run first".into()),
        );
        let decision = resolve_approval(&bash_result(true), &feedback);
        assert!(decision.message.unwrap().contains("--dry-run"));
        assert!(!resolve_approval(&bash_result(true), &ConfirmationOutcome::Cancelled).is_allowed());
    }
}
