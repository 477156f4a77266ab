//! Plan-exit confirmation: approve the plan and pick the implementation mode.

use super::{Answer, ConfirmationOutcome, ConfirmationRequest, Prompt};
use crate::permissions::{PermissionDecision, PermissionMode, PlanFile};

pub const PLAN_EXIT_QUESTION: &str = "Would you like to proceed with this plan?";
pub const ACCEPT_EDITS_LABEL: &str = "Yes, auto-accept edits";
pub const MANUAL_APPROVAL_LABEL: &str = "Yes, manually approve edits";
pub const KEEP_PLANNING_LABEL: &str = "No, keep planning";

/// Build the request, attaching the current plan content.
pub fn plan_exit_request(plan: &PlanFile, content: impl Into<String>) -> ConfirmationRequest {
    ConfirmationRequest::new("Ready to code?")
        .prompt(
            Prompt::new(PLAN_EXIT_QUESTION, "Plan")
                .option_with_description(
                    ACCEPT_EDITS_LABEL,
                    "Leave plan mode and approve file edits in the project automatically",
                )
                .option_with_description(
                    MANUAL_APPROVAL_LABEL,
                    "Leave plan mode and confirm each edit",
                )
                .option_with_description(
                    KEEP_PLANNING_LABEL,
                    "Stay in plan mode; use Other to tell the agent what to change",
                ),
        )
        .attachment(plan.path().display().to_string(), content)
}

/// Map the user's answer to a decision. Anything unrecognised keeps planning.
pub fn resolve_plan_exit(outcome: &ConfirmationOutcome) -> PermissionDecision {
    let Some(answer) = outcome.answer(PLAN_EXIT_QUESTION) else {
        return PermissionDecision::deny("Plan approval was cancelled; staying in plan mode");
    };
    match answer {
        Answer::Selected(labels) => match labels.as_slice() {
            [label] if label == ACCEPT_EDITS_LABEL => PermissionDecision::allow()
                .with_message("User approved the plan")
                .with_mode(PermissionMode::AcceptEdits),
            [label] if label == MANUAL_APPROVAL_LABEL => PermissionDecision::allow()
                .with_message("User approved the plan")
                .with_mode(PermissionMode::Default),
            _ => PermissionDecision::deny("User chose to keep planning"),
        },
        Answer::Other(feedback) => PermissionDecision::deny(format!(
            "User chose to keep planning with feedback: {}",
            feedback
        )),
    }
}
