//! Interactive confirmation.
//!
//! One generic primitive, a [`ConfirmationRequest`] of 1-4 prompts with 2-4
//! options each plus an implicit free-text "Other", serves every flow: plan
//! exit, agent questions and approvals of calls the kernel could not allow.
//!
//! The waiting side holds a [`PendingConfirmation`] and the UI a [`Responder`];
//! a dropped responder or a cancelled token resolves as
//! [`ConfirmationOutcome::Cancelled`], which every flow maps to deny.

mod approval;
mod channel;
mod plan;
mod question;
mod request;

pub use approval::{
    APPROVAL_QUESTION, DONT_ASK_AGAIN_LABEL, NO_LABEL, YES_LABEL, approval_request,
    resolve_approval,
};
pub use channel::{
    ChannelConfirmationHandler, ConfirmationHandler, PendingConfirmation, Responder, channel,
    confirm_with_cancel,
};
pub use plan::{
    ACCEPT_EDITS_LABEL, KEEP_PLANNING_LABEL, MANUAL_APPROVAL_LABEL, PLAN_EXIT_QUESTION,
    plan_exit_request, resolve_plan_exit,
};
pub use question::{collect_answers, question_request};
pub use request::{
    Answer, Attachment, ConfirmationOption, ConfirmationOutcome, ConfirmationRequest,
    MAX_HEADER_CHARS, MAX_OPTIONS, MAX_PROMPTS, MIN_OPTIONS, OTHER_LABEL, Prompt,
};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("Must provide 1-4 questions, got {0}")]
    PromptCount(usize),

    #[error("Question '{header}' must have 2-4 options, got {count}")]
    OptionCount { header: String, count: usize },

    #[error("Header '{header}' exceeds 12 character limit")]
    HeaderTooLong { header: String },

    #[error("Question text is empty")]
    EmptyQuestion,

    #[error("No answer for question: {0}")]
    Unanswered(String),

    #[error("Confirmation was cancelled")]
    Cancelled,
}
