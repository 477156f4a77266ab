//! Security error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("unterminated quote in command: {0}")]
    UnterminatedQuote(String),

    #[error("unbalanced parenthesis in command: {0}")]
    UnbalancedGroup(String),

    #[error("empty command segment near '{operator}'")]
    EmptySegment { operator: String },

    #[error("redirection without a target: {0}")]
    DanglingRedirect(String),

    #[error("unsupported shell syntax: {0}")]
    Unsupported(String),

    #[error("shell grammar rejected command: {0}")]
    Syntax(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("path not within safe zone: {0}")]
    NotWithinSafeZone(PathBuf),
}

impl SecurityError {
    /// Parse failures of a shell string, as opposed to path problems.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::UnterminatedQuote(_)
                | Self::UnbalancedGroup(_)
                | Self::EmptySegment { .. }
                | Self::DanglingRedirect(_)
                | Self::Unsupported(_)
                | Self::Syntax(_)
        )
    }
}
