//! # agent-permissions
//!
//! Authorization kernel for AI coding-agent tool calls.
//!
//! For every tool call the model wants to make, the kernel decides whether it
//! runs, needs interactive confirmation, or is blocked, and applies the side
//! effects of the user's answer (a mode switch or a persisted allow rule).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_permissions::config::SettingsPaths;
//! use agent_permissions::confirmation::ChannelConfirmationHandler;
//! use agent_permissions::permissions::PermissionKernel;
//! use agent_permissions::tools::ToolCall;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let kernel = PermissionKernel::load(SettingsPaths::for_project("."), "session-1").await;
//!
//!     let result = kernel.check(&ToolCall::bash("git status && ls"));
//!     println!("{:?}: {}", result.status, result.reason);
//!
//!     let (handler, mut prompts) = ChannelConfirmationHandler::new(8);
//!     tokio::spawn(async move {
//!         while let Some(responder) = prompts.recv().await {
//!             // render responder.request() and answer
//!             responder.cancel();
//!         }
//!     });
//!     let auth = kernel
//!         .authorize(&ToolCall::bash("cargo publish"), &handler, &CancellationToken::new())
//!         .await;
//!     println!("{:?}", auth.decision);
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod common;
pub mod config;
pub mod confirmation;
pub mod permissions;
pub mod security;
pub mod tools;

pub use config::{ConfigError, Settings, SettingsLoader, SettingsPaths};
pub use confirmation::{
    Answer, ConfirmationHandler, ConfirmationOutcome, ConfirmationRequest, Prompt,
};
pub use permissions::{
    Authorization, PermissionContext, PermissionDecision, PermissionKernel, PermissionMode,
    PermissionResult, PermissionRule, PolicySnapshot, check_permission,
};
pub use security::{ComplexCommand, SafeZone, SecurityError, SimpleCommand, decompose};
pub use tools::{ToolCall, ToolName};

/// Error type for agent-permissions operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse a shell command or rule.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation blocked by permission policy.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The user dismissed a pending confirmation.
    #[error("Confirmation cancelled")]
    Cancelled,
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Denied by policy or by the user
    Authorization,
    /// Configuration, parsing, or request validation errors
    Configuration,
    /// Internal errors (IO, JSON, unexpected states)
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Permission(_) | Error::Cancelled => ErrorCategory::Authorization,
            Error::Config(_) | Error::Parse(_) | Error::InvalidRequest(_) => {
                ErrorCategory::Configuration
            }
            Error::Io(_) | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::WriterClosed => Error::Config("Settings writer is not running".into()),
        }
    }
}

impl From<security::SecurityError> for Error {
    fn from(err: security::SecurityError) -> Self {
        match err {
            security::SecurityError::NotWithinSafeZone(path) => {
                Error::Permission(format!("path not within safe zone: {}", path.display()))
            }
            security::SecurityError::InvalidPath(msg) => Error::Config(msg),
            other => Error::Parse(other.to_string()),
        }
    }
}

impl From<confirmation::ConfirmationError> for Error {
    fn from(err: confirmation::ConfirmationError) -> Self {
        match err {
            confirmation::ConfirmationError::Cancelled => Error::Cancelled,
            other => Error::InvalidRequest(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(Error::Permission("x".into()).is_authorization_error());
        assert!(Error::Cancelled.is_authorization_error());
        assert!(Error::Parse("x".into()).is_configuration_error());
        assert_eq!(
            Error::Io(std::io::Error::other("disk")).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: Error = confirmation::ConfirmationError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: Error = confirmation::ConfirmationError::PromptCount(0).into();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let err: Error = security::SecurityError::UnterminatedQuote("echo \"".into()).into();
        assert!(matches!(err, Error::Parse(_)));

        let err: Error = config::ConfigError::WriterClosed.into();
        assert!(err.is_configuration_error());
    }
}
