//! Layered `settings.json` loading.
//!
//! ```rust,no_run
//! use agent_permissions::config::{SettingsLoader, SettingsPaths};
//!
//! # async fn example() {
//! let paths = SettingsPaths::for_project("./project");
//! let settings = SettingsLoader::new(paths).load().await;
//! println!("{} allow rules", settings.permissions.allow.len());
//! # }
//! ```

pub mod settings;

pub use settings::{PermissionSettings, Settings, SettingsLoader, SettingsPaths, SettingsSource};

use thiserror::Error;

/// Errors that can occur in configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings writer task has shut down
    #[error("Settings writer is not running")]
    WriterClosed,
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
