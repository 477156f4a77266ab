//! settings.json loading with additive merging.
//!
//! Loads settings from (lowest to highest priority):
//! 1. User settings: ~/.claude/settings.json
//! 2. Project settings: .claude/settings.json
//! 3. Local settings: .claude/settings.local.json (not committed, written by the kernel)
//!
//! Rule lists and additional directories are unioned across files; scalar
//! values take the last file that sets them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};
use crate::common::home_dir;
use crate::permissions::{PermissionMode, PolicySnapshot, RuleSet};
use crate::security::SafeZone;
use crate::security::path::expand_home;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    #[default]
    User,
    Project,
    Local,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip)]
    pub source: SettingsSource,

    #[serde(default)]
    pub permissions: PermissionSettings,

    #[serde(default, rename = "plansDirectory")]
    pub plans_directory: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Settings {
    pub fn with_source(mut self, source: SettingsSource) -> Self {
        self.source = source;
        self
    }

    /// Build the immutable policy for a session rooted at `project_dir`.
    pub fn to_snapshot(&self, project_dir: &Path) -> PolicySnapshot {
        let zone = SafeZone::new(project_dir)
            .with_additional(self.permissions.additional_directories.iter().map(PathBuf::from));

        PolicySnapshot {
            rules: RuleSet::from_strings(&self.permissions.allow),
            zone,
            plans_dir: self.plans_dir(project_dir),
            default_mode: self.permissions.mode(),
        }
    }

    fn plans_dir(&self, project_dir: &Path) -> PathBuf {
        match &self.plans_directory {
            Some(dir) => {
                let dir = expand_home(Path::new(dir));
                if dir.is_absolute() {
                    dir
                } else {
                    project_dir.join(dir)
                }
            }
            None => home_dir()
                .unwrap_or_else(|| project_dir.to_path_buf())
                .join(".claude")
                .join("plans"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionSettings {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default, rename = "additionalDirectories")]
    pub additional_directories: Vec<String>,
    #[serde(default, rename = "defaultMode")]
    pub default_mode: Option<String>,
}

impl PermissionSettings {
    /// Configured starting mode; unknown names fall back to default.
    pub fn mode(&self) -> PermissionMode {
        let Some(mode_str) = &self.default_mode else {
            return PermissionMode::Default;
        };
        match mode_str.parse::<PermissionMode>() {
            Ok(mode) => mode,
            Err(e) => {
                tracing::warn!(mode = %mode_str, error = %e, "Ignoring unknown defaultMode");
                PermissionMode::Default
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.additional_directories.is_empty() && self.default_mode.is_none()
    }
}

/// Locations of the three settings layers for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    project_dir: PathBuf,
    user: Option<PathBuf>,
}

impl SettingsPaths {
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            user: home_dir().map(|home| home.join(".claude").join("settings.json")),
        }
    }

    /// Override the user-level settings file, or disable it with `None`.
    pub fn with_user_settings(mut self, path: Option<PathBuf>) -> Self {
        self.user = path;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn user(&self) -> Option<&Path> {
        self.user.as_deref()
    }

    pub fn project(&self) -> PathBuf {
        self.project_dir.join(".claude").join("settings.json")
    }

    /// The only settings file the kernel writes.
    pub fn local(&self) -> PathBuf {
        self.project_dir.join(".claude").join("settings.local.json")
    }

    fn layers(&self) -> Vec<(PathBuf, SettingsSource)> {
        let mut layers = Vec::with_capacity(3);
        if let Some(user) = &self.user {
            layers.push((user.clone(), SettingsSource::User));
        }
        layers.push((self.project(), SettingsSource::Project));
        layers.push((self.local(), SettingsSource::Local));
        layers
    }
}

/// Settings loader that merges from multiple sources.
#[derive(Debug)]
pub struct SettingsLoader {
    paths: SettingsPaths,
    settings: Settings,
}

impl SettingsLoader {
    pub fn new(paths: SettingsPaths) -> Self {
        Self {
            paths,
            settings: Settings::default(),
        }
    }

    /// Load and merge every layer.
    ///
    /// Never fails: a missing file is skipped, an unreadable or malformed one
    /// is logged and contributes nothing.
    pub async fn load(mut self) -> Settings {
        for (path, source) in self.paths.layers() {
            match self.merge_file(&path, source).await {
                Ok(()) => {}
                Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        source = ?source,
                        error = %e,
                        "Ignoring unreadable settings file"
                    );
                }
            }
        }
        self.settings
    }

    async fn merge_file(&mut self, path: &Path, source: SettingsSource) -> ConfigResult<()> {
        let content = tokio::fs::read_to_string(path).await?;
        let file_settings: Settings = serde_json::from_str(&content)?;
        self.merge_settings(file_settings.with_source(source));
        Ok(())
    }

    fn merge_settings(&mut self, other: Settings) {
        let permissions = &mut self.settings.permissions;
        for rule in other.permissions.allow {
            if !permissions.allow.contains(&rule) {
                permissions.allow.push(rule);
            }
        }
        for dir in other.permissions.additional_directories {
            if !permissions.additional_directories.contains(&dir) {
                permissions.additional_directories.push(dir);
            }
        }
        if other.permissions.default_mode.is_some() {
            permissions.default_mode = other.permissions.default_mode;
        }
        if other.plans_directory.is_some() {
            self.settings.plans_directory = other.plans_directory;
        }
        self.settings.extra.extend(other.extra);
        self.settings.source = other.source;
    }
}
