//! Safe zone containment using real filesystem resolution.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::normalize_path;
use crate::common::home_dir;
use crate::security::SecurityError;

/// Directory subtrees inside which automatic approval is possible.
///
/// Roots are stored as given and canonicalised at every check, so symlinks
/// created or retargeted during the session are honoured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZone {
    working_dir: PathBuf,
    #[serde(default)]
    additional: Vec<PathBuf>,
}

impl SafeZone {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            additional: Vec::new(),
        }
    }

    /// Add trusted directories; relative entries are taken from the working directory.
    pub fn with_additional(mut self, dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        for dir in dirs {
            let dir = expand_home(&dir.into());
            let dir = if dir.is_absolute() {
                dir
            } else {
                self.working_dir.join(dir)
            };
            if !self.additional.contains(&dir) {
                self.additional.push(dir);
            }
        }
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn additional(&self) -> &[PathBuf] {
        &self.additional
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.working_dir.as_path()).chain(self.additional.iter().map(PathBuf::as_path))
    }

    /// Resolve `target` against the working directory to its canonical form.
    pub fn resolve(&self, target: &Path) -> PathBuf {
        let target = expand_home(target);
        let absolute = if target.is_absolute() {
            target
        } else {
            self.working_dir.join(target)
        };
        resolve_real(&absolute)
    }

    pub fn contains(&self, target: &Path) -> bool {
        is_inside_safe_zone(target, self)
    }

    /// Canonical form of `target` if it lies inside the zone.
    pub fn ensure_contains(&self, target: &Path) -> Result<PathBuf, SecurityError> {
        if target.as_os_str().is_empty() {
            return Err(SecurityError::InvalidPath("empty path".into()));
        }
        if !self.contains(target) {
            return Err(SecurityError::NotWithinSafeZone(self.resolve(target)));
        }
        Ok(self.resolve(target))
    }
}

/// Whether `target` resolves to one of the zone roots or a descendant of one.
pub fn is_inside_safe_zone(target: &Path, zone: &SafeZone) -> bool {
    let resolved = zone.resolve(target);
    let inside = zone
        .roots()
        .map(resolve_real)
        .any(|root| resolved.starts_with(&root));
    if !inside {
        tracing::debug!(
            target = %target.display(),
            resolved = %resolved.display(),
            "Path outside safe zone"
        );
    }
    inside
}

/// Canonicalise through the filesystem, following symlinks.
///
/// For paths that do not exist, the longest existing ancestor is canonicalised and
/// the remaining components are appended lexically.
pub fn resolve_real(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let normalized = normalize_path(path);
    let mut existing = normalized.as_path();
    let mut remainder: Vec<Component<'_>> = Vec::new();
    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            let mut resolved = canonical;
            for component in remainder.iter().rev() {
                match component {
                    Component::ParentDir => {
                        resolved.pop();
                    }
                    Component::CurDir => {}
                    other => resolved.push(other.as_os_str()),
                }
            }
            return resolved;
        }
        match (existing.parent(), existing.components().next_back()) {
            (Some(parent), Some(last)) => {
                remainder.push(last);
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn canonical_tempdir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_workdir_and_descendants_inside() {
        let (_dir, root) = canonical_tempdir();
        fs::create_dir_all(root.join("src/components")).unwrap();
        let zone = SafeZone::new(&root);

        assert!(is_inside_safe_zone(&root, &zone));
        assert!(is_inside_safe_zone(Path::new("src"), &zone));
        assert!(is_inside_safe_zone(Path::new("src/components"), &zone));
        assert!(is_inside_safe_zone(&root.join("src/new_file.rs"), &zone));
    }

    #[test]
    fn test_parent_and_absolute_outside() {
        let (_dir, root) = canonical_tempdir();
        let zone = SafeZone::new(&root);

        assert!(!is_inside_safe_zone(Path::new(".."), &zone));
        assert!(!is_inside_safe_zone(Path::new("/etc"), &zone));
        assert!(!is_inside_safe_zone(Path::new("src/../../escape"), &zone));
    }

    #[test]
    fn test_sibling_prefix_not_inside() {
        let (_dir, root) = canonical_tempdir();
        fs::create_dir_all(root.join("project")).unwrap();
        fs::create_dir_all(root.join("project-other")).unwrap();
        let zone = SafeZone::new(root.join("project"));

        assert!(!is_inside_safe_zone(&root.join("project-other"), &zone));
    }

    #[test]
    fn test_symlink_escape_detected() {
        let (_dir, root) = canonical_tempdir();
        let (_outside_dir, outside) = canonical_tempdir();
        fs::create_dir_all(root.join("project")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("project/link")).unwrap();
        let zone = SafeZone::new(root.join("project"));

        assert!(!is_inside_safe_zone(Path::new("link"), &zone));
        assert!(!is_inside_safe_zone(Path::new("link/new.txt"), &zone));
    }

    #[test]
    fn test_nonexistent_paths_resolved_lexically() {
        let (_dir, root) = canonical_tempdir();
        let zone = SafeZone::new(&root);

        assert!(is_inside_safe_zone(Path::new("missing/deeper/file.txt"), &zone));
        assert!(!is_inside_safe_zone(Path::new("missing/../../file.txt"), &zone));
    }

    #[test]
    fn test_ensure_contains() {
        let (_dir, root) = canonical_tempdir();
        let zone = SafeZone::new(&root);

        assert_eq!(zone.ensure_contains(Path::new("a/b.txt")).unwrap(), root.join("a/b.txt"));
        assert!(matches!(
            zone.ensure_contains(Path::new("/etc/passwd")),
            Err(SecurityError::NotWithinSafeZone(_))
        ));
        assert!(matches!(
            zone.ensure_contains(Path::new("")),
            Err(SecurityError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_additional_directories() {
        let (_dir, root) = canonical_tempdir();
        fs::create_dir_all(root.join("project")).unwrap();
        fs::create_dir_all(root.join("shared-lib")).unwrap();
        let zone = SafeZone::new(root.join("project")).with_additional(["../shared-lib"]);

        assert!(is_inside_safe_zone(&root.join("shared-lib/mod.rs"), &zone));
        assert!(!is_inside_safe_zone(&root.join("elsewhere"), &zone));
    }
}
