//! Matching simple commands against explicit rules and the built-in safe list.

use std::path::{Path, PathBuf};

use super::RuleSet;
use crate::common::home_dir;
use crate::security::{SafeZone, SimpleCommand};

/// Commands allowed without a rule when every path they touch is inside the zone.
pub const BUILTIN_SAFE_COMMANDS: &[&str] = &["cd", "ls", "pwd"];

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// True iff an explicit rule equals the command's normalised text, or the
/// command qualifies for the built-in safe list.
pub fn matches(cmd: &SimpleCommand, rules: &RuleSet, zone: &SafeZone) -> bool {
    if rules.iter().any(|rule| rule.matches_command(&cmd.raw_text)) {
        return true;
    }
    is_builtin_safe(cmd, zone)
}

pub fn is_builtin_safe(cmd: &SimpleCommand, zone: &SafeZone) -> bool {
    if !BUILTIN_SAFE_COMMANDS.contains(&cmd.command.as_str()) || cmd.has_expansion {
        return false;
    }

    let Some(targets) = path_arguments(cmd) else {
        return false;
    };

    if targets.is_empty() {
        return match implicit_target(&cmd.command) {
            Some(target) => zone.contains(&target),
            None => false,
        };
    }

    targets.iter().all(|arg| is_plain_path(arg) && zone.contains(Path::new(arg)))
}

/// Non-flag arguments, or `None` when the invocation can never be safe.
fn path_arguments(cmd: &SimpleCommand) -> Option<Vec<&str>> {
    let mut targets = Vec::new();
    let mut flags_done = false;
    for arg in &cmd.args {
        if !flags_done && arg == "--" {
            flags_done = true;
            continue;
        }
        if !flags_done && cmd.command == "cd" && arg == "-" {
            // `cd -` jumps to $OLDPWD, which is unknown here
            return None;
        }
        if !flags_done && arg.starts_with('-') && arg.len() > 1 {
            continue;
        }
        targets.push(arg.as_str());
    }
    Some(targets)
}

/// Directory a command acts on when given no path.
fn implicit_target(command: &str) -> Option<PathBuf> {
    match command {
        "cd" => home_dir(),
        _ => Some(PathBuf::from(".")),
    }
}

/// Rejects words the shell would expand into something other than themselves.
fn is_plain_path(arg: &str) -> bool {
    if arg.is_empty() || arg.contains(GLOB_CHARS) {
        return false;
    }
    if let Some(rest) = arg.strip_prefix('~') {
        return rest.is_empty() || rest.starts_with('/');
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::decompose;
    use std::fs;
    use tempfile::tempdir;

    fn first(raw: &str) -> SimpleCommand {
        decompose(raw).unwrap().commands.remove(0)
    }

    fn project() -> (tempfile::TempDir, SafeZone) {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap().join("project");
        fs::create_dir_all(root.join("src/components")).unwrap();
        (dir, SafeZone::new(root))
    }

    #[test]
    fn test_bare_safe_commands() {
        let (_dir, zone) = project();
        assert!(is_builtin_safe(&first("ls"), &zone));
        assert!(is_builtin_safe(&first("pwd"), &zone));
        assert!(is_builtin_safe(&first("ls -la"), &zone));
        assert!(is_builtin_safe(&first("pwd -P"), &zone));
    }

    #[test]
    fn test_cd_inside_and_outside() {
        let (_dir, zone) = project();
        assert!(is_builtin_safe(&first("cd src"), &zone));
        assert!(is_builtin_safe(&first("cd src/components"), &zone));
        assert!(is_builtin_safe(&first("cd ."), &zone));
        assert!(!is_builtin_safe(&first("cd .."), &zone));
        assert!(!is_builtin_safe(&first("cd /etc"), &zone));
        assert!(!is_builtin_safe(&first("cd -"), &zone));
    }

    #[test]
    fn test_ls_with_paths() {
        let (_dir, zone) = project();
        assert!(is_builtin_safe(&first("ls -la src"), &zone));
        assert!(is_builtin_safe(&first("ls -- -weird-name"), &zone));
        assert!(!is_builtin_safe(&first("ls src /etc"), &zone));
        assert!(!is_builtin_safe(&first("ls ../"), &zone));
    }

    #[test]
    fn test_expansions_never_safe() {
        let (_dir, zone) = project();
        assert!(!is_builtin_safe(&first("ls $HOME"), &zone));
        assert!(!is_builtin_safe(&first("cd $(echo /)"), &zone));
        assert!(!is_builtin_safe(&first("ls *"), &zone));
        assert!(!is_builtin_safe(&first("ls {..,.}"), &zone));
        assert!(!is_builtin_safe(&first("cd ~root"), &zone));
    }

    #[test]
    fn test_other_commands_not_builtin() {
        let (_dir, zone) = project();
        assert!(!is_builtin_safe(&first("cat README.md"), &zone));
        assert!(!is_builtin_safe(&first("rm -rf src"), &zone));
    }

    #[test]
    fn test_rules_or_safe_list() {
        let (_dir, zone) = project();
        let rules = RuleSet::from_strings(["Bash(git status)", "Bash(ls /etc)"]);

        assert!(matches(&first("git status"), &rules, &zone));
        assert!(!matches(&first("git status --short"), &rules, &zone));
        assert!(matches(&first("ls /etc"), &rules, &zone));
        assert!(matches(&first("ls src"), &rules, &zone));
        assert!(!matches(&first("ls /var"), &rules, &zone));
    }

    #[test]
    fn test_assignment_prefix_matches_same_rule() {
        let (_dir, zone) = project();
        let rules = RuleSet::from_strings(["Bash(make build)"]);
        assert!(matches(&first("CI=1 make build"), &rules, &zone));
    }
}
