//! Persisted allow rules of the form `Tool(argument)`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::tools::ToolName;

static TOOL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid tool name regex"));

/// An exactly-matched allow rule.
///
/// `Bash(git status)` allows the simple command whose normalised text is exactly
/// `git status`; the argument is kept byte for byte, edge whitespace included.
/// A bare tool name such as `Read` or `Edit` allows that tool as a whole and
/// never matches a shell command.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PermissionRule {
    tool: String,
    argument: Option<String>,
}

impl PermissionRule {
    pub fn new(tool: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            tool: tool.into(),
            argument,
        }
    }

    pub fn bash(command: impl Into<String>) -> Self {
        Self::new(ToolName::Bash.as_str(), Some(command.into()))
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn is_bash(&self) -> bool {
        self.tool == ToolName::Bash.as_str()
    }

    /// Exact equality against a normalised shell command.
    pub fn matches_command(&self, raw_text: &str) -> bool {
        self.is_bash() && self.argument.as_deref() == Some(raw_text)
    }

    /// Bare rule for a non-shell tool.
    pub fn matches_tool(&self, tool: ToolName) -> bool {
        tool != ToolName::Bash && self.argument.is_none() && self.tool == tool.as_str()
    }

    fn parse_scope(s: &str) -> Option<(&str, &str)> {
        let start = s.find('(')?;
        let inner = s[start + 1..].strip_suffix(')')?;
        Some((&s[..start], inner))
    }
}

impl std::str::FromStr for PermissionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (tool, argument) = match Self::parse_scope(s) {
            Some((tool, argument)) => {
                if argument.trim().is_empty() {
                    return Err(format!("Empty rule argument: {}", s));
                }
                (tool.trim(), Some(argument.to_string()))
            }
            None if s.contains('(') || s.contains(')') => {
                return Err(format!("Malformed rule: {}", s));
            }
            None => (s, None),
        };
        if !TOOL_NAME_RE.is_match(tool) {
            return Err(format!("Invalid tool name in rule: {}", s));
        }
        Ok(Self::new(tool, argument))
    }
}

impl std::fmt::Display for PermissionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{}({})", self.tool, argument),
            None => write!(f, "{}", self.tool),
        }
    }
}

impl Serialize for PermissionRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermissionRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered, duplicate-free set of rules merged from every settings source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<PermissionRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rule strings, skipping and logging the malformed ones.
    pub fn from_strings<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for entry in entries {
            match entry.as_ref().parse::<PermissionRule>() {
                Ok(rule) => {
                    set.insert(rule);
                }
                Err(e) => tracing::warn!(rule = entry.as_ref(), error = %e, "Ignoring invalid permission rule"),
            }
        }
        set
    }

    /// Returns false when the rule was already present.
    pub fn insert(&mut self, rule: PermissionRule) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn extend(&mut self, other: RuleSet) {
        for rule in other.rules {
            self.insert(rule);
        }
    }

    pub fn contains(&self, rule: &PermissionRule) -> bool {
        self.rules.contains(rule)
    }

    /// True when a bare rule names `tool`.
    pub fn allows_tool(&self, tool: ToolName) -> bool {
        self.rules.iter().any(|rule| rule.matches_tool(tool))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<PermissionRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = PermissionRule>>(iter: T) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a PermissionRule;
    type IntoIter = std::slice::Iter<'a, PermissionRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scoped_rule() {
        let rule: PermissionRule = "Bash(git status)".parse().unwrap();
        assert_eq!(rule.tool(), "Bash");
        assert_eq!(rule.argument(), Some("git status"));
        assert_eq!(rule.to_string(), "Bash(git status)");
    }

    #[test]
    fn test_parse_nested_parentheses() {
        let rule: PermissionRule = "Bash(echo (hi))".parse().unwrap();
        assert_eq!(rule.argument(), Some("echo (hi)"));
    }

    #[test]
    fn test_parse_bare_tool() {
        let rule: PermissionRule = "Read".parse().unwrap();
        assert_eq!(rule.argument(), None);
        assert!(!rule.matches_command("Read"));
    }

    #[test]
    fn test_argument_whitespace_preserved() {
        let rule = PermissionRule::bash("echo x ");
        let parsed: PermissionRule = rule.to_string().parse().unwrap();
        assert_eq!(parsed, rule);
        assert!(parsed.matches_command("echo x "));
        assert!(!parsed.matches_command("echo x"));
        assert!("Bash(   )".parse::<PermissionRule>().is_err());
    }

    #[test]
    fn test_bare_tool_rules() {
        let set = RuleSet::from_strings(["Read", "Edit", "Bash", "Write(src/main.rs)"]);
        assert!(set.allows_tool(ToolName::Read));
        assert!(set.allows_tool(ToolName::Edit));
        assert!(!set.allows_tool(ToolName::Write));
        assert!(!set.allows_tool(ToolName::Glob));
        assert!(!set.allows_tool(ToolName::Bash));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("Bash()".parse::<PermissionRule>().is_err());
        assert!("Bash(ls".parse::<PermissionRule>().is_err());
        assert!("(ls)".parse::<PermissionRule>().is_err());
        assert!("Bash(ls) extra".parse::<PermissionRule>().is_err());
    }

    #[test]
    fn test_exact_match_only() {
        let rule = PermissionRule::bash("git status");
        assert!(rule.matches_command("git status"));
        assert!(!rule.matches_command("git status --short"));
        assert!(!rule.matches_command("git"));
        assert!(!PermissionRule::new("Write", Some("git status".into())).matches_command("git status"));
    }

    #[test]
    fn test_rule_set_dedupes() {
        let set = RuleSet::from_strings(["Bash(ls)", "Bash(ls)", "Bash(pwd)", "Bash(", "Read"]);
        assert_eq!(set.len(), 3);

        let mut merged = set.clone();
        merged.extend(RuleSet::from_strings(["Bash(pwd)", "Bash(make)"]));
        let rendered: Vec<String> = merged.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Bash(ls)", "Bash(pwd)", "Read", "Bash(make)"]);
    }

    #[test]
    fn test_serde_as_string() {
        let rule = PermissionRule::bash("cargo test");
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, "\"Bash(cargo test)\"");
        let parsed: PermissionRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }
}
