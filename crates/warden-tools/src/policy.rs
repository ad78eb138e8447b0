// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;
use warden_config::ToolsConfig;

/// Per-tool approval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Always run without asking
    Auto,
    /// Ask user before each invocation
    Ask,
    /// Never run; return an error
    Deny,
}

/// An auto-approve or deny pattern that failed to compile.
#[derive(Debug, Error)]
#[error("invalid policy pattern \"{0}\": {1}")]
pub struct InvalidPatternError(pub String, pub regex::Error);

/// Policy engine that maps a tool call's command string to an approval
/// decision.
///
/// Patterns are compiled once at construction time. An invalid pattern is a
/// configuration error: letting it pass silently would mean a rule the
/// operator believes is active never actually matches anything, which is a
/// worse failure mode than refusing to start.
#[derive(Debug)]
pub struct ToolPolicy {
    auto_patterns: Vec<Regex>,
    deny_patterns: Vec<Regex>,
}

impl ToolPolicy {
    pub fn from_config(cfg: &ToolsConfig) -> Result<Self, InvalidPatternError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, InvalidPatternError> {
            patterns
                .iter()
                .map(|p| glob_to_regex(p).map_err(|e| InvalidPatternError(p.clone(), e)))
                .collect()
        };
        Ok(Self {
            auto_patterns: compile(&cfg.auto_approve_patterns)?,
            deny_patterns: compile(&cfg.deny_patterns)?,
        })
    }

    /// Decide whether a tool call (identified by its command string) should
    /// run automatically, prompt the user, or be denied. Deny patterns are
    /// checked first and always win over an auto-approve match.
    pub fn decide(&self, command: &str) -> ApprovalPolicy {
        for re in &self.deny_patterns {
            if re.is_match(command) {
                return ApprovalPolicy::Deny;
            }
        }
        for re in &self.auto_patterns {
            if re.is_match(command) {
                return ApprovalPolicy::Auto;
            }
        }
        ApprovalPolicy::Ask
    }
}

/// Hard allow-list gate for the bash tool.
///
/// Distinct from [`ToolPolicy`]: `ToolPolicy` decides whether a command that
/// is already permitted to run needs human approval first. `BashAllowlist`
/// decides whether the command is permitted to run at all, and refuses
/// (rather than asking) anything it doesn't recognise.
#[derive(Debug)]
pub struct BashAllowlist {
    commands: HashSet<String>,
    patterns: Vec<Regex>,
}

impl BashAllowlist {
    pub fn from_config(cfg: &ToolsConfig) -> Result<Self, InvalidPatternError> {
        let patterns = cfg
            .bash_allowed_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| InvalidPatternError(p.clone(), e)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            commands: cfg.bash_allowed_commands.iter().cloned().collect(),
            patterns,
        })
    }

    /// Whether `command` is allowed to run at all. Matches against the
    /// command string's first whitespace-separated token (the literal
    /// command name) or, failing that, any configured regex pattern against
    /// the full command string.
    pub fn permits(&self, command: &str) -> bool {
        let first_token = command.split_whitespace().next().unwrap_or("");
        if self.commands.contains(first_token) {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(command))
    }
}

/// Convert a simple shell glob pattern to a [`Regex`].
/// Only `*` (match anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_config::ToolsConfig;

    fn policy_with(auto: &[&str], deny: &[&str]) -> ToolPolicy {
        ToolPolicy::from_config(&ToolsConfig {
            auto_approve_patterns: auto.iter().map(|s| s.to_string()).collect(),
            deny_patterns: deny.iter().map(|s| s.to_string()).collect(),
            ..ToolsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn deny_beats_auto_for_same_pattern() {
        let p = policy_with(&["rm *"], &["rm *"]);
        assert_eq!(p.decide("rm /tmp/foo"), ApprovalPolicy::Deny);
    }

    #[test]
    fn deny_does_not_match_different_prefix() {
        let p = policy_with(&[], &["rm -rf /*"]);
        assert_ne!(p.decide("git status"), ApprovalPolicy::Deny);
    }

    #[test]
    fn auto_approve_wildcard_prefix() {
        let p = policy_with(&["cat *"], &[]);
        assert_eq!(p.decide("cat /etc/hosts"), ApprovalPolicy::Auto);
    }

    #[test]
    fn auto_approve_question_mark_matches_one_char() {
        let p = policy_with(&["ls ?"], &[]);
        assert_eq!(p.decide("ls -"), ApprovalPolicy::Auto);
        assert_ne!(p.decide("ls --"), ApprovalPolicy::Auto);
    }

    #[test]
    fn unknown_command_results_in_ask() {
        let p = policy_with(&["cat *"], &["rm -rf /*"]);
        assert_eq!(p.decide("git commit -m test"), ApprovalPolicy::Ask);
    }

    #[test]
    fn empty_patterns_always_ask() {
        let p = policy_with(&[], &[]);
        assert_eq!(p.decide("anything"), ApprovalPolicy::Ask);
    }

    #[test]
    fn default_config_auto_approves_cat() {
        let p = ToolPolicy::from_config(&ToolsConfig::default()).unwrap();
        assert_eq!(p.decide("cat README.md"), ApprovalPolicy::Auto);
    }

    #[test]
    fn default_config_asks_for_write_command() {
        let p = ToolPolicy::from_config(&ToolsConfig::default()).unwrap();
        assert_eq!(p.decide("cargo build"), ApprovalPolicy::Ask);
    }

    // regex crate never actually fails to compile a pattern produced by our
    // escape-everything-but-*-and-? translation, but invalid *user* regex
    // would be rejected the same way if ToolsConfig ever exposed raw regex.
    #[test]
    fn compiled_patterns_are_anchored() {
        let p = policy_with(&["cat foo"], &[]);
        assert_ne!(p.decide("cat foobar"), ApprovalPolicy::Auto);
    }

    fn allowlist_with(commands: &[&str], patterns: &[&str]) -> BashAllowlist {
        BashAllowlist::from_config(&ToolsConfig {
            bash_allowed_commands: commands.iter().map(|s| s.to_string()).collect(),
            bash_allowed_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            ..ToolsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn allowlist_permits_known_command_name() {
        let a = allowlist_with(&["echo"], &[]);
        assert!(a.permits("echo hello world"));
    }

    #[test]
    fn allowlist_refuses_unknown_command_name() {
        let a = allowlist_with(&["echo"], &[]);
        assert!(!a.permits("rm -rf /tmp/foo"));
    }

    #[test]
    fn allowlist_permits_via_regex_pattern_regardless_of_command_name() {
        let a = allowlist_with(&[], &[r"^git (status|log)\b"]);
        assert!(a.permits("git status"));
        assert!(!a.permits("git push"));
    }

    #[test]
    fn allowlist_empty_config_refuses_everything() {
        let a = allowlist_with(&[], &[]);
        assert!(!a.permits("echo hi"));
    }

    #[test]
    fn allowlist_rejects_invalid_regex_pattern() {
        let err = BashAllowlist::from_config(&ToolsConfig {
            bash_allowed_patterns: vec!["(".to_string()],
            ..ToolsConfig::default()
        });
        assert!(err.is_err());
    }
}
