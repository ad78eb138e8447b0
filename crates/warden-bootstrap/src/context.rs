// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime context types for agent construction.
//!
//! [`RuntimeContext`] holds environment-detected information (project root,
//! git state, CI environment) that is not part of the config file schema.

use std::path::PathBuf;

use warden_runtime::{CiContext, GitContext};

/// Environment-detected context for an agent session.
///
/// This is separate from [`warden_config::AgentConfig`] (which holds only
/// config-file fields) so that the two concerns — "what the user configured"
/// and "what we found at runtime" — stay cleanly separated.
#[derive(Default)]
pub struct RuntimeContext {
    /// Absolute path to the project root (detected from `.git` walk-up).
    pub project_root: Option<PathBuf>,
    /// Live git metadata (branch, commit, dirty state).
    pub git_context: Option<GitContext>,
    /// CI environment metadata.
    pub ci_context: Option<CiContext>,
    /// Contents of `.warden/context.md`, `AGENTS.md`, or `CLAUDE.md`.
    pub project_context_file: Option<String>,
    /// Text appended after the default system prompt Guidelines section.
    pub append_system_prompt: Option<String>,
    /// Full system prompt override (from `--system-prompt-file`).
    pub system_prompt_override: Option<String>,
}

impl RuntimeContext {
    /// Create with auto-detected project, git, and CI context.
    pub fn auto_detect() -> Self {
        let project_root = warden_runtime::find_project_root().ok();
        let git_context = project_root.as_ref()
            .map(|r| warden_runtime::collect_git_context(r));
        let ci_context = Some(warden_runtime::detect_ci_context());
        let project_context_file = project_root.as_ref()
            .and_then(|r| warden_runtime::load_project_context_file(r));

        Self {
            project_root,
            git_context,
            ci_context,
            project_context_file,
            append_system_prompt: None,
            system_prompt_override: None,
        }
    }

    /// Create an empty context (no project/git/CI detection).
    pub fn empty() -> Self {
        Self::default()
    }
}
