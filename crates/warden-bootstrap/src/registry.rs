// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Centralised tool-registry builder.
//!
//! All callers (CI runner, TUI) use `build_tool_registry` instead of each
//! inlining their own registration loop, so the seven built-in tools stay
//! wired up identically everywhere.

use warden_config::Config;
use warden_tools::{register_builtin_tools, RegisterToolsError, ToolRegistry};

/// Build a [`ToolRegistry`] populated with the built-in tool set.
///
/// This is the single canonical place where tools are wired up. Mode (
/// Research/Plan/Agent) gates which of these tools the model is actually
/// offered — see [`warden_tools::ApprovalPolicy`] — rather than changing
/// which tools exist in the registry.
pub fn build_tool_registry(cfg: &Config) -> Result<ToolRegistry, RegisterToolsError> {
    let mut reg = ToolRegistry::new();
    register_builtin_tools(&mut reg, &cfg.tools)?;
    Ok(reg)
}
