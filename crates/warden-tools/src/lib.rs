// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod builtin;
pub mod policy;
pub mod registry;
pub mod tool;

use thiserror::Error;
use warden_config::ToolsConfig;

pub use policy::{ApprovalPolicy, BashAllowlist, InvalidPatternError, ToolPolicy};
pub use registry::{DuplicateToolError, ToolRegistry, ToolSchema};
pub use tool::{OutputCategory, Tool, ToolCall, ToolOutput};

pub use builtin::bash::BashTool;
pub use builtin::edit_file::EditTool;
pub use builtin::grep::GrepTool;
pub use builtin::multi_edit::MultiEditTool;
pub use builtin::read_file::ReadTool;
pub use builtin::tree::TreeTool;
pub use builtin::write::WriteTool;

/// Failure constructing the built-in tool registry.
#[derive(Debug, Error)]
pub enum RegisterToolsError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateToolError),
    #[error("invalid bash allow-list pattern: {0}")]
    InvalidAllowlistPattern(#[from] InvalidPatternError),
}

/// Register the seven built-in tools into a fresh registry.
///
/// Returns an error if any two tools collide on name, which would indicate
/// a bug in this crate rather than user configuration (tool names here are
/// fixed, not user-supplied), or if a configured bash allow-list regex
/// pattern fails to compile.
pub fn register_builtin_tools(registry: &mut ToolRegistry, tools_cfg: &ToolsConfig) -> Result<(), RegisterToolsError> {
    registry.register(ReadTool)?;
    registry.register(WriteTool)?;
    registry.register(EditTool)?;
    registry.register(MultiEditTool)?;
    registry.register(BashTool {
        timeout_secs: tools_cfg.timeout_secs,
        allowlist: BashAllowlist::from_config(tools_cfg)?,
    })?;
    registry.register(GrepTool)?;
    registry.register(TreeTool)?;
    Ok(())
}
