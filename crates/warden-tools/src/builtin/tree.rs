// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Default recursion depth when the caller does not specify `max_depth`.
const DEFAULT_MAX_DEPTH: usize = 3;
/// Hard ceiling on the number of entries rendered, regardless of depth.
const MAX_ENTRIES: usize = 500;

/// Renders a directory as an indented tree, similar to the `tree` command.
/// Hidden entries (dotfiles) and common build/vendor directories are
/// skipped by default to keep output relevant to source exploration.
pub struct TreeTool;

#[async_trait]
impl Tool for TreeTool {
    fn name(&self) -> &str {
        "tree"
    }

    fn description(&self) -> &str {
        "Lists the contents of a directory as an indented tree. Skips dotfiles and common \
         build directories (target, node_modules, .git) by default. max_depth limits recursion \
         (default 3); the walk stops early and reports how many entries were omitted once the \
         entry cap is hit."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to list (default: current directory)" },
                "max_depth": { "type": "integer", "description": "Maximum recursion depth (default 3)" },
                "show_hidden": { "type": "boolean", "description": "Include dotfiles and dot-directories (default false)" }
            },
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let path = call.args.get("path").and_then(|v| v.as_str()).unwrap_or(".").to_string();
        let max_depth = call
            .args
            .get("max_depth")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_DEPTH as u64) as usize;
        let show_hidden = call.args.get("show_hidden").and_then(|v| v.as_bool()).unwrap_or(false);

        debug!(path = %path, max_depth, "tree tool");

        let root = std::path::PathBuf::from(&path);
        if !root.exists() {
            return ToolOutput::err(&call.id, format!("path does not exist: {path}"));
        }
        if !root.is_dir() {
            return ToolOutput::err(&call.id, format!("not a directory: {path}"));
        }

        let mut out = format!("{path}\n");
        let mut count = 0usize;
        let mut omitted = false;
        walk(&root, 0, max_depth, show_hidden, &mut out, &mut count, &mut omitted);
        if omitted {
            out.push_str(&format!("...[stopped after {MAX_ENTRIES} entries]\n"));
        }
        ToolOutput::ok(&call.id, out)
    }
}

fn is_skipped_dir(name: &str) -> bool {
    matches!(name, "target" | "node_modules" | ".git" | "dist" | "build")
}

fn walk(
    dir: &std::path::Path,
    depth: usize,
    max_depth: usize,
    show_hidden: bool,
    out: &mut String,
    count: &mut usize,
    omitted: &mut bool,
) {
    if *omitted || depth > max_depth {
        return;
    }
    let mut entries: Vec<std::fs::DirEntry> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(Result::ok).collect(),
        Err(_) => return,
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if *count >= MAX_ENTRIES {
            *omitted = true;
            return;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && is_skipped_dir(&name) {
            continue;
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str(if is_dir { "├── " } else { "├── " });
        out.push_str(&name);
        if is_dir {
            out.push('/');
        }
        out.push('\n');
        *count += 1;

        if is_dir {
            walk(&entry.path(), depth + 1, max_depth, show_hidden, out, count, omitted);
        }
    }
}
