// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use similar::{ChangeTag, TextDiff};
use tracing::debug;

use warden_config::AgentMode;

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Replace exactly one occurrence of `old_string` with `new_string` in a
/// file's content, or every occurrence if `replace_all` is set.
///
/// The contract is deliberately narrow: no fuzzy or indent-normalized
/// matching. The caller must supply the exact substring to replace. This
/// keeps the failure mode obvious — zero or multiple matches is always an
/// error rather than a best-effort guess.
pub struct EditTool;

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Performs an exact string replacement in a file. old_string must match exactly one \
         location in the file unless replace_all is set; zero matches or more than one match \
         (without replace_all) is an error. old_string and new_string must differ. \
         Always read the file first so you know the exact text to match, including whitespace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file to edit" },
                "old_string": { "type": "string", "description": "Exact text to replace" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": {
                    "type": "boolean",
                    "description": "Replace every occurrence instead of requiring exactly one (default false)"
                }
            },
            "required": ["path", "old_string", "new_string"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    fn modes(&self) -> &[AgentMode] {
        &[AgentMode::Agent]
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let path = match call.args.get("path").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'path'"),
        };
        let old_string = match call.args.get("old_string").and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'old_string'"),
        };
        let new_string = match call.args.get("new_string").and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'new_string'"),
        };
        let replace_all = call.args.get("replace_all").and_then(|v| v.as_bool()).unwrap_or(false);

        debug!(path = %path, replace_all, "edit tool");

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) => return ToolOutput::err(&call.id, format!("read error: {e}")),
        };

        match apply_single_edit(&original, &old_string, &new_string, replace_all) {
            Ok(updated) => match crate::builtin::write::atomic_write_text(&path, &updated).await {
                Ok(_) => {
                    let diff = unified_diff(&path, &original, &updated);
                    ToolOutput::ok(&call.id, diff)
                }
                Err(e) => ToolOutput::err(&call.id, format!("write error: {e}")),
            },
            Err(e) => ToolOutput::err(&call.id, e),
        }
    }
}

/// Apply one old_string → new_string replacement to `content`, enforcing the
/// exact-occurrence contract shared by `edit` and `multi_edit`.
pub(crate) fn apply_single_edit(
    content: &str,
    old_string: &str,
    new_string: &str,
    replace_all: bool,
) -> Result<String, String> {
    if old_string == new_string {
        return Err("old_string and new_string are identical; no edit to apply".to_string());
    }
    if old_string.is_empty() {
        return Err("old_string must not be empty".to_string());
    }
    let count = content.matches(old_string).count();
    if count == 0 {
        return Err(format!("old_string not found in file: {old_string:?}"));
    }
    if count > 1 && !replace_all {
        return Err(format!(
            "old_string matches {count} locations; pass replace_all=true or narrow old_string to a unique match"
        ));
    }
    if replace_all {
        Ok(content.replace(old_string, new_string))
    } else {
        Ok(content.replacen(old_string, new_string, 1))
    }
}

/// Render a unified diff between `before` and `after` for display to the
/// user/model, headed by `path`.
pub(crate) fn unified_diff(path: &str, before: &str, after: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut out = format!("--- {path}\n+++ {path}\n");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push_str(change.as_str().unwrap_or(""));
        if !change.as_str().unwrap_or("").ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
