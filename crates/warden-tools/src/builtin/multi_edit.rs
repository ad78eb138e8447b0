// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use warden_config::AgentMode;

use crate::builtin::edit_file::{apply_single_edit, unified_diff};
use crate::builtin::write::atomic_write_text;
use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Apply a sequence of `edit`-style replacements to a single file as one
/// atomic unit: either every edit in the list applies cleanly and the file
/// is written once, or none of them are written and the file on disk is
/// untouched.
///
/// Edits are applied in order against the in-memory result of the previous
/// edit, so a later edit can target text introduced by an earlier one.
pub struct MultiEditTool;

#[async_trait]
impl Tool for MultiEditTool {
    fn name(&self) -> &str {
        "multi_edit"
    }

    fn description(&self) -> &str {
        "Applies multiple exact string-replacement edits to a single file atomically. \
         Each edit has the same contract as edit (old_string must match exactly once unless \
         replace_all is set). Edits are applied in order, each against the result of the \
         previous one. If any edit fails, no changes are written to disk."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file to edit" },
                "edits": {
                    "type": "array",
                    "description": "Ordered list of edits to apply",
                    "items": {
                        "type": "object",
                        "properties": {
                            "old_string": { "type": "string" },
                            "new_string": { "type": "string" },
                            "replace_all": { "type": "boolean" }
                        },
                        "required": ["old_string", "new_string"]
                    },
                    "minItems": 1
                }
            },
            "required": ["path", "edits"],
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
        let edits = match call.args.get("edits").and_then(|v| v.as_array()) {
            Some(e) if !e.is_empty() => e.clone(),
            Some(_) => return ToolOutput::err(&call.id, "'edits' must contain at least one edit"),
            None => return ToolOutput::err(&call.id, "missing required parameter 'edits'"),
        };

        debug!(path = %path, n = edits.len(), "multi_edit tool");

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) => return ToolOutput::err(&call.id, format!("read error: {e}")),
        };

        let mut current = original.clone();
        for (i, edit) in edits.iter().enumerate() {
            let old_string = match edit.get("old_string").and_then(|v| v.as_str()) {
                Some(s) => s,
                None => return ToolOutput::err(&call.id, format!("edit {i}: missing 'old_string'")),
            };
            let new_string = match edit.get("new_string").and_then(|v| v.as_str()) {
                Some(s) => s,
                None => return ToolOutput::err(&call.id, format!("edit {i}: missing 'new_string'")),
            };
            let replace_all = edit.get("replace_all").and_then(|v| v.as_bool()).unwrap_or(false);

            match apply_single_edit(&current, old_string, new_string, replace_all) {
                Ok(updated) => current = updated,
                Err(e) => return ToolOutput::err(&call.id, format!("edit {i} failed, no changes written: {e}")),
            }
        }

        match atomic_write_text(&path, &current).await {
            Ok(_) => {
                let diff = unified_diff(&path, &original, &current);
                ToolOutput::ok(&call.id, format!("{} edits applied\n{diff}", edits.len()))
            }
            Err(e) => ToolOutput::err(&call.id, format!("write error: {e}")),
        }
    }
}
