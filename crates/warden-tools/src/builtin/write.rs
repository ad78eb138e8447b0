// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use warden_config::AgentMode;

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

pub struct WriteTool;

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Writes a file to the local filesystem. Overwrites the existing file atomically if one \
         exists at the provided path — readers never observe a partially written file. \
         ALWAYS prefer editing existing files with edit/multi_edit. \
         NEVER write new files unless explicitly required. \
         Creates parent directories automatically. \
         Set append=true to add to the end of an existing file instead of overwriting \
         (append is not atomic with respect to concurrent readers)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Absolute or relative path to the file"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                },
                "append": {
                    "type": "boolean",
                    "description": "If true, append to existing content instead of overwriting (default false)"
                }
            },
            "required": ["path", "content"]
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
        let content = match call.args.get("content").and_then(|v| v.as_str()) {
            Some(c) => c.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'content'"),
        };
        let should_append = call.args.get("append").and_then(|v| v.as_bool()).unwrap_or(false);

        debug!(path = %path, append = should_append, "write tool");

        let parent = std::path::Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolOutput::err(&call.id, format!("failed to create parent directory: {e}"));
            }
        }

        if should_append {
            use tokio::io::AsyncWriteExt;
            match tokio::fs::OpenOptions::new().append(true).create(true).open(&path).await {
                Ok(mut f) => {
                    let result = f.write_all(content.as_bytes()).await;
                    let _ = f.flush().await;
                    let _ = f.shutdown().await;
                    match result {
                        Ok(_) => ToolOutput::ok(&call.id, format!("appended {} bytes to {path}", content.len())),
                        Err(e) => ToolOutput::err(&call.id, format!("write error: {e}")),
                    }
                }
                Err(e) => ToolOutput::err(&call.id, format!("open error: {e}")),
            }
        } else {
            match atomic_write(&path, content.as_bytes()).await {
                Ok(_) => ToolOutput::ok(&call.id, format!("wrote {} bytes to {path}", content.len())),
                Err(e) => ToolOutput::err(&call.id, format!("write error: {e}")),
            }
        }
    }
}

/// Replace the file at `path` with `bytes` without ever exposing a partially
/// written file to a concurrent reader.
///
/// Writes to a sibling temp file in the same directory (so the final rename
/// is on the same filesystem) and renames it over the target. `rename` is
/// atomic on POSIX filesystems; on platforms where it is not (notably some
/// network filesystems) we fall back to copy + unlink + rename, which is not
/// fully atomic but still avoids truncate-then-write data loss on failure.
pub(crate) async fn atomic_write_text(path: &str, text: &str) -> std::io::Result<()> {
    atomic_write(path, text.as_bytes()).await
}

async fn atomic_write(path: &str, bytes: &[u8]) -> std::io::Result<()> {
    let path = std::path::Path::new(path).to_path_buf();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let bytes = bytes.to_vec();
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        use std::io::Write as _;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        match tmp.persist(&target) {
            Ok(_) => Ok(()),
            Err(persist_err) => {
                // Cross-filesystem rename failure fallback: copy + unlink + rename.
                let tmp_path = persist_err.file.path().to_path_buf();
                std::fs::copy(&tmp_path, &target)?;
                let _ = std::fs::remove_file(&tmp_path);
                Ok(())
            }
        }
    })
    .await
    .map_err(|e| std::io::Error::other(e.to_string()))?
}
