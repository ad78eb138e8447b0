// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use warden_config::{AgentMode, ToolsConfig};

use crate::policy::{ApprovalPolicy, BashAllowlist};
use crate::tool::{OutputCategory, Tool, ToolCall, ToolOutput};

/// Grace period after the soft timeout before the process is force-killed.
const HARD_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Runs a shell command to completion (or until it times out) and returns
/// its combined stdout/stderr.
///
/// Timeout has two stages: at the *soft* timeout (the caller-supplied or
/// default `timeout_secs`) the result is marked as timed out but the process
/// is given `HARD_TIMEOUT_GRACE` more seconds to exit on its own — many
/// processes react to the pipe closing or flush buffered output right before
/// dying. If it is still running after the grace period (the *hard*
/// timeout), it is killed outright.
///
/// Before spawning anything, the command is checked against `allowlist`: a
/// command whose first token isn't a recognised name and that matches none
/// of the configured regex patterns is refused outright, without ever
/// reaching the separate [`crate::policy::ToolPolicy`] approval gate.
pub struct BashTool {
    pub timeout_secs: u64,
    pub allowlist: BashAllowlist,
}

impl Default for BashTool {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            allowlist: BashAllowlist::from_config(&ToolsConfig::default())
                .expect("default ToolsConfig patterns always compile"),
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Executes a shell command and returns its combined stdout/stderr. Runs in a fresh shell \
         (`sh -c`), not a persistent session — state like `cd` or env vars does not survive \
         between calls. A command that exceeds the timeout is killed; its partial output is \
         still returned along with a timeout notice. Commands not on the configured allow-list \
         are refused outright, before any approval prompt."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "The shell command to run" },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Soft timeout in seconds before the command is considered hung (default 30)"
                },
                "cwd": { "type": "string", "description": "Working directory to run the command in" }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }
    fn output_category(&self) -> OutputCategory {
        OutputCategory::HeadTail
    }
    fn modes(&self) -> &[AgentMode] {
        &[AgentMode::Agent]
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let command = match call.args.get("command").and_then(|v| v.as_str()) {
            Some(c) => c.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'command'"),
        };
        let soft_timeout = call
            .args
            .get("timeout_secs")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.timeout_secs);
        let cwd = call.args.get("cwd").and_then(|v| v.as_str()).map(str::to_string);

        if !self.allowlist.permits(&command) {
            return ToolOutput::err(
                &call.id,
                format!("command refused: \"{command}\" does not match the configured bash allow-list"),
            );
        }

        debug!(command = %command, soft_timeout, "bash tool");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command);
        if let Some(cwd) = &cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => return ToolOutput::err(&call.id, format!("failed to spawn command: {e}")),
        };

        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();

        let run = async {
            let _ = tokio::join!(stdout.read_to_end(&mut out_buf), stderr.read_to_end(&mut err_buf));
            child.wait().await
        };

        let soft = Duration::from_secs(soft_timeout);
        match timeout(soft, run).await {
            Ok(Ok(status)) => {
                let combined = combine(&out_buf, &err_buf);
                if status.success() {
                    ToolOutput::ok(&call.id, combined)
                } else {
                    ToolOutput::err(
                        &call.id,
                        format!("exit status {}\n{combined}", status.code().unwrap_or(-1)),
                    )
                }
            }
            Ok(Err(e)) => ToolOutput::err(&call.id, format!("command wait failed: {e}")),
            Err(_) => {
                // Soft timeout hit: give the process HARD_TIMEOUT_GRACE more
                // seconds before force-killing it.
                match timeout(HARD_TIMEOUT_GRACE, child.wait()).await {
                    Ok(_) => {
                        let combined = combine(&out_buf, &err_buf);
                        ToolOutput::err(
                            &call.id,
                            format!(
                                "command exceeded soft timeout of {soft_timeout}s but exited during grace period\n{combined}"
                            ),
                        )
                    }
                    Err(_) => {
                        let _ = child.kill().await;
                        let combined = combine(&out_buf, &err_buf);
                        ToolOutput::err(
                            &call.id,
                            format!(
                                "command hard-timed out after {}s (soft {soft_timeout}s + grace {}s) and was killed\n{combined}",
                                soft_timeout + HARD_TIMEOUT_GRACE.as_secs(),
                                HARD_TIMEOUT_GRACE.as_secs()
                            ),
                        )
                    }
                }
            }
        }
    }
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let mut s = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !s.is_empty() && !s.ends_with('\n') {
            s.push('\n');
        }
        s.push_str(&String::from_utf8_lossy(stderr));
    }
    s
}

// Kept for parity with the pattern used by child-process stdin wiring in
// other tools; bash never writes to the child's stdin but closing it
// promptly avoids leaving commands that read stdin hanging forever.
#[allow(dead_code)]
async fn close_stdin(mut stdin: tokio::process::ChildStdin) {
    let _ = stdin.shutdown().await;
}
