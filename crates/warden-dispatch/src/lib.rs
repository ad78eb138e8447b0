// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Concurrent tool execution with an approval gate.
//!
//! [`ToolDispatcher`] sits between the agent loop and [`ToolRegistry`]: it
//! runs a batch of tool calls under a concurrency ceiling, routes calls that
//! need human sign-off through an approval channel, and always returns
//! outputs in the same order the calls were submitted — regardless of which
//! one finishes first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::warn;

use warden_tools::{ApprovalPolicy, ToolCall, ToolOutput, ToolPolicy, ToolRegistry};

/// A tool call that needs a human decision before it can run.
pub struct ApprovalRequest {
    pub call: ToolCall,
    /// Human-readable rendering of what the call would do (e.g. the shell
    /// command string), shown to the approver.
    pub preview: String,
    pub respond_to: oneshot::Sender<ApprovalDecision>,
}

impl std::fmt::Debug for ApprovalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalRequest")
            .field("call", &self.call)
            .field("preview", &self.preview)
            .finish()
    }
}

/// The approver's answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Run this one call.
    Allow,
    /// Run this call, and auto-approve matching calls for the rest of the
    /// session. Never persisted to disk or config.
    AllowAlwaysThisSession,
    /// Refuse. Produces a synthetic failed result, never a panic.
    Deny,
}

/// Executes batches of [`ToolCall`]s against a [`ToolRegistry`], gating
/// anything above [`ApprovalPolicy::Auto`] behind an approval channel.
///
/// One dispatcher is created per agent session: `session_allowed` tracks
/// `allow_always_this_session` upgrades for the lifetime of the dispatcher
/// and is never written back to config or storage.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    policy: Arc<ToolPolicy>,
    semaphore: Arc<Semaphore>,
    approvals_tx: mpsc::Sender<ApprovalRequest>,
    session_allowed: Arc<Mutex<HashSet<String>>>,
}

impl ToolDispatcher {
    /// `max_concurrent_tools` of zero is treated as one (a dispatcher that
    /// never runs anything is a misconfiguration, not a valid degenerate
    /// case).
    pub fn new(
        registry: Arc<ToolRegistry>,
        policy: Arc<ToolPolicy>,
        max_concurrent_tools: usize,
        approvals_tx: mpsc::Sender<ApprovalRequest>,
    ) -> Self {
        Self {
            registry,
            policy,
            semaphore: Arc::new(Semaphore::new(max_concurrent_tools.max(1))),
            approvals_tx,
            session_allowed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Run every call in `calls` concurrently (bounded by the configured
    /// ceiling) and return their outputs in the same order as `calls`.
    pub async fn dispatch(&self, calls: Vec<ToolCall>) -> Vec<ToolOutput> {
        Self::join_all(self.spawn_all(calls)).await
    }

    /// Like [`dispatch`], but abandons every in-flight call (aborting its
    /// task, whether it is blocked on approval or mid-execution) the moment
    /// `cancel` resolves, returning `None` instead of a result vector.
    pub async fn dispatch_cancellable(
        &self,
        calls: Vec<ToolCall>,
        cancel: &mut oneshot::Receiver<()>,
    ) -> Option<Vec<ToolOutput>> {
        let tasks = self.spawn_all(calls);
        let abort_handles: Vec<_> = tasks.iter().map(|task| task.abort_handle()).collect();
        tokio::select! {
            biased;
            _ = &mut *cancel => {
                for handle in &abort_handles {
                    handle.abort();
                }
                None
            }
            outputs = Self::join_all(tasks) => Some(outputs),
        }
    }

    fn spawn_all(&self, calls: Vec<ToolCall>) -> Vec<tokio::task::JoinHandle<ToolOutput>> {
        let mut tasks = Vec::with_capacity(calls.len());
        for call in calls {
            let registry = Arc::clone(&self.registry);
            let policy = Arc::clone(&self.policy);
            let semaphore = Arc::clone(&self.semaphore);
            let approvals_tx = self.approvals_tx.clone();
            let session_allowed = Arc::clone(&self.session_allowed);
            tasks.push(tokio::spawn(async move {
                Self::run_one(registry, policy, semaphore, approvals_tx, session_allowed, call).await
            }));
        }
        tasks
    }

    async fn join_all(tasks: Vec<tokio::task::JoinHandle<ToolOutput>>) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(tasks.len());
        for task in tasks {
            outputs.push(match task.await {
                Ok(output) => output,
                Err(e) => {
                    warn!(error = %e, "tool task panicked or was cancelled");
                    ToolOutput::err("unknown", format!("tool panicked: {e}"))
                }
            });
        }
        outputs
    }

    async fn run_one(
        registry: Arc<ToolRegistry>,
        policy: Arc<ToolPolicy>,
        semaphore: Arc<Semaphore>,
        approvals_tx: mpsc::Sender<ApprovalRequest>,
        session_allowed: Arc<Mutex<HashSet<String>>>,
        call: ToolCall,
    ) -> ToolOutput {
        let Some(tool) = registry.get(&call.name) else {
            return ToolOutput::err(&call.id, format!("unknown tool: {}", call.name));
        };

        let preview = preview_for(&call);
        let approval_key = format!("{}:{}", call.name, preview);

        let decision = if session_allowed.lock().unwrap().contains(&approval_key) {
            ApprovalPolicy::Auto
        } else {
            // An explicit auto-approve or deny pattern match always wins
            // over the tool's own baseline; an unmatched call (policy
            // returns Ask, its no-match default) falls back to whatever the
            // tool itself declares as its default approval level.
            match policy.decide(&preview) {
                ApprovalPolicy::Ask => tool.default_policy(),
                explicit => explicit,
            }
        };

        match decision {
            ApprovalPolicy::Deny => return ToolOutput::err(&call.id, "denied by policy"),
            ApprovalPolicy::Auto => {}
            ApprovalPolicy::Ask => {
                let (tx, rx) = oneshot::channel();
                let request = ApprovalRequest {
                    call: call.clone(),
                    preview: preview.clone(),
                    respond_to: tx,
                };
                if approvals_tx.send(request).await.is_err() {
                    // No approver listening: fail closed.
                    return ToolOutput::err(&call.id, "denied by user");
                }
                match rx.await {
                    Ok(ApprovalDecision::Allow) => {}
                    Ok(ApprovalDecision::AllowAlwaysThisSession) => {
                        session_allowed.lock().unwrap().insert(approval_key);
                    }
                    Ok(ApprovalDecision::Deny) | Err(_) => {
                        return ToolOutput::err(&call.id, "denied by user");
                    }
                }
            }
        }

        let _permit = semaphore
            .acquire()
            .await
            .expect("dispatcher semaphore is never closed");
        registry.execute(&call).await
    }
}

/// Render the part of a call's arguments worth showing an approver.
fn preview_for(call: &ToolCall) -> String {
    if call.name == "bash" {
        if let Some(cmd) = call.args.get("command").and_then(|v| v.as_str()) {
            return cmd.to_string();
        }
    }
    call.args.to_string()
}
