// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! [`AgentBuilder`] — single entry point for constructing a fully wired Agent.
//!
//! Callers pass a [`Config`], an optional [`RuntimeContext`], the desired
//! starting mode, and a model.  The builder handles registry construction
//! and [`AgentRuntimeContext`] population internally.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use warden_config::{AgentMode, Config};
use warden_core::{Agent, AgentRuntimeContext};
use warden_dispatch::{ApprovalRequest, ToolDispatcher};
use warden_model::ModelProvider;
use warden_tools::ToolPolicy;

use crate::context::RuntimeContext;
use crate::registry::build_tool_registry;

/// Capacity of the approval channel between the dispatcher's worker tasks
/// and whatever frontend is consuming [`ApprovalRequest`]s. Generous because
/// a full parallel tool-call batch can all land in `Ask` at once.
const APPROVAL_CHANNEL_CAPACITY: usize = 64;

/// Constructs a fully wired [`Agent`] from configuration and runtime context.
///
/// # Example
/// ```rust,ignore
/// let agent = AgentBuilder::new(config)
///     .with_runtime_context(RuntimeContext::auto_detect())
///     .build(mode, model)?;
/// ```
pub struct AgentBuilder {
    config: Arc<Config>,
    runtime_ctx: RuntimeContext,
}

impl AgentBuilder {
    /// Create a builder with the given configuration.
    /// Runtime context defaults to empty (no project/git/CI detection).
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            runtime_ctx: RuntimeContext::empty(),
        }
    }

    /// Set the runtime context (project root, git, CI environment).
    pub fn with_runtime_context(mut self, ctx: RuntimeContext) -> Self {
        self.runtime_ctx = ctx;
        self
    }

    /// Build the [`Agent`] with the given starting mode and model.
    ///
    /// 1. Converts [`RuntimeContext`] into [`AgentRuntimeContext`].
    /// 2. Builds a [`ToolRegistry`] via `build_tool_registry`.
    /// 3. Builds a [`ToolDispatcher`] wrapping that registry, wired to an
    ///    approval channel.
    /// 4. Constructs `Agent::new(...)`.
    ///
    /// Returns the [`Agent`] together with the receiving half of the
    /// approval channel — the caller (CLI, TUI) owns surfacing
    /// [`ApprovalRequest`]s to the human and answering them.
    pub fn build(
        self,
        mode: AgentMode,
        model: Arc<dyn ModelProvider>,
    ) -> Result<(Agent, mpsc::Receiver<ApprovalRequest>)> {
        let runtime = AgentRuntimeContext {
            project_root: self.runtime_ctx.project_root,
            git_context_note: self.runtime_ctx.git_context
                .and_then(|g| g.to_prompt_section()),
            ci_context_note: self.runtime_ctx.ci_context
                .and_then(|c| c.to_prompt_section()),
            project_context_file: self.runtime_ctx.project_context_file,
            append_system_prompt: self.runtime_ctx.append_system_prompt,
            system_prompt_override: self.runtime_ctx.system_prompt_override,
        };

        let registry = Arc::new(build_tool_registry(&self.config)?);
        let policy = Arc::new(ToolPolicy::from_config(&self.config.tools)?);
        let (approvals_tx, approvals_rx) = mpsc::channel(APPROVAL_CHANNEL_CAPACITY);
        let dispatcher = Arc::new(ToolDispatcher::new(
            Arc::clone(&registry),
            policy,
            self.config.tools.max_concurrent_tools,
            approvals_tx,
        ));

        // Resolve context window from the static catalog; fall back to 128 000.
        let context_window = model.catalog_context_window().unwrap_or(128_000) as usize;

        let agent = Agent::new(
            model,
            registry,
            Arc::new(self.config.agent.clone()),
            runtime,
            mode,
            context_window,
            dispatcher,
        );
        Ok((agent, approvals_rx))
    }
}
