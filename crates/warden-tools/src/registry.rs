// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use warden_config::AgentMode;

use crate::{Tool, ToolCall, ToolOutput};

/// A tool schema handed to the model as part of the completion request.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Returned when two tools are registered under the same name.
///
/// Two tools racing for one name is a configuration error, not something the
/// registry should paper over by keeping the last writer: a silently shadowed
/// tool means some of the model's calls land on the wrong implementation with
/// no diagnostic. Registration therefore fails the whole startup.
#[derive(Debug, Error)]
#[error("duplicate tool registration: \"{0}\" is already registered")]
pub struct DuplicateToolError(pub String);

/// Central registry holding all available tools.
///
/// Immutable after construction: `register` is the only mutating method and
/// is expected to run entirely during startup, before the registry is shared
/// across the dispatcher's worker tasks.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name is already
    /// registered rather than silently overwriting it.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), DuplicateToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(DuplicateToolError(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Produce schemas for ALL registered tools (mode-unfiltered).
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Produce schemas only for tools available in the given mode.
    pub fn schemas_for_mode(&self, mode: AgentMode) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .filter(|t| t.modes().contains(&mode))
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self.tools.get(&call.name) {
            Some(tool) => tool.execute(call).await,
            None => ToolOutput::err(&call.id, format!("unknown tool: {}", call.name)),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn names_for_mode(&self, mode: AgentMode) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .values()
            .filter(|t| t.modes().contains(&mode))
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
