// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration, assembled by merging YAML layers (see `loader`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    pub storage: StorageConfig,
    pub pricing: HashMap<String, ModelPricing>,
}

/// The mode the agent is currently operating in, controlling which tools are
/// offered to the model and how aggressively it may act without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Read-only exploration: no tool carries write/execute side effects.
    Research,
    /// May propose edits but does not apply them without explicit approval.
    Plan,
    /// Full tool access, gated by the configured approval policy.
    Agent,
}

impl Default for AgentMode {
    fn default() -> Self {
        AgentMode::Agent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: String,
    pub name: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Overrides the provider's advertised context window, in tokens.
    /// `None` defers to the model catalog.
    pub context_window: Option<u32>,
    /// Path to a recorded-response fixture file; when set, the mock provider
    /// replays it instead of making real network calls. Test-only.
    pub mock_responses_file: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            name: "gpt-4o".to_string(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 4096,
            temperature: 0.7,
            context_window: None,
            mock_responses_file: None,
        }
    }
}

/// Per-model pricing, in USD per 1,000,000 tokens. A model with no entry
/// here always costs zero rather than erroring — missing pricing data is
/// routine, not a fault.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    #[serde(default)]
    pub cache_read_per_million: f64,
    #[serde(default)]
    pub cache_write_per_million: f64,
}

/// Which prompt the optimizer sends to the model when a compaction pass is
/// LLM-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompactionStrategy {
    /// Fixed Markdown sections (Active Task, Key Decisions, …).
    #[default]
    Structured,
    /// Free-form narrative summary.
    Narrative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub default_mode: AgentMode,
    /// Inclusive cutoff: once this many turns have elapsed the agent is
    /// forced into a bounded stop instead of starting another turn.
    pub max_tool_rounds: u32,
    /// Fraction (0.0-1.0) of the context window at which the optimizer
    /// compacts history before the next inference call.
    pub compaction_threshold: f32,
    /// Number of most-recent messages always kept verbatim by the optimizer.
    pub compaction_keep_recent: usize,
    pub compaction_strategy: CompactionStrategy,
    /// Token cap applied to an individual tool result before it is
    /// considered for truncation.
    pub tool_result_token_cap: u32,
    /// Fraction of the context window reserved as headroom for the next
    /// request's schema/system-prompt overhead.
    pub compaction_overhead_reserve: f32,
    pub system_prompt: Option<String>,
    pub max_step_timeout_secs: Option<u64>,
    pub max_run_timeout_secs: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_mode: AgentMode::Agent,
            max_tool_rounds: 200,
            compaction_threshold: 0.85,
            compaction_keep_recent: 6,
            compaction_strategy: CompactionStrategy::Structured,
            tool_result_token_cap: 4000,
            compaction_overhead_reserve: 0.10,
            system_prompt: None,
            max_step_timeout_secs: None,
            max_run_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Shell-glob patterns matched against a tool's command string; a match
    /// runs without asking.
    pub auto_approve_patterns: Vec<String>,
    /// Shell-glob patterns that always deny, even if also auto-approved.
    pub deny_patterns: Vec<String>,
    pub timeout_secs: u64,
    /// Upper bound on tool calls from a single turn running at once.
    pub max_concurrent_tools: usize,
    /// Literal command names (the bash tool's command string's first
    /// whitespace-separated token) permitted to run at all. A command whose
    /// first token is absent from this list and that matches none of
    /// `bash_allowed_patterns` is refused before it ever reaches
    /// [`auto_approve_patterns`]/[`deny_patterns`].
    pub bash_allowed_commands: Vec<String>,
    /// Regex patterns matched against a bash command's full string; a match
    /// permits the command to run even if its first token is not in
    /// `bash_allowed_commands`.
    pub bash_allowed_patterns: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            auto_approve_patterns: vec!["cat *".to_string(), "ls*".to_string(), "ls".to_string()],
            deny_patterns: Vec::new(),
            timeout_secs: 30,
            max_concurrent_tools: 4,
            bash_allowed_commands: [
                "ls", "cat", "echo", "pwd", "cd", "exit", "true", "false", "sleep", "git", "cargo",
                "rustc", "make", "grep", "rg", "find", "sed", "awk", "head", "tail", "wc", "diff",
                "sort", "uniq", "mkdir", "touch", "cp", "mv", "rm", "curl", "wget", "python3",
                "node", "npm", "pip", "pip3", "sh", "bash", "tree", "jq", "which", "env", "test",
                "printf", "date",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            bash_allowed_patterns: Vec::new(),
        }
    }
}

/// Which storage backend persists conversations, and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Filesystem path for the sqlite/jsonl backends; ignored by `memory`.
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Sqlite,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Jsonl,
    #[default]
    Sqlite,
}
