// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use warden_config::AgentMode;
use warden_tools::ToolCall;

/// Which compaction strategy produced a given [`AgentEvent::ContextCompacted`]
/// event, mirroring [`warden_config::CompactionStrategy`] for UI display
/// without pulling the config crate's full type into every event consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStrategyUsed {
    /// Structured checkpoint: active task, decisions, files, pending items.
    Structured,
    /// Free-form narrative summary of the conversation so far.
    Narrative,
    /// Deterministic drop-oldest fallback with no model call.
    Emergency,
}

/// Events emitted by the agent during a single turn.
/// Consumers (CI runner, TUI) subscribe to these to drive their output.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A text chunk streamed from the model
    TextDelta(String),
    /// A complete text response from the model (after streaming finishes)
    TextComplete(String),
    /// A thinking/reasoning chunk from the model (extended thinking API).
    /// Consumers should accumulate deltas and finalise them into a Thinking
    /// segment when the model signals the end of the reasoning block.
    ThinkingDelta(String),
    /// A complete thinking/reasoning block (accumulated from ThinkingDelta events).
    ThinkingComplete(String),
    /// The model has requested a tool call
    ToolCallStarted(ToolCall),
    /// A tool call finished
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
    /// Context was compacted; statistics for the UI
    ContextCompacted {
        tokens_before: usize,
        tokens_after: usize,
        strategy: CompactionStrategyUsed,
        /// Loop round number at which compaction fired (0 = pre-submit).
        turn: u32,
    },
    /// Current token usage update
    TokenUsage {
        input: u32,
        output: u32,
        /// Tokens served from the provider's prompt cache this turn.
        cache_read: u32,
        /// Tokens written into the provider's prompt cache this turn.
        cache_write: u32,
        /// Running total of cache-read tokens for the whole session.
        cache_read_total: u64,
        /// Running total of cache-write tokens for the whole session.
        cache_write_total: u64,
        /// The model's context window, for UI budget bars.
        max_tokens: usize,
    },
    /// The agent has finished processing the current user turn
    TurnComplete,
    /// The current turn was cancelled; any text streamed before cancellation.
    Aborted { partial_text: String },
    /// A recoverable error occurred
    Error(String),
    /// The agent mode was changed
    ModeChanged(AgentMode),
}
