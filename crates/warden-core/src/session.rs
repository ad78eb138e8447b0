// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_model::Message;
use uuid::Uuid;

/// Exponential-moving-average weight applied to each new calibration sample.
/// Lower values make the factor more stable against single noisy turns;
/// higher values adapt faster to a model/provider switch mid-session.
const CALIBRATION_EMA_ALPHA: f32 = 0.3;

/// One saved turn in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub role: String,
    pub content: String,
}

/// In-memory conversation session.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// Approximate total token count for the current message list, using the
    /// crude chars/4 estimate in [`Message::approx_tokens`].
    pub token_count: usize,
    /// Maximum context tokens (set from model config / provider limits)
    pub max_tokens: usize,
    /// Maximum output tokens the current model can produce; reserved out of
    /// `max_tokens` so a full-length reply never gets crowded out of the
    /// context window by the prompt itself.
    pub max_output_tokens: usize,
    /// Estimated tokens consumed by data sent with every request but not
    /// stored in `messages` — tool schemas and the dynamic context block.
    /// Recomputed once per turn by the caller before budget checks.
    pub schema_overhead: usize,
    /// Correction factor applied to the chars/4 estimate to approximate the
    /// provider's real tokenizer, refreshed from reported usage each turn.
    pub calibration_factor: f32,
    /// Running total of prompt-cache-read tokens reported by the provider
    /// across the whole session (§4.4 cumulative, not per-turn).
    pub cache_read_total: u64,
    /// Running total of prompt-cache-write tokens reported by the provider
    /// across the whole session.
    pub cache_write_total: u64,
}

impl Session {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            max_output_tokens: 0,
            schema_overhead: 0,
            calibration_factor: 1.0,
            cache_read_total: 0,
            cache_write_total: 0,
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.token_count += msg.approx_tokens();
        self.messages.push(msg);
    }

    pub fn push_many(&mut self, msgs: impl IntoIterator<Item = Message>) {
        for m in msgs { self.push(m); }
    }

    /// Tokens available for the prompt itself: the context window minus the
    /// space reserved for the model's reply.
    pub fn input_budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.max_output_tokens)
    }

    /// Fraction of the input budget consumed (0.0–1.0), including the
    /// per-turn schema/context overhead not tracked in `messages`.
    pub fn context_fraction(&self) -> f32 {
        let budget = self.input_budget();
        if budget == 0 {
            return 0.0;
        }
        ((self.token_count + self.schema_overhead) as f32) / (budget as f32)
    }

    pub fn is_near_limit(&self, threshold: f32) -> bool {
        self.context_fraction() >= threshold
    }

    /// Recalculate token count from scratch (call after compaction).
    pub fn recalculate_tokens(&mut self) {
        self.token_count = self.messages.iter().map(|m| m.approx_tokens()).sum();
    }

    /// Replace the message list and recalculate token count (for resubmit / edit).
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.recalculate_tokens();
    }

    /// Record prompt-cache usage reported with a turn's completion.
    pub fn add_cache_usage(&mut self, cache_read: u32, cache_write: u32) {
        self.cache_read_total += cache_read as u64;
        self.cache_write_total += cache_write as u64;
    }

    /// Blend a freshly observed (actual vs. estimated) input-token ratio into
    /// the running calibration factor via an exponential moving average, so
    /// `token_count * calibration_factor` tracks the provider's real
    /// tokenizer more closely than the raw chars/4 estimate.
    ///
    /// A no-op when `estimated` is zero (nothing to calibrate against).
    /// The factor is clamped to `[0.5, 2.0]` so a single garbled usage report
    /// cannot swing budget decisions wildly off course.
    pub fn update_calibration(&mut self, actual_input: u32, estimated: usize) {
        if estimated == 0 {
            return;
        }
        let observed = actual_input as f32 / estimated as f32;
        self.calibration_factor = self.calibration_factor * (1.0 - CALIBRATION_EMA_ALPHA)
            + observed * CALIBRATION_EMA_ALPHA;
        self.calibration_factor = self.calibration_factor.clamp(0.5, 2.0);
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
