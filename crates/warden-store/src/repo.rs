// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use warden_config::ModelPricing;
use warden_model::Message;

use crate::backend::{Result, StorageBackend};
use crate::export;
use crate::record::{ConversationRecord, TurnUsage};

/// Token totals for a conversation.
///
/// `prompt_tokens` is the last turn's reported value, not a sum — see
/// [`TurnUsage`]. `completion_tokens`, `cache_read_tokens` and
/// `cache_write_tokens` are genuinely new work per turn, so those are
/// summed, mirroring how [`warden_core::Session`] accumulates cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

/// Dollar cost for a conversation, broken down by usage category.
///
/// Unlike [`TokenStats`], this sums every turn's own `prompt_tokens`: each
/// API call really was billed for the full context it sent, even though
/// that context overlaps with earlier calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    pub input_cost: f64,
    pub output_cost: f64,
    pub cache_read_cost: f64,
    pub cache_write_cost: f64,
}

impl CostStats {
    pub fn total(&self) -> f64 {
        self.input_cost + self.output_cost + self.cache_read_cost + self.cache_write_cost
    }
}

/// Operates on one loaded conversation, backed by a [`StorageBackend`] for
/// persistence. One repo instance is created per active conversation.
pub struct ConversationRepo {
    backend: Arc<dyn StorageBackend>,
    pricing: HashMap<String, ModelPricing>,
    record: ConversationRecord,
}

impl ConversationRepo {
    pub fn new(backend: Arc<dyn StorageBackend>, pricing: HashMap<String, ModelPricing>) -> Self {
        Self { backend, pricing, record: ConversationRecord::new(uuid::Uuid::new_v4().to_string()) }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn title(&self) -> Option<&str> {
        self.record.title.as_deref()
    }

    /// Load an existing conversation from the backend, replacing whatever
    /// is currently held. Returns `false` (leaving the current record
    /// untouched) if no conversation with that id exists.
    pub async fn load_conversation(&mut self, id: &str) -> Result<bool> {
        match self.backend.load(id).await? {
            Some(record) => {
                self.record = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn save_conversation(&self) -> Result<()> {
        self.backend.save(&self.record).await
    }

    /// Append a message to the conversation, stamping `updated_at`.
    pub fn append(&mut self, message: Message) {
        self.record.messages.push(message);
        self.record.updated_at = Utc::now();
    }

    /// Overwrite the full message list, e.g. to mirror an agent's session
    /// after a turn completes.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.record.messages = messages;
        self.record.updated_at = Utc::now();
    }

    /// Record the usage reported for the turn that just completed.
    pub fn append_usage(&mut self, usage: TurnUsage) {
        self.record.turns.push(usage);
    }

    pub fn messages(&self) -> &[Message] {
        &self.record.messages
    }

    pub fn message_count(&self) -> usize {
        self.record.messages.len()
    }

    pub fn token_stats(&self) -> TokenStats {
        let prompt_tokens = self.record.turns.last().map(|t| t.prompt_tokens).unwrap_or(0);
        let (completion_tokens, cache_read_tokens, cache_write_tokens) = self.record.turns.iter().fold(
            (0u64, 0u64, 0u64),
            |(c, r, w), t| (c + t.completion_tokens, r + t.cache_read_tokens, w + t.cache_write_tokens),
        );
        TokenStats { prompt_tokens, completion_tokens, cache_read_tokens, cache_write_tokens }
    }

    pub fn cost_stats(&self) -> CostStats {
        let mut stats = CostStats::default();
        for turn in &self.record.turns {
            // A model with no pricing entry always costs zero, never errors.
            let rate = self.pricing.get(&turn.model_id).copied().unwrap_or_default();
            stats.input_cost += turn.prompt_tokens as f64 / 1_000_000.0 * rate.input_per_million;
            stats.output_cost += turn.completion_tokens as f64 / 1_000_000.0 * rate.output_per_million;
            stats.cache_read_cost += turn.cache_read_tokens as f64 / 1_000_000.0 * rate.cache_read_per_million;
            stats.cache_write_cost += turn.cache_write_tokens as f64 / 1_000_000.0 * rate.cache_write_per_million;
        }
        stats
    }

    /// Lossless markdown rendering of the conversation, suitable for
    /// round-tripping back through [`export::from_markdown`].
    pub fn export_markdown(&self) -> String {
        export::to_markdown(self.record.title.as_deref(), &self.record.messages)
    }

    pub async fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.record.title = Some(title.clone());
        self.record.updated_at = Utc::now();
        self.backend.update_metadata(&self.record.id, Some(title)).await
    }
}
