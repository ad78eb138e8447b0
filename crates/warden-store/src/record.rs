// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_model::Message;

/// One persisted conversation: its messages plus the per-turn usage log
/// needed to reconstruct token and cost statistics without re-reading every
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub turns: Vec<TurnUsage>,
}

impl ConversationRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            turns: Vec::new(),
        }
    }

    /// A conversation is a title-generation candidate once it has at least
    /// one full exchange and no title yet. Re-checked on every scheduler
    /// tick so a conversation that later gains a title naturally drops out.
    pub fn needs_title(&self) -> bool {
        self.title.is_none() && self.messages.len() >= 2
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// Lightweight listing row — everything [`crate::StorageBackend::list`]
/// needs without loading every message of every conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Usage reported by the model provider for one completed turn.
///
/// `prompt_tokens` is the provider's own cumulative figure for that single
/// call (it already reflects the whole context sent with the request, not
/// just what's new), which is why [`crate::TokenStats`] takes the *last*
/// one instead of summing across turns.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TurnUsage {
    pub model_id: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl TurnUsage {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self { model_id: model_id.into(), ..Default::default() }
    }
}
