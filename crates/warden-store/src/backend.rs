// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::record::{ConversationRecord, ConversationSummary};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("conversation {0} not found")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Persistence for conversation records.
///
/// Implementations must guarantee:
/// - `save` is atomic: a reader never observes a partially written record.
/// - `save` followed by `load` of the same id returns exactly what was
///   saved (messages and turn order preserved).
/// - `delete` of a nonexistent id is not an error.
/// - `close` is idempotent and safe to call more than once.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn save(&self, record: &ConversationRecord) -> Result<()>;
    async fn load(&self, id: &str) -> Result<Option<ConversationRecord>>;
    async fn list(&self) -> Result<Vec<ConversationSummary>>;
    /// Ids of conversations eligible for title generation, per
    /// [`ConversationRecord::needs_title`].
    async fn list_needing_titles(&self) -> Result<Vec<String>>;
    async fn update_metadata(&self, id: &str, title: Option<String>) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Lightweight liveness check. Never mutates state.
    async fn health(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// In-process backend. Conversations live only for the lifetime of the
/// process; nothing is written to disk.
///
/// This is the only backend this crate ships — durable backends (SQLite,
/// Postgres, Redis, JSONL-on-disk) are a separate concern left to whatever
/// embeds this crate.
#[derive(Default)]
pub struct InMemoryBackend {
    conversations: Mutex<HashMap<String, ConversationRecord>>,
    closed: Mutex<bool>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        let mut guard = self.conversations.lock().unwrap();
        guard.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<ConversationRecord>> {
        Ok(self.conversations.lock().unwrap().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .lock()
            .unwrap()
            .values()
            .map(|r| r.summary())
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn list_needing_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.needs_title())
            .map(|r| r.id.clone())
            .collect())
    }

    async fn update_metadata(&self, id: &str, title: Option<String>) -> Result<()> {
        let mut guard = self.conversations.lock().unwrap();
        let record = guard.get_mut(id).ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.title = title;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.conversations.lock().unwrap().remove(id);
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        if *self.closed.lock().unwrap() {
            return Err(StorageError::Unavailable("backend closed".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let backend = InMemoryBackend::new();
        let record = ConversationRecord::new("c1");
        backend.save(&record).await.unwrap();
        let loaded = backend.load("c1").await.unwrap().unwrap();
        assert_eq!(loaded.id, "c1");
    }

    #[tokio::test]
    async fn load_missing_returns_none_not_error() {
        let backend = InMemoryBackend::new();
        assert!(backend.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_is_not_an_error() {
        let backend = InMemoryBackend::new();
        assert!(backend.delete("ghost").await.is_ok());
    }

    #[tokio::test]
    async fn list_needing_titles_reflects_eligibility() {
        let backend = InMemoryBackend::new();
        let mut untitled = ConversationRecord::new("untitled");
        untitled.messages = vec![warden_model::Message::user("hi"), warden_model::Message::assistant("hello")];
        backend.save(&untitled).await.unwrap();

        let mut titled = ConversationRecord::new("titled");
        titled.title = Some("Greeting".to_string());
        titled.messages = untitled.messages.clone();
        backend.save(&titled).await.unwrap();

        let needing = backend.list_needing_titles().await.unwrap();
        assert_eq!(needing, vec!["untitled".to_string()]);
    }

    #[tokio::test]
    async fn update_metadata_on_unknown_id_errors() {
        let backend = InMemoryBackend::new();
        assert!(backend.update_metadata("ghost", Some("x".into())).await.is_err());
    }

    #[tokio::test]
    async fn health_fails_after_close() {
        let backend = InMemoryBackend::new();
        backend.health().await.unwrap();
        backend.close().await.unwrap();
        assert!(backend.health().await.is_err());
        // Idempotent: closing again must not panic.
        backend.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_by_most_recently_updated() {
        let backend = InMemoryBackend::new();
        let mut older = ConversationRecord::new("older");
        older.updated_at = Utc::now() - chrono::Duration::minutes(10);
        backend.save(&older).await.unwrap();
        let newer = ConversationRecord::new("newer");
        backend.save(&newer).await.unwrap();

        let listed = backend.list().await.unwrap();
        assert_eq!(listed[0].id, "newer");
    }
}
