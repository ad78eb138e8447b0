// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Title generation backed by a [`ModelProvider`].

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;

use warden_model::{CompletionRequest, Message, ModelProvider, ResponseEvent};
use warden_scheduler::TitleGenerator;
use warden_store::StorageBackend;

const TITLE_SYSTEM_PROMPT: &str = "Summarise this conversation in four words or fewer, as a plain \
    title with no punctuation and no quotes. Reply with the title only.";

/// Generates a conversation title by sending its messages to a model with a
/// short system prompt and collecting the reply text.
pub struct ModelTitleGenerator {
    model: Arc<dyn ModelProvider>,
    backend: Arc<dyn StorageBackend>,
}

impl ModelTitleGenerator {
    pub fn new(model: Arc<dyn ModelProvider>, backend: Arc<dyn StorageBackend>) -> Self {
        Self { model, backend }
    }
}

#[async_trait]
impl TitleGenerator for ModelTitleGenerator {
    async fn generate_title(&self, conversation_id: &str) -> anyhow::Result<String> {
        let record = self
            .backend
            .load(conversation_id)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .context("conversation disappeared before title generation")?;

        let mut messages = vec![Message::system(TITLE_SYSTEM_PROMPT)];
        messages.extend(record.messages.iter().filter_map(|m| m.as_text().map(|_| m.clone())));

        let req = CompletionRequest { messages, tools: vec![], stream: true, ..Default::default() };
        let mut stream = self.model.complete(req).await.context("title completion failed")?;

        let mut title = String::new();
        while let Some(event) = stream.next().await {
            if let ResponseEvent::TextDelta(delta) = event? {
                title.push_str(&delta);
            }
        }

        let title = title.trim().trim_matches('"').to_string();
        if title.is_empty() {
            anyhow::bail!("model returned an empty title for conversation {conversation_id}");
        }
        Ok(title)
    }
}
