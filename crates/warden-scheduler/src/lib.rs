// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Background title generation for conversations.
//!
//! [`TitleJobScheduler`] polls a [`StorageBackend`] for conversations that
//! qualify for a generated title (see [`warden_store::ConversationRecord::needs_title`])
//! and runs them through a [`TitleGenerator`] one at a time, so a slow or
//! rate-limited provider never creates more concurrent load than the rest
//! of the agent is already putting on it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use warden_store::StorageBackend;

/// Produces a short title for a conversation, typically by asking the model
/// to summarise it in a few words.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate_title(&self, conversation_id: &str) -> anyhow::Result<String>;
}

/// Serial, single-worker poll loop that assigns titles to eligible
/// conversations. `start`/`stop` are both idempotent: calling either one
/// while already in that state is a no-op rather than an error.
pub struct TitleJobScheduler {
    backend: Arc<dyn StorageBackend>,
    generator: Arc<dyn TitleGenerator>,
    poll_interval: Duration,
    item_timeout: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl TitleJobScheduler {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        generator: Arc<dyn TitleGenerator>,
        poll_interval: Duration,
        item_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            generator,
            poll_interval,
            item_timeout,
            handle: Mutex::new(None),
            stop_tx: Mutex::new(None),
        }
    }

    /// Spawn the poll loop if it is not already running.
    pub fn start(&self) {
        let mut handle_guard = self.handle.lock().unwrap();
        if handle_guard.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.stop_tx.lock().unwrap() = Some(stop_tx);

        let backend = Arc::clone(&self.backend);
        let generator = Arc::clone(&self.generator);
        let poll_interval = self.poll_interval;
        let item_timeout = self.item_timeout;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        run_one_tick(&backend, &generator, item_timeout).await;
                    }
                }
            }
        });

        *handle_guard = Some(task);
    }

    /// Signal the poll loop to exit and wait for it to finish its current
    /// tick. Calling this when the scheduler is not running is a no-op.
    pub async fn stop(&self) {
        let stop_tx = self.stop_tx.lock().unwrap().take();
        if let Some(tx) = stop_tx {
            let _ = tx.send(());
        }
        let handle = self.handle.lock().unwrap().take();
        if let Some(h) = handle {
            let _ = h.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().unwrap().is_some()
    }
}

/// One poll: fetch every conversation that currently needs a title and
/// generate them in sequence. A conversation that fails or times out is
/// simply left untitled and re-checked on the next tick.
async fn run_one_tick(
    backend: &Arc<dyn StorageBackend>,
    generator: &Arc<dyn TitleGenerator>,
    item_timeout: Duration,
) {
    let ids = match backend.list_needing_titles().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "failed to list conversations needing titles");
            return;
        }
    };

    for id in ids {
        match tokio::time::timeout(item_timeout, generator.generate_title(&id)).await {
            Ok(Ok(title)) => {
                if let Err(e) = backend.update_metadata(&id, Some(title)).await {
                    warn!(conversation_id = %id, error = %e, "failed to save generated title");
                }
            }
            Ok(Err(e)) => {
                warn!(conversation_id = %id, error = %e, "title generation failed");
            }
            Err(_) => {
                warn!(conversation_id = %id, "title generation timed out");
            }
        }
    }
}
