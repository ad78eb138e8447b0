// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod cli;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_bootstrap::{AgentBuilder, ApprovalDecision, ApprovalRequest, ModelTitleGenerator, RuntimeContext};
use warden_core::{Agent, AgentEvent};
use warden_scheduler::TitleJobScheduler;
use warden_store::{ConversationRepo, InMemoryBackend, StorageBackend, TurnUsage};

use cli::Cli;

/// How often the title scheduler checks for conversations that need one.
const TITLE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(20);
/// Per-conversation budget for a single title-generation call.
const TITLE_ITEM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Service approval requests from the dispatcher until the channel closes.
///
/// `auto_yes` answers every request with `AllowAlwaysThisSession` instead of
/// prompting; otherwise each request is printed to stderr and the answer is
/// read from stdin (y = allow once, a = allow always this session, anything
/// else = deny).
async fn run_approval_loop(mut rx: tokio::sync::mpsc::Receiver<ApprovalRequest>, auto_yes: bool) {
    while let Some(req) = rx.recv().await {
        let decision = if auto_yes {
            ApprovalDecision::AllowAlwaysThisSession
        } else {
            prompt_for_decision(&req.call.name, &req.preview)
        };
        let _ = req.respond_to.send(decision);
    }
}

fn prompt_for_decision(tool_name: &str, preview: &str) -> ApprovalDecision {
    eprint!("\napprove {tool_name}: {preview}\n[y]es / [a]lways this session / [N]o: ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return ApprovalDecision::Deny;
    }
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Allow,
        "a" | "always" => ApprovalDecision::AllowAlwaysThisSession,
        _ => ApprovalDecision::Deny,
    }
}

async fn run_turn(agent: &mut Agent, repo: &mut ConversationRepo, input: &str) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(256);
    agent.submit(input, tx).await?;

    let mut stdout = io::stdout();
    let mut usage = TurnUsage::new(agent.model_id());
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::TextDelta(chunk) => {
                print!("{chunk}");
                let _ = stdout.flush();
            }
            AgentEvent::ToolCallStarted(call) => {
                eprintln!("\n$ {} {}", call.name, call.args);
            }
            AgentEvent::ToolCallFinished { tool_name, is_error, .. } => {
                if is_error {
                    eprintln!("  ! {tool_name} failed");
                }
            }
            AgentEvent::TokenUsage { input: prompt, output: completion, cache_read, cache_write, .. } => {
                usage.prompt_tokens = prompt as u64;
                usage.completion_tokens += completion as u64;
                usage.cache_read_tokens += cache_read as u64;
                usage.cache_write_tokens += cache_write as u64;
            }
            AgentEvent::Error(msg) => {
                eprintln!("\nerror: {msg}");
            }
            AgentEvent::TurnComplete => {
                println!();
                break;
            }
            AgentEvent::Aborted { .. } => break,
            _ => {}
        }
    }

    repo.replace_messages(agent.messages().to_vec());
    repo.append_usage(usage);
    if let Err(e) = repo.save_conversation().await {
        eprintln!("warning: failed to save conversation: {e}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = warden_config::load(cli.config.as_deref())
        .context("loading configuration")?;
    let pricing = config.pricing.clone();
    let storage_backend_kind = config.storage.backend;

    let model: Arc<dyn warden_model::ModelProvider> =
        Arc::from(warden_model::from_config(&config.model).context("constructing model provider")?);

    let runtime_ctx = RuntimeContext::auto_detect();
    let mode = cli.mode.unwrap_or(config.agent.default_mode);

    let (mut agent, approvals_rx) = AgentBuilder::new(Arc::new(config))
        .with_runtime_context(runtime_ctx)
        .build(mode, Arc::clone(&model))
        .context("constructing agent")?;

    let approval_task = tokio::spawn(run_approval_loop(approvals_rx, cli.yes));

    if storage_backend_kind != warden_config::StorageBackendKind::Memory {
        eprintln!(
            "warning: storage.backend = {storage_backend_kind:?} has no driver in this build; using an in-memory store for this session"
        );
    }
    let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
    let mut repo = ConversationRepo::new(Arc::clone(&backend), pricing);
    let title_generator = Arc::new(ModelTitleGenerator::new(model, Arc::clone(&backend)));
    let title_scheduler =
        TitleJobScheduler::new(backend, title_generator, TITLE_POLL_INTERVAL, TITLE_ITEM_TIMEOUT);
    title_scheduler.start();

    if let Some(prompt) = cli.prompt {
        run_turn(&mut agent, &mut repo, &prompt).await?;
    } else {
        let stdin = io::stdin();
        print!("> ");
        io::stdout().flush().ok();
        for line in stdin.lock().lines() {
            let line = line.context("reading stdin")?;
            if line.trim().is_empty() {
                print!("> ");
                io::stdout().flush().ok();
                continue;
            }
            run_turn(&mut agent, &mut repo, &line).await?;
            print!("> ");
            io::stdout().flush().ok();
        }
    }

    drop(agent);
    let _ = approval_task.await;
    title_scheduler.stop().await;
    Ok(())
}
