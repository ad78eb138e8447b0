// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::Parser;

use warden_config::AgentMode;

/// Interactive AI coding assistant.
///
/// With no `--prompt`, reads lines from stdin one at a time, feeding each as
/// a user turn and streaming the agent's response to stdout. With
/// `--prompt`, runs that single turn non-interactively and exits.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
pub struct Cli {
    /// Path to an explicit config file. Overrides the discovered
    /// `~/.config/warden/config.yaml` / `.warden/config.yaml` layers.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Starting agent mode.
    #[arg(long, value_enum)]
    pub mode: Option<AgentMode>,

    /// Run a single turn non-interactively and exit.
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Auto-approve every tool call that would otherwise prompt.
    /// Equivalent to answering "allow always" to every approval request.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Enable debug logging to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}
