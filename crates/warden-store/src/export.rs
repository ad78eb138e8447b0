// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Lossless markdown export/import for conversations.
//!
//! The format uses H2 sections as turn boundaries:
//!
//! ````markdown
//! # Optional title
//!
//! ## User
//! Question or task here.
//!
//! ## Assistant
//! Agent response here.
//!
//! ## Tool
//! ```json
//! {"tool_call_id": "call_001", "name": "read_file", "args": {"path": "/src/main.rs"}}
//! ```
//!
//! ## Tool Result
//! ```text
//! file contents
//! ```
//! ````
//!
//! Export and import round-trip exactly for any conversation built purely
//! from text turns and tool call/result pairs (system messages are skipped
//! on export — they are reconstructed by the agent on reload, not stored).

use thiserror::Error;
use warden_model::{FunctionCall, Message, MessageContent, Role};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("orphaned ## Tool Result without a preceding ## Tool section")]
    OrphanedToolResult,
    #[error("## Tool section contains invalid JSON: {0}")]
    InvalidToolJson(String),
    #[error("## Tool section missing JSON code block")]
    MissingToolJson,
}

/// Render `title` and `messages` as a complete markdown conversation file.
pub fn to_markdown(title: Option<&str>, messages: &[Message]) -> String {
    let mut out = String::new();
    if let Some(t) = title {
        out.push_str(&format!("# {t}\n\n"));
    }
    for msg in messages {
        out.push_str(&message_to_section(msg));
    }
    out
}

fn message_to_section(msg: &Message) -> String {
    match (&msg.role, &msg.content) {
        (Role::System, _) => String::new(),

        (Role::User, MessageContent::Text(t)) => format!("## User\n{}\n\n", t.trim()),

        (Role::Assistant, MessageContent::Text(t)) => format!("## Assistant\n{}\n\n", t.trim()),

        (Role::Assistant, MessageContent::ToolCall { tool_call_id, function }) => {
            let args_value: serde_json::Value =
                serde_json::from_str(&function.arguments).unwrap_or(serde_json::Value::Null);
            let envelope = serde_json::json!({
                "tool_call_id": tool_call_id,
                "name": function.name,
                "args": args_value,
            });
            let pretty = serde_json::to_string_pretty(&envelope).unwrap_or_default();
            format!("## Tool\n```json\n{pretty}\n```\n\n")
        }

        (Role::Tool, MessageContent::ToolResult { content, .. }) => {
            format!("## Tool Result\n```\n{content}\n```\n\n")
        }

        _ => String::new(),
    }
}

/// Parse a markdown conversation file back into a title and message list.
///
/// Inverse of [`to_markdown`] for any file `to_markdown` produced.
pub fn from_markdown(markdown: &str) -> Result<(Option<String>, Vec<Message>), ExportError> {
    let (title, sections) = split_sections(markdown);
    let messages = sections_to_messages(sections)?;
    Ok((title, messages))
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum SectionKind {
    User,
    Assistant,
    Tool,
    ToolResult,
    Unknown(String),
}

impl SectionKind {
    fn from_str(s: &str) -> Self {
        match s.trim() {
            "User" => SectionKind::User,
            "Assistant" => SectionKind::Assistant,
            "Tool" => SectionKind::Tool,
            "Tool Result" => SectionKind::ToolResult,
            other => SectionKind::Unknown(other.to_string()),
        }
    }
}

struct Section {
    heading: SectionKind,
    content: String,
}

fn split_sections(markdown: &str) -> (Option<String>, Vec<Section>) {
    let mut title: Option<String> = None;
    let mut sections: Vec<Section> = Vec::new();
    let mut current_heading: Option<SectionKind> = None;
    let mut current_content = String::new();
    let mut preamble = String::new();

    for line in markdown.lines() {
        if let Some(h1) = line.strip_prefix("# ").filter(|_| !line.starts_with("## ")) {
            if current_heading.is_none() && preamble.is_empty() && title.is_none() {
                title = Some(h1.trim().to_string());
                continue;
            }
        }

        if let Some(h2) = line.strip_prefix("## ") {
            let kind = SectionKind::from_str(h2.trim());
            if !matches!(kind, SectionKind::Unknown(_)) {
                if let Some(heading) = current_heading.take() {
                    sections.push(Section { heading, content: current_content.trim_matches('\n').to_string() });
                } else {
                    preamble.push_str(&current_content);
                }
                current_content = String::new();
                current_heading = Some(kind);
                continue;
            }
        }

        current_content.push_str(line);
        current_content.push('\n');
    }

    if let Some(heading) = current_heading {
        sections.push(Section { heading, content: current_content.trim_matches('\n').to_string() });
    }

    (title, sections)
}

fn sections_to_messages(sections: Vec<Section>) -> Result<Vec<Message>, ExportError> {
    let mut messages = Vec::new();
    let mut pending_tool_call_id: Option<String> = None;

    for section in sections {
        match section.heading {
            SectionKind::Unknown(name) => {
                tracing::warn!(heading = %name, "skipping unknown H2 section in conversation file");
            }
            SectionKind::User => messages.push(Message::user(section.content.trim())),
            SectionKind::Assistant => messages.push(Message::assistant(section.content.trim())),
            SectionKind::Tool => {
                let envelope = parse_tool_envelope(&section.content)?;
                pending_tool_call_id = Some(envelope.tool_call_id.clone());
                messages.push(Message {
                    role: Role::Assistant,
                    content: MessageContent::ToolCall {
                        tool_call_id: envelope.tool_call_id,
                        function: FunctionCall { name: envelope.name, arguments: envelope.args.to_string() },
                    },
                });
            }
            SectionKind::ToolResult => {
                let call_id = pending_tool_call_id.take().ok_or(ExportError::OrphanedToolResult)?;
                let content = extract_fenced_block(&section.content, "").unwrap_or(section.content);
                messages.push(Message::tool_result(call_id, content.trim()));
            }
        }
    }

    Ok(messages)
}

#[derive(serde::Deserialize)]
struct ToolCallEnvelope {
    tool_call_id: String,
    name: String,
    args: serde_json::Value,
}

fn parse_tool_envelope(content: &str) -> Result<ToolCallEnvelope, ExportError> {
    let json_str = extract_fenced_block(content, "json")
        .or_else(|| extract_fenced_block(content, ""))
        .ok_or(ExportError::MissingToolJson)?;
    serde_json::from_str(&json_str).map_err(|e| ExportError::InvalidToolJson(e.to_string()))
}

fn extract_fenced_block(content: &str, lang: &str) -> Option<String> {
    let open_marker = if lang.is_empty() { "```".to_string() } else { format!("```{lang}") };
    let mut in_block = false;
    let mut result = String::new();

    for line in content.lines() {
        if !in_block {
            let trimmed = line.trim();
            if lang.is_empty() {
                if trimmed == "```" {
                    in_block = true;
                    continue;
                }
            } else if trimmed == open_marker || trimmed.starts_with(&format!("{open_marker} ")) {
                in_block = true;
                continue;
            }
        } else {
            if line.trim() == "```" {
                return Some(result);
            }
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(line);
        }
    }

    if in_block { Some(result) } else { None }
}
