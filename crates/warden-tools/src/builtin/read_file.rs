// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::policy::ApprovalPolicy;
use crate::tool::{OutputCategory, Tool, ToolCall, ToolOutput};

/// Default number of lines returned when the caller does not specify a limit.
/// Kept small to avoid flooding the model context on the first read; the
/// agent can paginate with offset + limit to get more.
const DEFAULT_LINE_LIMIT: usize = 200;

/// Hard byte ceiling applied in addition to the line limit. Whichever
/// constraint is hit first determines where the output is cut.
const MAX_BYTES: usize = 20_000;

pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Reads a file. Default: 200 lines / 20 KB — whichever comes first.\n\
         Binary files (detected by extension or content) are rendered as Intel HEX;\n\
         limit/offset apply to HEX line numbers (each line = 16 bytes).\n\
         Lines are formatted as L{n}:content (1-indexed). When editing, strip the L{n}: prefix.\n\
         When more lines exist, a pagination notice shows the next offset.\n\
         Prefer grep to locate the relevant region first, then read only that window."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Absolute or relative path to the file"
                },
                "offset": {
                    "type": "integer",
                    "description": "1-indexed line number to start reading from (default 1)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (default 200)"
                }
            },
            "required": ["path"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }
    fn output_category(&self) -> OutputCategory {
        OutputCategory::FileContent
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let path = match call.args.get("path").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'path'"),
        };
        let offset = call.args.get("offset").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
        let limit = call
            .args
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_LINE_LIMIT as u64) as usize;

        debug!(path = %path, offset, limit, "read tool");

        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => return ToolOutput::err(&call.id, format!("read error: {e}")),
        };
        if meta.is_dir() {
            return ToolOutput::err(&call.id, format!("{path} is a directory, not a file"));
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) => return ToolOutput::err(&call.id, format!("read error: {e}")),
        };

        let ext = std::path::Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        if is_binary_extension(ext) || has_binary_content(&bytes) {
            let ihex_lines = to_ihex_lines(&bytes);
            let total = ihex_lines.len();
            let start = offset.saturating_sub(1);
            let slice: Vec<&str> = ihex_lines.iter().skip(start).take(limit).map(String::as_str).collect();
            let last = start + slice.len();
            let mut content = format!(
                "note: binary file ({} bytes) rendered as Intel HEX ({} lines, 16 bytes/line)\n{}",
                bytes.len(),
                total,
                slice.join("\n")
            );
            if last < total {
                content.push_str(&format!(
                    "\n...[{} more lines — showing L{}-L{} of {}; use offset={} to continue]",
                    total - last,
                    offset,
                    offset + slice.len().saturating_sub(1),
                    total,
                    last + 1
                ));
            }
            return ToolOutput::ok(&call.id, content);
        }

        let text = String::from_utf8_lossy(&bytes);
        let start = offset.saturating_sub(1);
        let all_lines: Vec<&str> = text.lines().collect();
        let total = all_lines.len();

        let mut selected: Vec<String> = Vec::new();
        let mut byte_count: usize = 0;
        let mut truncated_by_bytes = false;
        for (i, line) in all_lines.iter().enumerate().skip(start).take(limit) {
            let line_bytes = line.len() + 1;
            if byte_count + line_bytes > MAX_BYTES {
                truncated_by_bytes = true;
                break;
            }
            selected.push(format!("L{}:{}", i + 1, line));
            byte_count += line_bytes;
        }

        let last_shown = start + selected.len();
        let mut content = selected.join("\n");

        if last_shown < total {
            let reason = if truncated_by_bytes {
                format!("byte limit ({MAX_BYTES} B) reached")
            } else {
                format!("{} more lines", total - last_shown)
            };
            content.push_str(&format!(
                "\n...[{} — showing L{}-L{} of {}; use offset={} to continue]",
                reason,
                offset,
                offset + selected.len().saturating_sub(1),
                total,
                last_shown + 1
            ));
        }

        ToolOutput::ok(&call.id, content)
    }
}

fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "o" | "a" | "so" | "elf" | "exe" | "dll" | "wasm" | "pdb" |
        "zip" | "gz" | "tar" | "bz2" | "xz" | "7z" | "zst" |
        "bin" | "img" | "rom" | "fw" |
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tiff" |
        "pyc" | "pyo" | "class" | "jar" | "war" |
        "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "pdf" |
        "obj" | "lib"
    )
}

/// Samples up to 4096 bytes of `bytes` to decide if the content is binary.
/// Any null byte, or more than 30% non-printable bytes, means binary.
fn has_binary_content(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(4096)];
    if sample.contains(&0u8) {
        return true;
    }
    let non_printable = sample.iter().filter(|&&b| b < 9 || (b > 13 && b < 32)).count();
    non_printable * 100 / sample.len() > 30
}

/// Convert raw bytes to Intel HEX lines, 16 bytes per data record, emitting
/// an Extended Linear Address record whenever the 64 KB segment changes.
fn to_ihex_lines(data: &[u8]) -> Vec<String> {
    const BPL: usize = 16;
    let mut lines: Vec<String> = Vec::with_capacity(data.len() / BPL + 2);
    let mut cur_seg = usize::MAX;

    for (i, chunk) in data.chunks(BPL).enumerate() {
        let addr = i * BPL;
        let seg = addr >> 16;

        if seg != cur_seg {
            cur_seg = seg;
            let hi = (seg >> 8) as u8;
            let lo = (seg & 0xFF) as u8;
            let cs = (0u8).wrapping_add(2).wrapping_add(4).wrapping_add(hi).wrapping_add(lo);
            let cs = (!cs).wrapping_add(1);
            lines.push(format!(":02000004{hi:02X}{lo:02X}{cs:02X}"));
        }

        let a16 = (addr & 0xFFFF) as u16;
        let n = chunk.len() as u8;
        let mut cs = n.wrapping_add((a16 >> 8) as u8).wrapping_add((a16 & 0xFF) as u8);
        let data_hex: String = chunk
            .iter()
            .map(|b| {
                cs = cs.wrapping_add(*b);
                format!("{b:02X}")
            })
            .collect();
        cs = (!cs).wrapping_add(1);
        lines.push(format!(":{n:02X}{a16:04X}00{data_hex}{cs:02X}"));
    }

    lines.push(":00000001FF".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tool::{Tool, ToolCall};

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "r1".into(),
            name: "read".into(),
            args,
        }
    }

    fn tmp_file(content: &str) -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static CTR: AtomicU32 = AtomicU32::new(0);
        let n = CTR.fetch_add(1, Ordering::Relaxed);
        let path = format!("/tmp/warden_read_test_{}_{n}.txt", std::process::id());
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn reads_file_with_line_numbers() {
        let path = tmp_file("alpha\nbeta\ngamma\n");
        let out = ReadTool.execute(&call(json!({"path": path}))).await;
        assert!(!out.is_error, "{}", out.content);
        assert!(out.content.contains("L1:alpha"));
        assert!(out.content.contains("L3:gamma"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn offset_and_limit_work() {
        let path = tmp_file("line1\nline2\nline3\nline4\nline5\n");
        let out = ReadTool
            .execute(&call(json!({"path": path, "offset": 2, "limit": 2})))
            .await;
        assert!(!out.is_error);
        assert!(out.content.contains("L2:line2"));
        assert!(out.content.contains("L3:line3"));
        assert!(!out.content.contains("L1:"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_is_error() {
        let out = ReadTool.execute(&call(json!({"path": "/tmp/warden_no_such_file.txt"}))).await;
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn directory_path_is_error() {
        let out = ReadTool.execute(&call(json!({"path": "/tmp"}))).await;
        assert!(out.is_error);
        assert!(out.content.contains("directory"));
    }

    #[tokio::test]
    async fn pagination_notice_when_more_lines_exist() {
        let path = tmp_file("a\nb\nc\nd\ne\n");
        let out = ReadTool.execute(&call(json!({"path": path, "limit": 2}))).await;
        assert!(!out.is_error);
        assert!(out.content.contains("offset=3"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn binary_extension_detected() {
        assert!(is_binary_extension("elf"));
        assert!(is_binary_extension("ELF"));
        assert!(!is_binary_extension("rs"));
    }

    #[test]
    fn null_byte_triggers_binary_detection() {
        assert!(has_binary_content(b"hello\x00world"));
    }

    #[test]
    fn ihex_always_ends_with_eof_record() {
        let lines = to_ihex_lines(b"hello");
        assert_eq!(lines.last().unwrap(), ":00000001FF");
    }

    #[tokio::test]
    async fn binary_file_returns_ihex_output() {
        let path = tmp_file("");
        std::fs::write(&path, b"\x7fELF\x00\x01\x02\x03").unwrap();
        let out = ReadTool.execute(&call(json!({"path": path}))).await;
        assert!(!out.is_error, "{}", out.content);
        assert!(out.content.contains("Intel HEX"));
        let _ = std::fs::remove_file(&path);
    }
}
