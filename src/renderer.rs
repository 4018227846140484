// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for parsed sessions.
//!
//! This module transforms a [`Session`] into a readable Markdown document.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - A top-level `# Session Export` heading
//! - Export time and working directory lines
//! - A `## <Role>` section per message, closed by a `---` separator
//! - `### Tool Use: <name>` blocks with parameters and a fenced, tagged
//!   excerpt of the tool output
//!
//! Large tool parameters and outputs are cut down so a single file dump
//! cannot swamp the transcript.
//!
//! # Example
//!
//! ```
//! use session_export::parser::parse_session;
//! use session_export::renderer::{RenderOptions, render_session};
//!
//! let session = parse_session(r#"{
//!     "metadata": { "exportedAt": "2024-12-05T00:00:00Z", "workingDirectory": "/tmp" },
//!     "messages": [{ "role": "user", "content": "hello" }]
//! }"#).unwrap();
//!
//! let markdown = render_session(&session, &RenderOptions::default());
//!
//! assert!(markdown.starts_with("# Session Export"));
//! assert!(markdown.contains("## User\n\nhello"));
//! ```

use crate::language;
use crate::parser::{Content, ContentBlock, Metadata, Session};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt::Write;

/// String parameters longer than this are cut and fenced.
const MAX_PARAM_CHARS: usize = 100;

/// Tool output longer than this is truncated.
const MAX_OUTPUT_CHARS: usize = 2000;

/// How much of an over-long tool output is kept.
const TRUNCATED_OUTPUT_CHARS: usize = 1500;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Configuration options for Markdown rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to include tool invocation blocks in the output.
    ///
    /// When disabled, `tool_use` blocks render to nothing, like unknown
    /// block types.
    pub show_tools: bool,

    /// Number of heading levels to shift (0-5).
    ///
    /// A value of 0 produces H1/H2/H3 headings (default).
    /// A value of 1 produces H2/H3/H4 headings, useful for embedding.
    pub heading_offset: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_tools: true,
            heading_offset: 0,
        }
    }
}

/// Returns a markdown heading prefix with the given level and offset.
///
/// The heading level is clamped to a maximum of 6 (H6).
fn heading(level: u8, offset: u8) -> String {
    let actual = level.saturating_add(offset).min(6);
    "#".repeat(actual as usize)
}

/// Renders a parsed session as Markdown.
///
/// Sessions without a recorded export time are stamped with the current
/// time. Use [`render_session_at`] to supply the clock explicitly.
#[must_use]
pub fn render_session(session: &Session, opts: &RenderOptions) -> String {
    render_session_at(session, opts, Utc::now())
}

/// Renders a parsed session as Markdown, using `now` as the export time
/// when the session does not record one.
///
/// # Arguments
///
/// * `session` - The parsed session to render
/// * `opts` - Configuration options controlling the output format
/// * `now` - Fallback export time
#[must_use]
pub fn render_session_at(session: &Session, opts: &RenderOptions, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    writeln!(out, "{} Session Export\n", heading(1, opts.heading_offset)).unwrap();
    render_metadata(&mut out, session.metadata(), now);

    for message in session.messages() {
        writeln!(
            out,
            "{} {}\n",
            heading(2, opts.heading_offset),
            role_label(&message.role)
        )
        .unwrap();

        let body = render_content(&message.content, opts);
        if !body.is_empty() {
            writeln!(out, "{body}\n").unwrap();
        }
        out.push_str("---\n\n");
    }

    out
}

fn render_metadata(out: &mut String, metadata: &Metadata, now: DateTime<Utc>) {
    let exported = metadata
        .exported_at
        .as_deref()
        .filter(|ts| !ts.is_empty())
        .map_or_else(|| now.format(TIMESTAMP_FORMAT).to_string(), format_timestamp);
    let working_dir = metadata
        .working_directory
        .as_deref()
        .filter(|dir| !dir.is_empty())
        .unwrap_or("Unknown");

    writeln!(out, "**Exported:** {exported}").unwrap();
    writeln!(out, "**Working Directory:** {working_dir}\n").unwrap();
    out.push_str("---\n\n");
}

/// Normalizes RFC 3339 timestamps to UTC; anything else is shown verbatim.
fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_owned(),
        |dt| dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string(),
    )
}

/// Upper-cases the first character of a role, e.g. `user` becomes `User`.
fn role_label(role: &str) -> String {
    let mut chars = role.chars();
    chars.next().map_or_else(
        || "Unknown".to_owned(),
        |first| first.to_uppercase().chain(chars).collect(),
    )
}

/// Renders a message body.
///
/// Plain text is returned unchanged. Block sequences render each block in
/// order and join the non-empty results with a blank line.
#[must_use]
pub fn render_content(content: &Content, opts: &RenderOptions) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Blocks(blocks) => blocks
            .iter()
            .map(|block| render_block(block, opts))
            .filter(|rendered| !rendered.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Renders a single content block. Unknown blocks render to an empty string.
#[must_use]
pub fn render_block(block: &ContentBlock, opts: &RenderOptions) -> String {
    match block {
        ContentBlock::Text(text) => text.clone(),
        ContentBlock::ToolUse {
            name,
            input,
            output,
        } if opts.show_tools => render_tool_use(name, input, output.as_deref(), opts),
        _ => String::new(),
    }
}

/// Renders a tool invocation: a heading, one line per parameter, then the
/// captured output in a tagged code block.
#[must_use]
pub fn render_tool_use(
    name: &str,
    input: &Map<String, Value>,
    output: Option<&str>,
    opts: &RenderOptions,
) -> String {
    let mut out = String::new();
    write!(out, "{} Tool Use: {name}", heading(3, opts.heading_offset)).unwrap();

    if !input.is_empty() {
        out.push_str("\n\n");
        let params: Vec<String> = input
            .iter()
            .map(|(key, value)| render_param(key, value))
            .collect();
        out.push_str(&params.join("\n"));
    }

    if let Some(output) = output.filter(|o| !o.is_empty()) {
        let tag = language::detect(output).tag();
        let body = truncate_output(output);
        out.push_str("\n\n");
        out.push_str(&fenced(&body, tag));
    }

    out
}

/// Renders one tool parameter as `**key**: value`.
///
/// Long string values are cut to [`MAX_PARAM_CHARS`] and fenced so they do
/// not run on inside the parameter list.
fn render_param(key: &str, value: &Value) -> String {
    match value {
        Value::String(text) if text.chars().count() > MAX_PARAM_CHARS => {
            let prefix: String = text.chars().take(MAX_PARAM_CHARS).collect();
            format!("**{key}**:\n{}", fenced(&format!("{prefix}..."), ""))
        }
        Value::String(text) => format!("**{key}**: {text}"),
        other => format!("**{key}**: {other}"),
    }
}

/// Keeps the head of an over-long output and notes how much was dropped.
fn truncate_output(output: &str) -> String {
    let total = output.chars().count();
    if total <= MAX_OUTPUT_CHARS {
        return output.to_owned();
    }

    let mut kept: String = output.chars().take(TRUNCATED_OUTPUT_CHARS).collect();
    write!(
        kept,
        "\n... ({} characters omitted)",
        total - TRUNCATED_OUTPUT_CHARS
    )
    .unwrap();
    kept
}

/// Wraps `body` in a code fence tagged with `tag`.
///
/// The fence is one backtick longer than the longest backtick run in the
/// body, so embedded fences cannot close the block early. Trailing newlines
/// of the body are dropped; the closing fence always sits on the next line.
fn fenced(body: &str, tag: &str) -> String {
    let longest_run = body
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(3));
    let body = body.trim_end_matches('\n');
    format!("{fence}{tag}\n{body}\n{fence}")
}
