// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for session logs.
//!
//! A session log is a loosely-typed document. Parsing is lenient: apart from
//! requiring the root to be a JSON object, no field is mandatory, and every
//! missing or oddly-shaped field falls back to a default instead of failing.
//!
//! # Format Overview
//!
//! A session contains:
//! - `metadata` with an optional `exportedAt` timestamp and `workingDirectory`
//! - `messages`, each with a `role` and a `content` that is either a plain
//!   string or a list of typed blocks (`text`, `tool_use`)
//!
//! # Example
//!
//! ```
//! use session_export::parser::{Content, parse_session};
//!
//! let json = r#"{
//!     "metadata": { "workingDirectory": "/tmp" },
//!     "messages": [{ "role": "user", "content": "hello" }]
//! }"#;
//!
//! let session = parse_session(json).unwrap();
//! assert_eq!(session.messages().len(), 1);
//! assert_eq!(session.messages()[0].content, Content::Text("hello".into()));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// Error type for loading a session from disk.
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// The session file does not exist.
    #[snafu(display("session file not found: {}", path.display()))]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The session file exists but could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Read {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The session file is not a valid session document.
    #[snafu(display("invalid session data in {}: {source}", path.display()))]
    Format {
        /// The path being parsed.
        path: PathBuf,
        /// The underlying parse error.
        source: ParseError,
    },
}

/// The root of an exported session.
///
/// Besides the typed view used for rendering, a session keeps the JSON tree
/// it was parsed from. Serializing a session writes that tree back out, so
/// fields this crate does not model survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    metadata: Metadata,
    messages: Vec<Message>,
    raw: Value,
}

impl Session {
    /// Builds a session from an already-parsed JSON object.
    ///
    /// Missing `metadata` or `messages` resolve to empty defaults.
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let metadata = raw.get("metadata").map(Metadata::from_value).unwrap_or_default();
        let messages = raw
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Message::from_value).collect())
            .unwrap_or_default();

        Self {
            metadata,
            messages,
            raw,
        }
    }

    /// Session-level metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The messages of the conversation, in recorded order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The JSON tree this session was parsed from.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Serializes the session back to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON tree cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("session must be a JSON object"));
        }
        Ok(Self::from_value(value))
    }
}

impl Serialize for Session {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.serialize(serializer)
    }
}

/// Metadata recorded alongside the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// When the session was exported, as recorded by the producer.
    ///
    /// Usually an RFC 3339 timestamp, but kept as free-form text.
    pub exported_at: Option<String>,

    /// The working directory the session ran in.
    pub working_directory: Option<String>,
}

impl Metadata {
    fn from_value(value: &Value) -> Self {
        Self {
            exported_at: get_string(value, &["exportedAt"]),
            working_directory: get_string(value, &["workingDirectory"]),
        }
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who sent the message (e.g., "user", "assistant"). Empty if absent.
    pub role: String,

    /// The message body.
    pub content: Content,
}

impl Message {
    fn from_value(value: &Value) -> Self {
        Self {
            role: get_string(value, &["role"]).unwrap_or_default(),
            content: value.get("content").map(Content::from_value).unwrap_or_default(),
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from_value(&Value::deserialize(deserializer)?))
    }
}

/// The body of a message: plain text or a sequence of typed blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// A plain string, rendered as-is.
    Text(String),

    /// An ordered list of content blocks.
    Blocks(Vec<ContentBlock>),
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Content {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(items) => Self::Blocks(items.iter().map(ContentBlock::from_value).collect()),
            _ => Self::default(),
        }
    }
}

/// One typed unit within a message's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Prose written by a participant.
    Text(String),

    /// A recorded invocation of a tool.
    ToolUse {
        /// The tool name, `"Unknown"` if absent.
        name: String,
        /// The parameters passed to the tool, in recorded order.
        input: Map<String, Value>,
        /// Captured tool output, if any.
        output: Option<String>,
    },

    /// A block with a missing or unrecognized `type`.
    ///
    /// Such blocks are kept so block positions stay stable, but render to
    /// nothing.
    Other,
}

impl ContentBlock {
    fn from_value(value: &Value) -> Self {
        match get_str(value, &["type"]) {
            Some("text") => Self::Text(get_string(value, &["text"]).unwrap_or_default()),
            Some("tool_use") => Self::ToolUse {
                name: get_string(value, &["name"]).unwrap_or_else(|| "Unknown".to_owned()),
                input: value
                    .get("input")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                output: extract_output(value),
            },
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self::from_value(&Value::deserialize(deserializer)?))
    }
}

/// Extracts tool output, keeping non-string payloads as compact JSON text.
fn extract_output(value: &Value) -> Option<String> {
    match value.get("output")? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Navigates a JSON path and returns the string value at the end.
///
/// # Arguments
///
/// * `value` - The root JSON value to navigate from
/// * `path` - A sequence of keys to follow through the JSON structure
fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Parses a JSON string into a [`Session`].
///
/// # Errors
///
/// Returns an error if the JSON is malformed or its root is not an object.
///
/// # Example
///
/// ```
/// use session_export::parser::parse_session;
///
/// let session = parse_session(r#"{"messages": []}"#).unwrap();
/// assert!(session.messages().is_empty());
/// assert!(session.metadata().exported_at.is_none());
/// ```
pub fn parse_session(json_str: &str) -> Result<Session, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Reads and parses the session file at `path`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] if the file does not exist,
/// [`LoadError::Read`] for other I/O failures and [`LoadError::Format`] if
/// the content is not a session document.
pub fn load_session(path: &Path) -> Result<Session, LoadError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return NotFoundSnafu { path }.fail();
        }
        Err(source) => return Err(source).context(ReadSnafu { path }),
    };
    parse_session(&json).context(FormatSnafu { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_json(messages_json: &str) -> String {
        format!(
            r#"{{
                "metadata": {{
                    "exportedAt": "2024-12-05T00:00:00Z",
                    "workingDirectory": "/home/dev/project"
                }},
                "messages": [{messages_json}]
            }}"#
        )
    }

    fn first_blocks(session: &Session) -> &[ContentBlock] {
        match &session.messages()[0].content {
            Content::Blocks(blocks) => blocks,
            other => panic!("Expected Blocks, got {other:?}"),
        }
    }

    #[test]
    fn parses_metadata() {
        let session = parse_session(&session_json("")).unwrap();

        assert_eq!(
            session.metadata().exported_at.as_deref(),
            Some("2024-12-05T00:00:00Z")
        );
        assert_eq!(
            session.metadata().working_directory.as_deref(),
            Some("/home/dev/project")
        );
        assert!(session.messages().is_empty());
    }

    #[test]
    fn parses_plain_string_content() {
        let json = session_json(r#"{"role": "user", "content": "hello"}"#);
        let session = parse_session(&json).unwrap();

        let message = &session.messages()[0];
        assert_eq!(message.role, "user");
        assert_eq!(message.content, Content::Text("hello".into()));
    }

    #[test]
    fn parses_text_block() {
        let json = session_json(
            r#"{"role": "assistant", "content": [{"type": "text", "text": "Hi there!"}]}"#,
        );
        let session = parse_session(&json).unwrap();

        assert_eq!(first_blocks(&session), [ContentBlock::Text("Hi there!".into())]);
    }

    #[test]
    fn parses_tool_use_block() {
        let json = session_json(
            r#"{"role": "assistant", "content": [{
                "type": "tool_use",
                "name": "Bash",
                "input": {"command": "ls", "timeout": 30},
                "output": "Cargo.toml"
            }]}"#,
        );
        let session = parse_session(&json).unwrap();

        match &first_blocks(&session)[0] {
            ContentBlock::ToolUse {
                name,
                input,
                output,
            } => {
                assert_eq!(name, "Bash");
                assert_eq!(input["command"], "ls");
                assert_eq!(input["timeout"], 30);
                assert_eq!(output.as_deref(), Some("Cargo.toml"));
            }
            other => panic!("Expected ToolUse, got {other:?}"),
        }
    }

    #[test]
    fn tool_use_defaults_missing_fields() {
        let json = session_json(r#"{"role": "assistant", "content": [{"type": "tool_use"}]}"#);
        let session = parse_session(&json).unwrap();

        assert_eq!(
            first_blocks(&session),
            [ContentBlock::ToolUse {
                name: "Unknown".into(),
                input: Map::new(),
                output: None,
            }]
        );
    }

    #[test]
    fn tool_use_keeps_input_order() {
        let json = session_json(
            r#"{"role": "assistant", "content": [{
                "type": "tool_use",
                "name": "Edit",
                "input": {"zeta": 1, "alpha": 2, "mid": 3}
            }]}"#,
        );
        let session = parse_session(&json).unwrap();

        let ContentBlock::ToolUse { input, .. } = &first_blocks(&session)[0] else {
            panic!("Expected ToolUse");
        };
        let keys: Vec<&str> = input.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn non_string_output_kept_as_json_text() {
        let json = session_json(
            r#"{"role": "assistant", "content": [{
                "type": "tool_use",
                "name": "Query",
                "output": {"rows": 2}
            }]}"#,
        );
        let session = parse_session(&json).unwrap();

        let ContentBlock::ToolUse { output, .. } = &first_blocks(&session)[0] else {
            panic!("Expected ToolUse");
        };
        assert_eq!(output.as_deref(), Some(r#"{"rows":2}"#));
    }

    #[test]
    fn null_output_is_absent() {
        let json = session_json(
            r#"{"role": "assistant", "content": [{"type": "tool_use", "name": "X", "output": null}]}"#,
        );
        let session = parse_session(&json).unwrap();

        let ContentBlock::ToolUse { output, .. } = &first_blocks(&session)[0] else {
            panic!("Expected ToolUse");
        };
        assert!(output.is_none());
    }

    #[test]
    fn parses_unknown_and_untyped_blocks_as_other() {
        let json = session_json(
            r#"{"role": "assistant", "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"text": "no type"},
                "bare string"
            ]}"#,
        );
        let session = parse_session(&json).unwrap();

        assert_eq!(
            first_blocks(&session),
            [ContentBlock::Other, ContentBlock::Other, ContentBlock::Other]
        );
    }

    #[test]
    fn missing_fields_resolve_to_defaults() {
        let session = parse_session(r#"{"messages": [{}]}"#).unwrap();

        assert_eq!(session.metadata(), &Metadata::default());
        let message = &session.messages()[0];
        assert_eq!(message.role, "");
        assert_eq!(message.content, Content::Text(String::new()));
    }

    #[test]
    fn odd_content_shape_becomes_empty_text() {
        let json = session_json(r#"{"role": "user", "content": 42}"#);
        let session = parse_session(&json).unwrap();

        assert_eq!(session.messages()[0].content, Content::default());
    }

    #[test]
    fn empty_object_is_a_valid_session() {
        let session = parse_session("{}").unwrap();

        assert!(session.messages().is_empty());
        assert!(session.metadata().working_directory.is_none());
    }

    #[test]
    fn reserializes_original_document() {
        let json = r#"{"metadata":{"workingDirectory":"/tmp","extra":true},"messages":[{"role":"user","content":"hello","id":7}]}"#;
        let session = parse_session(json).unwrap();

        assert_eq!(session.to_json().unwrap(), json);
    }

    #[test]
    fn deserializes_message_directly() {
        let message: Message = serde_json::from_str(
            r#"{"role": "assistant", "content": [{"type": "text", "text": "ok"}]}"#,
        )
        .unwrap();

        assert_eq!(message.role, "assistant");
        assert_eq!(
            message.content,
            Content::Blocks(vec![ContentBlock::Text("ok".into())])
        );
    }

    #[test]
    fn deserializes_content_block_directly() {
        let block: ContentBlock =
            serde_json::from_str(r#"{"type": "tool_use", "name": "Grep", "input": {"pattern": "fn"}}"#)
                .unwrap();
        let image: ContentBlock = serde_json::from_str(r#"{"type": "image"}"#).unwrap();

        match block {
            ContentBlock::ToolUse { name, input, output } => {
                assert_eq!(name, "Grep");
                assert_eq!(input["pattern"], "fn");
                assert!(output.is_none());
            }
            other => panic!("Expected ToolUse, got {other:?}"),
        }
        assert_eq!(image, ContentBlock::Other);
    }

    #[test]
    fn serializes_session_as_original_tree() {
        let json = r#"{"messages":[{"role":"user","content":"hi","extra":[1,2]}],"metadata":{}}"#;
        let session = parse_session(json).unwrap();

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(&value, session.raw());
        assert_eq!(serde_json::to_string(&session).unwrap(), json);
    }

    #[test]
    fn returns_error_for_invalid_json() {
        let result = parse_session("not valid json");
        assert!(result.is_err());
    }

    #[test]
    fn returns_error_for_non_object_root() {
        assert!(parse_session("[]").is_err());
        assert!(parse_session(r#""session""#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = load_session(&path).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn load_reports_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_session(&path).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn load_reads_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, session_json(r#"{"role": "user", "content": "hi"}"#)).unwrap();

        let session = load_session(&path).unwrap();
        assert_eq!(session.messages().len(), 1);
    }
}
