// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Self-contained HTML export.
//!
//! The HTML page is a static template that decodes and displays the session
//! client-side. This module only fills in the data: the whole session is
//! serialized back to JSON, base64-encoded and substituted for the
//! [`PLACEHOLDER`] token.
//!
//! # Example
//!
//! ```
//! use session_export::{html, parser};
//!
//! let session = parser::parse_session(r#"{"messages":[]}"#).unwrap();
//! let page = html::embed_session("<script>load('{{SESSION_DATA}}')</script>", &session).unwrap();
//!
//! assert_eq!(page, "<script>load('eyJtZXNzYWdlcyI6W119')</script>");
//! ```

use crate::parser::Session;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use snafu::prelude::*;
use std::path::{Path, PathBuf};

/// The token in the template that is replaced by the encoded session.
pub const PLACEHOLDER: &str = "{{SESSION_DATA}}";

/// Error type for HTML generation.
#[derive(Debug, Snafu)]
pub enum HtmlError {
    /// The template file does not exist.
    #[snafu(display("template not found: {}", path.display()))]
    TemplateNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The template file exists but could not be read.
    #[snafu(display("failed to read template {}: {source}", path.display()))]
    ReadTemplate {
        /// The template path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The template has no placeholder to substitute.
    #[snafu(display("template does not contain {PLACEHOLDER}"))]
    MissingPlaceholder,

    /// The template contains the placeholder more than once.
    #[snafu(display("template contains {PLACEHOLDER} {count} times, expected once"))]
    DuplicatePlaceholder {
        /// How many placeholders were found.
        count: usize,
    },

    /// The session could not be serialized.
    #[snafu(display("failed to serialize session: {source}"))]
    Serialize {
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Reads the HTML template at `path`.
///
/// # Errors
///
/// Returns [`HtmlError::TemplateNotFound`] if the file does not exist and
/// [`HtmlError::ReadTemplate`] for other I/O failures.
pub fn load_template(path: &Path) -> Result<String, HtmlError> {
    match std::fs::read_to_string(path) {
        Ok(template) => Ok(template),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            TemplateNotFoundSnafu { path }.fail()
        }
        Err(source) => Err(source).context(ReadTemplateSnafu { path }),
    }
}

/// Serializes the session to compact JSON and base64-encodes it.
///
/// # Errors
///
/// Returns [`HtmlError::Serialize`] if the session cannot be serialized.
pub fn encode_session(session: &Session) -> Result<String, HtmlError> {
    let json = session.to_json().context(SerializeSnafu)?;
    Ok(STANDARD.encode(json))
}

/// Substitutes the encoded session into `template`.
///
/// The rest of the template is copied verbatim.
///
/// # Errors
///
/// Returns an error if the template does not contain [`PLACEHOLDER`]
/// exactly once, or if the session cannot be serialized.
pub fn embed_session(template: &str, session: &Session) -> Result<String, HtmlError> {
    let count = template.matches(PLACEHOLDER).count();
    ensure!(count > 0, MissingPlaceholderSnafu);
    ensure!(count == 1, DuplicatePlaceholderSnafu { count });

    let payload = encode_session(session)?;
    Ok(template.replacen(PLACEHOLDER, &payload, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_session;

    const SESSION: &str = r#"{"metadata":{"workingDirectory":"/tmp"},"messages":[{"role":"user","content":"hello"}]}"#;

    fn decode(payload: &str) -> String {
        String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn bare_placeholder_becomes_encoded_session() {
        let session = parse_session(SESSION).unwrap();
        let page = embed_session(PLACEHOLDER, &session).unwrap();

        assert_eq!(page, STANDARD.encode(SESSION));
    }

    #[test]
    fn surrounding_template_is_untouched() {
        let session = parse_session(SESSION).unwrap();
        let template = "<html>\n<body data-x=\"{{OTHER}}\">\n<script>const data = \"{{SESSION_DATA}}\";</script>\n</body>\n</html>\n";
        let page = embed_session(template, &session).unwrap();

        let payload = STANDARD.encode(SESSION);
        assert_eq!(page, template.replace(PLACEHOLDER, &payload));
        assert!(page.contains("{{OTHER}}"));
    }

    #[test]
    fn embedded_payload_round_trips() {
        let json = r#"{
            "metadata": {"exportedAt": "2024-12-05T00:00:00Z", "custom": [1, 2]},
            "messages": [{"role": "assistant", "content": [
                {"type": "tool_use", "name": "Bash", "input": {"command": "ls"}, "output": "ünïcödé"},
                {"type": "mystery", "payload": null}
            ]}]
        }"#;
        let session = parse_session(json).unwrap();
        let page = embed_session("[{{SESSION_DATA}}]", &session).unwrap();

        let payload = page.trim_start_matches('[').trim_end_matches(']');
        let decoded = parse_session(&decode(payload)).unwrap();
        assert_eq!(decoded, session);
        assert_eq!(decoded.raw(), &serde_json::from_str::<serde_json::Value>(json).unwrap());
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let session = parse_session(SESSION).unwrap();
        let err = embed_session("<html></html>", &session).unwrap_err();

        assert!(matches!(err, HtmlError::MissingPlaceholder));
    }

    #[test]
    fn rejects_duplicate_placeholder() {
        let session = parse_session(SESSION).unwrap();
        let err = embed_session("{{SESSION_DATA}}{{SESSION_DATA}}", &session).unwrap_err();

        assert!(matches!(err, HtmlError::DuplicatePlaceholder { count: 2 }));
    }

    #[test]
    fn load_template_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_template(&dir.path().join("template.html")).unwrap_err();

        assert!(matches!(err, HtmlError::TemplateNotFound { .. }));
        assert!(err.to_string().contains("template.html"));
    }

    #[test]
    fn load_template_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.html");
        std::fs::write(&path, "<p>{{SESSION_DATA}}</p>").unwrap();

        assert_eq!(load_template(&path).unwrap(), "<p>{{SESSION_DATA}}</p>");
    }
}
