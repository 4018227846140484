// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Code fence tag guessing for tool output.
//!
//! The guess is substring sniffing, not parsing. It is cheap and often
//! right, and a wrong tag only affects syntax highlighting in the viewer.

/// Substrings that mark output as source code.
const CODE_MARKERS: &[&str] = &[
    "function ",
    "def ",
    "class ",
    "import ",
    "const ",
    "let ",
    "fn ",
    "=> ",
];

/// The tag written after the opening code fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Output that looks like source code.
    Code,
    /// Output that looks like structured data.
    Data,
    /// Anything else.
    PlainText,
}

impl Language {
    /// The Markdown info string for this language.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Code => "javascript",
            Self::Data => "json",
            Self::PlainText => "text",
        }
    }
}

/// Guesses the language of `text`.
///
/// Code markers win over the data check, so a JSON blob that happens to
/// contain `import ` is tagged as code.
///
/// # Example
///
/// ```
/// use session_export::language::{Language, detect};
///
/// assert_eq!(detect(r#"{"a":1}"#), Language::Data);
/// assert_eq!(detect("import os"), Language::Code);
/// assert_eq!(detect("All tests passed."), Language::PlainText);
/// ```
#[must_use]
pub fn detect(text: &str) -> Language {
    if CODE_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Language::Code;
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Language::Data
    } else {
        Language::PlainText
    }
}
