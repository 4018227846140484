// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Export conversation session logs to Markdown and HTML.
//!
//! This crate turns a session log (a JSON document holding metadata and an
//! ordered list of messages) into two human-readable forms:
//!
//! 1. A Markdown transcript, with tool invocations rendered as labeled,
//!    length-limited blocks
//! 2. A self-contained HTML page that embeds the whole session as base64
//!
//! # Example
//!
//! ```no_run
//! use session_export::{html, parser, renderer};
//!
//! let session = parser::load_session("session-data.json".as_ref()).unwrap();
//!
//! let markdown = renderer::render_session(&session, &renderer::RenderOptions::default());
//! println!("{markdown}");
//!
//! let template = html::load_template("template.html".as_ref()).unwrap();
//! let page = html::embed_session(&template, &session).unwrap();
//! std::fs::write("session-export.html", page).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`parser`]: loading and lenient parsing of session JSON
//! - [`renderer`]: Markdown generation for sessions, messages and tool calls
//! - [`language`]: code fence tag guessing for tool output
//! - [`html`]: template substitution of the encoded session payload

#![deny(missing_docs)]

pub mod html;
pub mod language;
pub mod parser;
pub mod renderer;
