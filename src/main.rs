// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for session-export.
//!
//! This binary reads one session log and writes `<base>.md` and
//! `<base>.html` next to each other.

use lexopt::prelude::*;
use session_export::{html, parser, renderer};
use snafu::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DEFAULT_SESSION_FILE: &str = "session-data.json";
const DEFAULT_OUTPUT_BASE: &str = "session-export";
const DEFAULT_TEMPLATE_FILE: &str = "template.html";

struct Cli {
    session: PathBuf,
    output_base: PathBuf,
    template: PathBuf,
    html: bool,
    show_tools: bool,
    heading_offset: u8,
    quiet: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("heading-offset must be 0-5, got {value}"))]
    InvalidHeadingOffset { value: u8 },

    #[snafu(display("failed to load session"))]
    Load { source: parser::LoadError },

    #[snafu(display("failed to load HTML template"))]
    Template { source: html::HtmlError },

    #[snafu(display("failed to build HTML export"))]
    Embed { source: html::HtmlError },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Export a session log to Markdown and self-contained HTML

Usage: {name} [OPTIONS] [SESSION] [OUTPUT_BASE]

Arguments:
  [SESSION]      Session JSON file (default: {session} next to the program)
  [OUTPUT_BASE]  Output path without extension; writes <base>.md and <base>.html
                 (default: {output} next to the program)

Options:
      --template <PATH>     HTML template (default: {template} next to the program)
      --no-html             Only write the Markdown export
      --heading-offset <N>  Shift heading levels by N (0-5, default: 0)
      --show-tools          Include tool invocations (default: on)
      --hide-tools          Hide tool invocations
  -q, --quiet               Suppress progress messages
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        session = DEFAULT_SESSION_FILE,
        output = DEFAULT_OUTPUT_BASE,
        template = DEFAULT_TEMPLATE_FILE,
    );
}

/// Directory holding the running executable, where default files live.
fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut template: Option<PathBuf> = None;
    let mut html = true;
    let mut show_tools = true;
    let mut heading_offset: u8 = 0;
    let mut quiet = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("template") => template = Some(parser.value()?.parse()?),
            Long("no-html") => html = false,
            // Show/hide flags - last one wins
            Long("show-tools") => show_tools = true,
            Long("hide-tools") => show_tools = false,
            Long("heading-offset") => {
                heading_offset = parser
                    .value()?
                    .parse()
                    .map_err(|_| "heading-offset must be a number 0-5")?;
            }
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if positional.len() < 2 => positional.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    let mut positional = positional.into_iter();
    let dir = program_dir();
    Ok(Cli {
        session: positional
            .next()
            .unwrap_or_else(|| dir.join(DEFAULT_SESSION_FILE)),
        output_base: positional
            .next()
            .unwrap_or_else(|| dir.join(DEFAULT_OUTPUT_BASE)),
        template: template.unwrap_or_else(|| dir.join(DEFAULT_TEMPLATE_FILE)),
        html,
        show_tools,
        heading_offset,
        quiet,
    })
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    ensure!(
        cli.heading_offset <= 5,
        InvalidHeadingOffsetSnafu {
            value: cli.heading_offset
        }
    );

    progress(&cli, &format!("Loading session from: {}", cli.session.display()));
    let session = parser::load_session(&cli.session).context(LoadSnafu)?;
    progress(&cli, &format!("Loaded {} messages", session.messages().len()));

    let opts = renderer::RenderOptions {
        show_tools: cli.show_tools,
        heading_offset: cli.heading_offset,
    };
    let markdown = renderer::render_session(&session, &opts);
    write_output(&cli, &with_suffix(&cli.output_base, "md"), &markdown)?;

    if cli.html {
        let template = html::load_template(&cli.template).context(TemplateSnafu)?;
        let page = html::embed_session(&template, &session).context(EmbedSnafu)?;
        write_output(&cli, &with_suffix(&cli.output_base, "html"), &page)?;
    }

    progress(&cli, "Done!");
    Ok(())
}

fn progress(cli: &Cli, message: &str) {
    if !cli.quiet {
        println!("{message}");
    }
}

/// Appends `.ext` to `base`, keeping any dots already in the file name.
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Writes `contents` to `path`, creating the parent directory if needed.
fn write_output(cli: &Cli, path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu { path: parent })?;
    }
    std::fs::write(path, contents).context(WriteFileSnafu { path })?;

    progress(cli, &format!("Written: {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_suffix_to_base() {
        assert_eq!(
            with_suffix(Path::new("out/session"), "md"),
            PathBuf::from("out/session.md")
        );
    }

    #[test]
    fn keeps_dots_in_base_name() {
        assert_eq!(
            with_suffix(Path::new("export.v2"), "html"),
            PathBuf::from("export.v2.html")
        );
    }
}
