//! Span-aware error rendering shared by the CLI and the REPL.
//!
//! Walks the original source once, splitting it into the text before
//! the error span, the span itself (highlighted), and the text after,
//! tracking line numbers as it goes so each emitted line is prefixed
//! with its row.

use crate::error::WispError;
use crate::position::Position;

#[cfg(feature = "cli")]
use colored::Colorize;

/// Renders `err` against `source`, producing the multi-line,
/// row-prefixed report printed to stderr by the CLI and the REPL.
pub fn render(source: &str, err: &WispError) -> String {
    let mut out = String::new();
    if let Some(span) = err.span() {
        out.push_str(&render_span(source, span));
        out.push_str("\n\n");
    }
    out.push_str(&format!("{}: {}", stage_prefix(err.stage_label()), err));
    out
}

#[cfg(feature = "cli")]
fn stage_prefix(label: &str) -> String {
    label.bold().red().to_string()
}

#[cfg(not(feature = "cli"))]
fn stage_prefix(label: &str) -> String {
    label.to_string()
}

fn render_span(source: &str, span: Position) -> String {
    let bytes = source.as_bytes();
    let start = span.start.min(bytes.len());
    let end = span.end.min(bytes.len());

    let mut row = 1usize;
    for b in &bytes[..start] {
        if *b == b'\n' {
            row += 1;
        }
    }

    let before = line_around(source, 0, start);
    let highlighted = &source[start..end];
    let after_start = end;
    let after_end = bytes.len();
    let after = line_around(source, after_start, after_end);

    let marker = format!(" {row} | ");
    format!(
        "{}{}{}{}",
        decorate_gutter(&marker),
        before,
        decorate_error(highlighted),
        after
    )
}

/// Returns the slice of `source[from..to]` trimmed to just the lines
/// touching that range, so long files don't dump their entirety into
/// one diagnostic.
fn line_around(source: &str, from: usize, to: usize) -> &str {
    let from = from.min(source.len());
    let to = to.min(source.len());
    let line_start = source[..from].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[to..]
        .find('\n')
        .map(|i| to + i)
        .unwrap_or(source.len());
    &source[line_start..line_end]
}

#[cfg(feature = "cli")]
fn decorate_gutter(s: &str) -> String {
    s.bold().to_string()
}

#[cfg(not(feature = "cli"))]
fn decorate_gutter(s: &str) -> String {
    s.to_string()
}

#[cfg(feature = "cli")]
fn decorate_error(s: &str) -> String {
    s.on_red().to_string()
}

#[cfg(not(feature = "cli"))]
fn decorate_error(s: &str) -> String {
    format!(">>{s}<<")
}
