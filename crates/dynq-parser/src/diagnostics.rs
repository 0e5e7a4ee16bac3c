//! Ariadne-based rendering of parse errors.
//!
//! Every [`ParseError`] renders as one report: the error code of its
//! category, the message, and a caret label at the offending offset.
//! `json` mode emits a single-line JSON object instead, for tooling.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use dynq_common::error::{ErrorCategory, ParseError};

/// How diagnostics are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

impl DiagnosticOptions {
    /// Plain text, for snapshots and piped output.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

#[derive(Serialize)]
struct JsonSpan {
    start: u32,
    end: u32,
    label: String,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'static str,
    severity: &'static str,
    category: ErrorCategory,
    message: String,
    file: &'a str,
    spans: Vec<JsonSpan>,
}

fn label_text(error: &ParseError) -> &'static str {
    match error.kind.category() {
        ErrorCategory::Lexical => "invalid token",
        ErrorCategory::Syntax => "unexpected here",
        ErrorCategory::NameResolution => "not resolved",
        ErrorCategory::TypeResolution => "type error",
    }
}

/// Render `error` against the expression text it came from.
pub fn render_diagnostic(
    error: &ParseError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    if options.json {
        return render_json(error, filename);
    }

    let source_len = source.chars().count();
    // Ariadne needs a span of at least one character.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len + 1).max(s);
        if s == e {
            s..s + 1
        } else {
            s..e
        }
    };
    let span = clamp(error.span.start as usize..error.span.end as usize);
    let message = error.message();

    let report = Report::build(ReportKind::Error, span.clone())
        .with_code(error.kind.code())
        .with_message(&message)
        .with_config(Config::default().with_color(options.color))
        .with_label(
            Label::new(span)
                .with_message(label_text(error))
                .with_color(Color::Red),
        )
        .finish();

    // The caret may sit one past the last character (end of input); give
    // ariadne a trailing space to point at.
    let padded = format!("{source} ");
    let mut buf = Vec::new();
    if report.write(Source::from(padded.as_str()), &mut buf).is_err() {
        return error.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn render_json(error: &ParseError, filename: &str) -> String {
    let diagnostic = JsonDiagnostic {
        code: error.kind.code(),
        severity: "error",
        category: error.kind.category(),
        message: error.message(),
        file: filename,
        spans: vec![JsonSpan {
            start: error.span.start,
            end: error.span.end,
            label: label_text(error).to_string(),
        }],
    };
    serde_json::to_string(&diagnostic).unwrap_or_else(|_| error.to_string())
}
