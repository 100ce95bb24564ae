use std::cmp::max;
use std::fmt;
use std::io;

use unicode_width::UnicodeWidthStr;

use crate::types::span::Span;

/// A convenient type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during template compilation or rendering.
///
/// Compilation reports every problem in the template at once; the individual
/// diagnostics are available through [`syntax_errors`][Error::syntax_errors].
/// The pretty (alternate `{:#}`) form renders each diagnostic with the
/// offending line of template source underlined.
pub struct Error {
    kind: ErrorKind,
}

enum ErrorKind {
    Compile {
        source: String,
        errors: Vec<SyntaxError>,
    },
    Render {
        msg: String,
        source: String,
        span: Span,
    },
    Message(String),
    Io(io::Error),
}

/// A single diagnostic produced while compiling a template.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    kind: SyntaxErrorKind,
    msg: String,
    span: Span,
    line: usize,
    column: usize,
}

/// Classifies a [`SyntaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A block tag without its counterpart, or closed out of order.
    StructuralMismatch,
    /// A model path that does not follow the path grammar.
    InvalidPathSyntax,
    /// A malformed formatter call, e.g. unbalanced parentheses.
    FormatSyntax,
}

impl Error {
    pub(crate) fn compile(source: &str, errors: Vec<SyntaxError>) -> Self {
        Self {
            kind: ErrorKind::Compile {
                source: source.to_string(),
                errors,
            },
        }
    }

    pub(crate) fn render(msg: impl Into<String>, source: &str, span: Span) -> Self {
        Self {
            kind: ErrorKind::Render {
                msg: msg.into(),
                source: source.to_string(),
                span,
            },
        }
    }

    pub(crate) fn message(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Message(msg.into()),
        }
    }

    /// The diagnostics gathered during compilation, if this is a compile
    /// error.
    pub fn syntax_errors(&self) -> Option<&[SyntaxError]> {
        match &self.kind {
            ErrorKind::Compile { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

impl SyntaxError {
    pub(crate) fn new(
        kind: SyntaxErrorKind,
        msg: impl Into<String>,
        source: &str,
        span: Span,
    ) -> Self {
        let (line, column) = span.to_line_col(source);
        Self {
            kind,
            msg: msg.into(),
            span,
            line,
            column,
        }
    }

    pub fn kind(&self) -> SyntaxErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// The 1-based line of the tag this diagnostic refers to.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based character column of the tag this diagnostic refers to.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}, character {})",
            self.msg, self.line, self.column
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            kind: ErrorKind::Io(err),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::message(msg.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_error(self, f, true)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_error(self, f, f.alternate())
    }
}

fn fmt_error(err: &Error, f: &mut fmt::Formatter<'_>, pretty: bool) -> fmt::Result {
    match &err.kind {
        ErrorKind::Compile { source, errors } => {
            if pretty {
                for err in errors {
                    fmt_pretty(&err.msg, source, err.span, f)?;
                }
                Ok(())
            } else {
                match errors.as_slice() {
                    [err] => write!(f, "invalid template: {err}"),
                    errors => write!(
                        f,
                        "invalid template: {} syntax errors",
                        errors.len()
                    ),
                }
            }
        }
        ErrorKind::Render { msg, source, span } => {
            if pretty {
                fmt_pretty(msg, source, *span, f)
            } else {
                write!(f, "{} between bytes {} and {}", msg, span.m, span.n)
            }
        }
        ErrorKind::Message(msg) => write!(f, "{msg}"),
        ErrorKind::Io(io) => write!(f, "{io}"),
    }
}

fn fmt_pretty(msg: &str, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();

    // find the line the span starts on and the byte offset within it
    let mut idx = 0;
    let mut byte = span.m;
    for (i, line) in lines.iter().enumerate() {
        idx = i;
        if byte <= line.len() {
            break;
        }
        byte -= line.len() + 1;
    }
    let code = lines.get(idx).copied().unwrap_or("");
    let byte = byte.min(code.len());

    let col = code[..byte].width();
    let width = max(1, source[span].width());

    let num = (idx + 1).to_string();
    let pad = num.width();
    let pipe = "|";
    let underline = "^".repeat(width);

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        width = col + width,
    )
}
