//! The compiled representation of a template.
//!
//! The compiler lowers the token stream into a tree of [`Node`]s which the
//! renderer walks directly. Nodes refer back to the template source using
//! [`Span`]s so that render time errors can point at the offending tag.

use std::borrow::Cow;

use crate::types::span::Span;

#[cfg_attr(test, derive(Debug))]
pub struct Template<'source> {
    pub source: Cow<'source, str>,
    pub nodes: Vec<Node>,
}

#[cfg_attr(test, derive(Debug))]
pub enum Node {
    /// A run of raw template text, emitted verbatim.
    Content(Span),

    /// Look up a value and write its textual form. `escape` is false for
    /// triple delimited and `&` prefixed tags.
    Substitution { path: Path, escape: bool },

    /// Resolve a value, run it through the formatter registry and store the
    /// result in the current scope's formatting slot.
    FormatAssign { path: Path, argument: Option<String> },

    /// Write and clear the current scope's formatting slot.
    PrintFormatted,

    /// A conditional block. The body renders when the value at `path` is
    /// truthy (or falsy, when `negated`), scoped to the resolved value.
    Section {
        path: Path,
        body: Vec<Node>,
        negated: bool,
    },

    /// Render the body once per element of the list at `path`.
    Loop { path: Path, body: Vec<Node> },
}

/// A dotted model path as written in a tag, e.g. `../Person.Name`.
#[cfg_attr(test, derive(Debug))]
pub struct Path {
    pub raw: String,
    pub span: Span,
    pub segments: Vec<Segment>,
}

#[cfg_attr(test, derive(Debug))]
pub enum Segment {
    /// A `../` prefix, stepping out to the parent scope.
    Parent,
    /// A lone `?`, referring to the current scope itself.
    Query,
    /// A named lookup.
    Key(String),
}

impl Path {
    pub fn new(raw: &str, span: Span) -> Self {
        let mut segments = Vec::new();
        let mut rest = raw;
        while let Some(r) = rest
            .strip_prefix("../")
            .or_else(|| rest.strip_prefix("..\\"))
        {
            segments.push(Segment::Parent);
            rest = r;
        }
        if !rest.is_empty() {
            for seg in rest.split('.') {
                if seg == "?" {
                    segments.push(Segment::Query);
                } else {
                    segments.push(Segment::Key(seg.to_owned()));
                }
            }
        }
        Self {
            raw: raw.to_owned(),
            span,
            segments,
        }
    }

    /// A path referring to the current scope's own value, as written `[[.]]`.
    pub fn self_value(span: Span) -> Self {
        Self {
            raw: String::from("."),
            span,
            segments: Vec::new(),
        }
    }
}
