use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::types::span::Span;

/// A lexer that splits the template source into raw content runs and tags so
/// that the parser doesn't have to operate on raw text.
///
/// Unlike most lexers this one never fails fast: every malformed tag is
/// recorded as a [`SyntaxError`] and scanning continues, so a single compile
/// reports everything wrong with the template. Block nesting is checked here
/// too, which means the token stream handed to the parser is always balanced.
pub struct Lexer<'source> {
    /// The original template source.
    source: &'source str,

    /// Tokens produced so far.
    tokens: Vec<Token>,

    /// Diagnostics gathered while scanning.
    errors: Vec<SyntaxError>,

    /// The stack of currently open blocks.
    scopes: Vec<Scope>,
}

struct Scope {
    kind: ScopeKind,
    name: String,
    span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    /// An `[[#each path]]` block.
    Each,
    /// An `[[#path]]` or `[[^path]]` block.
    Element,
}

/// The unit yielded by the lexer.
#[cfg_attr(test, derive(Debug))]
pub struct Token {
    pub kind: TokenKind,
    /// For content: the span of the raw run. For anything else: the span of
    /// the whole tag including delimiters.
    pub span: Span,
    /// The model path named by the tag, if it has one.
    pub value: String,
    /// The formatter argument, for format tags written `[[path(arg)]]`.
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw template content.
    Content,
    /// `[[!...]]`, dropped from the output.
    Comment,
    /// `[[path]]`
    EscapedValue,
    /// `[[[path]]]` or `[[&path]]`
    UnescapedValue,
    /// `[[#path]]`
    SectionOpen,
    /// `[[^path]]`
    InvertedOpen,
    /// `[[/path]]`
    SectionClose,
    /// `[[#each path]]`
    CollectionOpen,
    /// `[[/each]]`
    CollectionClose,
    /// `[[path(arg)]]`, or one link of a chained format call.
    FormatAssign,
    /// Emitted after the format assigns of a tag, prints the buffer.
    PrintFormatted,
    /// `[[.]]`
    PrintSelf,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            errors: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Scan the whole source.
    ///
    /// Returns every token and every diagnostic; the caller decides whether
    /// the errors are fatal.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<SyntaxError>) {
        let mut start = 0;
        let mut pos = 0;
        while let Some((span, inner, triple)) = self.find_tag(pos) {
            if span.m > start {
                self.push(TokenKind::Content, Span::from(start..span.m));
            }
            self.lex_tag(inner, span, triple);
            pos = span.n;
            start = pos;
        }
        if start < self.source.len() {
            self.push(TokenKind::Content, Span::from(start..self.source.len()));
        }
        while let Some(scope) = self.scopes.pop() {
            self.errors.push(SyntaxError::new(
                SyntaxErrorKind::StructuralMismatch,
                format!(
                    "a block for the path '{}' was opened but never closed",
                    scope.name
                ),
                self.source,
                scope.span,
            ));
        }
        (self.tokens, self.errors)
    }

    /// Find the next well delimited tag at or after `pos`.
    ///
    /// A tag is `[[ ... ]]` or `[[[ ... ]]]` whose interior is non-empty and
    /// free of square brackets. Anything that merely looks like a delimiter,
    /// e.g. a dangling `[[`, stays raw content.
    fn find_tag(&self, mut pos: usize) -> Option<(Span, Span, bool)> {
        let source = self.source;
        while let Some(rel) = source[pos..].find("[[") {
            let at = pos + rel;
            if source[at..].starts_with("[[[") {
                if let Some(end) = source[at + 3..].find("]]]") {
                    let inner = Span::from(at + 3..at + 3 + end);
                    if is_clean(&source[inner]) {
                        return Some((Span::from(at..inner.n + 3), inner, true));
                    }
                }
            }
            if let Some(end) = source[at + 2..].find("]]") {
                let inner = Span::from(at + 2..at + 2 + end);
                if is_clean(&source[inner]) {
                    return Some((Span::from(at..inner.n + 2), inner, false));
                }
            }
            pos = at + 1;
        }
        None
    }

    fn lex_tag(&mut self, inner: Span, span: Span, triple: bool) {
        let t = self.source[inner].trim();

        // triple delimited tags are always plain unescaped values, the
        // prefix sigils below only apply inside double delimiters
        if triple {
            let path = t.trim_start_matches('&').trim();
            self.validate_path(path, span);
            self.push_path(TokenKind::UnescapedValue, span, path);
            return;
        }

        if t.starts_with('!') {
            self.push(TokenKind::Comment, span);
        } else if let Some(rest) = t.strip_prefix("#each") {
            if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
                let path = rest.trim();
                self.validate_path(path, span);
                self.scopes.push(Scope {
                    kind: ScopeKind::Each,
                    name: path.to_owned(),
                    span,
                });
                self.push_path(TokenKind::CollectionOpen, span, path);
            } else {
                self.error(
                    SyntaxErrorKind::InvalidPathSyntax,
                    "the 'each' block being opened requires a model path to be \
                     specified in the form '[[#each <path>]]'",
                    span,
                );
            }
        } else if t.starts_with("/each") {
            if t != "/each" {
                self.error(
                    SyntaxErrorKind::StructuralMismatch,
                    "the syntax to close the 'each' block should be: '[[/each]]'",
                    span,
                );
            } else if matches!(self.scopes.last(), Some(s) if s.kind == ScopeKind::Each) {
                self.scopes.pop();
                self.push(TokenKind::CollectionClose, span);
            } else {
                self.error(
                    SyntaxErrorKind::StructuralMismatch,
                    "an 'each' block is being closed, but no corresponding opening \
                     element ('[[#each <path>]]') was detected",
                    span,
                );
            }
        } else if let Some(name) = t.strip_prefix('#') {
            self.open_element(TokenKind::SectionOpen, name.trim(), span);
        } else if let Some(name) = t.strip_prefix('^') {
            self.open_element(TokenKind::InvertedOpen, name.trim(), span);
        } else if let Some(name) = t.strip_prefix('/') {
            let name = name.trim();
            let matched = matches!(
                self.scopes.last(),
                Some(s) if s.kind == ScopeKind::Element && s.name == name
            );
            if matched {
                self.scopes.pop();
                self.push_path(TokenKind::SectionClose, span, name);
            } else {
                self.error(
                    SyntaxErrorKind::StructuralMismatch,
                    "it appears that open and closing elements are mismatched",
                    span,
                );
            }
        } else if let Some(path) = t.strip_prefix('&') {
            let path = path.trim();
            self.validate_path(path, span);
            self.push_path(TokenKind::UnescapedValue, span, path);
        } else if t == "." {
            self.push(TokenKind::PrintSelf, span);
        } else if t == "?" || t.contains('(') || t.contains(')') {
            self.lex_format(t, span);
        } else {
            self.validate_path(t, span);
            self.push_path(TokenKind::EscapedValue, span, t);
        }
    }

    /// Open an `[[#name]]` or `[[^name]]` block.
    ///
    /// Opening a block with the same path as the currently open one closes
    /// it implicitly, so `[[#x]]..[[^x]]..[[/x]]` reads as if/else.
    fn open_element(&mut self, kind: TokenKind, name: &str, span: Span) {
        self.validate_path(name, span);
        let negates = matches!(
            self.scopes.last(),
            Some(s) if s.kind == ScopeKind::Element && s.name == name
        );
        if negates {
            self.push_path(TokenKind::SectionClose, span, name);
        } else {
            self.scopes.push(Scope {
                kind: ScopeKind::Element,
                name: name.to_owned(),
                span,
            });
        }
        self.push_path(kind, span, name);
    }

    /// Lex a format tag like `[[date(dd.MM.yyyy)]]` or a chain like
    /// `[[date(d).Year]]`, ending with a print of the buffered result.
    fn lex_format(&mut self, t: &str, span: Span) {
        let mut part = t;
        loop {
            let open = match part.find('(') {
                Some(open) => open,
                None => {
                    if part.contains(')') {
                        self.error(
                            SyntaxErrorKind::FormatSyntax,
                            format!("the format call '{t}' has a ')' without a matching '('"),
                            span,
                        );
                    } else {
                        self.validate_path(part, span);
                        self.tokens.push(Token {
                            kind: TokenKind::FormatAssign,
                            span,
                            value: part.to_owned(),
                            argument: None,
                        });
                    }
                    break;
                }
            };
            let head = part[..open].trim_end();
            let close = match part[open + 1..].find(')') {
                Some(close) => open + 1 + close,
                None => {
                    self.error(
                        SyntaxErrorKind::FormatSyntax,
                        format!("the format call '{t}' is missing a closing ')'"),
                        span,
                    );
                    break;
                }
            };
            self.validate_path(head, span);
            self.tokens.push(Token {
                kind: TokenKind::FormatAssign,
                span,
                value: head.to_owned(),
                argument: Some(part[open + 1..close].to_owned()),
            });
            let rest = &part[close + 1..];
            if rest.is_empty() {
                break;
            }
            match rest.strip_prefix('.') {
                Some(next) => part = next,
                None => {
                    self.error(
                        SyntaxErrorKind::FormatSyntax,
                        format!("unexpected characters after the format call in '{t}'"),
                        span,
                    );
                    break;
                }
            }
        }
        self.push(TokenKind::PrintFormatted, span);
    }

    fn validate_path(&mut self, path: &str, span: Span) {
        if !is_valid_path(path) {
            self.error(
                SyntaxErrorKind::InvalidPathSyntax,
                format!(
                    "the path '{path}' is not valid: paths are dotted segments of \
                     letters, digits, '_', '$' or '?', optionally prefixed with '../'"
                ),
                span,
            );
        }
    }

    fn error(&mut self, kind: SyntaxErrorKind, msg: impl Into<String>, span: Span) {
        self.errors
            .push(SyntaxError::new(kind, msg, self.source, span));
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.push_path(kind, span, "");
    }

    fn push_path(&mut self, kind: TokenKind, span: Span, value: &str) {
        self.tokens.push(Token {
            kind,
            span,
            value: value.to_owned(),
            argument: None,
        });
    }
}

fn is_clean(interior: &str) -> bool {
    !interior.is_empty() && !interior.contains(['[', ']'])
}

fn is_valid_path(path: &str) -> bool {
    let mut rest = path;
    let mut ascended = false;
    while let Some(r) = rest
        .strip_prefix("../")
        .or_else(|| rest.strip_prefix("..\\"))
    {
        rest = r;
        ascended = true;
    }
    if rest.is_empty() {
        return ascended;
    }
    rest.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '?'))
    })
}
