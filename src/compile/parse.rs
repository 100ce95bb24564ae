use crate::compile::lex::{Token, TokenKind};
use crate::infer;
use crate::types::tree::{Node, Path};

/// A parser that lowers the token stream into a [`Node`] tree.
///
/// The lexer has already validated nesting and paths, so parsing is a
/// straightforward recursive descent over block opens and closes. When model
/// inference is enabled the parser also registers every dereferenced path
/// with the [`infer::Builder`] as it goes, carrying the inference scope down
/// into blocks.
pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    infer: Option<infer::Builder>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, infer: Option<infer::Builder>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            infer,
        }
    }

    pub fn parse(mut self) -> (Vec<Node>, Option<infer::Builder>) {
        let nodes = self.parse_block(0);
        debug_assert!(self.tokens.next().is_none(), "lexer bug: unbalanced blocks");
        (nodes, self.infer)
    }

    fn parse_block(&mut self, scope: infer::ScopeId) -> Vec<Node> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Content => {
                    nodes.push(Node::Content(token.span));
                }

                TokenKind::Comment => continue,

                TokenKind::EscapedValue | TokenKind::UnescapedValue => {
                    let escape = token.kind == TokenKind::EscapedValue;
                    let path = Path::new(&token.value, token.span);
                    self.register(&path, scope, infer::Usage::Scalar);
                    nodes.push(Node::Substitution { path, escape });
                }

                TokenKind::PrintSelf => {
                    nodes.push(Node::Substitution {
                        path: Path::self_value(token.span),
                        escape: true,
                    });
                }

                TokenKind::FormatAssign => {
                    let path = Path::new(&token.value, token.span);
                    self.register(&path, scope, infer::Usage::Scalar);
                    nodes.push(Node::FormatAssign {
                        path,
                        argument: token.argument,
                    });
                }

                TokenKind::PrintFormatted => {
                    nodes.push(Node::PrintFormatted);
                }

                TokenKind::SectionOpen | TokenKind::InvertedOpen => {
                    let negated = token.kind == TokenKind::InvertedOpen;
                    let path = Path::new(&token.value, token.span);
                    let inner = self.register(&path, scope, infer::Usage::Conditional);
                    let body = self.parse_block(inner);
                    nodes.push(Node::Section {
                        path,
                        body,
                        negated,
                    });
                }

                TokenKind::CollectionOpen => {
                    let path = Path::new(&token.value, token.span);
                    let inner = self.register(&path, scope, infer::Usage::Collection);
                    let body = self.parse_block(inner);
                    nodes.push(Node::Loop { path, body });
                }

                TokenKind::SectionClose | TokenKind::CollectionClose => break,
            }
        }
        nodes
    }

    fn register(
        &mut self,
        path: &Path,
        scope: infer::ScopeId,
        usage: infer::Usage,
    ) -> infer::ScopeId {
        match &mut self.infer {
            Some(builder) => builder.register(scope, path, usage),
            None => scope,
        }
    }
}
