//! Compile template source into the tree the renderer walks.
//!
//! This happens in two stages:
//! - The lexer chunks the source into tokens, validating paths and block
//!   nesting and gathering every diagnostic instead of stopping at the first.
//! - The parser lowers the balanced token stream into a [`Node`] tree and,
//!   when enabled, infers an example model on the side.
//!
//! [`Node`]: crate::types::tree::Node

mod lex;
mod parse;

use std::borrow::Cow;

use crate::infer::{Builder, InferredModel};
use crate::types::tree;
use crate::{Engine, Error, Result};

pub(crate) fn template<'source>(
    engine: &Engine,
    source: &'source str,
) -> Result<(tree::Template<'source>, Option<InferredModel>)> {
    let (tokens, errors) = lex::Lexer::new(source).tokenize();
    if !errors.is_empty() {
        return Err(Error::compile(source, errors));
    }
    let builder = engine.infer_model.then(Builder::new);
    let (nodes, builder) = parse::Parser::new(tokens, builder).parse();
    let template = tree::Template {
        source: Cow::Borrowed(source),
        nodes,
    };
    Ok((template, builder.map(Builder::finish)))
}
