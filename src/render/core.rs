use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::format;
use crate::render::context::{Contexts, CtxId};
use crate::render::writer::{rtf_escape, Writer};
use crate::types::tree::{Node, Template};
use crate::value::ValueCow;
use crate::{Engine, Error, Result, Value};

/// A renderer that walks the compiled node tree.
///
/// Rendering is interruptible in two ways: the byte-budgeted [`Writer`]
/// aborts once the budget is reached, and the optional cancellation flag is
/// polled between nodes and loop iterations. Both stop the walk without an
/// error; whatever was written before the stop stays written.
pub struct RendererImpl<'render> {
    pub engine: &'render Engine,
    pub template: &'render Template<'render>,
    pub cancel: Option<&'render AtomicBool>,
}

impl<'render> RendererImpl<'render> {
    pub fn render<W>(&self, contexts: &mut Contexts<'render>, writer: &mut Writer<W>) -> Result<()>
    where
        W: io::Write,
    {
        self.render_block(&self.template.nodes, contexts, 0, writer)
    }

    fn render_block<W>(
        &self,
        nodes: &'render [Node],
        contexts: &mut Contexts<'render>,
        cur: CtxId,
        writer: &mut Writer<W>,
    ) -> Result<()>
    where
        W: io::Write,
    {
        for node in nodes {
            if writer.aborted() || self.cancelled() {
                break;
            }
            match node {
                Node::Content(span) => {
                    writer.write(self.template.source[*span].as_bytes())?;
                }

                Node::Substitution { path, escape } => {
                    let id = contexts.resolve(cur, path, false);
                    let value = &contexts.get(id).value;
                    // absent values print nothing; the null text only
                    // applies to format prints
                    if let Value::None = &**value {
                        continue;
                    }
                    let formatted = self.engine.formatters.format(value, None);
                    let mut text = format::text_of(&formatted);
                    if *escape && !self.engine.disable_escaping {
                        text = rtf_escape(&text);
                    }
                    writer.write(text.as_bytes())?;
                }

                Node::FormatAssign { path, argument } => {
                    let id = contexts.resolve(cur, path, true);
                    let result = self
                        .engine
                        .formatters
                        .format(&contexts.get(id).value, argument.as_deref());
                    contexts.get_mut(cur).formatting = Some(result);
                }

                Node::PrintFormatted => {
                    match contexts.get_mut(cur).formatting.take() {
                        Some(Value::None) | None => {
                            writer.write(self.engine.null_text.as_bytes())?;
                        }
                        Some(value) => {
                            writer.write(format::text_of(&value).as_bytes())?;
                        }
                    }
                }

                Node::Section {
                    path,
                    body,
                    negated,
                } => {
                    let id = contexts.resolve(cur, path, false);
                    if contexts.get(id).value.is_truthy() != *negated {
                        self.render_block(body, contexts, id, writer)?;
                    }
                }

                Node::Loop { path, body } => {
                    let id = contexts.resolve(cur, path, false);
                    if !contexts.get(id).value.is_truthy() {
                        continue;
                    }
                    match contexts.get(id).value.clone() {
                        ValueCow::Borrowed(Value::List(list)) => {
                            let len = list.len();
                            for (i, item) in list.iter().enumerate() {
                                if writer.aborted() || self.cancelled() {
                                    break;
                                }
                                let mark = contexts.mark();
                                let child = contexts.push_loop_item(
                                    id,
                                    ValueCow::Borrowed(item),
                                    i as i64,
                                    i + 1 == len,
                                );
                                self.render_block(body, contexts, child, writer)?;
                                contexts.truncate(mark);
                            }
                        }
                        ValueCow::Owned(Value::List(list)) => {
                            let len = list.len();
                            for (i, item) in list.into_iter().enumerate() {
                                if writer.aborted() || self.cancelled() {
                                    break;
                                }
                                let mark = contexts.mark();
                                let child = contexts.push_loop_item(
                                    id,
                                    ValueCow::Owned(item),
                                    i as i64,
                                    i + 1 == len,
                                );
                                self.render_block(body, contexts, child, writer)?;
                                contexts.truncate(mark);
                            }
                        }
                        _ => {
                            return Err(Error::render(
                                format!(
                                    "'{}' is used like an array by the template, \
                                     but is a scalar value or object in your model",
                                    path.raw
                                ),
                                &self.template.source,
                                path.span,
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.cancel.map_or(false, |c| c.load(Ordering::Relaxed))
    }
}
