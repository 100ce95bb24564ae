//! The scope chain used during rendering.
//!
//! Every block a render enters gets a context holding the value in scope, a
//! link to its parent and the formatting buffer for that scope. Contexts
//! live in an arena owned by the render and refer to each other by index,
//! which keeps `../` ascent simple and lets a loop discard everything an
//! iteration allocated in one truncate.

use crate::types::tree::{Path, Segment};
use crate::value::ValueCow;
use crate::Value;

pub type CtxId = usize;

pub struct Contexts<'render> {
    arena: Vec<Context<'render>>,
}

pub struct Context<'render> {
    pub value: ValueCow<'render>,
    pub parent: Option<CtxId>,
    /// The buffered result of the latest format tag in this scope.
    pub formatting: Option<Value>,
    /// Set for contexts created by loop iteration, enabling the `$index`
    /// family of variables.
    pub loop_meta: Option<LoopMeta>,
}

pub struct LoopMeta {
    pub index: i64,
    pub is_last: bool,
}

impl<'render> Contexts<'render> {
    pub fn new(root: ValueCow<'render>) -> Self {
        Self {
            arena: vec![Context {
                value: root,
                parent: None,
                formatting: None,
                loop_meta: None,
            }],
        }
    }

    pub fn get(&self, id: CtxId) -> &Context<'render> {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: CtxId) -> &mut Context<'render> {
        &mut self.arena[id]
    }

    /// The current arena size, paired with [`truncate`][Self::truncate] to
    /// drop the contexts a loop iteration created.
    pub fn mark(&self) -> usize {
        self.arena.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.arena.truncate(mark);
    }

    /// Push the context for one loop iteration, parented to the collection
    /// context so that `../` from the body steps back out through it.
    pub fn push_loop_item(
        &mut self,
        collection: CtxId,
        value: ValueCow<'render>,
        index: i64,
        is_last: bool,
    ) -> CtxId {
        self.push(Context {
            value,
            parent: Some(collection),
            formatting: None,
            loop_meta: Some(LoopMeta { index, is_last }),
        })
    }

    /// Walk `path` from the context `at`, creating a child context per
    /// segment, and return the final context.
    ///
    /// Lookups never fail: a missing key, or a key applied to a non-map,
    /// resolves to the absent value. `../` above the root stays at the root.
    /// With `use_formatting` set, lookups read out of the scope's formatting
    /// buffer when one is present, which is how a chained format tag
    /// addresses the members of a buffered result.
    ///
    /// Every segment yields a fresh context parented to the previous one,
    /// so each `../` undoes exactly one navigation step. Inside a loop body
    /// that means the first `../` reaches the collection itself and the
    /// second reaches the scope it was resolved in.
    pub fn resolve(&mut self, at: CtxId, path: &Path, use_formatting: bool) -> CtxId {
        let mut cur = at;
        for segment in &path.segments {
            match segment {
                Segment::Parent => {
                    if let Some(parent) = self.arena[cur].parent {
                        cur = parent;
                    }
                }
                Segment::Query => {
                    let value = self.effective(cur, use_formatting);
                    cur = self.child(cur, value, None);
                }
                Segment::Key(key) => {
                    if let Some(var) = self.loop_var(cur, key) {
                        cur = self.child(cur, ValueCow::Owned(var), None);
                        continue;
                    }
                    let value = self.lookup(cur, key, use_formatting);
                    cur = self.child(cur, value, None);
                }
            }
        }
        cur
    }

    fn child(
        &mut self,
        parent: CtxId,
        value: ValueCow<'render>,
        loop_meta: Option<LoopMeta>,
    ) -> CtxId {
        let formatting = self.arena[parent].formatting.clone();
        self.push(Context {
            value,
            parent: Some(parent),
            formatting,
            loop_meta,
        })
    }

    fn push(&mut self, context: Context<'render>) -> CtxId {
        self.arena.push(context);
        self.arena.len() - 1
    }

    /// The value lookups in this context read from.
    fn effective(&self, id: CtxId, use_formatting: bool) -> ValueCow<'render> {
        let ctx = &self.arena[id];
        if use_formatting {
            if let Some(buffered) = &ctx.formatting {
                return ValueCow::Owned(buffered.clone());
            }
        }
        ctx.value.clone()
    }

    fn lookup(&self, id: CtxId, key: &str, use_formatting: bool) -> ValueCow<'render> {
        let ctx = &self.arena[id];
        if use_formatting {
            if let Some(buffered) = &ctx.formatting {
                return match buffered {
                    Value::Map(map) => match map.get(key) {
                        Some(v) => ValueCow::Owned(v.clone()),
                        None => ValueCow::none(),
                    },
                    _ => ValueCow::none(),
                };
            }
        }
        ctx.value.lookup(key)
    }

    /// Answer the `$`-prefixed loop variables for contexts created by a
    /// loop. Unknown `$` names fall through to a regular model lookup.
    fn loop_var(&self, id: CtxId, key: &str) -> Option<Value> {
        if !key.starts_with('$') {
            return None;
        }
        let meta = self.arena[id].loop_meta.as_ref()?;
        let value = match key {
            "$index" => Value::Integer(meta.index),
            "$first" => Value::Bool(meta.index == 0),
            "$last" => Value::Bool(meta.is_last),
            "$middle" => Value::Bool(meta.index != 0 && !meta.is_last),
            "$odd" => Value::Bool(meta.index % 2 != 0),
            "$even" => Value::Bool(meta.index % 2 == 0),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::types::span::Span;
    use crate::value;

    fn path(raw: &str) -> Path {
        Path::new(raw, Span::from(0..raw.len()))
    }

    #[test]
    fn resolve_nested_key() {
        let root = value!({ a: { b: { c: "deep" } } });
        let mut ctxs = Contexts::new(ValueCow::Borrowed(&root));
        let id = ctxs.resolve(0, &path("a.b.c"), false);
        assert_eq!(*ctxs.get(id).value, Value::String(String::from("deep")));
    }

    #[test]
    fn resolve_missing_key_is_absent() {
        let root = value!({ a: 1 });
        let mut ctxs = Contexts::new(ValueCow::Borrowed(&root));
        let id = ctxs.resolve(0, &path("b.c"), false);
        assert_eq!(*ctxs.get(id).value, Value::None);
    }

    #[test]
    fn resolve_parent_above_root_stays_at_root() {
        let root = value!({ name: "root" });
        let mut ctxs = Contexts::new(ValueCow::Borrowed(&root));
        let id = ctxs.resolve(0, &path("../../name"), false);
        assert_eq!(*ctxs.get(id).value, Value::String(String::from("root")));
    }

    #[test]
    fn loop_variables() {
        let root = value!({});
        let item = Value::String(String::from("x"));
        let mut ctxs = Contexts::new(ValueCow::Borrowed(&root));
        let id = ctxs.push_loop_item(0, ValueCow::Borrowed(&item), 2, true);
        let first = ctxs.resolve(id, &path("$first"), false);
        assert_eq!(*ctxs.get(first).value, Value::Bool(false));
        let last = ctxs.resolve(id, &path("$last"), false);
        assert_eq!(*ctxs.get(last).value, Value::Bool(true));
        let even = ctxs.resolve(id, &path("$even"), false);
        assert_eq!(*ctxs.get(even).value, Value::Bool(true));
    }

    #[test]
    fn formatting_buffer_lookup() {
        let root = value!({ date: "2018-01-31" });
        let mut ctxs = Contexts::new(ValueCow::Borrowed(&root));
        ctxs.get_mut(0).formatting = Some(value!({ Year: 2018 }));
        let id = ctxs.resolve(0, &path("Year"), true);
        assert_eq!(*ctxs.get(id).value, Value::Integer(2018));
        // without the flag the model wins
        let id = ctxs.resolve(0, &path("date"), false);
        assert_eq!(
            *ctxs.get(id).value,
            Value::String(String::from("2018-01-31"))
        );
    }
}
