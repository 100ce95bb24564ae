//! Model shape inference.
//!
//! When enabled on the engine, compilation records every model path the
//! template dereferences and folds them into an example model: objects for
//! paths used as scopes, arrays for `#each` targets and placeholder strings
//! for values that are printed. The result documents what data a template
//! expects without having to read it.

use std::fmt;

use crate::types::tree::{Path, Segment};
use crate::value::Map;
use crate::Value;

/// How a path is used by the template, which decides the inferred type of
/// its final segment.
#[derive(Clone, Copy)]
pub(crate) enum Usage {
    /// Printed as text.
    Scalar,
    /// Scoped into by a conditional block.
    Conditional,
    /// Iterated by an `#each` block.
    Collection,
}

/// An example model inferred from a compiled template.
///
/// Displays as JSON. Placeholder leaves are named after the path segment
/// that produced them, e.g. the path `Person.Name` infers
/// `{"Person":{"Name":"Name_Value"}}`.
pub struct InferredModel {
    root: Node,
}

enum Node {
    Scalar(String),
    Object(Map<String, Node>),
    Array(Vec<Node>),
}

impl InferredModel {
    /// Convert the example model into a renderable [`Value`].
    pub fn to_value(&self) -> Value {
        fn conv(node: &Node) -> Value {
            match node {
                Node::Scalar(s) => Value::String(s.clone()),
                Node::Object(map) => {
                    Value::Map(map.iter().map(|(k, v)| (k.clone(), conv(v))).collect())
                }
                Node::Array(items) => Value::List(items.iter().map(conv).collect()),
            }
        }
        conv(&self.root)
    }
}

impl fmt::Display for InferredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_json(&self.root, f)
    }
}

impl fmt::Debug for InferredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_json(&self.root, f)
    }
}

fn fmt_json(node: &Node, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node {
        Node::Scalar(s) => write!(f, "\"{s}\""),
        Node::Object(map) => {
            f.write_str("{")?;
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "\"{key}\":")?;
                fmt_json(value, f)?;
            }
            f.write_str("}")
        }
        Node::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                fmt_json(item, f)?;
            }
            f.write_str("]")
        }
    }
}

/// Accumulates path registrations during compilation.
///
/// Nodes live in an arena and refer to their parent by index so that `../`
/// segments can walk out of a scope.
pub(crate) struct Builder {
    nodes: Vec<RawNode>,
}

struct RawNode {
    key: String,
    kind: RawKind,
    parent: Option<usize>,
    children: Map<String, usize>,
}

#[derive(Clone, Copy, PartialEq)]
enum RawKind {
    Object,
    Scalar,
    Array,
}

/// Index of a scope node inside the builder arena.
pub(crate) type ScopeId = usize;

impl Builder {
    pub fn new() -> Self {
        Self {
            nodes: vec![RawNode {
                key: String::new(),
                kind: RawKind::Object,
                parent: None,
                children: Map::new(),
            }],
        }
    }

    /// Record that `path` is dereferenced from scope `at` and return the
    /// scope its final segment introduces.
    ///
    /// Loop variables, `?` and the self path never add to the model; they
    /// resolve to the scope itself. A segment that was already classified
    /// keeps its first classification.
    pub fn register(&mut self, at: ScopeId, path: &Path, usage: Usage) -> ScopeId {
        let mut cur = at;
        let last = path.segments.len().saturating_sub(1);
        for (i, segment) in path.segments.iter().enumerate() {
            match segment {
                Segment::Parent => {
                    if let Some(parent) = self.nodes[cur].parent {
                        cur = parent;
                    }
                }
                Segment::Query => return cur,
                Segment::Key(key) if key.starts_with('$') => return cur,
                Segment::Key(key) => {
                    let kind = if i == last {
                        match usage {
                            Usage::Scalar => RawKind::Scalar,
                            Usage::Conditional => RawKind::Object,
                            Usage::Collection => RawKind::Array,
                        }
                    } else {
                        RawKind::Object
                    };
                    cur = self.child(cur, key, kind);
                }
            }
        }
        cur
    }

    fn child(&mut self, at: ScopeId, key: &str, kind: RawKind) -> ScopeId {
        if let Some(&id) = self.nodes[at].children.get(key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(RawNode {
            key: key.to_owned(),
            kind,
            parent: Some(at),
            children: Map::new(),
        });
        self.nodes[at].children.insert(key.to_owned(), id);
        id
    }

    pub fn finish(self) -> InferredModel {
        InferredModel {
            root: self.build(0),
        }
    }

    fn build(&self, id: ScopeId) -> Node {
        let node = &self.nodes[id];
        match node.kind {
            RawKind::Scalar => Node::Scalar(format!("{}_Value", node.key)),
            RawKind::Object => Node::Object(
                node.children
                    .iter()
                    .map(|(key, &child)| (key.clone(), self.build(child)))
                    .collect(),
            ),
            RawKind::Array => {
                if node.children.is_empty() {
                    // nothing in the body pins down the element shape, so
                    // give three example strings
                    Node::Array(
                        (1..=3)
                            .map(|i| Node::Scalar(format!("{}_{i}", node.key)))
                            .collect(),
                    )
                } else {
                    Node::Array(vec![Node::Object(
                        node.children
                            .iter()
                            .map(|(key, &child)| (key.clone(), self.build(child)))
                            .collect(),
                    )])
                }
            }
        }
    }
}
