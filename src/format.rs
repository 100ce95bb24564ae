//! Value formatting.
//!
//! Format tags like `[[date(dd.MM.yyyy)]]` look up a formatter for the
//! resolved value's type and buffer the result in the current scope. The
//! registry holds user formatters keyed by [`ValueKind`]; an exact type match
//! wins over a formatter registered for [`ValueKind::Any`], and values with
//! no matching formatter fall back to their default textual form.

use std::collections::BTreeMap;

use crate::{Value, ValueKind};

/// The signature of a registered formatter.
///
/// Receives the resolved value and the argument written between the
/// parentheses of the tag, if any. The returned value is buffered; returning
/// a map or list makes its members addressable by a chained tag such as
/// `[[date(d).Year]]`.
pub type FormatFn = dyn Fn(&Value, Option<&str>) -> Value + Send + Sync;

#[derive(Default)]
pub struct Registry {
    formatters: BTreeMap<ValueKind, Box<FormatFn>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.formatters.keys()).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, kind: ValueKind, f: F)
    where
        F: Fn(&Value, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.formatters.insert(kind, Box::new(f));
    }

    /// Run the most specific formatter for `value`.
    ///
    /// Absent values are never formatted and stay absent.
    pub fn format(&self, value: &Value, argument: Option<&str>) -> Value {
        if let Value::None = value {
            return Value::None;
        }
        let f = self
            .formatters
            .get(&value.kind())
            .or_else(|| self.formatters.get(&ValueKind::Any));
        match f {
            Some(f) => f(value, argument),
            None => Value::String(text_of(value)),
        }
    }
}

/// The default textual form of a value.
///
/// Lists and maps have no textual form and render as nothing.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::None => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::List(_) | Value::Map(_) => String::new(),
    }
}
