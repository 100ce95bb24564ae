//! Defines a clone-on-write [`Value`].
//!
//! Scope resolution borrows from the user's model where it can and only
//! clones at the edges, e.g. when a lookup has to read out of an owned
//! formatting buffer.

use std::ops::Deref;

use crate::Value;

static NONE: Value = Value::None;

#[cfg_attr(test, derive(Debug))]
#[derive(Clone)]
pub enum ValueCow<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl Deref for ValueCow<'_> {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(v) => v,
            Self::Owned(v) => v,
        }
    }
}

impl<'a> ValueCow<'a> {
    /// The absent value, used when a path lookup misses.
    pub fn none() -> Self {
        Self::Borrowed(&NONE)
    }

    /// Look up `key` in this value, keeping borrowed data borrowed.
    ///
    /// Anything other than a map resolves to the absent value; there is no
    /// error for missing keys.
    pub fn lookup(&self, key: &str) -> ValueCow<'a> {
        match self {
            Self::Borrowed(Value::Map(map)) => match map.get(key) {
                Some(v) => Self::Borrowed(v),
                None => Self::none(),
            },
            Self::Owned(Value::Map(map)) => match map.get(key) {
                Some(v) => Self::Owned(v.clone()),
                None => Self::none(),
            },
            _ => Self::none(),
        }
    }
}
