//! A Mustache-style template engine that renders RTF-escaped output.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Substitutions: `[[person.name]]`
//! - Unescaped substitutions: `[[[person.name]]]` or `[[&person.name]]`
//! - Conditional blocks: `[[#person]] ... [[/person]]` and inverted blocks
//!   `[[^person]] ... [[/person]]`
//! - Loops: `[[#each orders]] ... [[/each]]` with the loop variables
//!   `$index`, `$first`, `$middle`, `$last`, `$odd` and `$even`
//! - Parent scope access: `[[../name]]`, self access: `[[.]]`
//! - Formatter calls: `[[date(dd.MM.yyyy)]]`
//! - Comments: `[[!anything]]`
//!
//! ### Engine
//!
//! - Output safe for inclusion in RTF documents: every non-ASCII byte and
//!   the `\`, `{`, `}` control characters are escaped as `\'hh`
//! - Compilation reports *every* syntax error in the template at once
//! - Rendering is tolerant: missing values print nothing (or a configurable
//!   null text for format tags) and never fail the render
//! - An exact output byte budget and cooperative cancellation, for rendering
//!   untrusted templates
//! - Optional inference of an example model from the template
//! - Render to a [`String`] or any [`std::io::Write`] implementor, using any
//!   [`serde`] serializable model
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct, which holds the configuration
//! and the registered formatters. Compile a template with
//! [`.compile`][Engine::compile] and render it with a model:
//!
//! ```
//! let engine = mustachio::Engine::new();
//! let template = engine.compile("Hello [[user.name]]!")?;
//! let result = template.render(mustachio::value!({ user: { name: "John Smith" } }))?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), mustachio::Error>(())
//! ```
//!
//! Any [`serde::Serialize`] type works as a model:
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let engine = mustachio::Engine::new();
//! let result = engine
//!     .compile("Hello [[name]]")?
//!     .render(&User { name: "John Smith".into() })?;
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), mustachio::Error>(())
//! ```
//!
//! # Examples
//!
//! ### RTF escaping
//!
//! Substitutions written `[[path]]` escape their output; the triple
//! delimited form does not.
//!
//! ```
//! let engine = mustachio::Engine::new();
//! let result = engine
//!     .compile(r"[[text]] and [[[text]]]")?
//!     .render(mustachio::value!({ text: "{wbr}" }))?;
//! assert_eq!(result, r"\'7bwbr\'7d and {wbr}");
//! # Ok::<(), mustachio::Error>(())
//! ```
//!
//! ### Formatters
//!
//! A formatter receives the resolved value and the argument written in the
//! tag, and its result is printed in place:
//!
//! ```
//! use mustachio::{Value, ValueKind};
//!
//! let mut engine = mustachio::Engine::new();
//! engine.add_formatter(ValueKind::Integer, |value, arg| match (value, arg) {
//!     (Value::Integer(i), Some("hex")) => Value::String(format!("{i:#x}")),
//!     (value, _) => value.clone(),
//! });
//!
//! let result = engine
//!     .compile("[[answer(hex)]]")?
//!     .render(mustachio::value!({ answer: 255 }))?;
//! assert_eq!(result, "0xff");
//! # Ok::<(), mustachio::Error>(())
//! ```
//!
//! ### Byte budget
//!
//! An output limit bounds rendering of untrusted templates; the output is
//! cut at exactly the limit.
//!
//! ```
//! let mut engine = mustachio::Engine::new();
//! engine.set_max_output_bytes(5);
//! let result = engine
//!     .compile("[[#each items]][[.]][[/each]]")?
//!     .render(mustachio::value!({ items: ["aa", "bb", "cc"] }))?;
//! assert_eq!(result, "aabbc");
//! # Ok::<(), mustachio::Error>(())
//! ```
//!
//! ### Model inference
//!
//! With inference enabled, compilation also produces an example model
//! describing the data the template dereferences.
//!
//! ```
//! let mut engine = mustachio::Engine::new();
//! engine.set_model_inference(true);
//! let template = engine.compile("[[#person]][[name]][[/person]]")?;
//! let model = template.inferred_model().unwrap();
//! assert_eq!(model.to_string(), r#"{"person":{"name":"name_Value"}}"#);
//! # Ok::<(), mustachio::Error>(())
//! ```

mod compile;
mod error;
mod format;
mod infer;
mod macros;
mod render;
mod types;
mod value;

use std::fmt;
use std::io;
use std::sync::atomic::AtomicBool;

pub use crate::error::{Error, Result, SyntaxError, SyntaxErrorKind};
pub use crate::format::FormatFn;
pub use crate::infer::InferredModel;
pub use crate::value::{to_value, List, Map, Value, ValueKind};

use crate::types::tree;

/// The compilation and rendering engine.
///
/// Holds the rendering configuration and the formatter registry. Compiled
/// [`Template`]s borrow the engine they were compiled by. The engine is
/// [`Send`] and [`Sync`], one can be shared for the lifetime of a program.
pub struct Engine {
    formatters: format::Registry,
    max_output_bytes: u64,
    disable_escaping: bool,
    infer_model: bool,
    null_text: String,
}

/// A compiled template.
pub struct Template<'engine, 'source> {
    engine: &'engine Engine,
    template: tree::Template<'source>,
    inferred: Option<InferredModel>,
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine.
    ///
    /// The defaults are: no output limit, RTF escaping on, model inference
    /// off and absent values rendering as the empty string.
    #[inline]
    pub fn new() -> Self {
        Self {
            formatters: format::Registry::new(),
            max_output_bytes: 0,
            disable_escaping: false,
            infer_model: false,
            null_text: String::new(),
        }
    }

    /// Limit the number of bytes a render may emit, zero meaning unlimited.
    ///
    /// The limit is exact: output is cut mid-content so that precisely this
    /// many bytes are written, and the rest of the render is skipped. Note
    /// that the cut can land inside an escape sequence or, for unescaped
    /// output, inside a multi-byte character; rendering to a [`String`]
    /// drops the partial character.
    #[inline]
    pub fn set_max_output_bytes(&mut self, n: u64) {
        self.max_output_bytes = n;
    }

    /// Disable RTF escaping, making `[[path]]` behave like `[[[path]]]`.
    #[inline]
    pub fn set_disable_escaping(&mut self, yes: bool) {
        self.disable_escaping = yes;
    }

    /// Produce an [`InferredModel`] for every compiled template.
    #[inline]
    pub fn set_model_inference(&mut self, yes: bool) {
        self.infer_model = yes;
    }

    /// The text a format print renders when there is no value, empty by
    /// default.
    #[inline]
    pub fn set_null_text(&mut self, text: impl Into<String>) {
        self.null_text = text.into();
    }

    /// Register a formatter for values of the given kind.
    ///
    /// A formatter registered for [`ValueKind::Any`] applies to every value
    /// that has no exact-kind formatter. Formatters run for format tags like
    /// `[[path(arg)]]` and also for plain substitutions, with no argument.
    #[inline]
    pub fn add_formatter<F>(&mut self, kind: ValueKind, f: F)
    where
        F: Fn(&Value, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.formatters.insert(kind, f);
    }

    /// Compile a template.
    ///
    /// Every syntax error in the source is gathered before this returns;
    /// see [`Error::syntax_errors`].
    #[inline]
    pub fn compile<'source>(&self, source: &'source str) -> Result<Template<'_, 'source>> {
        let (template, inferred) = compile::template(self, source)?;
        Ok(Template {
            engine: self,
            template,
            inferred,
        })
    }
}

impl<'engine, 'source> Template<'engine, 'source> {
    /// Render the template to a string using the given model.
    #[inline]
    pub fn render<S>(&self, model: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        let value = to_value(model)?;
        render::to_string(self.engine, &self.template, &value, None)
    }

    /// Render the template to a string, checking the cancellation flag
    /// between nodes and loop iterations.
    ///
    /// Cancellation is not an error: the render stops early and returns the
    /// output produced so far.
    #[inline]
    pub fn render_cancellable<S>(&self, model: S, cancel: &AtomicBool) -> Result<String>
    where
        S: serde::Serialize,
    {
        let value = to_value(model)?;
        render::to_string(self.engine, &self.template, &value, Some(cancel))
    }

    /// Render the template to the given writer using the given model.
    #[inline]
    pub fn render_to_writer<W, S>(&self, writer: W, model: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        let value = to_value(model)?;
        render::to_writer(self.engine, &self.template, &value, None, writer)
    }

    /// Render the template to the given writer, checking the cancellation
    /// flag between nodes and loop iterations.
    #[inline]
    pub fn render_to_writer_cancellable<W, S>(
        &self,
        writer: W,
        model: S,
        cancel: &AtomicBool,
    ) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        let value = to_value(model)?;
        render::to_writer(self.engine, &self.template, &value, Some(cancel), writer)
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &str {
        &self.template.source
    }

    /// The example model inferred during compilation, present when
    /// [`Engine::set_model_inference`] was enabled.
    #[inline]
    pub fn inferred_model(&self) -> Option<&InferredModel> {
        self.inferred.as_ref()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("formatters", &self.formatters)
            .field("max_output_bytes", &self.max_output_bytes)
            .field("disable_escaping", &self.disable_escaping)
            .field("infer_model", &self.infer_model)
            .field("null_text", &self.null_text)
            .finish()
    }
}

impl fmt::Debug for Template<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("engine", &self.engine)
            .field("source", &self.template.source)
            .finish_non_exhaustive()
    }
}
