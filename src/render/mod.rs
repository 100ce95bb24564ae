mod context;
mod core;
mod writer;

use std::io;
use std::sync::atomic::AtomicBool;

use crate::render::context::Contexts;
use crate::render::core::RendererImpl;
use crate::render::writer::Writer;
use crate::types::tree::Template;
use crate::value::ValueCow;
use crate::{Engine, Result, Value};

pub(crate) fn to_string(
    engine: &Engine,
    template: &Template<'_>,
    value: &Value,
    cancel: Option<&AtomicBool>,
) -> Result<String> {
    let mut buf = Vec::with_capacity(template.source.len());
    to_writer(engine, template, value, cancel, &mut buf)?;
    Ok(into_utf8(buf))
}

pub(crate) fn to_writer<W>(
    engine: &Engine,
    template: &Template<'_>,
    value: &Value,
    cancel: Option<&AtomicBool>,
    writer: W,
) -> Result<()>
where
    W: io::Write,
{
    let mut writer = Writer::new(writer, engine.max_output_bytes);
    let mut contexts = Contexts::new(ValueCow::Borrowed(value));
    RendererImpl {
        engine,
        template,
        cancel,
    }
    .render(&mut contexts, &mut writer)
}

fn into_utf8(buf: Vec<u8>) -> String {
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(err) => {
            // only a byte budget cut can land inside a character, drop the
            // partial bytes
            let valid = err.utf8_error().valid_up_to();
            let mut bytes = err.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).expect("truncated at a character boundary")
        }
    }
}
