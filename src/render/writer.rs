//! Byte-counted output with RTF escaping.

use std::io;

use crate::Result;

/// Wraps the output sink and enforces the engine's byte budget.
///
/// The budget is exact: a write that would cross the limit is cut so that
/// exactly `limit` bytes reach the sink, and the writer aborts. Once aborted
/// every further write is a no-op; the renderer polls [`aborted`][Self::aborted]
/// to stop walking the tree early.
pub struct Writer<W> {
    inner: W,
    /// Maximum bytes to emit, zero meaning unlimited.
    limit: u64,
    written: u64,
    aborted: bool,
}

impl<W: io::Write> Writer<W> {
    pub fn new(inner: W, limit: u64) -> Self {
        Self {
            inner,
            limit,
            written: 0,
            aborted: false,
        }
    }

    pub fn write(&mut self, mut bytes: &[u8]) -> Result<()> {
        if self.aborted {
            return Ok(());
        }
        if self.limit > 0 {
            let remaining = self.limit.saturating_sub(self.written);
            if bytes.len() as u64 >= remaining {
                bytes = &bytes[..remaining as usize];
                self.aborted = true;
            }
        }
        if !bytes.is_empty() {
            self.inner.write_all(bytes)?;
            self.written += bytes.len() as u64;
        }
        Ok(())
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

/// Escape text for inclusion in an RTF document.
///
/// Every byte above 0x7F and the three RTF control characters `\`, `{` and
/// `}` become a `\'hh` hex escape. Multi-byte characters escape to one
/// `\'hh` per UTF-8 byte.
pub fn rtf_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for b in text.bytes() {
        match b {
            b'\\' | b'{' | b'}' => push_escaped(&mut out, b),
            0x80.. => push_escaped(&mut out, b),
            _ => out.push(b as char),
        }
    }
    out
}

fn push_escaped(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.push_str("\\'");
    out.push(HEX[(b >> 4) as usize] as char);
    out.push(HEX[(b & 0xf) as usize] as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtf_escape_ascii_passthrough() {
        assert_eq!(rtf_escape("hello world!"), "hello world!");
    }

    #[test]
    fn rtf_escape_control_chars() {
        assert_eq!(rtf_escape(r"{wbr}"), r"\'7bwbr\'7d");
        assert_eq!(rtf_escape(r"a\b"), r"a\'5cb");
    }

    #[test]
    fn rtf_escape_multibyte() {
        // two UTF-8 bytes, two escapes
        assert_eq!(rtf_escape("é"), r"\'c3\'a9");
    }

    #[test]
    fn writer_limit_exact() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf, 5);
        w.write(b"abc").unwrap();
        assert!(!w.aborted());
        w.write(b"defg").unwrap();
        assert!(w.aborted());
        w.write(b"hij").unwrap();
        assert_eq!(buf, b"abcde");
    }

    #[test]
    fn writer_limit_zero_is_unlimited() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf, 0);
        w.write(b"abcdefgh").unwrap();
        assert!(!w.aborted());
        assert_eq!(buf, b"abcdefgh");
    }

    #[test]
    fn writer_aborts_when_filled_exactly() {
        let mut buf = Vec::new();
        let mut w = Writer::new(&mut buf, 3);
        w.write(b"abc").unwrap();
        assert!(w.aborted());
        assert_eq!(buf, b"abc");
    }
}
