//! Defines a [`Span`] which is used to represent a region in the template
//! source code.

use std::ops::{Index, Range};

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub m: usize,
    pub n: usize,
}

impl Span {
    /// The 1-based line and column of the start of this span.
    ///
    /// Columns are counted in characters, not bytes, so they line up with
    /// what an editor would report.
    pub fn to_line_col(self, source: &str) -> (usize, usize) {
        let lines: Vec<_> = source.split_terminator('\n').collect();
        let (mut line, mut col) = (1, self.m + 1);
        for curr in &lines {
            let len = curr.len() + 1;
            if col <= len {
                break;
            }
            col -= len;
            line += 1;
        }
        let byte = col - 1;
        let col = lines
            .get(line - 1)
            .map(|l| l[..byte].chars().count() + 1)
            .unwrap_or(col);
        (line, col)
    }
}

impl Index<Span> for str {
    type Output = str;

    fn index(&self, span: Span) -> &Self::Output {
        let Span { m, n } = span;
        &self[m..n]
    }
}

impl From<Range<usize>> for Span {
    fn from(r: Range<usize>) -> Self {
        Self {
            m: r.start,
            n: r.end,
        }
    }
}
