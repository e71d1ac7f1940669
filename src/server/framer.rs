//! Splits a connection's receive buffer into lines.
//!
//! Every delimiter-terminated line is yielded without its delimiter. Any
//! bytes left after the last delimiter are yielded as a final fragment, so
//! the buffer is always fully consumed; the [`LineEnding`] of each item lets
//! the handler tell complete lines from fragments that continue in a later
//! read.

/// What terminated a [`Line`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\r\n` (only when the delimiter is `\n`)
    CrLf,
    /// The bare delimiter byte.
    Delimiter([u8; 1]),
    /// Undelimited residue at the end of the buffer.
    None,
}

impl LineEnding {
    /// The bytes that were stripped from the line.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            LineEnding::CrLf => &b"\r\n"[..],
            LineEnding::Delimiter(b) => &b[..],
            LineEnding::None => &[],
        }
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(self, LineEnding::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub bytes: &'a [u8],
    pub ending: LineEnding,
}

impl<'a> Line<'a> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_terminated(&self) -> bool {
        self.ending.is_terminated()
    }
}

/// Iterator over the lines of a buffer.
pub struct Framer<'a> {
    buf: &'a [u8],
    delimiter: u8,
}

impl<'a> Framer<'a> {
    pub fn new(buf: &'a [u8], delimiter: u8) -> Self {
        Self { buf, delimiter }
    }
}

impl<'a> Iterator for Framer<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.buf.is_empty() {
            return None;
        }

        let Some(pos) = self.buf.iter().position(|&b| b == self.delimiter) else {
            let residue = std::mem::take(&mut self.buf);
            return Some(Line {
                bytes: residue,
                ending: LineEnding::None,
            });
        };

        let mut bytes = &self.buf[..pos];
        let mut ending = LineEnding::Delimiter([self.delimiter]);
        if self.delimiter == b'\n' && bytes.last() == Some(&b'\r') {
            bytes = &bytes[..bytes.len() - 1];
            ending = LineEnding::CrLf;
        }

        self.buf = &self.buf[pos + 1..];
        Some(Line { bytes, ending })
    }
}
