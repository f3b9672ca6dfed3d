use crate::span::Span;

/// Forward cursor over the raw file bytes. `pos` is public so the parser can
/// snapshot a position and rewind after a failed lookahead.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    pub bytes: &'a [u8],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    pub fn consume(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn consume_while<F: Fn(u8) -> bool>(&mut self, f: F) -> Span {
        let start = self.pos;
        while self.peek().map_or(false, &f) {
            self.pos += 1;
        }
        Span::at(start, self.pos)
    }

    /// Whitespace and `%` comments are interchangeable between tokens, so
    /// both are skipped in one step. A comment runs to the next EOL byte.
    pub fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b) if is_whitespace(b) => {
                    self.pos += 1;
                }
                Some(b'%') => {
                    while let Some(b) = self.consume() {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    pub fn consume_keyword(&mut self, kw: &[u8]) -> bool {
        let matched = self.bytes.get(self.pos..).map_or(false, |rest| rest.starts_with(kw));
        if matched {
            self.pos += kw.len();
        }
        matched
    }
}

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\x00' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

pub fn is_delim(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

pub fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delim(b)
}
