use std::borrow::Cow;

use anyhow::{anyhow, Result};
use memchr::memmem;
use tracing::{trace, warn};

use crate::document::ObjEntry;
use crate::lexer::{is_regular, is_whitespace, Cursor};
use crate::object::{PdfAtom, PdfDict, PdfName, PdfObj, PdfStr, PdfStream, PdfSymbol};
use crate::span::Span;

pub struct Parser<'a> {
    cur: Cursor<'a>,
}

const MAX_ARRAY_ELEMENTS: usize = 100_000;
const MAX_DICT_ENTRIES: usize = 10_000;
const MAX_PARSE_DEPTH: usize = 64;

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { cur: Cursor { bytes, pos } }
    }

    pub fn position(&self) -> usize {
        self.cur.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.cur.pos = pos;
    }

    pub fn skip_ws_and_comments(&mut self) {
        self.cur.skip_ws_and_comments();
    }

    pub fn consume_keyword(&mut self, kw: &[u8]) -> bool {
        self.cur.consume_keyword(kw)
    }

    pub fn parse_object(&mut self) -> Result<PdfObj<'a>> {
        self.parse_object_with_depth(0)
    }

    fn parse_object_with_depth(&mut self, depth: usize) -> Result<PdfObj<'a>> {
        if depth >= MAX_PARSE_DEPTH {
            warn!(kind = "parse_depth_exceeded", pos = self.cur.pos, depth, "Parse depth exceeded");
            return Err(anyhow!("parse depth exceeded"));
        }
        self.cur.skip_ws_and_comments();
        let start = self.cur.pos;
        let b = self.cur.peek().ok_or_else(|| anyhow!("eof"))?;
        let atom = match b {
            b'/' => self.parse_name().map(PdfAtom::Name)?,
            b'<' => {
                if self.cur.peek_ahead(1) == Some(b'<') {
                    let dict = self.parse_dict_with_depth(depth + 1)?;
                    if self.at_stream_keyword() {
                        PdfAtom::Stream(self.parse_stream(dict)?)
                    } else {
                        PdfAtom::Dict(dict)
                    }
                } else {
                    PdfAtom::Str(self.parse_hex_string())
                }
            }
            b'(' => PdfAtom::Str(self.parse_literal_string()),
            b'[' => PdfAtom::Array(self.parse_array_with_depth(depth + 1)?),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.parse_number_or_ref()?,
            _ => {
                if is_regular(b) {
                    self.parse_keyword_or_symbol()
                } else {
                    warn!(
                        kind = "unexpected_token",
                        pos = self.cur.pos,
                        byte = format_args!("0x{:02x}", b),
                        "Unexpected delimiter byte"
                    );
                    return Err(anyhow!("unexpected byte {:x}", b));
                }
            }
        };
        let end = self.cur.pos;
        Ok(PdfObj { span: Span::at(start, end), atom })
    }

    /// Bare keyword position: `true`, `false` and `null` are the grammar's own
    /// keywords; any other regular-character run becomes a `Symbol` node so a
    /// stray token does not abort the enclosing object.
    fn parse_keyword_or_symbol(&mut self) -> PdfAtom<'a> {
        let span = self.cur.consume_while(is_regular);
        let raw = &self.cur.bytes[span.start as usize..span.end as usize];
        match raw {
            b"true" => PdfAtom::Bool(true),
            b"false" => PdfAtom::Bool(false),
            b"null" => PdfAtom::Null,
            _ => {
                trace!(
                    kind = "bare_symbol",
                    pos = span.start,
                    token = %String::from_utf8_lossy(raw),
                    "Lexed bare symbol token"
                );
                PdfAtom::Symbol(PdfSymbol { span, raw: Cow::Borrowed(raw) })
            }
        }
    }

    fn parse_number_or_ref(&mut self) -> Result<PdfAtom<'a>> {
        let (_, num1_str) = self.read_number_token()?;
        let num1 = parse_number(&num1_str)?;
        let after_first = self.cur.pos;

        self.cur.skip_ws_and_comments();
        if let Ok((_, num2_str)) = self.read_number_token() {
            self.cur.skip_ws_and_comments();
            if self.cur.consume_keyword(b"R") {
                if let (Some(obj), Ok(num2)) = (num1.as_i64(), parse_number(&num2_str)) {
                    if let Some(gen) = num2.as_i64() {
                        if (0..=u32::MAX as i64).contains(&obj)
                            && (0..=u16::MAX as i64).contains(&gen)
                        {
                            return Ok(PdfAtom::Ref { obj: obj as u32, gen: gen as u16 });
                        }
                    }
                }
            }
        }
        self.cur.pos = after_first;
        Ok(match num1 {
            PdfNumber::Int(i) => PdfAtom::Int(i),
            PdfNumber::Real(f) => PdfAtom::Real(f),
        })
    }

    fn parse_array_with_depth(&mut self, depth: usize) -> Result<Vec<PdfObj<'a>>> {
        let mut out = Vec::new();
        let _ = self.cur.consume();
        loop {
            self.cur.skip_ws_and_comments();
            if self.cur.peek() == Some(b']') {
                self.cur.consume();
                break;
            }
            if self.cur.eof() {
                warn!(kind = "unterminated_array", pos = self.cur.pos, "Unterminated array");
                break;
            }
            if out.len() >= MAX_ARRAY_ELEMENTS {
                warn!(
                    kind = "array_size_limit_exceeded",
                    max_elements = MAX_ARRAY_ELEMENTS,
                    "Array size limit exceeded"
                );
                return Err(anyhow!("array size limit exceeded"));
            }
            out.push(self.parse_object_with_depth(depth + 1)?);
        }
        Ok(out)
    }

    fn parse_dict_with_depth(&mut self, depth: usize) -> Result<PdfDict<'a>> {
        let start = self.cur.pos;
        self.cur.consume_keyword(b"<<");
        let mut entries = Vec::new();
        loop {
            self.cur.skip_ws_and_comments();
            if self.cur.consume_keyword(b">>") {
                break;
            }
            if self.cur.eof() {
                warn!(kind = "unterminated_dict", start, "Unterminated dictionary");
                break;
            }
            let name = self.parse_name()?;
            self.cur.skip_ws_and_comments();
            if self.cur.peek() == Some(b'>') {
                break;
            }
            // Keep the key even when its value fails to parse; the hole is
            // represented as null.
            if let Ok(val) = self.parse_object_with_depth(depth + 1) {
                entries.push((name, val));
            } else {
                entries.push((
                    name,
                    PdfObj {
                        span: Span::at(self.cur.pos, self.cur.pos),
                        atom: PdfAtom::Null,
                    },
                ));
            }
            if entries.len() >= MAX_DICT_ENTRIES {
                warn!(
                    kind = "dict_size_limit_exceeded",
                    max_entries = MAX_DICT_ENTRIES,
                    "Dictionary size limit exceeded"
                );
                return Err(anyhow!("dict size limit exceeded"));
            }
        }
        let end = self.cur.pos;
        Ok(PdfDict { span: Span::at(start, end), entries })
    }

    fn parse_name(&mut self) -> Result<PdfName<'a>> {
        if self.cur.peek() != Some(b'/') {
            warn!(kind = "expected_name", pos = self.cur.pos, "Expected a name token");
            return Err(anyhow!("expected name"));
        }
        let start = self.cur.pos;
        let _ = self.cur.consume();
        let raw_start = self.cur.pos;
        let _ = self.cur.consume_while(is_regular);
        let raw_end = self.cur.pos;
        let raw = &self.cur.bytes[start..raw_end];
        let decoded = decode_name(&self.cur.bytes[raw_start..raw_end]);
        Ok(PdfName { span: Span::at(start, raw_end), raw: Cow::Borrowed(raw), decoded })
    }

    fn parse_literal_string(&mut self) -> PdfStr<'a> {
        let start = self.cur.pos;
        let _ = self.cur.consume();
        let mut depth = 1;
        let mut out = Vec::new();
        while let Some(b) = self.cur.consume() {
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    if let Some(next) = self.cur.consume() {
                        match next {
                            b'n' => out.push(b'\n'),
                            b'r' => out.push(b'\r'),
                            b't' => out.push(b'\t'),
                            b'b' => out.push(0x08),
                            b'f' => out.push(0x0c),
                            b'(' | b')' | b'\\' => out.push(next),
                            b'\n' | b'\r' => {
                                if next == b'\r' && self.cur.peek() == Some(b'\n') {
                                    self.cur.consume();
                                }
                            }
                            b'0'..=b'7' => {
                                let mut oct = vec![next];
                                for _ in 0..2 {
                                    if let Some(d) = self.cur.peek() {
                                        if (b'0'..=b'7').contains(&d) {
                                            oct.push(d);
                                            self.cur.consume();
                                        } else {
                                            break;
                                        }
                                    }
                                }
                                let val = oct.iter().fold(0u8, |acc, d| acc * 8 + (d - b'0'));
                                out.push(val);
                            }
                            // Unknown escapes pass the escaped byte through.
                            other => out.push(other),
                        }
                    }
                }
                _ => out.push(b),
            }
        }
        if depth != 0 {
            warn!(kind = "unterminated_literal_string", start, "Unterminated literal string");
        }
        let end = self.cur.pos;
        PdfStr::Literal {
            span: Span::at(start, end),
            raw: Cow::Borrowed(&self.cur.bytes[start..end]),
            decoded: out,
        }
    }

    fn parse_hex_string(&mut self) -> PdfStr<'a> {
        let start = self.cur.pos;
        let _ = self.cur.consume();
        let mut out = Vec::new();
        let mut buf = Vec::new();
        let mut saw_end = false;
        while let Some(b) = self.cur.consume() {
            if b == b'>' {
                saw_end = true;
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            buf.push(b);
        }
        // Odd-length hex data is padded with a trailing zero digit.
        let mut i = 0;
        while i < buf.len() {
            let hi = buf[i];
            let lo = if i + 1 < buf.len() { buf[i + 1] } else { b'0' };
            if let (Some(h), Some(l)) = (hex_val(hi), hex_val(lo)) {
                out.push((h << 4) | l);
            }
            i += 2;
        }
        let end = self.cur.pos;
        if !saw_end {
            warn!(kind = "unterminated_hex_string", start, "Unterminated hex string");
        }
        PdfStr::Hex {
            span: Span::at(start, end),
            raw: Cow::Borrowed(&self.cur.bytes[start..end]),
            decoded: out,
        }
    }

    fn read_number_token(&mut self) -> Result<(Span, String)> {
        let start = self.cur.pos;
        let mut out = Vec::new();
        if let Some(b) = self.cur.peek() {
            if b == b'+' || b == b'-' || b == b'.' || b.is_ascii_digit() {
                out.push(b);
                self.cur.consume();
            } else {
                return Err(anyhow!("not a number"));
            }
        }
        while let Some(b) = self.cur.peek() {
            if b.is_ascii_digit() || b == b'.' {
                out.push(b);
                self.cur.consume();
            } else {
                break;
            }
        }
        let end = self.cur.pos;
        Ok((Span::at(start, end), String::from_utf8_lossy(&out).to_string()))
    }

    fn at_stream_keyword(&mut self) -> bool {
        let mark = self.cur.pos;
        self.cur.skip_ws_and_comments();
        let found = self.cur.consume_keyword(b"stream");
        self.cur.pos = mark;
        found
    }

    fn parse_stream(&mut self, dict: PdfDict<'a>) -> Result<PdfStream<'a>> {
        self.cur.skip_ws_and_comments();
        self.cur.consume_keyword(b"stream");
        if self.cur.peek() == Some(b'\r') {
            self.cur.consume();
            if self.cur.peek() == Some(b'\n') {
                self.cur.consume();
            }
        } else if self.cur.peek() == Some(b'\n') {
            self.cur.consume();
        }
        let data_start = self.cur.pos;
        let data_end = if let Some(len) = stream_length_from_dict(&dict) {
            let end = match data_start.checked_add(len as usize) {
                Some(v) => v,
                None => {
                    warn!(
                        kind = "stream_length_overflow",
                        start = data_start,
                        length = len,
                        "Stream length overflow"
                    );
                    return Err(anyhow!("stream length overflow"));
                }
            };
            if end > self.cur.bytes.len() {
                warn!(
                    kind = "truncated_stream_data",
                    start = data_start,
                    length = len,
                    bytes_len = self.cur.bytes.len(),
                    "Stream data truncated at end of input"
                );
            }
            end.min(self.cur.bytes.len())
        } else {
            // /Length absent or indirect; fall back to scanning for the
            // closing keyword. Indirect lengths are reconciled after the
            // whole file has been indexed.
            memmem::find(&self.cur.bytes[data_start..], b"endstream")
                .map(|pos| data_start + pos)
                .unwrap_or(self.cur.bytes.len())
        };
        self.cur.pos = data_end;
        self.cur.skip_ws_and_comments();
        if !self.cur.consume_keyword(b"endstream") {
            warn!(kind = "missing_endstream", pos = data_end, "Missing endstream keyword");
        }
        Ok(PdfStream { dict, data_span: Span::at(data_start, data_end) })
    }
}

#[derive(Debug)]
enum PdfNumber {
    Int(i64),
    Real(f64),
}

impl PdfNumber {
    fn as_i64(&self) -> Option<i64> {
        match self {
            PdfNumber::Int(i) => Some(*i),
            PdfNumber::Real(_) => None,
        }
    }
}

fn parse_number(s: &str) -> Result<PdfNumber> {
    if s.contains('.') {
        Ok(PdfNumber::Real(s.parse::<f64>()?))
    } else {
        Ok(PdfNumber::Int(s.parse::<i64>()?))
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(10 + b - b'a'),
        b'A'..=b'F' => Some(10 + b - b'A'),
        _ => None,
    }
}

fn decode_name(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + 1);
    out.push(b'/');
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(h), Some(l)) = (hex_val(raw[i + 1]), hex_val(raw[i + 2])) {
                out.push((h << 4) | l);
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

fn stream_length_from_dict(dict: &PdfDict<'_>) -> Option<u64> {
    let (_, obj) = dict.get_first(b"/Length")?;
    match &obj.atom {
        PdfAtom::Int(i) if *i >= 0 => Some(*i as u64),
        _ => None,
    }
}

pub fn parse_indirect_object_at<'a>(bytes: &'a [u8], offset: usize) -> Result<(ObjEntry<'a>, usize)> {
    let mut p = Parser::new(bytes, offset);
    p.cur.skip_ws_and_comments();
    let (_, obj_str) = p.read_number_token()?;
    p.cur.skip_ws_and_comments();
    let (_, gen_str) = p.read_number_token()?;
    p.cur.skip_ws_and_comments();
    if !p.cur.consume_keyword(b"obj") {
        return Err(anyhow!("missing obj keyword"));
    }
    let obj_num = obj_str.parse::<u32>()?;
    let gen_num = gen_str.parse::<u16>()?;
    p.cur.skip_ws_and_comments();
    let body = p.parse_object()?;
    p.cur.skip_ws_and_comments();
    if !p.cur.consume_keyword(b"endobj") {
        trace!(
            kind = "missing_endobj",
            obj = obj_num,
            gen = gen_num,
            pos = p.cur.pos,
            "Missing endobj keyword"
        );
        if let Some(pos) = memmem::find(&bytes[p.cur.pos..], b"endobj") {
            p.cur.pos += pos + "endobj".len();
        }
    }
    let full_end = p.cur.pos;
    Ok((ObjEntry { obj: obj_num, gen: gen_num, body }, full_end))
}

pub fn scan_indirect_objects(bytes: &[u8], max_objects: usize) -> Vec<ObjEntry<'_>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 7 < bytes.len() {
        if max_objects > 0 && out.len() >= max_objects {
            warn!(
                kind = "max_objects_reached",
                max_objects, "Object budget reached during indirect scan"
            );
            break;
        }
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let mark = i;
        match parse_indirect_object_at(bytes, i) {
            Ok((entry, end_pos)) => {
                trace!(
                    kind = "indirect_object_parsed",
                    obj = entry.obj,
                    gen = entry.gen,
                    end_pos,
                    "Parsed indirect object"
                );
                out.push(entry);
                i = end_pos.max(mark + 1);
            }
            Err(_) => {
                i = mark + 1;
            }
        }
    }
    out
}
