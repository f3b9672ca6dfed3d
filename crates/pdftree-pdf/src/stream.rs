use anyhow::Result;

use crate::decode::decode_stream;
use crate::document::Document;
use crate::object::PdfStream;

/// Forward-only, one-shot reader over a stream's decoded payload. There is no
/// rewind; callers that need a second pass acquire a second reader.
#[derive(Debug)]
pub struct StreamReader {
    data: Vec<u8>,
    pos: usize,
}

impl StreamReader {
    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let b = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }
}

impl<'a> Document<'a> {
    /// Acquires a fresh reader over the stream's payload, decoding its filter
    /// chain anew on every call.
    pub fn stream_reader(&self, stream: &PdfStream<'_>) -> Result<StreamReader> {
        let decoded = decode_stream(self.bytes, stream, self.options.max_stream_bytes)?;
        Ok(StreamReader { data: decoded.data, pos: 0 })
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{Document, ParseOptions};
    use crate::object::PdfAtom;

    fn doc_fixture() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj << /Length 5 >> stream\nhello\nendstream endobj\n".to_vec()
    }

    #[test]
    fn reader_is_forward_only_and_exhausts() {
        let pdf = doc_fixture();
        let doc = Document::parse(&pdf, ParseOptions::default()).expect("parse");
        let obj = doc.resolve_object(1).expect("object 1");
        let PdfAtom::Stream(st) = &obj.atom else { panic!("expected stream") };
        let mut reader = doc.stream_reader(st).expect("reader");
        let mut out = Vec::new();
        while reader.has_more() {
            if let Some(b) = reader.read_byte() {
                out.push(b);
            }
        }
        assert_eq!(out, b"hello");
        assert!(reader.read_byte().is_none());
    }

    #[test]
    fn malformed_ascii85_payload_reads_as_stored_bytes() {
        let pdf =
            b"%PDF-1.4\n1 0 obj << /Length 7 /Filter /ASCII85Decode >> stream\nuuuuu~>\nendstream endobj\n"
                .to_vec();
        let doc = Document::parse(&pdf, ParseOptions::default()).expect("parse");
        let obj = doc.resolve_object(1).expect("object 1");
        let PdfAtom::Stream(st) = &obj.atom else { panic!("expected stream") };
        let mut reader = doc.stream_reader(st).expect("reader");
        let mut out = Vec::new();
        while let Some(b) = reader.read_byte() {
            out.push(b);
        }
        assert_eq!(out, b"uuuuu~>");
    }

    #[test]
    fn each_acquisition_starts_at_the_beginning() {
        let pdf = doc_fixture();
        let doc = Document::parse(&pdf, ParseOptions::default()).expect("parse");
        let obj = doc.resolve_object(1).expect("object 1");
        let PdfAtom::Stream(st) = &obj.atom else { panic!("expected stream") };
        let mut first = doc.stream_reader(st).expect("reader");
        let _ = first.read_byte();
        let _ = first.read_byte();
        let mut second = doc.stream_reader(st).expect("reader");
        assert_eq!(second.read_byte(), Some(b'h'));
    }
}
