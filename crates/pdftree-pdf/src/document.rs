use std::collections::HashMap;

use anyhow::{anyhow, Result};
use memchr::memmem;
use tracing::{debug, info, trace, warn};

use crate::object::{PdfAtom, PdfDict, PdfObj};
use crate::objstm::{expand_objstm, ObjStmExpansion};
use crate::parser::scan_indirect_objects;
use crate::xref::parse_xref_chain;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub max_objects: usize,
    pub max_objstm_bytes: usize,
    pub max_objstm_total_bytes: usize,
    pub max_stream_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_objects: 250_000,
            max_objstm_bytes: 16 << 20,
            max_objstm_total_bytes: 128 << 20,
            max_stream_bytes: usize::MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjEntry<'a> {
    pub obj: u32,
    pub gen: u16,
    pub body: PdfObj<'a>,
}

/// Parsed document: every object found by the whole-file scan plus the
/// contents of object streams, indexed by object number. Trailers come from
/// the startxref chain and are ordered newest first.
#[derive(Debug)]
pub struct Document<'a> {
    pub bytes: &'a [u8],
    pub objects: Vec<ObjEntry<'a>>,
    pub index: HashMap<u32, Vec<usize>>,
    pub trailers: Vec<PdfDict<'a>>,
    pub startxrefs: Vec<u64>,
    pub options: ParseOptions,
    version: f64,
}

impl<'a> Document<'a> {
    pub fn parse(bytes: &'a [u8], options: ParseOptions) -> Result<Document<'a>> {
        let parse_span = tracing::info_span!("parse_document", bytes_len = bytes.len());
        let _parse_guard = parse_span.enter();
        info!("Parsing PDF document");
        let header_version = parse_header_version(bytes);
        let startxrefs = find_startxrefs(bytes);
        let mut trailers = Vec::new();
        if let Some(last) = startxrefs.last().copied() {
            let chain = parse_xref_chain(bytes, last);
            for sec in &chain.sections {
                if let Some(t) = sec.trailer.as_ref() {
                    trailers.push(t.clone());
                }
            }
            debug!(startxrefs = startxrefs.len(), sections = chain.sections.len(), "Parsed xref chain");
        }
        let mut objects = scan_indirect_objects(bytes, options.max_objects);
        debug!(objects = objects.len(), "Scanned indirect objects");
        if header_version.is_none() && objects.is_empty() {
            return Err(anyhow!("no PDF header and no indirect objects found"));
        }
        fix_stream_lengths(bytes, &mut objects);
        let ObjStmExpansion { objects: mut extra } = expand_objstm(
            bytes,
            &objects,
            options.max_objstm_bytes,
            options.max_objects,
            options.max_objstm_total_bytes,
        );
        objects.append(&mut extra);
        let mut index: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, o) in objects.iter().enumerate() {
            index.entry(o.obj).or_default().push(i);
        }
        let version = header_version.unwrap_or(DEFAULT_VERSION);
        info!(
            objects = objects.len(),
            startxrefs = startxrefs.len(),
            trailers = trailers.len(),
            version,
            "Parsed PDF document"
        );
        Ok(Document { bytes, objects, index, trailers, startxrefs, options, version })
    }

    /// Looks an object up by number alone. With incremental updates the same
    /// number can appear more than once; the entry latest in the file wins.
    pub fn resolve_object(&self, id: u32) -> Option<&PdfObj<'a>> {
        self.index
            .get(&id)
            .and_then(|v| v.last().copied())
            .and_then(|idx| self.objects.get(idx))
            .map(|entry| &entry.body)
    }

    /// Header version, e.g. 1.4 for `%PDF-1.4`.
    pub fn version(&self) -> f64 {
        self.version
    }

    /// Trailer /Size when a trailer carries a usable one, otherwise the
    /// number of distinct object numbers the scan found.
    pub fn object_count(&self) -> u64 {
        for trailer in &self.trailers {
            if let Some((_, obj)) = trailer.get_first(b"/Size") {
                if let PdfAtom::Int(n) = obj.atom {
                    if n >= 0 {
                        return n as u64;
                    }
                }
            }
        }
        self.index.len() as u64
    }
}

const DEFAULT_VERSION: f64 = 1.4;
const HEADER_SCAN_WINDOW: usize = 1024;

/// `%PDF-x.y` anywhere in the first KiB. A header with unparseable digits
/// still counts as a header and maps to the 1.4 default.
fn parse_header_version(bytes: &[u8]) -> Option<f64> {
    let window = &bytes[..bytes.len().min(HEADER_SCAN_WINDOW)];
    let at = memmem::find(window, b"%PDF-")?;
    let rest = &bytes[at + b"%PDF-".len()..];
    let mut end = 0usize;
    while end < rest.len() && (rest[end].is_ascii_digit() || rest[end] == b'.') {
        end += 1;
    }
    match std::str::from_utf8(&rest[..end]).ok().and_then(|s| s.parse::<f64>().ok()) {
        Some(v) => Some(v),
        None => {
            warn!(kind = "malformed_header_version", offset = at, "Malformed %PDF- header version");
            Some(DEFAULT_VERSION)
        }
    }
}

fn find_startxrefs(bytes: &[u8]) -> Vec<u64> {
    let mut out = Vec::new();
    for at in memmem::find_iter(bytes, b"startxref") {
        let mut j = at + b"startxref".len();
        while j < bytes.len() && matches!(bytes[j], b'\r' | b'\n' | b' ') {
            j += 1;
        }
        let start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if let Ok(s) = std::str::from_utf8(&bytes[start..j]) {
            if let Ok(v) = s.parse::<u64>() {
                out.push(v);
            }
        }
    }
    out
}

/// Streams whose /Length is an indirect reference get a provisional span from
/// the `endstream` scan. Once every object has been seen the real length can
/// be resolved and the span corrected.
fn fix_stream_lengths(bytes: &[u8], objects: &mut [ObjEntry<'_>]) {
    let mut last_by_id: HashMap<u32, usize> = HashMap::new();
    for (i, o) in objects.iter().enumerate() {
        last_by_id.insert(o.obj, i);
    }
    let mut fixes: Vec<(usize, u64)> = Vec::new();
    for (i, entry) in objects.iter().enumerate() {
        let PdfAtom::Stream(st) = &entry.body.atom else {
            continue;
        };
        let Some((_, len_obj)) = st.dict.get_first(b"/Length") else {
            continue;
        };
        let PdfAtom::Ref { obj: len_id, .. } = len_obj.atom else {
            continue;
        };
        let resolved = last_by_id
            .get(&len_id)
            .and_then(|idx| objects.get(*idx))
            .map(|target| &target.body.atom);
        let Some(PdfAtom::Int(len)) = resolved else {
            trace!(
                kind = "stream_length_unresolved",
                obj = entry.obj,
                length_ref = len_id,
                "Indirect stream /Length did not resolve to an integer"
            );
            continue;
        };
        if *len < 0 {
            continue;
        }
        let start = st.data_span.start;
        let end = start.saturating_add(*len as u64).min(bytes.len() as u64);
        if end != st.data_span.end {
            fixes.push((i, end));
        }
    }
    for (i, end) in fixes {
        if let PdfAtom::Stream(st) = &mut objects[i].body.atom {
            trace!(
                kind = "stream_length_fixed",
                obj = objects[i].obj,
                old_end = st.data_span.end,
                new_end = end,
                "Corrected stream span from indirect /Length"
            );
            st.data_span.end = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, ParseOptions};
    use crate::object::PdfAtom;

    #[test]
    fn later_definition_of_same_number_wins() {
        let pdf = b"%PDF-1.4\n5 0 obj 111 endobj\n5 0 obj 222 endobj\n";
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        let obj = doc.resolve_object(5).expect("object 5");
        assert!(matches!(obj.atom, PdfAtom::Int(222)));
    }

    #[test]
    fn header_version_is_parsed() {
        let pdf = b"%PDF-1.7\n1 0 obj null endobj\n";
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        assert_eq!(doc.version(), 1.7);
    }

    #[test]
    fn headerless_input_without_objects_is_fatal() {
        assert!(Document::parse(b"not a pdf at all", ParseOptions::default()).is_err());
    }

    #[test]
    fn headerless_input_with_objects_parses_with_default_version() {
        let pdf = b"1 0 obj (text) endobj\n";
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        assert_eq!(doc.version(), 1.4);
        assert!(doc.resolve_object(1).is_some());
    }

    #[test]
    fn object_count_prefers_trailer_size() {
        let mut pdf = b"%PDF-1.4\n1 0 obj null endobj\n".to_vec();
        let xref_off = pdf.len();
        pdf.extend_from_slice(b"xref\n0 2\ntrailer\n<< /Size 9 >>\n");
        pdf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());
        let doc = Document::parse(&pdf, ParseOptions::default()).expect("parse");
        assert_eq!(doc.object_count(), 9);
    }

    #[test]
    fn object_count_falls_back_to_distinct_ids() {
        let pdf = b"%PDF-1.4\n1 0 obj null endobj\n1 0 obj true endobj\n2 0 obj 3 endobj\n";
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        assert_eq!(doc.object_count(), 2);
    }

    #[test]
    fn indirect_length_corrects_stream_span() {
        let pdf =
            b"%PDF-1.4\n1 0 obj << /Length 2 0 R >> stream\nABCDEF\nendstream endobj\n2 0 obj 6 endobj\n";
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        let obj = doc.resolve_object(1).expect("object 1");
        let PdfAtom::Stream(st) = &obj.atom else { panic!("expected stream") };
        assert_eq!(st.data_span.len(), 6);
        let data = &pdf[st.data_span.start as usize..st.data_span.end as usize];
        assert_eq!(data, b"ABCDEF");
    }
}
