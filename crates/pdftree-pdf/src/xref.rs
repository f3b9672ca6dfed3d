use anyhow::{anyhow, Result};
use memchr::memmem;
use tracing::{debug, warn};

use crate::object::{PdfAtom, PdfDict};
use crate::parser::{parse_indirect_object_at, Parser};

#[derive(Debug, Clone, Copy)]
pub enum XrefKind {
    Table,
    Stream,
    Unknown,
}

#[derive(Debug)]
pub struct XrefSection<'a> {
    pub offset: u64,
    pub trailer: Option<PdfDict<'a>>,
    pub kind: XrefKind,
}

#[derive(Debug)]
pub struct XrefChain<'a> {
    pub sections: Vec<XrefSection<'a>>,
}

/// Walks the /Prev chain from `startxref`, newest section first. Offsets that
/// repeat or point outside the file end the walk.
pub fn parse_xref_chain<'a>(bytes: &'a [u8], startxref: u64) -> XrefChain<'a> {
    let mut sections = Vec::new();
    let mut next = Some(startxref);
    let mut seen = std::collections::HashSet::new();
    while let Some(off) = next {
        if !seen.insert(off) {
            warn!(kind = "xref_loop_detected", offset = off, "Detected xref loop");
            break;
        }
        let offset = off as usize;
        if offset >= bytes.len() {
            warn!(
                kind = "xref_offset_oob",
                offset = off,
                bytes_len = bytes.len(),
                "Xref offset out of range"
            );
            break;
        }
        if bytes[offset..].starts_with(b"xref") {
            if let Ok((trailer, prev)) = parse_xref_table(bytes, offset) {
                sections.push(XrefSection { offset: off, trailer, kind: XrefKind::Table });
                debug!(offset = off, kind = ?XrefKind::Table, "Parsed xref table");
                next = prev;
                continue;
            }
        }
        if let Ok((trailer, prev)) = parse_xref_stream(bytes, offset) {
            sections.push(XrefSection { offset: off, trailer, kind: XrefKind::Stream });
            debug!(offset = off, kind = ?XrefKind::Stream, "Parsed xref stream");
            next = prev;
            continue;
        }
        sections.push(XrefSection { offset: off, trailer: None, kind: XrefKind::Unknown });
        debug!(offset = off, kind = ?XrefKind::Unknown, "Parsed xref with unknown type");
        break;
    }
    XrefChain { sections }
}

fn parse_xref_table(bytes: &[u8], offset: usize) -> Result<(Option<PdfDict<'_>>, Option<u64>)> {
    let mut p = Parser::new(bytes, offset);
    p.consume_keyword(b"xref");
    // Skip subsection headers and entries, then find "trailer".
    let haystack_start = p.position();
    let haystack = &bytes[haystack_start..];
    if haystack.is_empty() {
        return Err(anyhow!("trailer search haystack empty"));
    }
    if let Some(pos) = memmem::find(haystack, b"trailer") {
        p.set_position(haystack_start + pos + "trailer".len());
        p.skip_ws_and_comments();
        let dict = p.parse_object()?;
        if let PdfAtom::Dict(d) = dict.atom {
            let prev = extract_prev(&d);
            return Ok((Some(d), prev));
        }
    } else {
        warn!(
            kind = "xref_trailer_missing",
            offset, "Trailer keyword not found after xref table"
        );
    }
    Err(anyhow!("trailer not found"))
}

fn parse_xref_stream(bytes: &[u8], offset: usize) -> Result<(Option<PdfDict<'_>>, Option<u64>)> {
    let (entry, _) = parse_indirect_object_at(bytes, offset)?;
    match entry.body.atom {
        PdfAtom::Stream(st) => {
            if st.dict.has_name(b"/Type", b"/XRef") {
                let prev = extract_prev(&st.dict);
                return Ok((Some(st.dict), prev));
            }
        }
        PdfAtom::Dict(d) => {
            if d.has_name(b"/Type", b"/XRef") {
                let prev = extract_prev(&d);
                return Ok((Some(d), prev));
            }
        }
        _ => {}
    }
    Err(anyhow!("not an xref stream"))
}

fn extract_prev(dict: &PdfDict<'_>) -> Option<u64> {
    let (_, obj) = dict.get_first(b"/Prev")?;
    match &obj.atom {
        PdfAtom::Int(i) if *i >= 0 => Some(*i as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_xref_chain;

    #[test]
    fn chain_stops_on_offset_loop() {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let off = pdf.len();
        // Trailer whose /Prev points back at its own section.
        let body = format!("xref\n0 0\ntrailer\n<< /Size 1 /Prev {} >>\n", off);
        pdf.extend_from_slice(body.as_bytes());
        let chain = parse_xref_chain(&pdf, off as u64);
        assert_eq!(chain.sections.len(), 1);
    }

    #[test]
    fn out_of_range_offset_yields_no_sections() {
        let chain = parse_xref_chain(b"%PDF-1.4\n", 10_000);
        assert!(chain.sections.is_empty());
    }
}
