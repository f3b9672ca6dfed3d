use std::io::Write;

use anyhow::Result;
use pdftree_pdf::object::{PdfAtom, PdfObj, PdfStr, PdfStream};
use pdftree_pdf::Document;
use tracing::warn;

use crate::fmt::indent;
use crate::indirects::IndirectSet;

/// Printed type name for a node. One label per kind; the enum is closed, so
/// there is no fallthrough.
pub fn type_label(atom: &PdfAtom<'_>) -> &'static str {
    match atom {
        PdfAtom::Bool(_) => "ePDFObjectBoolean",
        PdfAtom::Str(PdfStr::Literal { .. }) => "ePDFObjectLiteralString",
        PdfAtom::Str(PdfStr::Hex { .. }) => "ePDFObjectHexString",
        PdfAtom::Null => "ePDFObjectNull",
        PdfAtom::Name(_) => "ePDFObjectName",
        PdfAtom::Int(_) => "ePDFObjectInteger",
        PdfAtom::Real(_) => "ePDFObjectReal",
        PdfAtom::Array(_) => "ePDFObjectArray",
        PdfAtom::Dict(_) => "ePDFObjectDictionary",
        PdfAtom::Ref { .. } => "ePDFObjectIndirectObjectReference",
        PdfAtom::Stream(_) => "ePDFObjectStream",
        PdfAtom::Symbol(_) => "ePDFObjectSymbol",
    }
}

const HEX_BYTES_PER_LINE: usize = 16;

/// Renders one node of the object tree.
///
/// In dry-run mode nothing is written, but reference bookkeeping still
/// happens: every `Ref` met is appended to `set` (once per id). That is how
/// the closure pass discovers references without duplicating a page's output.
/// References are never followed here; their targets are printed later from
/// the set, so shared and cyclic structures stay finite.
pub fn render<W: Write>(
    out: &mut W,
    doc: &Document<'_>,
    node: &PdfObj<'_>,
    depth: usize,
    set: &mut IndirectSet,
    dry_run: bool,
) -> Result<()> {
    if !dry_run {
        write!(out, "{}{}: ", indent(depth), type_label(&node.atom))?;
    }
    match &node.atom {
        PdfAtom::Array(items) => {
            if !dry_run {
                writeln!(out)?;
            }
            for item in items {
                render(out, doc, item, depth + 1, set, dry_run)?;
            }
        }
        PdfAtom::Dict(dict) => {
            if !dry_run {
                writeln!(out)?;
            }
            for (key, value) in &dict.entries {
                if !dry_run {
                    write!(out, "{}key = ", indent(depth + 1))?;
                    out.write_all(key.text())?;
                    writeln!(out)?;
                }
                render(out, doc, value, depth + 2, set, dry_run)?;
            }
        }
        PdfAtom::Bool(v) => {
            if !dry_run {
                writeln!(out, "value = {}", v)?;
            }
        }
        PdfAtom::Str(PdfStr::Literal { decoded, .. }) => {
            if !dry_run {
                write!(out, "value = ")?;
                out.write_all(decoded)?;
                writeln!(out)?;
            }
        }
        PdfAtom::Str(PdfStr::Hex { raw, .. }) => {
            if !dry_run {
                // Every second byte of the stored text, starting at index 3.
                // The framing delimiters take part; this is the dump's wire
                // convention, not a decode.
                write!(out, "value = ")?;
                let raw = raw.as_ref();
                let mut i = 2;
                while i + 1 < raw.len() {
                    out.write_all(&raw[i + 1..i + 2])?;
                    i += 2;
                }
                writeln!(out)?;
            }
        }
        PdfAtom::Null => {
            if !dry_run {
                writeln!(out, "value = NULL")?;
            }
        }
        PdfAtom::Name(name) => {
            if !dry_run {
                write!(out, "value = ")?;
                out.write_all(name.text())?;
                writeln!(out)?;
            }
        }
        PdfAtom::Int(v) => {
            if !dry_run {
                writeln!(out, "value = {}", v)?;
            }
        }
        PdfAtom::Real(v) => {
            if !dry_run {
                writeln!(out, "value = {:.6}", v)?;
            }
        }
        PdfAtom::Stream(st) => {
            // Payloads are not touched at all in dry-run.
            if !dry_run {
                render_stream_payload(out, doc, st, depth)?;
            }
        }
        PdfAtom::Ref { obj, .. } => {
            if !dry_run {
                writeln!(out, "value = {}", obj)?;
            }
            // Record for the closure pass; duplicates are dropped by the set.
            set.insert(*obj);
        }
        PdfAtom::Symbol(_) => {
            if !dry_run {
                writeln!(out, "value = UNKNOWN")?;
            }
        }
    }
    Ok(())
}

/// Stream payload dump. A probe read over a fresh reader picks the mode: any
/// byte past 0x7f switches the whole payload to hex. The dump then runs over
/// a second fresh reader, since readers cannot rewind.
fn render_stream_payload<W: Write>(
    out: &mut W,
    doc: &Document<'_>,
    st: &PdfStream<'_>,
    depth: usize,
) -> Result<()> {
    let prefix = indent(depth + 1);
    let mut is_hex = false;
    match doc.stream_reader(st) {
        Ok(mut probe) => {
            while let Some(b) = probe.read_byte() {
                if !b.is_ascii() {
                    is_hex = true;
                    break;
                }
            }
        }
        Err(err) => {
            warn!(kind = "stream_read_failed", error = %err, "Stream payload unavailable");
        }
    }
    writeln!(out)?;
    write!(out, "{}", prefix)?;
    if let Ok(mut reader) = doc.stream_reader(st) {
        let mut pos = 0usize;
        while let Some(b) = reader.read_byte() {
            if is_hex {
                write!(out, "{:02X}", b)?;
                if (pos + 1) % HEX_BYTES_PER_LINE == 0 {
                    writeln!(out)?;
                    write!(out, "{}", prefix)?;
                    pos = 0;
                } else {
                    write!(out, " ")?;
                    pos += 1;
                }
            } else {
                out.write_all(&[b])?;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{render, type_label};
    use crate::indirects::IndirectSet;
    use pdftree_pdf::object::PdfAtom;
    use pdftree_pdf::{Document, ParseOptions};

    fn render_object_one(pdf: &[u8], dry_run: bool) -> (String, IndirectSet) {
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        let node = doc.resolve_object(1).expect("object 1");
        let mut set = IndirectSet::new();
        let mut out = Vec::new();
        render(&mut out, &doc, node, 0, &mut set, dry_run).expect("render");
        (String::from_utf8(out).expect("utf8"), set)
    }

    #[test]
    fn labels_cover_every_kind() {
        assert_eq!(type_label(&PdfAtom::Null), "ePDFObjectNull");
        assert_eq!(type_label(&PdfAtom::Int(0)), "ePDFObjectInteger");
        assert_eq!(
            type_label(&PdfAtom::Ref { obj: 1, gen: 0 }),
            "ePDFObjectIndirectObjectReference"
        );
    }

    #[test]
    fn scalar_values_share_the_label_line() {
        let pdf = b"%PDF-1.4\n1 0 obj [ true 42 3.5 /Name (lit) null ] endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(
            out,
            "ePDFObjectArray: \n\
             \x20 ePDFObjectBoolean: value = true\n\
             \x20 ePDFObjectInteger: value = 42\n\
             \x20 ePDFObjectReal: value = 3.500000\n\
             \x20 ePDFObjectName: value = Name\n\
             \x20 ePDFObjectLiteralString: value = lit\n\
             \x20 ePDFObjectNull: value = NULL\n"
        );
    }

    #[test]
    fn dict_prints_key_lines_with_values_two_deeper() {
        let pdf = b"%PDF-1.4\n1 0 obj << /K 7 >> endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectDictionary: \n  key = K\n    ePDFObjectInteger: value = 7\n");
    }

    #[test]
    fn hex_string_prints_stored_text_subsequence() {
        let pdf = b"%PDF-1.4\n1 0 obj <4142> endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectHexString: value = 4>\n");
    }

    #[test]
    fn odd_length_hex_string_does_not_panic() {
        let pdf = b"%PDF-1.4\n1 0 obj <414> endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectHexString: value = 4\n");
    }

    #[test]
    fn symbol_renders_unknown() {
        let pdf = b"%PDF-1.4\n1 0 obj [ mystery ] endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectArray: \n  ePDFObjectSymbol: value = UNKNOWN\n");
    }

    #[test]
    fn references_print_each_time_but_register_once() {
        let pdf = b"%PDF-1.4\n1 0 obj [ 5 0 R 5 0 R ] endobj\n5 0 obj null endobj\n";
        let (out, set) = render_object_one(pdf, false);
        assert_eq!(out.matches("value = 5").count(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn dry_run_writes_nothing_but_tracks_references() {
        let pdf = b"%PDF-1.4\n1 0 obj << /A 5 0 R /B [ 6 0 R ] >> endobj\n";
        let (out, set) = render_object_one(pdf, true);
        assert!(out.is_empty());
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 6]);
    }

    #[derive(Clone, Default)]
    struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> LogCapture {
            self.clone()
        }
    }

    /// Renders under a capturing subscriber and returns (log text, dump text).
    fn render_object_one_with_logs(pdf: &[u8], dry_run: bool) -> (String, String) {
        let doc = Document::parse(pdf, ParseOptions::default()).expect("parse");
        let node = doc.resolve_object(1).expect("object 1");
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(capture.clone())
            .finish();
        let mut set = IndirectSet::new();
        let mut out = Vec::new();
        tracing::subscriber::with_default(subscriber, || {
            render(&mut out, &doc, node, 0, &mut set, dry_run).expect("render")
        });
        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).expect("utf8");
        (logs, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn dry_run_never_opens_stream_payloads() {
        // Decoding this filter chain logs a warning, so a silent dry run
        // shows the payload was never opened at all.
        let pdf = b"%PDF-1.4\n1 0 obj << /Length 5 /Filter /Bogus >> stream\nhello\nendstream endobj\n";
        let (logs, _) = render_object_one_with_logs(pdf, false);
        assert!(logs.contains("stream_filter_failed"));
        let (logs, out) = render_object_one_with_logs(pdf, true);
        assert!(logs.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn ascii_stream_dumps_verbatim() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Length 5 >> stream\nhello\nendstream endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectStream: \n  hello\n");
    }

    #[test]
    fn binary_stream_dumps_hex_sixteen_per_line() {
        let mut pdf = b"%PDF-1.4\n1 0 obj << /Length 17 >> stream\n".to_vec();
        pdf.push(0x80);
        pdf.extend((1..=16u8).collect::<Vec<_>>());
        pdf.extend_from_slice(b"\nendstream endobj\n");
        let (out, _) = render_object_one(&pdf, false);
        assert_eq!(
            out,
            "ePDFObjectStream: \n\
             \x20 80 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n\
             \x20 10 \n"
        );
    }

    #[test]
    fn empty_stream_prints_bare_prefix_line() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Length 0 >> stream\nendstream endobj\n";
        let (out, _) = render_object_one(pdf, false);
        assert_eq!(out, "ePDFObjectStream: \n  \n");
    }
}
