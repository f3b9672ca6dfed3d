use pdftree_pdf::object::PdfAtom;
use pdftree_pdf::{Document, ParseOptions};

fn minimal_pdf() -> Vec<u8> {
    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.4\n");
    pdf.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    pdf.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    pdf.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /Contents 4 0 R >> endobj\n");
    pdf.extend_from_slice(b"4 0 obj << /Length 2 >> stream\nBT\nendstream endobj\n");
    let xref_off = pdf.len();
    pdf.extend_from_slice(b"xref\n0 5\ntrailer\n<< /Size 5 /Root 1 0 R >>\n");
    pdf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());
    pdf
}

#[test]
fn resolves_catalog_chain() {
    let pdf = minimal_pdf();
    let doc = Document::parse(&pdf, ParseOptions::default()).unwrap();

    let trailer = doc.trailers.first().expect("trailer");
    let (_, root) = trailer.get_first(b"/Root").expect("/Root");
    let PdfAtom::Ref { obj: root_id, .. } = root.atom else { panic!("expected ref") };
    let catalog = doc.resolve_object(root_id).expect("catalog");
    let PdfAtom::Dict(catalog) = &catalog.atom else { panic!("expected dict") };
    let (_, pages) = catalog.get_first(b"/Pages").expect("/Pages");
    let PdfAtom::Ref { obj: pages_id, .. } = pages.atom else { panic!("expected ref") };
    let pages = doc.resolve_object(pages_id).expect("pages");
    assert!(matches!(pages.atom, PdfAtom::Dict(_)));
}

#[test]
fn summary_queries_reflect_header_and_trailer() {
    let pdf = minimal_pdf();
    let doc = Document::parse(&pdf, ParseOptions::default()).unwrap();
    assert_eq!(doc.version(), 1.4);
    assert_eq!(doc.object_count(), 5);
}

#[test]
fn unknown_id_resolves_to_none() {
    let pdf = minimal_pdf();
    let doc = Document::parse(&pdf, ParseOptions::default()).unwrap();
    assert!(doc.resolve_object(99).is_none());
}

#[test]
fn object_stream_entries_are_resolvable() {
    let payload = b"123 << /K /V >>";
    let header = b"2 0 3 4 ";
    let mut data = Vec::new();
    data.extend_from_slice(header);
    data.extend_from_slice(payload);
    let mut pdf = b"%PDF-1.5\n".to_vec();
    pdf.extend_from_slice(
        format!(
            "1 0 obj << /Type /ObjStm /N 2 /First {} /Length {} >> stream\n",
            header.len(),
            data.len()
        )
        .as_bytes(),
    );
    pdf.extend_from_slice(&data);
    pdf.extend_from_slice(b"\nendstream endobj\n");

    let doc = Document::parse(&pdf, ParseOptions::default()).unwrap();
    let compressed = doc.resolve_object(2).expect("object 2");
    assert!(matches!(compressed.atom, PdfAtom::Int(123)));
    let dict = doc.resolve_object(3).expect("object 3");
    assert!(matches!(dict.atom, PdfAtom::Dict(_)));
    let container = doc.resolve_object(1).expect("object 1");
    assert!(matches!(container.atom, PdfAtom::Stream(_)));
}
