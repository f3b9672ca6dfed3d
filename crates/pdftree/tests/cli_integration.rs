//! Integration tests for the `pdftree` binary.
//!
//! These tests invoke the compiled binary directly via `std::process::Command`.
//! Run with: `cargo test -p pdftree --test cli_integration`

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn pdftree_bin() -> &'static str {
    env!("CARGO_BIN_EXE_pdftree")
}

fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("pdftree_{}_{name}", std::process::id()));
    fs::write(&path, bytes).expect("write fixture");
    path
}

fn one_page_pdf() -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    pdf.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    pdf.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /Contents 4 0 R >> endobj\n");
    pdf.extend_from_slice(b"4 0 obj << /Length 9 >> stream\nq BT ET Q\nendstream endobj\n");
    let xref_off = pdf.len();
    pdf.extend_from_slice(b"xref\n0 5\ntrailer\n<< /Size 5 /Root 1 0 R >>\n");
    pdf.extend_from_slice(format!("startxref\n{xref_off}\n%%EOF\n").as_bytes());
    pdf
}

#[test]
fn one_page_dump_succeeds() {
    let path = write_fixture("one_page.pdf", &one_page_pdf());
    let out = Command::new(pdftree_bin()).arg(&path).output().expect("failed to run pdftree");
    assert!(out.status.success(), "exit code: {}", out.status);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("PDF Header level = 1.400000"));
    assert!(stdout.contains("Number of objects in PDF = 5"));
    assert!(stdout.contains("Number of pages in PDF = 1"));
    assert!(stdout.contains("// Showing info for Page 0 "));
    assert!(stdout.contains("ePDFObjectIndirectObjectReference: Start : value = 4"));
    assert!(stdout.trim_end().ends_with("Parsing succeeded"));
    let _ = fs::remove_file(path);
}

#[test]
fn zero_page_dump_prints_summary_only() {
    let path = write_fixture("zero_page.pdf", b"%PDF-1.3\n1 0 obj << /Type /Catalog >> endobj\n");
    let out = Command::new(pdftree_bin()).arg(&path).output().expect("failed to run pdftree");
    assert!(out.status.success(), "exit code: {}", out.status);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("PDF Header level = 1.300000"));
    assert!(stdout.contains("Number of pages in PDF = 0"));
    assert!(!stdout.contains("// Showing info for Page"));
    assert!(stdout.trim_end().ends_with("Parsing succeeded"));
    let _ = fs::remove_file(path);
}

#[test]
fn missing_file_fails() {
    let out = Command::new(pdftree_bin())
        .arg("pdftree_no_such_fixture.pdf")
        .output()
        .expect("failed to run pdftree");
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.trim_end().ends_with("Parsing failed"));
}

#[test]
fn non_pdf_input_fails() {
    let path = write_fixture("not_a.pdf", b"plain text with nothing resembling an object");
    let out = Command::new(pdftree_bin()).arg(&path).output().expect("failed to run pdftree");
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.trim_end().ends_with("Parsing failed"));
    let _ = fs::remove_file(path);
}
