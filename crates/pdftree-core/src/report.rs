use std::io::Write;

use anyhow::Result;
use pdftree_pdf::Document;
use tracing::warn;

use crate::closure::resolve_and_print_indirects;
use crate::indirects::IndirectSet;
use crate::page_tree::{build_page_tree, PageTree};
use crate::render::render;

/// Header version and the two counters, ahead of any page section.
pub fn print_summary<W: Write>(out: &mut W, doc: &Document<'_>, pages: &PageTree) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "PDF Header level = {:.6}", doc.version())?;
    writeln!(out, "Number of objects in PDF = {}", doc.object_count())?;
    writeln!(out, "Number of pages in PDF = {}", pages.page_count())?;
    Ok(())
}

/// One section per page, in page order: the page's object tree, then every
/// object it reaches through indirect references. Each section starts from an
/// empty reference set, so objects shared between pages reappear under every
/// page that leads to them.
pub fn print_pages<W: Write>(out: &mut W, doc: &Document<'_>, pages: &PageTree) -> Result<()> {
    for index in 0..pages.page_count() {
        let Some(root) = pages.page_root(doc, index) else {
            warn!(kind = "page_root_unresolved", page = index, "Page did not resolve; skipping");
            continue;
        };
        writeln!(out)?;
        writeln!(out, "// Showing info for Page {index} {}", "/".repeat(58))?;
        writeln!(out, "Showing info for page {index}:")?;
        let mut set = IndirectSet::new();
        render(out, doc, root, 0, &mut set, false)?;
        writeln!(out)?;
        writeln!(out, "// Showing Indirect Object for Page {index} {}", "/".repeat(45))?;
        writeln!(out)?;
        resolve_and_print_indirects(out, doc, &mut set)?;
        writeln!(out, "{}", "/".repeat(87))?;
    }
    Ok(())
}

/// Full dump: summary first, then every page section.
pub fn print_report<W: Write>(out: &mut W, doc: &Document<'_>) -> Result<()> {
    let pages = build_page_tree(doc);
    print_summary(out, doc, &pages)?;
    print_pages(out, doc, &pages)
}
