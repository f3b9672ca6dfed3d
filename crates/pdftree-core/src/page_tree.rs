use std::collections::HashSet;

use pdftree_pdf::object::{PdfAtom, PdfDict, PdfObj};
use pdftree_pdf::Document;
use tracing::warn;

const MAX_PAGE_TREE_DEPTH: usize = 128;

/// Object number and generation of a leaf page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub obj: u32,
    pub gen: u16,
}

/// Leaf pages of the catalog's page tree, in the order the /Kids arrays list
/// them.
#[derive(Debug, Default)]
pub struct PageTree {
    pub pages: Vec<PageRef>,
}

impl PageTree {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Resolves the page at `index` back to its object. `None` when the index
    /// is out of range or the page's object number no longer resolves.
    pub fn page_root<'a, 'b>(&self, doc: &'b Document<'a>, index: usize) -> Option<&'b PdfObj<'a>> {
        let page = self.pages.get(index)?;
        doc.resolve_object(page.obj)
    }
}

/// Walks trailer /Root -> catalog /Pages -> /Kids and collects /Type /Page
/// leaves. Depth and revisit guards keep malformed trees from recursing
/// forever.
pub fn build_page_tree(doc: &Document<'_>) -> PageTree {
    let mut pages = Vec::new();
    let mut seen = HashSet::new();
    let root = doc.trailers.iter().find_map(|t| t.get_first(b"/Root").map(|(_, v)| v));
    let catalog = root.and_then(|o| resolve_to_dict(doc, o));
    let pages_obj = catalog.and_then(|d| d.get_first(b"/Pages").map(|(_, v)| v));
    if let Some(pages_obj) = pages_obj {
        walk_pages(doc, pages_obj, &mut pages, &mut seen, 0);
    }
    PageTree { pages }
}

fn walk_pages(
    doc: &Document<'_>,
    node: &PdfObj<'_>,
    pages: &mut Vec<PageRef>,
    seen: &mut HashSet<(u32, u16)>,
    depth: usize,
) {
    if depth > MAX_PAGE_TREE_DEPTH {
        warn!(kind = "page_tree_depth_exceeded", depth, "Page tree too deep; stopping traversal");
        return;
    }
    if let PdfAtom::Ref { obj, gen } = node.atom {
        if !seen.insert((obj, gen)) {
            warn!(kind = "page_tree_cycle", obj, gen, "Page tree revisits an object");
            return;
        }
    }
    let Some(dict) = resolve_to_dict(doc, node) else {
        return;
    };
    if dict.has_name(b"/Type", b"/Pages") {
        if let Some((_, kids)) = dict.get_first(b"/Kids") {
            if let PdfAtom::Array(arr) = &kids.atom {
                for kid in arr {
                    walk_pages(doc, kid, pages, seen, depth + 1);
                }
            }
        }
        return;
    }
    if dict.has_name(b"/Type", b"/Page") {
        match node.atom {
            PdfAtom::Ref { obj, gen } => pages.push(PageRef { obj, gen }),
            // A page embedded directly in its parent has no object number to
            // look it up by later.
            _ => warn!(kind = "inline_page_node", "Page node without an object number skipped"),
        }
    }
}

fn resolve_to_dict<'a, 'b>(doc: &'b Document<'a>, obj: &'b PdfObj<'a>) -> Option<&'b PdfDict<'a>> {
    match &obj.atom {
        PdfAtom::Dict(d) => Some(d),
        PdfAtom::Stream(st) => Some(&st.dict),
        PdfAtom::Ref { obj: id, .. } => match doc.resolve_object(*id).map(|o| &o.atom) {
            Some(PdfAtom::Dict(d)) => Some(d),
            Some(PdfAtom::Stream(st)) => Some(&st.dict),
            _ => None,
        },
        _ => None,
    }
}
