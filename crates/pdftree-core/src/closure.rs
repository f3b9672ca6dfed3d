use std::io::Write;

use anyhow::Result;
use pdftree_pdf::Document;
use tracing::trace;

use crate::indirects::IndirectSet;
use crate::render::render;

/// Expands `set` to the transitive closure of the references it holds, then
/// prints every member in ascending id order.
///
/// Expansion re-renders each member in dry-run mode, which records any
/// references the member's body contains without producing output. New
/// members are appended and picked up by the next sweep; the loop ends on
/// the first sweep that adds nothing. Ids that resolve to no object stay in
/// the set but get no printed block.
pub fn resolve_and_print_indirects<W: Write>(
    out: &mut W,
    doc: &Document<'_>,
    set: &mut IndirectSet,
) -> Result<()> {
    loop {
        let before = set.len();
        for i in 0..before {
            let Some(id) = set.get(i) else { break };
            if let Some(node) = doc.resolve_object(id) {
                render(out, doc, node, 1, set, true)?;
            }
        }
        if set.len() == before {
            break;
        }
    }
    set.sort();
    for i in 0..set.len() {
        let Some(id) = set.get(i) else { break };
        let Some(node) = doc.resolve_object(id) else {
            trace!(kind = "dangling_indirect", obj = id, "Referenced object missing from document");
            continue;
        };
        writeln!(out, "ePDFObjectIndirectObjectReference: Start : value = {id}")?;
        render(out, doc, node, 1, set, false)?;
        writeln!(out, "ePDFObjectIndirectObjectReference: End   : value = {id}")?;
        writeln!(out)?;
    }
    Ok(())
}
