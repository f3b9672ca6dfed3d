#![no_main]

use libfuzzer_sys::fuzz_target;
use pdftree_core::page_tree::build_page_tree;

fuzz_target!(|data: &[u8]| {
    let doc = match pdftree_pdf::Document::parse(
        data,
        pdftree_pdf::ParseOptions {
            max_objects: 20_000,
            max_objstm_bytes: 1_000_000,
            max_objstm_total_bytes: 5_000_000,
            max_stream_bytes: 1_000_000,
        },
    ) {
        Ok(doc) => doc,
        Err(_) => return,
    };

    let tree = build_page_tree(&doc);
    for index in 0..tree.page_count() {
        let _ = tree.page_root(&doc, index);
    }
});
