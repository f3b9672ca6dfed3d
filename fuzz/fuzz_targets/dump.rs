#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let doc = match pdftree_pdf::Document::parse(
        data,
        pdftree_pdf::ParseOptions {
            max_objects: 10_000,
            max_objstm_bytes: 1_000_000,
            max_objstm_total_bytes: 5_000_000,
            max_stream_bytes: 1_000_000,
        },
    ) {
        Ok(doc) => doc,
        Err(_) => return,
    };
    let _ = pdftree_core::print_report(&mut std::io::sink(), &doc);
});
