use tracing::warn;

use crate::decode::decode_stream;
use crate::document::ObjEntry;
use crate::object::{own_obj, PdfAtom, PdfDict};
use crate::parser::Parser;

const MAX_OBJSTM_COUNT: usize = 100;

pub struct ObjStmExpansion<'a> {
    pub objects: Vec<ObjEntry<'a>>,
}

/// Expands /Type /ObjStm containers into ordinary object entries. Entries in
/// an object stream always have generation 0. Streams cannot legally live
/// inside an object stream, so any that parse there are dropped.
pub fn expand_objstm<'a>(
    bytes: &'a [u8],
    objects: &[ObjEntry<'a>],
    max_objstm_bytes: usize,
    max_objects_total: usize,
    max_total_decoded_bytes: usize,
) -> ObjStmExpansion<'a> {
    let mut out = Vec::new();
    let mut decoded_total = 0usize;
    let mut objstm_count = 0usize;
    for entry in objects {
        if max_objects_total > 0 && objects.len() + out.len() >= max_objects_total {
            warn!(
                kind = "max_objects_total_reached",
                max_objects_total, "Object stream expansion halted by object budget"
            );
            break;
        }
        let st = match &entry.body.atom {
            PdfAtom::Stream(st) => st,
            _ => continue,
        };
        if !st.dict.has_name(b"/Type", b"/ObjStm") {
            continue;
        }
        objstm_count += 1;
        if objstm_count > MAX_OBJSTM_COUNT {
            warn!(
                kind = "objstm_count_exceeded",
                max_objstm_count = MAX_OBJSTM_COUNT,
                "Object stream expansion halted by count limit"
            );
            break;
        }
        let n = match dict_int(&st.dict, b"/N").and_then(|v| usize::try_from(v).ok()) {
            Some(v) => v,
            None => continue,
        };
        let first = match dict_int(&st.dict, b"/First").and_then(|v| usize::try_from(v).ok()) {
            Some(v) => v,
            None => continue,
        };
        if max_total_decoded_bytes > 0
            && decoded_total.saturating_add(max_objstm_bytes) > max_total_decoded_bytes
        {
            warn!(
                kind = "objstm_decode_budget_reached",
                decoded_total, max_total_decoded_bytes, "Object stream decode budget reached"
            );
            break;
        }
        let decoded = match decode_stream(bytes, st, max_objstm_bytes) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if max_total_decoded_bytes > 0 {
            decoded_total = decoded_total.saturating_add(decoded.data.len());
            if decoded_total > max_total_decoded_bytes {
                warn!(
                    kind = "objstm_decoded_bytes_exceeded",
                    decoded_total, max_total_decoded_bytes, "Object stream decoded bytes over budget"
                );
                break;
            }
        }
        if decoded.data.len() <= first {
            continue;
        }
        let data = decoded.data;
        let tokens = parse_header_tokens(&data[..first], n * 2);
        if tokens.len() < n * 2 {
            continue;
        }
        for idx in 0..n {
            if max_objects_total > 0 && objects.len() + out.len() >= max_objects_total {
                warn!(
                    kind = "max_objects_total_reached",
                    max_objects_total, "Object stream expansion halted by object budget"
                );
                break;
            }
            let obj_num = tokens[idx * 2] as u32;
            if obj_num == entry.obj {
                warn!(
                    kind = "objstm_recursive_reference",
                    obj = obj_num,
                    "Object stream entry claims its own container's number"
                );
                continue;
            }
            let offset = tokens[idx * 2 + 1] as usize;
            let obj_start = first.saturating_add(offset);
            if obj_start >= data.len() {
                continue;
            }
            let mut parser = Parser::new(&data, obj_start);
            let parsed = match parser.parse_object() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if matches!(parsed.atom, PdfAtom::Stream(_)) {
                warn!(
                    kind = "objstm_nested_stream",
                    obj = obj_num,
                    container = entry.obj,
                    "Stream object inside an object stream dropped"
                );
                continue;
            }
            out.push(ObjEntry { obj: obj_num, gen: 0, body: own_obj(parsed) });
        }
    }
    ObjStmExpansion { objects: out }
}

fn dict_int(dict: &PdfDict<'_>, key: &[u8]) -> Option<u64> {
    let (_, obj) = dict.get_first(key)?;
    match &obj.atom {
        PdfAtom::Int(i) if *i >= 0 => Some(*i as u64),
        _ => None,
    }
}

fn parse_header_tokens(bytes: &[u8], max: usize) -> Vec<u64> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() && out.len() < max {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if start == i {
            break;
        }
        if let Ok(v) = std::str::from_utf8(&bytes[start..i]) {
            if let Ok(num) = v.parse::<u64>() {
                out.push(num);
            }
        }
    }
    out
}
