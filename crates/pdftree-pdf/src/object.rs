use std::borrow::Cow;

use crate::span::Span;

/// A PDF string value. `raw` keeps the source text including the surrounding
/// delimiters; `decoded` holds the bytes after escape/hex processing.
#[derive(Debug, Clone)]
pub enum PdfStr<'a> {
    Literal { span: Span, raw: Cow<'a, [u8]>, decoded: Vec<u8> },
    Hex { span: Span, raw: Cow<'a, [u8]>, decoded: Vec<u8> },
}

impl<'a> PdfStr<'a> {
    pub fn raw(&self) -> &[u8] {
        match self {
            PdfStr::Literal { raw, .. } => raw,
            PdfStr::Hex { raw, .. } => raw,
        }
    }

    pub fn decoded(&self) -> &[u8] {
        match self {
            PdfStr::Literal { decoded, .. } => decoded,
            PdfStr::Hex { decoded, .. } => decoded,
        }
    }
}

/// A name token. `decoded` includes the leading `/` and has `#xx` escapes
/// resolved, so dictionary lookups can match on the canonical form.
#[derive(Debug, Clone)]
pub struct PdfName<'a> {
    pub span: Span,
    pub raw: Cow<'a, [u8]>,
    pub decoded: Vec<u8>,
}

impl<'a> PdfName<'a> {
    /// The name without its leading slash, as a reader would write it.
    pub fn text(&self) -> &[u8] {
        self.decoded.strip_prefix(b"/").unwrap_or(&self.decoded)
    }
}

/// A bare keyword token the grammar does not recognise (anything that is not
/// `true`, `false` or `null`). Kept so a damaged document still produces a
/// node for every token instead of aborting the surrounding object.
#[derive(Debug, Clone)]
pub struct PdfSymbol<'a> {
    pub span: Span,
    pub raw: Cow<'a, [u8]>,
}

/// Insertion-ordered dictionary. PDF dictionaries have no key order of their
/// own, so iteration follows the order keys appeared in the source.
#[derive(Debug, Clone)]
pub struct PdfDict<'a> {
    pub span: Span,
    pub entries: Vec<(PdfName<'a>, PdfObj<'a>)>,
}

#[derive(Debug, Clone)]
pub struct PdfStream<'a> {
    pub dict: PdfDict<'a>,
    pub data_span: Span,
}

#[derive(Debug, Clone)]
pub enum PdfAtom<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Name(PdfName<'a>),
    Str(PdfStr<'a>),
    Array(Vec<PdfObj<'a>>),
    Dict(PdfDict<'a>),
    Stream(PdfStream<'a>),
    Ref { obj: u32, gen: u16 },
    Symbol(PdfSymbol<'a>),
}

#[derive(Debug, Clone)]
pub struct PdfObj<'a> {
    pub span: Span,
    pub atom: PdfAtom<'a>,
}

impl<'a> PdfDict<'a> {
    pub fn get_first(&self, name: &[u8]) -> Option<(&PdfName<'a>, &PdfObj<'a>)> {
        self.entries
            .iter()
            .find(|(k, _)| k.decoded.eq_ignore_ascii_case(name))
            .map(|(k, v)| (k, v))
    }

    pub fn has_name(&self, key: &[u8], value: &[u8]) -> bool {
        self.entries.iter().any(|(k, v)| {
            k.decoded.eq_ignore_ascii_case(key)
                && match &v.atom {
                    PdfAtom::Name(n) => n.decoded.eq_ignore_ascii_case(value),
                    _ => false,
                }
        })
    }

    pub fn int_value(&self, key: &[u8]) -> Option<i64> {
        let (_, obj) = self.get_first(key)?;
        match &obj.atom {
            PdfAtom::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Reparents a parsed object onto owned buffers so it can outlive the bytes
/// it was parsed from. Used for objects recovered from object streams, whose
/// backing store is a transient decode buffer.
pub fn own_obj(obj: PdfObj<'_>) -> PdfObj<'static> {
    fn own_name(name: PdfName<'_>) -> PdfName<'static> {
        PdfName {
            span: name.span,
            raw: Cow::Owned(name.raw.into_owned()),
            decoded: name.decoded,
        }
    }

    fn own_str(s: PdfStr<'_>) -> PdfStr<'static> {
        match s {
            PdfStr::Literal { span, raw, decoded } => {
                PdfStr::Literal { span, raw: Cow::Owned(raw.into_owned()), decoded }
            }
            PdfStr::Hex { span, raw, decoded } => {
                PdfStr::Hex { span, raw: Cow::Owned(raw.into_owned()), decoded }
            }
        }
    }

    fn own_dict(dict: PdfDict<'_>) -> PdfDict<'static> {
        let entries = dict.entries.into_iter().map(|(k, v)| (own_name(k), own_obj(v))).collect();
        PdfDict { span: dict.span, entries }
    }

    let atom = match obj.atom {
        PdfAtom::Null => PdfAtom::Null,
        PdfAtom::Bool(v) => PdfAtom::Bool(v),
        PdfAtom::Int(v) => PdfAtom::Int(v),
        PdfAtom::Real(v) => PdfAtom::Real(v),
        PdfAtom::Ref { obj, gen } => PdfAtom::Ref { obj, gen },
        PdfAtom::Name(name) => PdfAtom::Name(own_name(name)),
        PdfAtom::Str(s) => PdfAtom::Str(own_str(s)),
        PdfAtom::Array(arr) => PdfAtom::Array(arr.into_iter().map(own_obj).collect()),
        PdfAtom::Dict(d) => PdfAtom::Dict(own_dict(d)),
        PdfAtom::Stream(st) => {
            PdfAtom::Stream(PdfStream { dict: own_dict(st.dict), data_span: st.data_span })
        }
        PdfAtom::Symbol(sym) => PdfAtom::Symbol(PdfSymbol {
            span: sym.span,
            raw: Cow::Owned(sym.raw.into_owned()),
        }),
    };
    PdfObj { span: obj.span, atom }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(decoded: &[u8]) -> PdfName<'static> {
        PdfName {
            span: Span { start: 0, end: 0 },
            raw: Cow::Owned(decoded.to_vec()),
            decoded: decoded.to_vec(),
        }
    }

    #[test]
    fn get_first_matches_case_insensitively_and_in_order() {
        let dict = PdfDict {
            span: Span { start: 0, end: 0 },
            entries: vec![
                (
                    name(b"/Type"),
                    PdfObj { span: Span { start: 0, end: 0 }, atom: PdfAtom::Int(1) },
                ),
                (
                    name(b"/type"),
                    PdfObj { span: Span { start: 0, end: 0 }, atom: PdfAtom::Int(2) },
                ),
            ],
        };
        let (_, v) = dict.get_first(b"/TYPE").expect("present");
        assert!(matches!(v.atom, PdfAtom::Int(1)));
    }

    #[test]
    fn name_text_strips_leading_slash() {
        assert_eq!(name(b"/Pages").text(), b"Pages");
    }
}
