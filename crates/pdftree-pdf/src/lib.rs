pub mod decode;
pub mod document;
pub mod lexer;
pub mod objstm;
pub mod object;
pub mod parser;
pub mod span;
pub mod stream;
pub mod xref;

pub use crate::document::{Document, ObjEntry, ParseOptions};
pub use crate::stream::StreamReader;
