pub mod closure;
pub mod fmt;
pub mod indirects;
pub mod page_tree;
pub mod render;
pub mod report;

pub use crate::closure::resolve_and_print_indirects;
pub use crate::indirects::IndirectSet;
pub use crate::page_tree::{build_page_tree, PageRef, PageTree};
pub use crate::render::{render, type_label};
pub use crate::report::{print_pages, print_report, print_summary};
