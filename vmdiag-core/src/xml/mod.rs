//! Owned XML element tree used for the diagnostics configuration document
//!
//! Parsing and serialization go through quick-xml; the tree itself is plain
//! data so fragments can be cloned, compared and re-namespaced without
//! touching the caller's copy.

pub mod element;
pub mod reader;
pub mod writer;

/// Deepest element nesting accepted by [`parse_document`] and [`to_xml_string`]
pub const MAX_NESTING_DEPTH: usize = 256;

pub use element::*;
pub use reader::parse_document;
pub use writer::to_xml_string;
