//! Document tree module
//!
//! An owned node tree standing in for the host document, plus the pieces
//! the anchoring engine needs around it:
//!
//! - `tree`: arena-backed `Document` with DOM-like mutation
//! - `parser`: sanitizing, namespace-preserving XHTML parser
//! - `serialize`: markup output
//! - `selector`: structural selectors relative to a bounded root

mod parser;
mod selector;
mod serialize;
mod tree;

pub use parser::{find_body, parse_xhtml, parse_xml, ParseError};
pub use selector::{
    differs_in_image_tail, is_marker, logical_children, logical_parent, resolve_selector,
    selector_for,
};
pub use serialize::{inner_markup, to_markup};
pub use tree::{byte_offset, char_len, Document, DocumentOrder, ElementData, NodeId, NodeKind};

use crate::config::MarkerConfig;

/// Elements that start a new line when a selection is re-serialized
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

pub fn is_block(doc: &Document, id: NodeId) -> bool {
    doc.tag(id).map(|t| BLOCK_TAGS.contains(&t)).unwrap_or(false)
}

/// A boundary point. On a text node `offset` counts chars; on an element
/// it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub node: NodeId,
    pub offset: usize,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection between two boundary points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Point,
    pub end: Point,
}

impl TextRange {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// A read-only view of one annotation surface: a document, the bounded
/// root every offset and selector is relative to, and the marker config.
#[derive(Clone, Copy)]
pub struct Surface<'a> {
    pub doc: &'a Document,
    pub root: NodeId,
    pub config: &'a MarkerConfig,
}

impl<'a> Surface<'a> {
    pub fn new(doc: &'a Document, root: NodeId, config: &'a MarkerConfig) -> Self {
        Self { doc, root, config }
    }

    /// The same surface bounded by another container
    pub fn within(self, root: NodeId) -> Self {
        Self { root, ..self }
    }

    pub fn selector_for(&self, element: NodeId) -> Option<String> {
        selector_for(self.doc, self.root, element, self.config)
    }

    pub fn resolve_selector(&self, selector: &str) -> Option<NodeId> {
        resolve_selector(self.doc, self.root, selector, self.config)
    }

    /// Nearest block-level, non-marker ancestor of `node` inside the root
    /// (the root itself when there is none)
    pub fn block_of(&self, node: NodeId) -> NodeId {
        let mut current = self.doc.parent(node);
        while let Some(id) = current {
            if id == self.root {
                return id;
            }
            if is_block(self.doc, id) && !is_marker(self.doc, id, self.config) {
                return id;
            }
            current = self.doc.parent(id);
        }
        self.root
    }
}
