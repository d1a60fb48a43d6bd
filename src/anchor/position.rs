//! Position indexing
//!
//! Converts between boundary points in the tree and absolute char offsets
//! within a container's concatenated text. Content under excluded tags
//! occupies no offset space in either direction.

use std::collections::HashMap;

use crate::dom::{byte_offset, char_len, DocumentOrder, NodeId, Point, Surface, TextRange};

/// A char range inside a single text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSlice {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

impl TextSlice {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy)]
struct Leaf {
    node: NodeId,
    order: usize,
    start: usize,
    len: usize,
}

/// Offset index over the text leaves of one container
pub struct PositionIndexer<'a> {
    surface: Surface<'a>,
    order: DocumentOrder,
    leaves: Vec<Leaf>,
    leaf_index: HashMap<NodeId, usize>,
    images: Vec<(NodeId, usize)>,
    breaks: Vec<usize>,
    text: String,
}

impl<'a> PositionIndexer<'a> {
    pub fn new(surface: Surface<'a>) -> Self {
        let order = surface.doc.order(surface.root);
        let mut indexer = Self {
            surface,
            order,
            leaves: Vec::new(),
            leaf_index: HashMap::new(),
            images: Vec::new(),
            breaks: Vec::new(),
            text: String::new(),
        };
        indexer.collect(surface.root);
        indexer
    }

    fn collect(&mut self, id: NodeId) {
        let doc = self.surface.doc;
        for child in doc.children(id) {
            let child = *child;
            let Some(order) = self.order.position(child) else {
                continue;
            };
            if let Some(text) = doc.text(child) {
                let start = self.total_len();
                self.leaf_index.insert(child, self.leaves.len());
                self.leaves.push(Leaf {
                    node: child,
                    order,
                    start,
                    len: char_len(text),
                });
                self.text.push_str(text);
                continue;
            }
            let tag = doc.tag(child).unwrap_or_default();
            if self.surface.config.is_excluded(tag) {
                continue;
            }
            match tag {
                "img" => self.images.push((child, order)),
                "br" => self.breaks.push(order),
                _ => {}
            }
            self.collect(child);
        }
    }

    pub fn container(&self) -> NodeId {
        self.surface.root
    }

    /// Concatenated text of all included leaves
    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn total_len(&self) -> usize {
        self.leaves.last().map(|l| l.start + l.len).unwrap_or(0)
    }

    /// Included text leaves in document order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.leaves.iter().map(|l| l.node).collect()
    }

    /// Pre-order position of a node inside the container
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.position(node)
    }

    /// Offset of a boundary point, `None` if the point is outside the container
    pub fn point_to_offset(&self, node: NodeId, offset: usize) -> Option<usize> {
        let position = self.order.position(node)?;
        if let Some(leaf) = self.leaf_index.get(&node).map(|i| self.leaves[*i]) {
            return Some(leaf.start + offset.min(leaf.len));
        }
        if self.surface.doc.is_text(node) {
            // Text inside an excluded region collapses onto the region start
            return Some(self.offset_before(position));
        }
        let boundary = match self.surface.doc.children(node).get(offset) {
            Some(child) => self.order.position(*child)?,
            None => self.order.subtree_end(node)? + 1,
        };
        Some(self.offset_before(boundary))
    }

    /// Point for an absolute offset, preferring the end of a leaf over the
    /// start of the next one. `None` past the end of the text.
    pub fn offset_to_point(&self, offset: usize) -> Option<Point> {
        if offset > self.total_len() {
            return None;
        }
        match self.leaves.iter().find(|l| offset <= l.start + l.len) {
            Some(leaf) => Some(Point::new(leaf.node, offset - leaf.start)),
            None => Some(Point::new(self.surface.root, 0)),
        }
    }

    /// Like `offset_to_point`, but prefers the start of the next leaf.
    /// Used for range starts so that no empty leading slice is produced.
    pub fn offset_to_start_point(&self, offset: usize) -> Option<Point> {
        match self.leaves.iter().find(|l| offset < l.start + l.len) {
            Some(leaf) => Some(Point::new(leaf.node, offset - leaf.start)),
            None => self.offset_to_point(offset),
        }
    }

    fn offset_before(&self, position: usize) -> usize {
        let idx = self.leaves.partition_point(|l| l.order < position);
        if idx == 0 {
            0
        } else {
            let leaf = self.leaves[idx - 1];
            leaf.start + leaf.len
        }
    }

    /// Ordered offsets of a range, `None` if either end lies outside
    pub fn range_offsets(&self, range: &TextRange) -> Option<(usize, usize)> {
        let a = self.point_to_offset(range.start.node, range.start.offset)?;
        let b = self.point_to_offset(range.end.node, range.end.offset)?;
        Some((a.min(b), a.max(b)))
    }

    /// Per-leaf pieces covering `start..end`
    pub fn slices(&self, start: usize, end: usize) -> Vec<TextSlice> {
        self.leaves
            .iter()
            .filter_map(|leaf| {
                let s = start.max(leaf.start);
                let e = end.min(leaf.start + leaf.len);
                (s < e).then(|| TextSlice {
                    node: leaf.node,
                    start: s - leaf.start,
                    end: e - leaf.start,
                })
            })
            .collect()
    }

    /// Text between two absolute offsets
    pub fn text_between(&self, start: usize, end: usize) -> String {
        let from = byte_offset(&self.text, start);
        let to = byte_offset(&self.text, end.max(start));
        self.text[from..to].to_string()
    }

    /// Flattened text of a range
    pub fn range_text(&self, range: &TextRange) -> Option<String> {
        let (start, end) = self.range_offsets(range)?;
        Some(self.text_between(start, end))
    }

    /// Text of a range with a line break wherever it crosses into another
    /// block element or over a `<br>`
    pub fn display_text(&self, range: &TextRange) -> Option<String> {
        let (start, end) = self.range_offsets(range)?;
        let doc = self.surface.doc;
        let mut out = String::new();
        let mut previous: Option<(NodeId, usize)> = None;
        for slice in self.slices(start, end) {
            let block = self.surface.block_of(slice.node);
            let order = self.order.position(slice.node).unwrap_or_default();
            if let Some((previous_block, previous_order)) = previous {
                let crosses_break = self
                    .breaks
                    .iter()
                    .any(|b| *b > previous_order && *b < order);
                if previous_block != block || crosses_break {
                    out.push('\n');
                }
            }
            previous = Some((block, order));
            let text = doc.text(slice.node).unwrap_or_default();
            let from = byte_offset(text, slice.start);
            let to = byte_offset(text, slice.end);
            out.push_str(&text[from..to]);
        }
        Some(out)
    }

    /// Image elements fully covered by a range
    pub fn images_in(&self, range: &TextRange) -> Vec<NodeId> {
        let (Some(lo), Some(hi)) = (
            self.boundary(range.start, true),
            self.boundary(range.end, false),
        ) else {
            return Vec::new();
        };
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        self.images
            .iter()
            .filter(|(_, order)| *order >= lo && *order < hi)
            .map(|(node, _)| *node)
            .collect()
    }

    fn boundary(&self, point: Point, is_start: bool) -> Option<usize> {
        let doc = self.surface.doc;
        let position = self.order.position(point.node)?;
        if let Some(text) = doc.text(point.node) {
            let at_edge = if is_start {
                point.offset == 0
            } else {
                point.offset < char_len(text)
            };
            return Some(if at_edge { position } else { position + 1 });
        }
        match doc.children(point.node).get(point.offset) {
            Some(child) => self.order.position(*child),
            None => self.order.subtree_end(point.node).map(|e| e + 1),
        }
    }
}
