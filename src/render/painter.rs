//! Marker painting
//!
//! Wraps resolved fragments in marker elements tagged with their group id,
//! toggles state classes on existing markers and unwraps them again. Two
//! explicit phases:
//! - `Create`: structural wrap of every fragment
//! - `Update`: class toggle on the markers already registered for a group

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use crate::anchor::{AnchorResolver, Locator, StructuralPath};
use crate::config::MarkerConfig;
use crate::dom::{char_len, is_marker, Document, NodeId, Surface};

use super::fragment::{fragments_for_offsets, fragments_for_source, Fragment};

/// Pointer event reported for a marker click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    /// The node the pointer landed on
    pub target: NodeId,
    pub x: f64,
    pub y: f64,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn at(target: NodeId, x: f64, y: f64) -> Self {
        Self { target, x, y }
    }
}

/// Receives `(marker element, event)` for every marker click
pub type ClickHandler = Arc<dyn Fn(NodeId, &ClickEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    Create,
    Update,
}

/// Which state classes a group's markers carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkState {
    pub stroke: bool,
    pub comment: bool,
    pub self_stroke: bool,
    pub highlighted: bool,
}

impl MarkState {
    fn classes(&self) -> [(&'static str, bool); 4] {
        [
            ("stroke", self.stroke),
            ("comment", self.comment),
            ("self-stroke", self.self_stroke),
            ("highlighted", self.highlighted),
        ]
    }
}

/// Everything the renderer needs to know about one group
#[derive(Debug, Clone, Copy)]
pub struct PaintTarget<'a> {
    pub id: &'a str,
    pub source: &'a [StructuralPath],
    pub anchor: Option<&'a Locator>,
    pub state: MarkState,
}

/// Outcome of one paint call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Markers created (`Create`) or updated (`Update`)
    pub markers: usize,
    /// Whether the locator had to stand in for the structural paths
    pub fallback_used: bool,
}

impl PaintReport {
    pub fn is_empty(&self) -> bool {
        self.markers == 0
    }
}

/// Renders groups as inline marker elements
pub struct MarkRenderer {
    config: MarkerConfig,
    click_handler: Option<ClickHandler>,
    markers: HashMap<String, Vec<NodeId>>,
}

impl MarkRenderer {
    pub fn new(config: MarkerConfig) -> Self {
        Self {
            config,
            click_handler: None,
            markers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    pub fn set_click_handler(&mut self, handler: ClickHandler) {
        self.click_handler = Some(handler);
    }

    pub fn click_handler(&self) -> Option<&ClickHandler> {
        self.click_handler.as_ref()
    }

    // ========================================================================
    // Paint
    // ========================================================================

    /// Paint one group. `Create` on a group that already has markers
    /// behaves like `Update`.
    pub fn paint(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        target: &PaintTarget<'_>,
        mode: PaintMode,
    ) -> PaintReport {
        let has_markers = self
            .markers
            .get(target.id)
            .is_some_and(|m| !m.is_empty());
        if mode == PaintMode::Update || has_markers {
            return self.update(doc, target);
        }
        self.create(doc, root, target)
    }

    /// Paint several groups in order
    pub fn paint_all(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        targets: &[PaintTarget<'_>],
    ) -> Vec<PaintReport> {
        targets
            .iter()
            .map(|target| self.paint(doc, root, target, PaintMode::Create))
            .collect()
    }

    fn create(&mut self, doc: &mut Document, root: NodeId, target: &PaintTarget<'_>) -> PaintReport {
        let (mut fragments, fallback_used) = {
            let surface = Surface::new(doc, root, &self.config);
            let fragments = fragments_for_source(surface, target.source);
            match target.anchor {
                Some(anchor) if fragments.is_empty() => {
                    let resolver = AnchorResolver::new(surface);
                    match resolver.resolve_match(anchor) {
                        Some(found) => (
                            fragments_for_offsets(resolver.indexer(), found.start, found.end),
                            true,
                        ),
                        None => (Vec::new(), false),
                    }
                }
                _ => (fragments, false),
            }
        };

        // Splitting a leaf keeps its head in place, so later pieces of the
        // same leaf are wrapped first
        fragments.sort_by_key(|f| match f {
            Fragment::Text(slice) => (slice.node, Reverse(slice.start)),
            Fragment::Image(node) => (*node, Reverse(0)),
        });

        let mut created = Vec::new();
        for fragment in fragments {
            let wrapped = match fragment {
                Fragment::Text(slice) => self.wrap_text(doc, slice.node, slice.start, slice.end),
                Fragment::Image(element) => self.wrap_node(doc, element),
            };
            if let Some(marker) = wrapped {
                doc.set_attribute(marker, &self.config.id_attribute, target.id);
                self.apply_state(doc, marker, target.state);
                created.push(marker);
            }
        }

        if created.is_empty() {
            tracing::warn!(group_id = %target.id, "Annotation did not resolve to any content");
        } else {
            tracing::debug!(
                group_id = %target.id,
                markers = created.len(),
                fallback_used,
                "Painted annotation"
            );
        }

        let report = PaintReport {
            markers: created.len(),
            fallback_used,
        };
        if !created.is_empty() {
            self.markers.insert(target.id.to_string(), created);
        }
        report
    }

    fn update(&mut self, doc: &mut Document, target: &PaintTarget<'_>) -> PaintReport {
        let markers = self.markers.get(target.id).cloned().unwrap_or_default();
        for marker in &markers {
            self.apply_state(doc, *marker, target.state);
        }
        tracing::debug!(group_id = %target.id, markers = markers.len(), "Updated annotation state");
        PaintReport {
            markers: markers.len(),
            fallback_used: false,
        }
    }

    fn apply_state(&self, doc: &mut Document, marker: NodeId, state: MarkState) {
        doc.add_class(marker, &self.config.item_class());
        for (name, on) in state.classes() {
            let class = self.config.state_class(name);
            if on {
                doc.add_class(marker, &class);
            } else {
                doc.remove_class(marker, &class);
            }
        }
    }

    // ========================================================================
    // Wrap / unwrap
    // ========================================================================

    fn wrap_text(&self, doc: &mut Document, node: NodeId, start: usize, end: usize) -> Option<NodeId> {
        let len = char_len(doc.text(node)?);
        let end = end.min(len);
        if start >= end {
            return None;
        }
        if end < len {
            doc.split_text(node, end)?;
        }
        let piece = if start > 0 {
            doc.split_text(node, start)?
        } else {
            node
        };
        self.wrap_node(doc, piece)
    }

    fn wrap_node(&self, doc: &mut Document, node: NodeId) -> Option<NodeId> {
        let parent = doc.parent(node)?;
        let marker = doc.create_element(&self.config.marker_tag);
        doc.insert_before(parent, marker, Some(node));
        doc.append_child(marker, node);
        Some(marker)
    }

    /// Splice a marker's children back into its parent and drop it
    pub fn unwrap(&mut self, doc: &mut Document, marker: NodeId) {
        let Some(parent) = doc.parent(marker) else {
            return;
        };
        for child in doc.children(marker).to_vec() {
            doc.insert_before(parent, child, Some(marker));
        }
        if let Some(id) = doc.attribute(marker, &self.config.id_attribute) {
            if let Some(markers) = self.markers.get_mut(id) {
                markers.retain(|m| *m != marker);
                if markers.is_empty() {
                    self.markers.remove(id);
                }
            }
        }

        doc.remove(marker);
        doc.normalize(parent);
    }

    /// Unwrap every marker of a group, returning how many were removed
    pub fn unwrap_group(&mut self, doc: &mut Document, group_id: &str) -> usize {
        let markers = self.markers.remove(group_id).unwrap_or_default();
        for marker in markers.iter().rev() {
            self.unwrap(doc, *marker);
        }
        if !markers.is_empty() {
            tracing::debug!(group_id = %group_id, markers = markers.len(), "Unwrapped annotation");
        }
        markers.len()
    }

    /// Unwrap every registered marker
    pub fn clear(&mut self, doc: &mut Document) {
        let ids: Vec<String> = self.markers.keys().cloned().collect();
        for id in ids {
            self.unwrap_group(doc, &id);
        }
    }

    // ========================================================================
    // Lookup and click routing
    // ========================================================================

    pub fn markers_for(&self, group_id: &str) -> &[NodeId] {
        self.markers.get(group_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Innermost marker containing `node` (inclusive)
    pub fn marker_at(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if is_marker(doc, id, &self.config) {
                return Some(id);
            }
            current = doc.parent(id);
        }
        None
    }

    /// Group id carried by a marker
    pub fn group_of(&self, doc: &Document, marker: NodeId) -> Option<String> {
        doc.attribute(marker, &self.config.id_attribute)
            .map(str::to_string)
    }

    /// Route a click to the installed handler. Returns the marker hit.
    pub fn dispatch_click(&self, doc: &Document, event: &ClickEvent) -> Option<NodeId> {
        let marker = self.marker_at(doc, event.target)?;
        if let Some(handler) = &self.click_handler {
            handler(marker, event);
        }
        Some(marker)
    }
}
