//! Structural selectors
//!
//! A selector identifies an element relative to a bounded root as a chain of
//! `seg > seg > ...` where each segment is either `#id` (unique id, which
//! also anchors the chain) or `tag:nth-of-type(n)`. A lone image among its
//! siblings is written as bare `img`.
//!
//! Marker elements are transparent: sibling indices are computed over the
//! "logical" children of a node, where markers are flattened into their
//! parent. Painting one group therefore never shifts another group's path.

use regex::Regex;
use std::sync::OnceLock;

use super::tree::{Document, NodeId};
use crate::config::MarkerConfig;

fn segment_regex() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| {
        Regex::new(r"(?i)^(?:#(?P<id>[^\s>]+)|(?P<tag>[a-z][a-z0-9\-]*)(?::nth-of-type\((?P<n>\d+)\))?)$")
            .expect("valid selector segment regex")
    })
}

/// Whether `id` is a marker element produced by the renderer
pub fn is_marker(doc: &Document, id: NodeId, config: &MarkerConfig) -> bool {
    doc.tag(id) == Some(config.marker_tag.as_str())
        && doc.attribute(id, &config.id_attribute).is_some()
}

/// Nearest ancestor that is not a marker
pub fn logical_parent(doc: &Document, id: NodeId, config: &MarkerConfig) -> Option<NodeId> {
    let mut parent = doc.parent(id)?;
    while is_marker(doc, parent, config) {
        parent = doc.parent(parent)?;
    }
    Some(parent)
}

/// Element children of `id` with marker elements flattened away
pub fn logical_children(doc: &Document, id: NodeId, config: &MarkerConfig) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_logical(doc, id, config, &mut out);
    out
}

fn collect_logical(doc: &Document, id: NodeId, config: &MarkerConfig, out: &mut Vec<NodeId>) {
    for child in doc.children(id) {
        if !doc.is_element(*child) {
            continue;
        }
        if is_marker(doc, *child, config) {
            collect_logical(doc, *child, config, out);
        } else {
            out.push(*child);
        }
    }
}

fn unique_id<'a>(doc: &'a Document, root: NodeId, element: NodeId) -> Option<&'a str> {
    let id = doc.attribute(element, "id").filter(|v| !v.is_empty())?;
    let count = doc
        .descendants(root)
        .filter(|n| doc.attribute(*n, "id") == Some(id))
        .take(2)
        .count();
    (count == 1).then_some(id)
}

/// Build a selector for `element` relative to `root`
pub fn selector_for(
    doc: &Document,
    root: NodeId,
    element: NodeId,
    config: &MarkerConfig,
) -> Option<String> {
    if !doc.is_element(element) || !doc.contains(root, element) || is_marker(doc, element, config)
    {
        return None;
    }

    let mut segments = Vec::new();
    let mut current = element;
    while current != root {
        if let Some(id) = unique_id(doc, root, current) {
            segments.push(format!("#{}", id));
            break;
        }

        let parent = logical_parent(doc, current, config)?;
        let tag = doc.tag(current)?;
        let same_tag: Vec<NodeId> = logical_children(doc, parent, config)
            .into_iter()
            .filter(|c| doc.tag(*c) == Some(tag))
            .collect();
        let n = same_tag.iter().position(|c| *c == current)? + 1;

        if tag == "img" && same_tag.len() == 1 {
            segments.push("img".to_string());
        } else {
            segments.push(format!("{}:nth-of-type({})", tag, n));
        }
        current = parent;
    }

    segments.reverse();
    Some(segments.join(" > "))
}

/// Resolve a selector produced by `selector_for` against `root`
pub fn resolve_selector(
    doc: &Document,
    root: NodeId,
    selector: &str,
    config: &MarkerConfig,
) -> Option<NodeId> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in selector.split('>').map(str::trim) {
        let caps = segment_regex().captures(segment)?;
        if let Some(id) = caps.name("id") {
            current = doc
                .descendants(root)
                .find(|n| doc.attribute(*n, "id") == Some(id.as_str()))?;
            continue;
        }

        let tag = caps.name("tag")?.as_str().to_lowercase();
        let n: usize = match caps.name("n") {
            Some(n) => n.as_str().parse().ok()?,
            None => 1,
        };
        current = logical_children(doc, current, config)
            .into_iter()
            .filter(|c| doc.tag(*c) == Some(tag.as_str()))
            .nth(n.checked_sub(1)?)?;
    }
    Some(current)
}

/// Whether two selectors differ only in a trailing image segment
/// (`img` vs `img:nth-of-type(1)`, for instance)
pub fn differs_in_image_tail(a: &str, b: &str) -> bool {
    let a: Vec<&str> = a.split('>').map(str::trim).collect();
    let b: Vec<&str> = b.split('>').map(str::trim).collect();
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    let last = a.len() - 1;
    a[..last] == b[..last] && is_image_segment(a[last]) && is_image_segment(b[last])
}

fn is_image_segment(segment: &str) -> bool {
    segment_regex()
        .captures(segment)
        .and_then(|c| c.name("tag").map(|t| t.as_str().eq_ignore_ascii_case("img")))
        .unwrap_or(false)
}
