//! Arena-backed node tree
//!
//! Detaching a node only unlinks it from its parent, so its `NodeId` stays
//! valid. `remove` recycles a node's slot instead: the id may come back from
//! a later `create_*` call. Merged and emptied text nodes in `normalize` are
//! recycled this way, which keeps repeated split/merge cycles from growing
//! the arena.

use std::collections::HashMap;

/// Handle to a node inside a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element name and attributes. Namespace declarations are kept as
/// `xmlns` attributes on the element that declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub prefix: Option<String>,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    /// Tag name as written in markup (`prefix:tag` when prefixed)
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.tag),
            None => self.tag.clone(),
        }
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Pre-order positions of every node under a root
#[derive(Debug, Clone, Default)]
pub struct DocumentOrder {
    order: HashMap<NodeId, usize>,
    subtree_end: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    /// Pre-order index of `node`, `None` if it is outside the root
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.get(&node).copied()
    }

    /// Largest pre-order index inside `node`'s subtree
    pub fn subtree_end(&self, node: NodeId) -> Option<usize> {
        self.subtree_end.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.order.contains_key(&node)
    }
}

/// A mutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a synthetic `#document` root
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Element(ElementData {
                tag: "#document".to_string(),
                prefix: None,
                attributes: Vec::new(),
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_lowercase(),
            prefix: None,
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = data;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// Number of allocated node slots, recycled ones included
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Lowercase tag name of an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el.tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// All nodes under `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Concatenated text of every text node under `id`
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Pre-order numbering of `root` and its subtree
    pub fn order(&self, root: NodeId) -> DocumentOrder {
        let mut order = DocumentOrder::default();
        let mut counter = 0usize;
        self.number(root, &mut counter, &mut order);
        order
    }

    fn number(&self, id: NodeId, counter: &mut usize, order: &mut DocumentOrder) {
        order.order.insert(id, *counter);
        *counter += 1;
        for child in self.children(id) {
            self.number(*child, counter, order);
        }
        order.subtree_end.insert(id, *counter - 1);
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => el
                .attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => &el.attributes,
            NodeKind::Text(_) => &[],
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            match el.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn set_prefix(&mut self, id: NodeId, prefix: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            el.prefix = Some(prefix.to_string());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            el.attributes.retain(|(k, _)| k != name);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.classes(id).iter().map(|c| c.to_string()).collect();
        classes.push(class.to_string());
        self.set_attribute(id, "class", &classes.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let classes: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(|c| c.to_string())
            .collect();
        if classes.is_empty() {
            self.remove_attribute(id, "class");
        } else {
            self.set_attribute(id, "class", &classes.join(" "));
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let index = reference
            .and_then(|r| self.children(parent).iter().position(|c| *c == r))
            .unwrap_or(self.children(parent).len());
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Unlink a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Detach a node and recycle it together with its subtree
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let data = &mut self.nodes[node.0];
            stack.append(&mut data.children);
            data.parent = None;
            data.kind = NodeKind::Text(String::new());
            self.free.push(node);
        }
    }

    /// Split a text node at a char offset. The original node keeps the head;
    /// the returned node holds the tail and is inserted right after it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let len = text.chars().count();
        if offset > len {
            return None;
        }
        let at = byte_offset(text, offset);
        let tail = text[at..].to_string();
        let head = text[..at].to_string();

        self.nodes[id.0].kind = NodeKind::Text(head);
        let tail_id = self.create_text(&tail);
        if let Some(parent) = self.parent(id) {
            let next = self
                .index_in_parent(id)
                .and_then(|i| self.children(parent).get(i + 1).copied());
            self.insert_before(parent, tail_id, next);
        }
        Some(tail_id)
    }

    /// Merge adjacent text children of `id` and drop empty ones
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            let Some(text) = self.text(child).map(|t| t.to_string()) else {
                previous_text = None;
                continue;
            };
            if text.is_empty() {
                self.remove(child);
                continue;
            }
            match previous_text {
                Some(prev) => {
                    if let NodeKind::Text(existing) = &mut self.nodes[prev.0].kind {
                        existing.push_str(&text);
                    }
                    self.remove(child);
                }
                None => previous_text = Some(child),
            }
        }
    }
}

/// Document-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Number of chars in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `offset`-th char (clamped to the end)
pub fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
