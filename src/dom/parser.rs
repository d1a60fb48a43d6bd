//! XHTML parsing into a `Document`
//!
//! Markup is parsed with roxmltree and copied into the arena. `parse_xhtml`
//! sanitizes during the copy: `script` and `style` elements, inline event
//! handlers and `javascript:` URLs are left out. Content documents are
//! expected to be well-formed XHTML.

use thiserror::Error;

use super::tree::{Document, NodeId};

/// Errors while turning markup into a tree
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parse failed: {0}")]
    Xml(String),
}

/// Named entities that are common in XHTML content but undefined in XML
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", "&#160;"),
    ("&mdash;", "&#8212;"),
    ("&ndash;", "&#8211;"),
    ("&hellip;", "&#8230;"),
    ("&lsquo;", "&#8216;"),
    ("&rsquo;", "&#8217;"),
    ("&ldquo;", "&#8220;"),
    ("&rdquo;", "&#8221;"),
    ("&copy;", "&#169;"),
];

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Elements dropped with their content when sanitizing
const STRIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Attributes that may carry a URL
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Sanitize and parse an XHTML document
pub fn parse_xhtml(markup: &str) -> Result<Document, ParseError> {
    parse(markup, true)
}

/// Parse well-formed markup without sanitizing it
pub fn parse_xml(markup: &str) -> Result<Document, ParseError> {
    parse(markup, false)
}

fn parse(markup: &str, sanitize: bool) -> Result<Document, ParseError> {
    let mut source = markup.to_string();
    for (entity, replacement) in HTML_ENTITIES {
        if source.contains(entity) {
            source = source.replace(entity, replacement);
        }
    }

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let xml = roxmltree::Document::parse_with_options(&source, options)
        .map_err(|e| ParseError::Xml(e.to_string()))?;

    let mut doc = Document::new();
    let root = doc.root();
    copy_node(&mut doc, root, xml.root_element(), sanitize);
    Ok(doc)
}

fn copy_node(doc: &mut Document, parent: NodeId, node: roxmltree::Node, sanitize: bool) {
    if node.is_element() {
        let tag = node.tag_name();
        if sanitize && STRIPPED_ELEMENTS.contains(&tag.name().to_ascii_lowercase().as_str()) {
            return;
        }

        let id = doc.create_element(tag.name());
        if let Some(prefix) = tag.namespace().and_then(|uri| element_prefix(node, uri)) {
            doc.set_prefix(id, prefix);
        }
        for (prefix, uri) in declared_namespaces(node) {
            match prefix {
                Some(prefix) => doc.set_attribute(id, &format!("xmlns:{}", prefix), uri),
                None => doc.set_attribute(id, "xmlns", uri),
            }
        }
        for attr in node.attributes() {
            if sanitize && is_unsafe_attribute(&attr) {
                continue;
            }
            match attr.namespace().and_then(|uri| attribute_prefix(node, uri)) {
                Some(prefix) => {
                    doc.set_attribute(id, &format!("{}:{}", prefix, attr.name()), attr.value())
                }
                None => doc.set_attribute(id, attr.name(), attr.value()),
            }
        }

        doc.append_child(parent, id);
        for child in node.children() {
            copy_node(doc, id, child, sanitize);
        }
    } else if node.is_text() {
        let id = doc.create_text(node.text().unwrap_or_default());
        doc.append_child(parent, id);
    }
}

fn is_unsafe_attribute(attr: &roxmltree::Attribute) -> bool {
    let name = attr.name().to_ascii_lowercase();
    if attr.namespace().is_none() && name.starts_with("on") {
        return true;
    }
    URL_ATTRIBUTES.contains(&name.as_str())
        && attr.value().trim().to_lowercase().starts_with("javascript:")
}

/// Namespace bindings that `node` introduces (in scope here but not on the
/// parent element)
fn declared_namespaces<'a>(node: roxmltree::Node<'a, '_>) -> Vec<(Option<&'a str>, &'a str)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .map(|ns| (ns.name(), ns.uri()))
        .filter(|(name, _)| *name != Some("xml"))
        .filter(|binding| !inherited.contains(binding))
        .collect()
}

/// Prefix an element needs for `uri`; `None` when it is the default namespace
fn element_prefix<'a>(node: roxmltree::Node<'a, '_>, uri: &str) -> Option<&'a str> {
    let is_default = node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri);
    if is_default {
        return None;
    }
    attribute_prefix(node, uri)
}

/// Prefix bound to `uri`. Unprefixed attributes have no namespace, so any
/// namespaced attribute needs one.
fn attribute_prefix<'a>(node: roxmltree::Node<'a, '_>, uri: &str) -> Option<&'a str> {
    if uri == XML_NAMESPACE {
        return Some("xml");
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name())
}

/// The `body` element if present, otherwise the document root
pub fn find_body(doc: &Document) -> NodeId {
    doc.descendants(doc.root())
        .find(|n| doc.tag(*n) == Some("body"))
        .unwrap_or_else(|| doc.root())
}
