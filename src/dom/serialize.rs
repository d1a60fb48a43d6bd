//! Markup serialization

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::tree::{Document, NodeId, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialize a node and its subtree. The synthetic document root
/// serializes as its children only.
pub fn to_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    if id == doc.root() {
        for child in doc.children(id) {
            write_node(doc, *child, &mut out);
        }
    } else {
        write_node(doc, id, &mut out);
    }
    out
}

/// Serialize only the children of a node
pub fn inner_markup(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Text(text) => out.push_str(&encode_text(text)),
        NodeKind::Element(el) => {
            let name = el.qualified_name();
            out.push('<');
            out.push_str(&name);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
            let children = doc.children(id);
            if children.is_empty() && VOID_ELEMENTS.contains(&el.tag.as_str()) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_xml;

    #[test]
    fn test_serialize_roundtrip() {
        let markup = r#"<div class="x"><p>a &amp; b<img src="i.png"/></p></div>"#;
        let doc = parse_xml(markup).unwrap();
        assert_eq!(to_markup(&doc, doc.root()), markup);
    }

    #[test]
    fn test_namespaces_roundtrip() {
        let markup = "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\
                      <body><section epub:type=\"chapter\" xml:lang=\"en\"><p>Hi</p>\
                      <svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\
                      <image xlink:href=\"c.png\"></image></svg>\
                      <epub:switch><p>x</p></epub:switch></section></body></html>";
        let doc = parse_xml(markup).unwrap();
        assert_eq!(to_markup(&doc, doc.root()), markup);
    }

    #[test]
    fn test_inner_markup() {
        let doc = parse_xml("<p>Hi <b>there</b></p>").unwrap();
        let p = doc.children(doc.root())[0];
        assert_eq!(inner_markup(&doc, p), "Hi <b>there</b>");
    }
}
