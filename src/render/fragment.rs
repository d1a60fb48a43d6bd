//! Fragment decomposition
//!
//! A wrap cannot straddle element boundaries, so every structural path or
//! resolved range is first broken into per-leaf text slices and image
//! elements.

use crate::anchor::{PositionIndexer, StructuralPath, TextSlice};
use crate::dom::{NodeId, Surface};

/// One wrappable piece of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Text(TextSlice),
    Image(NodeId),
}

impl Fragment {
    pub fn node(&self) -> NodeId {
        match self {
            Fragment::Text(slice) => slice.node,
            Fragment::Image(node) => *node,
        }
    }
}

/// Fragments for a single structural path. Empty when the selector no
/// longer resolves or the offsets fall outside the element's text.
pub fn fragments_for_path(surface: Surface<'_>, path: &StructuralPath) -> Vec<Fragment> {
    let Some(element) = surface.resolve_selector(path.path()) else {
        tracing::debug!(path = path.path(), "Selector did not resolve");
        return Vec::new();
    };

    match path {
        StructuralPath::Image { .. } => {
            if surface.doc.tag(element) == Some("img") {
                vec![Fragment::Image(element)]
            } else {
                Vec::new()
            }
        }
        StructuralPath::Text { start, end, .. } => {
            let indexer = PositionIndexer::new(surface.within(element));
            let end = (*end).min(indexer.total_len());
            if *start >= end {
                return Vec::new();
            }
            indexer
                .slices(*start, end)
                .into_iter()
                .map(Fragment::Text)
                .collect()
        }
    }
}

/// Fragments for every path of a source, deduplicated
pub fn fragments_for_source(surface: Surface<'_>, source: &[StructuralPath]) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = Vec::new();
    for fragment in source.iter().flat_map(|p| fragments_for_path(surface, p)) {
        if !out.contains(&fragment) {
            out.push(fragment);
        }
    }
    out
}

/// Fragments covering absolute offsets `start..end` of a container
pub fn fragments_for_offsets(indexer: &PositionIndexer<'_>, start: usize, end: usize) -> Vec<Fragment> {
    indexer
        .slices(start, end)
        .into_iter()
        .map(Fragment::Text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerConfig;
    use crate::dom::parse_xml;

    #[test]
    fn test_path_spanning_three_leaves() {
        let doc = parse_xml("<body><p>abc<b>def</b>ghi</p></body>").unwrap();
        let config = MarkerConfig::default();
        let body = doc.children(doc.root())[0];
        let surface = Surface::new(&doc, body, &config);
        let path = StructuralPath::Text {
            path: "p:nth-of-type(1)".to_string(),
            start: 1,
            end: 8,
        };

        let fragments = fragments_for_path(surface, &path);
        let lens: Vec<usize> = fragments
            .iter()
            .map(|f| match f {
                Fragment::Text(slice) => slice.len(),
                Fragment::Image(_) => 0,
            })
            .collect();
        assert_eq!(lens, vec![2, 3, 2]);
    }

    #[test]
    fn test_offsets_are_clamped() {
        let doc = parse_xml("<body><p>abc</p></body>").unwrap();
        let config = MarkerConfig::default();
        let body = doc.children(doc.root())[0];
        let surface = Surface::new(&doc, body, &config);

        let clamped = StructuralPath::Text {
            path: "p:nth-of-type(1)".to_string(),
            start: 1,
            end: 40,
        };
        assert_eq!(fragments_for_path(surface, &clamped).len(), 1);

        let outside = StructuralPath::Text {
            path: "p:nth-of-type(1)".to_string(),
            start: 5,
            end: 9,
        };
        assert!(fragments_for_path(surface, &outside).is_empty());
    }

    #[test]
    fn test_image_path_requires_image() {
        let doc = parse_xml("<body><p><img src=\"a.png\"/></p></body>").unwrap();
        let config = MarkerConfig::default();
        let body = doc.children(doc.root())[0];
        let surface = Surface::new(&doc, body, &config);

        let image = StructuralPath::Image {
            path: "p:nth-of-type(1) > img".to_string(),
        };
        assert_eq!(fragments_for_path(surface, &image).len(), 1);

        let not_image = StructuralPath::Image {
            path: "p:nth-of-type(1)".to_string(),
        };
        assert!(fragments_for_path(surface, &not_image).is_empty());
    }
}
