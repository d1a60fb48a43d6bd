//! Mark injection into content documents
//!
//! One-shot server-side rendering: fold stored records into groups, paint
//! every group into the document body and serialize the result.

use thiserror::Error;

use crate::config::MarkerConfig;
use crate::dom::{find_body, parse_xhtml, to_markup, ParseError, Surface};
use crate::marks::{fold_records, MarkRecord};
use crate::render::MarkRenderer;

/// Errors raised while injecting marks
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result of mark injection
#[derive(Debug)]
pub struct InjectionResult {
    /// The processed markup with marker elements
    pub html: String,
    /// Number of groups that painted at least one marker
    pub painted: usize,
    /// Groups that resolved to nothing in this document
    pub orphaned: Vec<String>,
    /// Records skipped as unusable or malformed
    pub dropped: usize,
}

/// Render stored marks into a content document.
///
/// State classes are computed for `user_id` (`self-stroke`); nothing is
/// highlighted.
pub fn inject_marks(
    html: &str,
    records: &[MarkRecord],
    user_id: &str,
    config: &MarkerConfig,
) -> Result<InjectionResult, InjectError> {
    if records.is_empty() {
        return Ok(InjectionResult {
            html: html.to_string(),
            painted: 0,
            orphaned: vec![],
            dropped: 0,
        });
    }

    let mut doc = parse_xhtml(html)?;
    let body = find_body(&doc);
    let outcome = fold_records(records, Some(Surface::new(&doc, body, config)));

    let mut renderer = MarkRenderer::new(config.clone());
    let targets: Vec<_> = outcome
        .groups
        .iter()
        .map(|g| g.paint_target(g.state(user_id, false)))
        .collect();
    let reports = renderer.paint_all(&mut doc, body, &targets);

    let mut painted = 0;
    let mut orphaned = Vec::new();
    for (group, report) in outcome.groups.iter().zip(&reports) {
        if report.is_empty() {
            orphaned.push(group.id.clone());
        } else {
            painted += 1;
        }
    }

    tracing::debug!(
        groups = outcome.groups.len(),
        painted,
        orphaned = orphaned.len(),
        dropped = outcome.dropped,
        "Injected marks"
    );

    Ok(InjectionResult {
        html: to_markup(&doc, doc.root()),
        painted,
        orphaned,
        dropped: outcome.dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Locator, StructuralPath};
    use crate::marks::{MarkSource, MarkType};
    use chrono::Utc;

    const CHAPTER: &str = "<html><head><title>Ch</title></head><body><p>Hello world</p>\
                           <script>alert(1)</script><p>Second line</p></body></html>";

    fn line(id: i64, user_id: &str, path: &str, start: usize, end: usize) -> MarkRecord {
        MarkRecord {
            id,
            user_id: user_id.to_string(),
            mark_type: MarkType::Line,
            source: MarkSource::Paths(vec![StructuralPath::Text {
                path: path.to_string(),
                start,
                end,
            }]),
            approx_source: None,
            parent_id: None,
            root_id: None,
            comment: String::new(),
            created_at: Utc::now(),
            is_deleted: false,
            username: String::new(),
            avatar: String::new(),
        }
    }

    #[test]
    fn test_empty_records_passthrough() {
        let result = inject_marks(CHAPTER, &[], "u1", &MarkerConfig::default()).unwrap();
        assert_eq!(result.html, CHAPTER);
        assert_eq!(result.painted, 0);
    }

    #[test]
    fn test_inject_single_stroke() {
        let records = vec![line(7, "u1", "p:nth-of-type(1)", 6, 11)];
        let result = inject_marks(CHAPTER, &records, "u1", &MarkerConfig::default()).unwrap();

        assert_eq!(result.painted, 1);
        assert!(result.orphaned.is_empty());
        assert!(result.html.contains(
            "<p>Hello <mark data-mark-id=\"7\" class=\"mark-item mark-stroke mark-self-stroke\">world</mark></p>"
        ));
        assert!(!result.html.contains("<script"));
    }

    #[test]
    fn test_other_users_stroke_is_not_self() {
        let records = vec![line(7, "u2", "p:nth-of-type(2)", 0, 6)];
        let result = inject_marks(CHAPTER, &records, "u1", &MarkerConfig::default()).unwrap();

        assert!(result.html.contains("class=\"mark-item mark-stroke\">Second</mark>"));
    }

    #[test]
    fn test_unresolved_group_is_orphaned() {
        let mut stale = line(9, "u1", "section:nth-of-type(4)", 0, 3);
        stale.approx_source = Some(Locator {
            exact: "zzqqzzq".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            position_start: 0,
            position_end: 7,
            raw_text: None,
        });
        let records = vec![stale, line(7, "u1", "p:nth-of-type(1)", 0, 5)];
        let result = inject_marks(CHAPTER, &records, "u1", &MarkerConfig::default()).unwrap();

        assert_eq!(result.painted, 1);
        assert_eq!(result.orphaned, vec!["9".to_string()]);
    }

    #[test]
    fn test_locator_fallback_paints() {
        let mut legacy = line(3, "u1", "", 0, 0);
        legacy.mark_type = MarkType::OriginLine;
        legacy.source = MarkSource::Legacy(42);
        legacy.approx_source = Some(Locator {
            exact: "Second".to_string(),
            prefix: "world".to_string(),
            suffix: " line".to_string(),
            position_start: 11,
            position_end: 17,
            raw_text: None,
        });
        let result = inject_marks(CHAPTER, &[legacy], "u1", &MarkerConfig::default()).unwrap();

        assert_eq!(result.painted, 1);
        assert!(result.html.contains(">Second</mark> line</p>"));
    }

    #[test]
    fn test_namespaced_markup_survives() {
        let chapter = "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\
                       <body><p epub:type=\"footnote\" xml:lang=\"en\">Hi there</p></body></html>";
        let records = vec![line(7, "u1", "p:nth-of-type(1)", 0, 2)];
        let result = inject_marks(chapter, &records, "u1", &MarkerConfig::default()).unwrap();

        assert_eq!(
            result.html,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\
             <body><p epub:type=\"footnote\" xml:lang=\"en\"><mark data-mark-id=\"7\" \
             class=\"mark-item mark-stroke mark-self-stroke\">Hi</mark> there</p></body></html>"
        );
    }

    #[test]
    fn test_self_closing_script_in_head() {
        let chapter = "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><script src=\"a.js\"/></head>\
                       <body><p>Hi there</p></body></html>";
        let records = vec![line(7, "u1", "p:nth-of-type(1)", 0, 2)];
        let result = inject_marks(chapter, &records, "u1", &MarkerConfig::default()).unwrap();

        assert_eq!(result.painted, 1);
        assert!(!result.html.contains("script"));
        assert!(result.html.contains("<head></head>"));
        assert!(result.html.contains(">Hi</mark> there</p>"));
    }

    #[test]
    fn test_malformed_markup_is_an_error() {
        let records = vec![line(7, "u1", "p:nth-of-type(1)", 0, 5)];
        let err = inject_marks("<html><body><p>open", &records, "u1", &MarkerConfig::default());
        assert!(matches!(err, Err(InjectError::Parse(_))));
    }
}
