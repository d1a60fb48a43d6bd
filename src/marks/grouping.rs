//! Record folding
//!
//! Groups a flat backend record list into annotation groups keyed by
//! structural-source equality, and rebuilds the comment forest.

use std::collections::HashMap;

use crate::anchor::{Locator, StructuralPath};
use crate::dom::{differs_in_image_tail, Surface};

use super::thread;
use super::types::{AnnotationGroup, CommentNode, MarkRecord, MarkSource, MarkType, Stroke};

/// Whether two sources describe the same selection.
///
/// Text paths must agree on selector and offsets. Image paths must agree on
/// selector, or differ only in their trailing image segment and resolve to
/// the same element (needs a surface).
pub fn same_source(a: &[StructuralPath], b: &[StructuralPath], surface: Option<Surface<'_>>) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x, y) {
            (
                StructuralPath::Text { path: p1, start: s1, end: e1 },
                StructuralPath::Text { path: p2, start: s2, end: e2 },
            ) => p1 == p2 && s1 == s2 && e1 == e2,
            (StructuralPath::Image { path: p1 }, StructuralPath::Image { path: p2 }) => {
                p1 == p2
                    || (differs_in_image_tail(p1, p2)
                        && surface.is_some_and(|s| {
                            let resolved = s.resolve_selector(p1);
                            resolved.is_some() && resolved == s.resolve_selector(p2)
                        }))
            }
            _ => false,
        })
}

/// Whether a group is the home for a selection with this source and anchor.
/// Locator-only selections (no paths) are matched by their anchor.
pub fn matches_group(
    group: &AnnotationGroup,
    source: &[StructuralPath],
    anchor: Option<&Locator>,
    surface: Option<Surface<'_>>,
) -> bool {
    if source.is_empty() && group.source.is_empty() {
        return match (group.anchor.as_ref(), anchor) {
            (Some(a), Some(b)) => a.same_anchor(b),
            _ => false,
        };
    }
    same_source(&group.source, source, surface)
}

/// Result of folding records into groups
#[derive(Debug, Default)]
pub struct FoldOutcome {
    pub groups: Vec<AnnotationGroup>,
    /// Records skipped as unusable or malformed
    pub dropped: usize,
}

fn usable(record: &MarkRecord) -> bool {
    let legacy = record.mark_type.is_origin() || matches!(record.source, MarkSource::Legacy(_));
    if legacy || record.source.paths().is_empty() {
        record.approx_source.is_some()
    } else {
        true
    }
}

/// Fold records into groups. Pure: the tree is only read, to settle image
/// selector ambiguities.
pub fn fold_records(records: &[MarkRecord], surface: Option<Surface<'_>>) -> FoldOutcome {
    let mut dropped = 0;
    let mut ordered: Vec<&MarkRecord> = Vec::with_capacity(records.len());
    for record in records {
        if usable(record) {
            ordered.push(record);
        } else {
            tracing::debug!(record_id = record.id, "Skipping record without a usable anchor");
            dropped += 1;
        }
    }
    ordered.sort_by_key(|r| (r.created_at, r.id));

    let mut groups: Vec<AnnotationGroup> = Vec::new();
    let mut thread_index: HashMap<i64, usize> = HashMap::new();

    for record in ordered.iter().filter(|r| r.mark_type != MarkType::Reply) {
        let paths = record.source.paths();
        let anchor = record.approx_source.as_ref();
        let index = match groups
            .iter()
            .position(|g| matches_group(g, paths, anchor, surface))
        {
            Some(index) => index,
            None => {
                groups.push(AnnotationGroup::new(
                    record.id.to_string(),
                    paths.to_vec(),
                    record.approx_source.clone(),
                ));
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        if group.anchor.is_none() {
            group.anchor = record.approx_source.clone();
        }

        if record.mark_type.is_stroke() {
            if !record.is_deleted && !group.has_stroke_by(&record.user_id) {
                group.strokes.push(Stroke {
                    mark_id: record.id,
                    user_id: record.user_id.clone(),
                });
            }
        } else {
            group.comments.push(CommentNode::from_record(record));
            thread_index.insert(record.id, index);
        }
    }

    for record in ordered.iter().filter(|r| r.mark_type == MarkType::Reply) {
        let Some(root_id) = record.root() else {
            tracing::warn!(record_id = record.id, "Dropping reply without a root");
            dropped += 1;
            continue;
        };
        let Some(index) = thread_index.get(&root_id).copied() else {
            tracing::warn!(record_id = record.id, root_id, "Dropping reply to unknown thread");
            dropped += 1;
            continue;
        };
        let comments = &mut groups[index].comments;
        let parent_id = record.parent().unwrap_or(root_id);
        let target = match thread::find(comments, parent_id) {
            Some(parent) if thread::thread_root(comments, parent_id) == Some(root_id) => {
                parent.reply_target()
            }
            _ => {
                tracing::warn!(record_id = record.id, parent_id, "Dropping reply to unknown parent");
                dropped += 1;
                continue;
            }
        };
        let reply = CommentNode::from_record(record).with_reply(root_id, target);
        thread::attach_reply(comments, root_id, reply);
    }

    for group in groups.iter_mut() {
        thread::prune(&mut group.comments);
    }
    groups.retain(|g| !g.is_empty());

    FoldOutcome { groups, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerConfig;
    use crate::dom::{find_body, parse_xml};
    use chrono::{TimeZone, Utc};

    fn path(p: &str, start: usize, end: usize) -> StructuralPath {
        StructuralPath::Text {
            path: p.to_string(),
            start,
            end,
        }
    }

    fn record(id: i64, mark_type: MarkType, source: Vec<StructuralPath>) -> MarkRecord {
        MarkRecord {
            id,
            user_id: "u1".to_string(),
            mark_type,
            source: MarkSource::Paths(source),
            approx_source: None,
            parent_id: None,
            root_id: None,
            comment: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, id as u32).unwrap(),
            is_deleted: false,
            username: "Ada".to_string(),
            avatar: String::new(),
        }
    }

    fn reply(id: i64, root: i64, parent: i64) -> MarkRecord {
        let mut r = record(id, MarkType::Reply, vec![path("p:nth-of-type(1)", 0, 4)]);
        r.root_id = Some(root);
        r.parent_id = Some(parent);
        r
    }

    #[test]
    fn test_line_and_comment_share_group() {
        let records = vec![
            record(1, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 4)]),
            record(2, MarkType::Comment, vec![path("p:nth-of-type(1)", 0, 4)]),
        ];
        let outcome = fold_records(&records, None);

        assert_eq!(outcome.groups.len(), 1);
        assert_eq!(outcome.groups[0].strokes.len(), 1);
        assert_eq!(outcome.groups[0].comments.len(), 1);
        assert_eq!(outcome.groups[0].id, "1");
    }

    #[test]
    fn test_different_offsets_make_different_groups() {
        let records = vec![
            record(1, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 4)]),
            record(2, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 5)]),
        ];
        assert_eq!(fold_records(&records, None).groups.len(), 2);
    }

    #[test]
    fn test_strokes_by_two_users_are_additive() {
        let mut second = record(2, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 4)]);
        second.user_id = "u2".to_string();
        let records = vec![
            record(1, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 4)]),
            second,
            record(3, MarkType::Line, vec![path("p:nth-of-type(1)", 0, 4)]),
        ];
        let outcome = fold_records(&records, None);

        assert_eq!(outcome.groups.len(), 1);
        let users: Vec<&str> = outcome.groups[0].strokes.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2"]);
    }

    #[test]
    fn test_replies_attach_to_root() {
        let records = vec![
            reply(3, 1, 2),
            record(1, MarkType::Comment, vec![path("p:nth-of-type(1)", 0, 4)]),
            reply(2, 1, 1),
            reply(4, 99, 99),
            reply(5, 1, 42),
        ];
        let outcome = fold_records(&records, None);

        assert_eq!(outcome.dropped, 2);
        let root = &outcome.groups[0].comments[0];
        assert_eq!(root.mark_id, 1);
        let children: Vec<i64> = root.children.iter().map(|c| c.mark_id).collect();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(root.children[1].reply.as_ref().unwrap().id, 2);
        assert_eq!(root.children[1].root_id, Some(1));
    }

    #[test]
    fn test_deleted_records_fold_to_tombstones() {
        let mut root = record(1, MarkType::Comment, vec![path("p:nth-of-type(1)", 0, 4)]);
        root.is_deleted = true;
        let mut lone = record(5, MarkType::Comment, vec![path("p:nth-of-type(2)", 0, 4)]);
        lone.is_deleted = true;
        let records = vec![root, reply(2, 1, 1), lone];
        let outcome = fold_records(&records, None);

        assert_eq!(outcome.groups.len(), 1);
        assert!(outcome.groups[0].comments[0].is_deleted);
        assert_eq!(outcome.groups[0].comments[0].children.len(), 1);
    }

    #[test]
    fn test_origin_records_need_locator() {
        let mut bare = record(1, MarkType::OriginLine, Vec::new());
        bare.source = MarkSource::Legacy(12);
        let mut anchored = record(2, MarkType::OriginComment, Vec::new());
        anchored.source = MarkSource::Legacy(12);
        anchored.approx_source = Some(Locator {
            exact: "word".to_string(),
            prefix: String::new(),
            suffix: String::new(),
            position_start: 0,
            position_end: 4,
            raw_text: None,
        });
        let outcome = fold_records(&[bare, anchored], None);

        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.groups.len(), 1);
        assert!(outcome.groups[0].source.is_empty());
        assert!(outcome.groups[0].anchor.is_some());
    }

    #[test]
    fn test_image_tail_equality_uses_tree() {
        let doc = parse_xml("<body><p><img src=\"a.png\"/></p></body>").unwrap();
        let config = MarkerConfig::default();
        let surface = Surface::new(&doc, find_body(&doc), &config);
        let a = vec![StructuralPath::Image {
            path: "p:nth-of-type(1) > img".to_string(),
        }];
        let b = vec![StructuralPath::Image {
            path: "p:nth-of-type(1) > img:nth-of-type(1)".to_string(),
        }];

        assert!(same_source(&a, &b, Some(surface)));
        assert!(!same_source(&a, &b, None));
        assert!(!same_source(&a, &[path("p:nth-of-type(1)", 0, 1)], Some(surface)));
    }
}
