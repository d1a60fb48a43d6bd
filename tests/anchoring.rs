//! End-to-end anchoring and mark lifecycle tests through the public API

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use marginalia::anchor::{capture_structural, AnchorResolver, Locator, StructuralPath};
use marginalia::dom::{find_body, parse_xml, to_markup, Document, Surface};
use marginalia::marks::{
    BackendError, CreateMark, CreatedMark, CurrentUser, MarkBackend, MarkManager, MarkRecord,
    MarkSource, MarkTarget, MarkType, PendingSelection,
};
use marginalia::render::{MarkRenderer, MarkState, PaintMode, PaintTarget};
use marginalia::{MarkError, MarkerConfig};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct MemoryBackend {
    offline: AtomicBool,
    next_id: AtomicI64,
    comments: Mutex<Vec<String>>,
}

#[async_trait]
impl MarkBackend for MemoryBackend {
    async fn create_mark(&self, request: CreateMark) -> Result<CreatedMark, BackendError> {
        tokio::task::yield_now().await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Request("offline".to_string()));
        }
        if let Some(comment) = request.comment {
            self.comments.lock().push(comment);
        }
        Ok(CreatedMark {
            mark_id: 500 + self.next_id.fetch_add(1, Ordering::SeqCst),
            root_id: None,
        })
    }

    async fn delete_mark(&self, _mark_id: i64) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        Ok(())
    }
}

const CHAPTER: &str = "<html><head><style>p { color: red; }</style></head><body>\
                       <p>Hi, Hello world! Bye.</p><p>Another paragraph here.</p></body></html>";

fn text_path(path: &str, start: usize, end: usize) -> StructuralPath {
    StructuralPath::Text {
        path: path.to_string(),
        start,
        end,
    }
}

fn record(id: i64, mark_type: MarkType, path: StructuralPath) -> MarkRecord {
    MarkRecord {
        id,
        user_id: "u2".to_string(),
        mark_type,
        source: MarkSource::Paths(vec![path]),
        approx_source: None,
        parent_id: None,
        root_id: None,
        comment: format!("note {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, id as u32).unwrap(),
        is_deleted: false,
        username: "Bo".to_string(),
        avatar: String::new(),
    }
}

fn manager(backend: Arc<MemoryBackend>) -> MarkManager {
    let doc = parse_xml(CHAPTER).unwrap();
    let root = find_body(&doc);
    MarkManager::builder(Arc::new(Mutex::new(doc)), root, backend)
        .user(CurrentUser::new("u1", "Ada"))
        .build()
}

fn markup(manager: &MarkManager) -> String {
    let doc = manager.document();
    let doc = doc.lock();
    to_markup(&doc, doc.root())
}

fn select(manager: &MarkManager, start: usize, end: usize) -> PendingSelection {
    let doc = manager.document();
    let doc = doc.lock();
    let config = MarkerConfig::default();
    let surface = Surface::new(&doc, manager.root(), &config);
    let resolver = AnchorResolver::new(surface);
    let range = resolver.to_range(start, end).unwrap();
    PendingSelection {
        group_id: None,
        source: capture_structural(surface, &range),
        anchor: resolver.capture(&range),
        text: resolver.indexer().range_text(&range).unwrap_or_default(),
    }
}

fn body_of(markup: &str) -> (Document, MarkerConfig) {
    (parse_xml(markup).unwrap(), MarkerConfig::default())
}

// ============================================================================
// Anchoring
// ============================================================================

#[test]
fn test_capture_resolve_round_trip() {
    let (doc, config) = body_of(
        "<body><p>One <em>two</em> three</p><ul><li>four</li><li>five six</li></ul></body>",
    );
    let surface = Surface::new(&doc, find_body(&doc), &config);
    let resolver = AnchorResolver::new(surface);

    for (start, end) in [(0, 3), (2, 12), (6, 18), (13, 25)] {
        let range = resolver.to_range(start, end).unwrap();
        let locator = resolver.capture(&range).unwrap();
        let resolved = resolver.resolve(&locator).unwrap();

        assert_eq!(
            resolver.indexer().range_text(&resolved),
            resolver.indexer().range_text(&range),
            "selection {}..{}",
            start,
            end
        );
    }
}

#[test]
fn test_locator_survives_context_shift() {
    let (before, config) = body_of("<body><p>Hi, Hello world! Bye.</p></body>");
    let resolver = AnchorResolver::new(Surface::new(&before, find_body(&before), &config));
    let range = resolver.to_range(4, 15).unwrap();
    let locator = resolver.capture(&range).unwrap();

    assert_eq!(
        locator,
        Locator {
            exact: "Hello world".to_string(),
            prefix: "Hi, ".to_string(),
            suffix: "! Bye.".to_string(),
            position_start: 4,
            position_end: 15,
            raw_text: None,
        }
    );

    let (after, _) = body_of("<body><p>Hi there, Hello world! Bye.</p></body>");
    let resolver = AnchorResolver::new(Surface::new(&after, find_body(&after), &config));
    let found = resolver.resolve_match(&locator).unwrap();

    assert_eq!((found.start, found.end), (10, 21));
    let range = resolver.to_range(found.start, found.end).unwrap();
    assert_eq!(resolver.indexer().range_text(&range).unwrap(), "Hello world");
}

#[test]
fn test_path_across_three_leaves_wraps_three_pieces() {
    let (mut doc, config) = body_of("<body><p>ab<b>cd</b>ef</p></body>");
    let root = find_body(&doc);
    let source = vec![text_path("p:nth-of-type(1)", 1, 5)];
    let mut renderer = MarkRenderer::new(config);

    let report = renderer.paint(
        &mut doc,
        root,
        &PaintTarget {
            id: "g1",
            source: &source,
            anchor: None,
            state: MarkState::default(),
        },
        PaintMode::Create,
    );

    assert_eq!(report.markers, 3);
    assert_eq!(
        to_markup(&doc, root),
        "<body><p>a<mark data-mark-id=\"g1\" class=\"mark-item\">b</mark>\
         <b><mark data-mark-id=\"g1\" class=\"mark-item\">cd</mark></b>\
         <mark data-mark-id=\"g1\" class=\"mark-item\">e</mark>f</p></body>"
    );

    renderer.unwrap_group(&mut doc, "g1");
    assert_eq!(to_markup(&doc, root), "<body><p>ab<b>cd</b>ef</p></body>");
}

// ============================================================================
// Mark lifecycle
// ============================================================================

#[test]
fn test_line_and_comment_fold_into_one_group() {
    let manager = manager(Arc::default());
    let path = text_path("p:nth-of-type(1)", 4, 15);
    let report = manager.ingest(&[
        record(1, MarkType::Line, path.clone()),
        record(2, MarkType::Comment, path),
    ]);

    assert_eq!(report.groups, 1);
    let group = &manager.groups()[0];
    assert_eq!(group.strokes.len(), 1);
    assert_eq!(group.comments.len(), 1);
    assert_eq!(manager.markers_for(&group.id).len(), 1);
}

#[tokio::test]
async fn test_comment_tombstones() {
    let manager = manager(Arc::default());
    let mut reply = record(2, MarkType::Reply, text_path("p:nth-of-type(1)", 4, 15));
    reply.root_id = Some(1);
    reply.parent_id = Some(1);
    manager.ingest(&[
        record(1, MarkType::Comment, text_path("p:nth-of-type(1)", 4, 15)),
        reply,
        record(3, MarkType::Comment, text_path("p:nth-of-type(2)", 0, 7)),
    ]);
    let threaded = manager.groups()[0].id.clone();
    let lone = manager.groups()[1].id.clone();

    manager.delete_comment(&threaded, 1).await.unwrap();
    let group = manager.group(&threaded).unwrap();
    assert!(group.comments[0].is_deleted);
    assert_eq!(group.comments[0].children.len(), 1);
    assert!(!group.comments[0].children[0].is_deleted);

    manager.delete_comment(&lone, 3).await.unwrap();
    assert!(manager.group(&lone).is_none());
    assert!(manager.markers_for(&lone).is_empty());
    assert!(!markup(&manager).contains(&format!("data-mark-id=\"{}\"", lone)));
}

#[tokio::test]
async fn test_failed_comment_leaves_no_residue() {
    let backend = Arc::new(MemoryBackend::default());
    backend.offline.store(true, Ordering::SeqCst);
    let manager = manager(backend);
    let before = markup(&manager);
    let selection = select(&manager, 4, 15);

    let err = manager
        .commit_comment(MarkTarget::Selection(selection), "first!", None)
        .await
        .unwrap_err();

    assert!(matches!(err, MarkError::PersistenceFailed(_)));
    assert!(manager.groups().is_empty());
    assert_eq!(markup(&manager), before);
    assert!(!markup(&manager).contains("<mark"));
}

#[tokio::test]
async fn test_same_group_writes_settle_in_order() {
    let backend = Arc::new(MemoryBackend::default());
    let manager = manager(backend.clone());
    manager.ingest(&[record(1, MarkType::Line, text_path("p:nth-of-type(2)", 0, 7))]);
    let group_id = manager.groups()[0].id.clone();

    let (first, second) = tokio::join!(
        manager.commit_comment(MarkTarget::Group(group_id.clone()), "first", None),
        manager.commit_comment(MarkTarget::Group(group_id.clone()), "second", None),
    );

    assert_eq!(first.unwrap(), group_id);
    assert_eq!(second.unwrap(), group_id);
    assert_eq!(backend.comments.lock().as_slice(), &["first", "second"]);
    let ids: Vec<i64> = manager
        .group(&group_id)
        .unwrap()
        .comments
        .iter()
        .map(|c| c.mark_id)
        .collect();
    assert_eq!(ids, vec![500, 501]);
}

#[tokio::test]
async fn test_stroke_on_fresh_selection_is_persisted() {
    let backend = Arc::new(MemoryBackend::default());
    let manager = manager(backend);
    let selection = select(&manager, 21, 28);
    assert_eq!(selection.text, "Another");

    let group_id = manager
        .commit_stroke(MarkTarget::Selection(selection))
        .await
        .unwrap();

    let group = manager.group(&group_id).unwrap();
    assert_eq!(group.strokes[0].mark_id, 500);
    assert!(markup(&manager).contains(">Another</mark> paragraph"));
    assert!(markup(&manager).contains("mark-self-stroke"));
}
