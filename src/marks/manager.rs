//! Mark Manager
//!
//! Owns one annotation surface (a document and a bounded root) and the
//! groups painted on it:
//! - Ingest of backend records (fold, then paint)
//! - Optimistic stroke/comment creation with rollback on failure
//! - Persistence-first deletion with the tombstone rule
//! - Marker clicks, focus and deferred selection capture
//!
//! Model and tree changes happen synchronously under `parking_lot` locks
//! (state before document). Persistence calls for one group are serialized
//! through a per-group async queue; no lock is held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::anchor::{capture_structural, AnchorResolver, Locator};
use crate::config::MarkerConfig;
use crate::dom::{Document, NodeId, Point, Surface, TextRange};
use crate::error::{MarkError, Result};
use crate::render::{ClickEvent, ClickHandler, MarkRenderer, PaintMode};

use super::backend::{
    CreateMark, KeyTranslator, LogNotifier, MarkBackend, MarkEvents, Notifier, NoopEvents,
    PendingSelection, SelectionSource, Translator,
};
use super::grouping::{fold_records, matches_group};
use super::thread;
use super::types::{AnnotationGroup, CommentNode, CurrentUser, MarkRecord, MarkType, Stroke};

const STROKE_CREATE_FAILED: &str = "mark.stroke.create_failed";
const COMMENT_CREATE_FAILED: &str = "mark.comment.create_failed";
const DELETE_FAILED: &str = "mark.delete_failed";

/// What a commit applies to
#[derive(Debug, Clone)]
pub enum MarkTarget {
    /// An existing group
    Group(String),
    /// A freshly captured selection; joins a matching group or starts one
    Selection(PendingSelection),
}

/// Summary of an ingest pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub groups: usize,
    pub painted: usize,
    pub orphaned: usize,
    pub dropped: usize,
}

// ============================================================================
// Builder
// ============================================================================

pub struct MarkManagerBuilder {
    document: Arc<Mutex<Document>>,
    root: NodeId,
    backend: Arc<dyn MarkBackend>,
    config: MarkerConfig,
    user: CurrentUser,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    events: Arc<dyn MarkEvents>,
}

impl MarkManagerBuilder {
    pub fn config(mut self, config: MarkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user(mut self, user: CurrentUser) -> Self {
        self.user = user;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn events(mut self, events: Arc<dyn MarkEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> MarkManager {
        let renderer = MarkRenderer::new(self.config.clone());
        MarkManager {
            inner: Arc::new(MarkManagerInner {
                document: self.document,
                root: self.root,
                config: self.config,
                user: self.user,
                backend: self.backend,
                notifier: self.notifier,
                translator: self.translator,
                events: self.events,
                state: Mutex::new(ManagerState {
                    groups: Vec::new(),
                    renderer,
                    focused: None,
                    pending: None,
                    orphaned: HashSet::new(),
                    last_pointer: None,
                }),
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Annotation manager for one surface
#[derive(Clone)]
pub struct MarkManager {
    inner: Arc<MarkManagerInner>,
}

struct MarkManagerInner {
    document: Arc<Mutex<Document>>,
    root: NodeId,
    config: MarkerConfig,
    user: CurrentUser,
    backend: Arc<dyn MarkBackend>,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    events: Arc<dyn MarkEvents>,
    state: Mutex<ManagerState>,
    /// Per-group persistence queues
    queues: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

struct ManagerState {
    groups: Vec<AnnotationGroup>,
    renderer: MarkRenderer,
    focused: Option<String>,
    pending: Option<PendingSelection>,
    orphaned: HashSet<String>,
    last_pointer: Option<(f64, f64)>,
}

/// Split borrows of the locked state plus the document
struct Scene<'a> {
    state: &'a mut ManagerState,
    doc: &'a mut Document,
    root: NodeId,
    config: &'a MarkerConfig,
    user: &'a CurrentUser,
}

impl Scene<'_> {
    fn surface(&self) -> Surface<'_> {
        Surface::new(&*self.doc, self.root, self.config)
    }

    fn group(&self, id: &str) -> Option<&AnnotationGroup> {
        self.state.groups.iter().find(|g| g.id == id)
    }

    fn group_mut(&mut self, id: &str) -> Option<&mut AnnotationGroup> {
        self.state.groups.iter_mut().find(|g| g.id == id)
    }

    /// Create markers for a group that has none, else toggle classes
    fn repaint(&mut self, id: &str) {
        let ManagerState {
            groups,
            renderer,
            focused,
            orphaned,
            ..
        } = &mut *self.state;
        let Some(group) = groups.iter().find(|g| g.id == id) else {
            return;
        };
        let mode = if renderer.markers_for(id).is_empty() {
            PaintMode::Create
        } else {
            PaintMode::Update
        };
        let state = group.state(&self.user.id, focused.as_deref() == Some(id));
        let report = renderer.paint(self.doc, self.root, &group.paint_target(state), mode);
        if report.is_empty() {
            orphaned.insert(id.to_string());
        } else {
            orphaned.remove(id);
        }
    }

    /// Drop a group from the model and unwrap its markers
    fn remove_group(&mut self, id: &str) {
        self.state.renderer.unwrap_group(self.doc, id);
        self.state.groups.retain(|g| g.id != id);
        self.state.orphaned.remove(id);
        if self.state.focused.as_deref() == Some(id) {
            self.state.focused = None;
        }
        tracing::info!(group_id = %id, "Removed annotation group");
    }

    /// Remove the group if it lost its last stroke and comment, else repaint
    fn settle(&mut self, id: &str) -> bool {
        match self.group(id).map(AnnotationGroup::is_empty) {
            Some(true) => {
                self.remove_group(id);
                true
            }
            Some(false) => {
                self.repaint(id);
                false
            }
            None => false,
        }
    }

    /// Group id for a commit target, creating a local group for a new
    /// selection. Returns `(id, created)`.
    fn resolve_target(&mut self, target: &MarkTarget) -> Result<(String, bool)> {
        match target {
            MarkTarget::Group(id) => match self.group(id) {
                Some(_) => Ok((id.clone(), false)),
                None => Err(MarkError::StaleGroupReference(id.clone())),
            },
            MarkTarget::Selection(selection) => {
                if let Some(id) = selection.group_id.as_deref() {
                    if self.group(id).is_some() {
                        return Ok((id.to_string(), false));
                    }
                }
                let existing = {
                    let surface = self.surface();
                    self.state
                        .groups
                        .iter()
                        .find(|g| {
                            matches_group(g, &selection.source, selection.anchor.as_ref(), Some(surface))
                        })
                        .map(|g| g.id.clone())
                };
                if let Some(id) = existing {
                    return Ok((id, false));
                }
                if selection.source.is_empty() && selection.anchor.is_none() {
                    return Err(MarkError::AnchorUnresolved(
                        "selection has neither paths nor locator".to_string(),
                    ));
                }
                let group = AnnotationGroup::local(selection.source.clone(), selection.anchor.clone());
                let id = group.id.clone();
                self.state.groups.push(group);
                tracing::debug!(group_id = %id, "Created local annotation group");
                Ok((id, true))
            }
        }
    }

    /// Best-effort locator from a group's rendered markers
    fn derive_anchor(&self, id: &str) -> Option<Locator> {
        let markers = self.state.renderer.markers_for(id);
        let order = self.doc.order(self.root);
        let first = markers.iter().min_by_key(|m| order.position(**m))?;
        let last = markers.iter().max_by_key(|m| order.position(**m))?;
        let range = TextRange::new(
            Point::new(*first, 0),
            Point::new(*last, self.doc.children(*last).len()),
        );
        AnchorResolver::new(self.surface()).capture(&range)
    }
}

impl MarkManager {
    /// Start building a manager for `root` inside `document`
    pub fn builder(
        document: Arc<Mutex<Document>>,
        root: NodeId,
        backend: Arc<dyn MarkBackend>,
    ) -> MarkManagerBuilder {
        MarkManagerBuilder {
            document,
            root,
            backend,
            config: MarkerConfig::default(),
            user: CurrentUser::default(),
            notifier: Arc::new(LogNotifier),
            translator: Arc::new(KeyTranslator),
            events: Arc::new(NoopEvents),
        }
    }

    /// Run `f` with the model and the document locked
    fn with_scene<R>(&self, f: impl FnOnce(&mut Scene<'_>) -> R) -> R {
        let mut state = self.inner.state.lock();
        let mut doc = self.inner.document.lock();
        let mut scene = Scene {
            state: &mut *state,
            doc: &mut *doc,
            root: self.inner.root,
            config: &self.inner.config,
            user: &self.inner.user,
        };
        f(&mut scene)
    }

    fn queue(&self, group_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .queues
            .lock()
            .entry(group_id.to_string())
            .or_default()
            .clone()
    }

    fn forget_queue(&self, group_id: &str) {
        self.inner.queues.lock().remove(group_id);
    }

    fn notify_failure(&self, key: &str) {
        let message = self.inner.translator.t(key);
        let pointer = self.inner.state.lock().last_pointer;
        match pointer {
            Some((x, y)) => self.inner.notifier.toast_at_cursor(&message, x, y),
            None => self.inner.notifier.toast(&message),
        }
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Replace the model with groups folded from `records` and paint them
    pub fn ingest(&self, records: &[MarkRecord]) -> IngestReport {
        self.with_scene(|scene| {
            scene.state.renderer.clear(scene.doc);
            let outcome = fold_records(records, Some(scene.surface()));

            scene.state.groups = outcome.groups;
            scene.state.orphaned.clear();
            let focused = scene.state.focused.clone();
            if focused.is_some_and(|id| scene.group(&id).is_none()) {
                scene.state.focused = None;
            }

            let ids: Vec<String> = scene.state.groups.iter().map(|g| g.id.clone()).collect();
            for id in &ids {
                scene.repaint(id);
            }

            let report = IngestReport {
                groups: ids.len(),
                painted: ids.len() - scene.state.orphaned.len(),
                orphaned: scene.state.orphaned.len(),
                dropped: outcome.dropped,
            };
            tracing::info!(
                records = records.len(),
                groups = report.groups,
                painted = report.painted,
                orphaned = report.orphaned,
                dropped = report.dropped,
                "Ingested mark records"
            );
            report
        })
    }

    // ========================================================================
    // Strokes
    // ========================================================================

    /// Add the current user's stroke to a group, optimistically. Returns
    /// the group id.
    pub async fn commit_stroke(&self, target: MarkTarget) -> Result<String> {
        let user_id = self.inner.user.id.clone();
        let (group_id, request) = self.with_scene(|scene| -> Result<(String, Option<CreateMark>)> {
            let (id, _) = scene.resolve_target(&target)?;
            let group = scene
                .group_mut(&id)
                .ok_or_else(|| MarkError::StaleGroupReference(id.clone()))?;
            if group.has_stroke_by(&user_id) {
                return Ok((id, None));
            }
            group.strokes.push(Stroke {
                mark_id: 0,
                user_id: user_id.clone(),
            });
            let request = CreateMark {
                source: group.source.clone(),
                mark_type: MarkType::Line,
                approx_source: group.anchor.clone(),
                comment: None,
                parent_id: None,
            };
            scene.repaint(&id);
            Ok((id, Some(request)))
        })?;

        let Some(request) = request else {
            tracing::debug!(group_id = %group_id, "Stroke already present");
            return Ok(group_id);
        };

        let queue = self.queue(&group_id);
        let _turn = queue.lock().await;
        let result = self.inner.backend.create_mark(request).await;

        match result {
            Ok(created) => {
                self.with_scene(|scene| {
                    let stroke = scene.group_mut(&group_id).and_then(|g| {
                        g.strokes
                            .iter_mut()
                            .find(|s| s.mark_id == 0 && s.user_id == user_id)
                    });
                    match stroke {
                        Some(stroke) => stroke.mark_id = created.mark_id,
                        None => tracing::debug!(group_id = %group_id, "Stroke settled after group removal"),
                    }
                });
                tracing::info!(group_id = %group_id, mark_id = created.mark_id, "Created stroke");
                Ok(group_id)
            }
            Err(e) => {
                let removed = self.with_scene(|scene| {
                    if let Some(group) = scene.group_mut(&group_id) {
                        if let Some(index) = group
                            .strokes
                            .iter()
                            .position(|s| s.mark_id == 0 && s.user_id == user_id)
                        {
                            group.strokes.remove(index);
                        }
                    }
                    scene.settle(&group_id)
                });
                if removed {
                    self.forget_queue(&group_id);
                }
                tracing::warn!(group_id = %group_id, error = %e, "Stroke persistence failed, rolled back");
                self.notify_failure(STROKE_CREATE_FAILED);
                Err(MarkError::PersistenceFailed(e.to_string()))
            }
        }
    }

    /// Remove the current user's stroke from a group. The backend is asked
    /// first; the model only changes on success.
    pub async fn delete_stroke(&self, group_id: &str) -> Result<()> {
        let user_id = self.inner.user.id.clone();
        let mark_id = self.with_scene(|scene| {
            scene
                .group(group_id)
                .and_then(|g| g.strokes.iter().find(|s| s.user_id == user_id && s.mark_id > 0))
                .map(|s| s.mark_id)
                .ok_or_else(|| MarkError::StaleGroupReference(group_id.to_string()))
        })?;

        let queue = self.queue(group_id);
        let _turn = queue.lock().await;
        if let Err(e) = self.inner.backend.delete_mark(mark_id).await {
            tracing::warn!(group_id = %group_id, mark_id, error = %e, "Stroke deletion failed");
            self.notify_failure(DELETE_FAILED);
            return Err(MarkError::PersistenceFailed(e.to_string()));
        }

        let removed = self.with_scene(|scene| {
            if let Some(group) = scene.group_mut(group_id) {
                group.strokes.retain(|s| s.mark_id != mark_id);
            }
            scene.settle(group_id)
        });
        if removed {
            self.forget_queue(group_id);
        }
        tracing::info!(group_id = %group_id, mark_id, "Deleted stroke");
        Ok(())
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Add a comment, or a reply to `reply_to`, optimistically. Returns the
    /// group id.
    pub async fn commit_comment(
        &self,
        target: MarkTarget,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<String> {
        let user = self.inner.user.clone();
        let (group_id, client_id, request) = self.with_scene(|scene| -> Result<(String, Uuid, CreateMark)> {
            let (id, created) = scene.resolve_target(&target)?;
            let result = Self::splice_comment(scene, &id, &user, text, reply_to);
            if result.is_err() && created {
                scene.remove_group(&id);
            }
            let (client_id, request) = result?;
            scene.repaint(&id);
            Ok((id, client_id, request))
        })?;

        let queue = self.queue(&group_id);
        let _turn = queue.lock().await;
        let result = self.inner.backend.create_mark(request).await;

        match result {
            Ok(created) => {
                self.with_scene(|scene| {
                    let node = scene
                        .group_mut(&group_id)
                        .and_then(|g| thread::find_local_mut(&mut g.comments, client_id));
                    match node {
                        Some(node) => {
                            node.mark_id = created.mark_id;
                            if node.reply.is_some() {
                                node.root_id = created.root_id.or(node.root_id);
                            }
                            node.loading = false;
                            node.client_id = None;
                        }
                        None => tracing::debug!(group_id = %group_id, "Comment settled after removal"),
                    }
                });
                tracing::info!(group_id = %group_id, mark_id = created.mark_id, "Created comment");
                Ok(group_id)
            }
            Err(e) => {
                let removed = self.with_scene(|scene| {
                    if let Some(group) = scene.group_mut(&group_id) {
                        thread::remove_local(&mut group.comments, client_id);
                        thread::prune(&mut group.comments);
                    }
                    scene.settle(&group_id)
                });
                if removed {
                    self.forget_queue(&group_id);
                }
                tracing::warn!(group_id = %group_id, error = %e, "Comment persistence failed, rolled back");
                self.notify_failure(COMMENT_CREATE_FAILED);
                Err(MarkError::PersistenceFailed(e.to_string()))
            }
        }
    }

    fn splice_comment(
        scene: &mut Scene<'_>,
        group_id: &str,
        user: &CurrentUser,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(Uuid, CreateMark)> {
        let group = scene
            .group_mut(group_id)
            .ok_or_else(|| MarkError::StaleGroupReference(group_id.to_string()))?;
        let client_id = Uuid::new_v4();
        let mut node = CommentNode::local(user, text);
        node.client_id = Some(client_id);

        let mark_type = match reply_to {
            Some(parent_id) => {
                let parent = thread::find(&group.comments, parent_id)
                    .filter(|_| parent_id > 0)
                    .filter(|p| !p.is_deleted && !p.operate_loading && p.client_id.is_none())
                    .ok_or_else(|| MarkError::StaleGroupReference(format!("comment {}", parent_id)))?;
                let target = parent.reply_target();
                let root_id = thread::thread_root(&group.comments, parent_id)
                    .ok_or_else(|| MarkError::StaleGroupReference(format!("comment {}", parent_id)))?;
                node = node.with_reply(root_id, target);
                thread::attach_reply(&mut group.comments, root_id, node);
                MarkType::Reply
            }
            None => {
                group.comments.push(node);
                MarkType::Comment
            }
        };

        let request = CreateMark {
            source: group.source.clone(),
            mark_type,
            approx_source: group.anchor.clone(),
            comment: Some(text.to_string()),
            parent_id: reply_to,
        };
        Ok((client_id, request))
    }

    /// Delete a comment. On success the tombstone rule decides whether it
    /// stays flagged or disappears; the group goes away with its last item.
    pub async fn delete_comment(&self, group_id: &str, comment_id: i64) -> Result<()> {
        if comment_id <= 0 {
            return Err(MarkError::StaleGroupReference(format!("{}/{}", group_id, comment_id)));
        }
        self.with_scene(|scene| {
            let node = scene
                .group_mut(group_id)
                .and_then(|g| thread::find_mut(&mut g.comments, comment_id))
                .filter(|n| !n.is_deleted && n.client_id.is_none())
                .ok_or_else(|| MarkError::StaleGroupReference(format!("{}/{}", group_id, comment_id)))?;
            node.operate_loading = true;
            Ok::<_, MarkError>(())
        })?;

        let queue = self.queue(group_id);
        let _turn = queue.lock().await;
        if let Err(e) = self.inner.backend.delete_mark(comment_id).await {
            self.with_scene(|scene| {
                if let Some(node) = scene
                    .group_mut(group_id)
                    .and_then(|g| thread::find_mut(&mut g.comments, comment_id))
                {
                    node.operate_loading = false;
                }
            });
            tracing::warn!(group_id = %group_id, comment_id, error = %e, "Comment deletion failed");
            self.notify_failure(DELETE_FAILED);
            return Err(MarkError::PersistenceFailed(e.to_string()));
        }

        let removed = self.with_scene(|scene| {
            if let Some(group) = scene.group_mut(group_id) {
                thread::mark_deleted(&mut group.comments, comment_id);
            }
            scene.settle(group_id)
        });
        if removed {
            self.forget_queue(group_id);
        }
        tracing::info!(group_id = %group_id, comment_id, "Deleted comment");
        Ok(())
    }

    // ========================================================================
    // Clicks, focus and selection
    // ========================================================================

    /// Install the handler every marker click is reported to
    pub fn set_click_handler(&self, handler: ClickHandler) {
        self.inner.state.lock().renderer.set_click_handler(handler);
    }

    /// Route a pointer event: find the marker under it, report it to the
    /// click handler and focus its group
    pub fn click(&self, event: ClickEvent) -> Option<AnnotationGroup> {
        let (marker, handler) = self.with_scene(|scene| {
            let marker = scene.state.renderer.marker_at(scene.doc, event.target)?;
            Some((marker, scene.state.renderer.click_handler().cloned()))
        })?;
        if let Some(handler) = handler {
            handler(marker, &event);
        }
        self.handle_marker_click(marker, event)
    }

    /// Focus the group owning `marker`, backfilling its locator when it has
    /// none, and hand it to the host
    pub fn handle_marker_click(&self, marker: NodeId, event: ClickEvent) -> Option<AnnotationGroup> {
        let group = self.with_scene(|scene| {
            let id = scene.state.renderer.group_of(scene.doc, marker)?;
            if scene.group(&id).is_none() {
                tracing::debug!(group_id = %id, "Click on marker of unknown group");
                return None;
            }

            if scene.group(&id).is_some_and(|g| g.anchor.is_none()) {
                let anchor = scene.derive_anchor(&id);
                if anchor.is_some() {
                    tracing::debug!(group_id = %id, "Backfilled locator from rendered text");
                }
                if let Some(group) = scene.group_mut(&id) {
                    group.anchor = anchor;
                }
            }

            let previous = scene.state.focused.replace(id.clone());
            if let Some(previous) = previous.filter(|p| *p != id) {
                scene.repaint(&previous);
            }
            scene.repaint(&id);
            scene.state.last_pointer = Some((event.x, event.y));
            scene.group(&id).cloned()
        })?;

        self.inner.events.on_marker_click(&group, &event);
        Some(group)
    }

    /// Drop the focus highlight
    pub fn clear_focus(&self) {
        self.with_scene(|scene| {
            if let Some(previous) = scene.state.focused.take() {
                scene.repaint(&previous);
            }
        });
    }

    /// Capture the host's selection once it has settled. Yields to the
    /// scheduler first: the host selection is only final after the
    /// pointer-up handler returns.
    pub async fn handle_selection_end<S>(&self, source: &S) -> Option<PendingSelection>
    where
        S: SelectionSource + ?Sized,
    {
        tokio::task::yield_now().await;

        let range = source.current_selection().filter(|r| !r.is_collapsed());
        let pending = self.with_scene(|scene| {
            let range = range?;
            let surface = scene.surface();
            let anchor = AnchorResolver::new(surface).capture(&range);
            let paths = capture_structural(surface, &range);
            if paths.is_empty() && anchor.is_none() {
                return None;
            }
            let group_id = scene
                .state
                .groups
                .iter()
                .find(|g| matches_group(g, &paths, anchor.as_ref(), Some(surface)))
                .map(|g| g.id.clone());
            Some(PendingSelection {
                group_id,
                text: anchor
                    .as_ref()
                    .map(|a| a.display_text().to_string())
                    .unwrap_or_default(),
                source: paths,
                anchor,
            })
        });

        self.with_scene(|scene| scene.state.pending = pending.clone());
        let pending = pending?;
        tracing::debug!(
            paths = pending.source.len(),
            existing = pending.group_id.is_some(),
            "Captured selection"
        );
        self.inner.events.on_selection_end(&pending);
        Some(pending)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn groups(&self) -> Vec<AnnotationGroup> {
        self.inner.state.lock().groups.clone()
    }

    pub fn group(&self, id: &str) -> Option<AnnotationGroup> {
        self.inner
            .state
            .lock()
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    pub fn focused_group(&self) -> Option<AnnotationGroup> {
        let state = self.inner.state.lock();
        let id = state.focused.as_deref()?;
        state.groups.iter().find(|g| g.id == id).cloned()
    }

    /// The pending selected-content buffer
    pub fn selected_content(&self) -> Option<PendingSelection> {
        self.inner.state.lock().pending.clone()
    }

    pub fn clear_selection(&self) {
        self.inner.state.lock().pending = None;
    }

    /// Groups that are modeled but currently paint nothing
    pub fn orphaned_groups(&self) -> Vec<AnnotationGroup> {
        let state = self.inner.state.lock();
        state
            .groups
            .iter()
            .filter(|g| state.orphaned.contains(&g.id))
            .cloned()
            .collect()
    }

    /// Marker elements currently rendered for a group
    pub fn markers_for(&self, group_id: &str) -> Vec<NodeId> {
        self.inner.state.lock().renderer.markers_for(group_id).to_vec()
    }

    /// Re-check a freshly captured locator against its recorded offsets
    pub fn revalidate(&self, locator: &Locator) -> Option<TextRange> {
        let doc = self.inner.document.lock();
        AnchorResolver::new(Surface::new(&doc, self.inner.root, &self.inner.config)).revalidate(locator)
    }

    pub fn document(&self) -> Arc<Mutex<Document>> {
        self.inner.document.clone()
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    pub fn user(&self) -> &CurrentUser {
        &self.inner.user
    }
}
