//! Mark domain types
//!
//! Backend records as persisted (snake_case), and the client-side model
//! they fold into: annotation groups with their strokes and comment threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::{Locator, StructuralPath};
use crate::render::{MarkState, PaintTarget};

// ============================================================================
// Backend records
// ============================================================================

/// Kind of a persisted mark record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkType {
    Line,
    Comment,
    Reply,
    /// Legacy stroke carrying only a locator
    OriginLine,
    /// Legacy comment carrying only a locator
    OriginComment,
}

impl MarkType {
    pub fn is_origin(&self) -> bool {
        matches!(self, MarkType::OriginLine | MarkType::OriginComment)
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self, MarkType::Line | MarkType::OriginLine)
    }

    pub fn is_root_comment(&self) -> bool {
        matches!(self, MarkType::Comment | MarkType::OriginComment)
    }
}

/// Record source: structural paths, or a legacy numeric reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkSource {
    Paths(Vec<StructuralPath>),
    Legacy(i64),
}

impl Default for MarkSource {
    fn default() -> Self {
        MarkSource::Paths(Vec::new())
    }
}

impl MarkSource {
    /// Structural paths, empty for legacy sources
    pub fn paths(&self) -> &[StructuralPath] {
        match self {
            MarkSource::Paths(paths) => paths,
            MarkSource::Legacy(_) => &[],
        }
    }
}

/// A mark record as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRecord {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(default)]
    pub source: MarkSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approx_source: Option<Locator>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub root_id: Option<i64>,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

impl MarkRecord {
    /// Parent comment id; `0` means none
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id > 0)
    }

    /// Thread root id; `0` means none
    pub fn root(&self) -> Option<i64> {
        self.root_id.filter(|id| *id > 0)
    }
}

/// Ids issued by the backend for a created mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMark {
    pub mark_id: i64,
    #[serde(default)]
    pub root_id: Option<i64>,
}

// ============================================================================
// Client model
// ============================================================================

/// The signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar: String::new(),
        }
    }
}

/// One user's highlight on a group. `mark_id == 0` while the create call
/// is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stroke {
    pub mark_id: i64,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Who a reply answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTarget {
    pub id: i64,
    pub username: String,
    pub user_id: String,
    pub avatar: String,
}

/// A comment or reply. Roots hold their thread's replies in `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub mark_id: i64,
    pub comment: String,
    pub user_id: String,
    pub username: String,
    pub avatar: String,
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyTarget>,
    #[serde(default)]
    pub children: Vec<CommentNode>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub operate_loading: bool,
    /// Identifies an optimistic node until the backend assigns `mark_id`
    #[serde(skip)]
    pub client_id: Option<Uuid>,
}

impl CommentNode {
    pub fn from_record(record: &MarkRecord) -> Self {
        Self {
            mark_id: record.id,
            comment: record.comment.clone(),
            user_id: record.user_id.clone(),
            username: record.username.clone(),
            avatar: record.avatar.clone(),
            is_deleted: record.is_deleted,
            root_id: record.root(),
            reply: None,
            children: Vec::new(),
            loading: false,
            operate_loading: false,
            client_id: None,
        }
    }

    /// An optimistic node authored by `user`, pending persistence
    pub fn local(user: &CurrentUser, comment: &str) -> Self {
        Self {
            mark_id: 0,
            comment: comment.to_string(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            is_deleted: false,
            root_id: None,
            reply: None,
            children: Vec::new(),
            loading: true,
            operate_loading: false,
            client_id: Some(Uuid::new_v4()),
        }
    }

    pub fn with_reply(mut self, root_id: i64, target: ReplyTarget) -> Self {
        self.root_id = Some(root_id);
        self.reply = Some(target);
        self
    }

    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            id: self.mark_id,
            username: self.username.clone(),
            user_id: self.user_id.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// All strokes and comments sharing one selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationGroup {
    pub id: String,
    pub source: Vec<StructuralPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Locator>,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
    #[serde(default)]
    pub comments: Vec<CommentNode>,
}

impl AnnotationGroup {
    pub fn new(id: impl Into<String>, source: Vec<StructuralPath>, anchor: Option<Locator>) -> Self {
        Self {
            id: id.into(),
            source,
            anchor,
            strokes: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// A client-side group with a fresh `local-<uuid>` id
    pub fn local(source: Vec<StructuralPath>, anchor: Option<Locator>) -> Self {
        Self::new(format!("local-{}", Uuid::new_v4()), source, anchor)
    }

    /// No strokes and no comments: the group should not exist
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.comments.is_empty()
    }

    pub fn has_stroke_by(&self, user_id: &str) -> bool {
        self.strokes.iter().any(|s| s.user_id == user_id)
    }

    pub fn state(&self, user_id: &str, highlighted: bool) -> MarkState {
        MarkState {
            stroke: !self.strokes.is_empty(),
            comment: !self.comments.is_empty(),
            self_stroke: self.has_stroke_by(user_id),
            highlighted,
        }
    }

    pub fn paint_target(&self, state: MarkState) -> PaintTarget<'_> {
        PaintTarget {
            id: &self.id,
            source: &self.source,
            anchor: self.anchor.as_ref(),
            state,
        }
    }
}
