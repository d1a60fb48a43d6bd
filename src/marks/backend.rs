//! Host seams
//!
//! Everything the mark manager consumes from its host: persistence,
//! notifications, message lookup, UI triggers and the live selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchor::{Locator, StructuralPath};
use crate::dom::TextRange;
use crate::render::ClickEvent;

use super::types::{AnnotationGroup, CreatedMark, MarkType};

/// Failure reported by a persistence backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Payload of a create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMark {
    pub source: Vec<StructuralPath>,
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approx_source: Option<Locator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// Mark persistence
#[async_trait]
pub trait MarkBackend: Send + Sync {
    /// Persist a new stroke, comment or reply
    async fn create_mark(&self, request: CreateMark) -> Result<CreatedMark, BackendError>;

    /// Delete a mark by id
    async fn delete_mark(&self, mark_id: i64) -> Result<(), BackendError>;
}

/// Toast sink
pub trait Notifier: Send + Sync {
    fn toast(&self, message: &str);

    /// Toast anchored at the last pointer position
    fn toast_at_cursor(&self, message: &str, _x: f64, _y: f64) {
        self.toast(message);
    }
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, message: &str) {
        tracing::info!(message, "Notification");
    }
}

/// Message lookup
pub trait Translator: Send + Sync {
    fn t(&self, key: &str) -> String;
}

/// Translator that returns the key itself
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn t(&self, key: &str) -> String {
        key.to_string()
    }
}

/// A captured selection waiting for the user to act on it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSelection {
    /// Existing group with the same source, if any
    pub group_id: Option<String>,
    pub source: Vec<StructuralPath>,
    pub anchor: Option<Locator>,
    /// Display text of the selection
    pub text: String,
}

/// Host UI triggers
pub trait MarkEvents: Send + Sync {
    fn on_marker_click(&self, _group: &AnnotationGroup, _event: &ClickEvent) {}

    fn on_selection_end(&self, _selection: &PendingSelection) {}
}

/// Events sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl MarkEvents for NoopEvents {}

/// The host's live selection
pub trait SelectionSource: Send + Sync {
    fn current_selection(&self) -> Option<TextRange>;
}

impl<F> SelectionSource for F
where
    F: Fn() -> Option<TextRange> + Send + Sync,
{
    fn current_selection(&self) -> Option<TextRange> {
        self()
    }
}
