//! Marks module
//!
//! The annotation domain on top of anchoring and rendering:
//!
//! - `types`: backend records, groups, strokes and comment nodes
//! - `grouping`: folding records into groups by source equality
//! - `thread`: comment forest with tombstones
//! - `backend`: host seams (persistence, notifications, UI triggers)
//! - `manager`: the `MarkManager`

mod backend;
mod grouping;
mod manager;
pub mod thread;
mod types;

use std::path::Path;

pub use backend::{
    BackendError, CreateMark, KeyTranslator, LogNotifier, MarkBackend, MarkEvents, Notifier,
    NoopEvents, PendingSelection, SelectionSource, Translator,
};
pub use grouping::{fold_records, matches_group, same_source, FoldOutcome};
pub use manager::{IngestReport, MarkManager, MarkManagerBuilder, MarkTarget};
pub use types::{
    AnnotationGroup, CommentNode, CreatedMark, CurrentUser, MarkRecord, MarkSource, MarkType,
    ReplyTarget, Stroke,
};

/// Read a JSON array of backend records
pub async fn load_records(path: impl AsRef<Path>) -> crate::Result<Vec<MarkRecord>> {
    let data = tokio::fs::read_to_string(path.as_ref()).await?;
    let records: Vec<MarkRecord> = serde_json::from_str(&data)?;
    tracing::debug!(path = %path.as_ref().display(), count = records.len(), "Loaded mark records");
    Ok(records)
}
