//! Anchoring module
//!
//! Everything needed to describe a selection so it can be found again:
//!
//! - `position`: offsets <-> boundary points within a container
//! - `fuzzy`: bounded edit-distance search and context scoring
//! - `resolver`: locator capture and multi-strategy resolution
//! - `structure`: selector-plus-offset capture

pub mod fuzzy;
mod position;
mod resolver;
mod structure;
mod types;

pub use position::{PositionIndexer, TextSlice};
pub use resolver::{AnchorMatch, AnchorResolver, Strategy};
pub use structure::capture_structural;
pub use types::{Locator, StructuralPath};
