//! Anchor types
//!
//! Two complementary ways of pointing at a selection:
//! - `StructuralPath`: selector + offsets, precise but brittle to markup changes
//! - `Locator`: quoted text + context + position hint, structure-independent

use serde::{Deserialize, Serialize};

/// Portable, structure-independent description of a text selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    /// The selected text
    pub exact: String,
    /// Text before the selection
    pub prefix: String,
    /// Text after the selection
    pub suffix: String,
    /// Absolute char offset of the selection start at capture time
    pub position_start: usize,
    /// Absolute char offset of the selection end at capture time
    pub position_end: usize,
    /// Display text of the selection, including structural line breaks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl Locator {
    /// Whether two locators point at the same capture
    pub fn same_anchor(&self, other: &Locator) -> bool {
        self.exact == other.exact
            && self.position_start == other.position_start
            && self.position_end == other.position_end
    }

    /// Text to show for the selection
    pub fn display_text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or(&self.exact)
    }
}

/// Selector-plus-offset description of one region of a selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructuralPath {
    /// Chars `start..end` of the concatenated text of the element at `path`
    Text {
        path: String,
        start: usize,
        end: usize,
    },
    /// The image element at `path`
    Image { path: String },
}

impl StructuralPath {
    pub fn path(&self) -> &str {
        match self {
            StructuralPath::Text { path, .. } => path,
            StructuralPath::Image { path } => path,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, StructuralPath::Image { .. })
    }
}
