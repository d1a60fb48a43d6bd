//! Marginalia
//!
//! Durable anchoring and inline rendering of user annotations ("marks")
//! inside rendered documents.
//!
//! # Modules
//!
//! - `dom`: Owned node tree, XHTML parsing/serialization and structural selectors
//! - `anchor`: Position indexing, fuzzy matching and locator capture/resolution
//! - `render`: Wrapping selections in marker elements and restyling them in place
//! - `marks`: Annotation groups, comment threads and the optimistic mark manager
//! - `inject`: One-shot server-side rendering of stored marks into markup

pub mod anchor;
pub mod config;
pub mod dom;
pub mod error;
pub mod inject;
pub mod marks;
pub mod render;

pub use config::MarkerConfig;
pub use error::{MarkError, Result};
