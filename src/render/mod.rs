//! Rendering module
//!
//! Turns annotation groups into inline marker elements and back:
//!
//! - `fragment`: decomposition of paths and ranges into wrappable pieces
//! - `painter`: the `MarkRenderer` (create/update paint, unwrap, click routing)

mod fragment;
mod painter;

pub use fragment::{fragments_for_offsets, fragments_for_path, fragments_for_source, Fragment};
pub use painter::{
    ClickEvent, ClickHandler, MarkRenderer, MarkState, PaintMode, PaintReport, PaintTarget,
};
