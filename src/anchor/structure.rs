//! Structural capture
//!
//! Turns a live range into `StructuralPath`s: one text path per run of
//! covered text sharing a block ancestor, with offsets relative to that
//! block, and one image path per image element inside the range.

use std::collections::HashMap;

use crate::dom::{NodeId, Surface, TextRange};

use super::position::PositionIndexer;
use super::types::StructuralPath;

struct Run {
    block: NodeId,
    order: usize,
    start: usize,
    end: usize,
}

/// Structural paths covering `range`, in document order
pub fn capture_structural(surface: Surface<'_>, range: &TextRange) -> Vec<StructuralPath> {
    let indexer = PositionIndexer::new(surface);
    let mut ordered: Vec<(usize, StructuralPath)> = Vec::new();

    if let Some((start, end)) = indexer.range_offsets(range) {
        let mut block_indexers: HashMap<NodeId, PositionIndexer<'_>> = HashMap::new();
        let mut runs: Vec<Run> = Vec::new();

        for slice in indexer.slices(start, end) {
            let block = surface.block_of(slice.node);
            let block_indexer = block_indexers
                .entry(block)
                .or_insert_with(|| PositionIndexer::new(surface.within(block)));
            let Some(local_start) = block_indexer.point_to_offset(slice.node, slice.start) else {
                continue;
            };
            let local_end = local_start + slice.len();

            match runs.last_mut() {
                Some(run) if run.block == block && run.end == local_start => run.end = local_end,
                _ => runs.push(Run {
                    block,
                    order: indexer.position(slice.node).unwrap_or_default(),
                    start: local_start,
                    end: local_end,
                }),
            }
        }

        for run in runs {
            if let Some(path) = surface.selector_for(run.block) {
                ordered.push((
                    run.order,
                    StructuralPath::Text {
                        path,
                        start: run.start,
                        end: run.end,
                    },
                ));
            }
        }
    }

    for image in indexer.images_in(range) {
        if let Some(path) = surface.selector_for(image) {
            let order = indexer.position(image).unwrap_or_default();
            ordered.push((order, StructuralPath::Image { path }));
        }
    }

    ordered.sort_by_key(|(order, _)| *order);
    ordered.into_iter().map(|(_, path)| path).collect()
}
