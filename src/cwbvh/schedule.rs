// src/cwbvh/schedule.rs
// Depth scheduler - buckets linearized entries into depth-ordered refit wavefronts.
// This file exists to produce the dispatch order for the bottom-up refit: deepest bucket
// first, each bucket independently parallel, strict barrier between buckets.
// RELEVANT FILES:src/cwbvh/linearize.rs,src/cwbvh/refit.rs

use crate::error::{RefitError, RefitResult};

use super::linearize::LinearizedTree;

/// Bucket entries by depth. Execution order is depth descending - a parent's
/// bounds are only correct once every deeper bucket has fully completed, and
/// that barrier is the sole ordering the dispatching host must enforce.
/// Rebuilt only on topology changes, not per frame.
pub fn build_depth_buckets(tree: &LinearizedTree) -> RefitResult<Vec<Vec<u32>>> {
    let has_internal = tree.entries.iter().skip(1).any(|entry| !entry.is_leaf);
    if tree.max_depth == 0 && (has_internal || tree.entries.len() > 1) {
        return Err(RefitError::impossible_tree(
            "max depth 0 with linearized children present",
        ));
    }

    let mut buckets = vec![Vec::new(); tree.max_depth as usize + 1];
    for entry in &tree.entries {
        buckets[entry.depth as usize].push(entry.self_index);
    }
    Ok(buckets)
}
