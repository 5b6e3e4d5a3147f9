// src/cwbvh/refit.rs
// CPU reference executor for the per-wavefront refit kernel.
// This file exists to run the bucket passes host-side with the exact buffer contracts the
// GPU backend consumes: each entry reads only its own adjacency record and its children's
// already-final bounds, and writes only its own bounds.
// RELEVANT FILES:src/cwbvh/schedule.rs,src/cwbvh/adjacency.rs,src/cwbvh/recompress.rs

use super::types::{Aabb, AdjacencyRecord, RefitIndexEntry, Triangle, WIDE_LANES};

/// Tunables for the per-frame refit
#[derive(Debug, Clone, Copy)]
pub struct RefitOptions {
    /// Relative padding (fraction of the largest extent) applied when a
    /// faulted leaf falls back to its previous bounds
    pub fault_padding_rel: f32,
    /// Absolute padding floor for the same fallback
    pub fault_padding_abs: f32,
}

impl Default for RefitOptions {
    fn default() -> Self {
        Self {
            fault_padding_rel: 0.005,
            fault_padding_abs: 1e-4,
        }
    }
}

/// Per-frame refit statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefitStats {
    /// Buckets executed, deepest first
    pub wavefronts: u32,
    pub entries_refit: u32,
    /// Leaves that referenced geometry beyond the live buffer and reused
    /// expanded previous-frame bounds instead
    pub leaf_faults: u32,
}

fn fault_expanded(bounds: &Aabb, options: &RefitOptions) -> Aabb {
    let extent = bounds.extent();
    let span = extent[0].max(extent[1]).max(extent[2]).max(0.0);
    bounds.padded(span * options.fault_padding_rel + options.fault_padding_abs)
}

/// Run every wavefront, deepest bucket first. Buckets are processed to
/// completion before the next shallower one starts; that sequencing is the
/// happens-before barrier the GPU backend reproduces with a fence between
/// dispatches. `live` holds deformed triangle positions indexed by original
/// primitive index; `triangle_remap` translates the CWBVH-ordered runs
/// stored in `leaf_info`.
///
/// A leaf whose run falls outside `live` is a reported fault: its previous
/// bounds are reused, conservatively expanded, never shrunk. The frame
/// degrades instead of crashing.
pub fn run_wavefronts(
    entries: &mut [RefitIndexEntry],
    adjacency: &[AdjacencyRecord],
    buckets: &[Vec<u32>],
    triangle_remap: &[u32],
    live: &[Triangle],
    options: &RefitOptions,
) -> RefitStats {
    let mut stats = RefitStats::default();

    for bucket in buckets.iter().rev() {
        for &index in bucket {
            let record = &adjacency[index as usize];
            let mut bounds = Aabb::empty();
            let mut fault = false;

            for slot in 0..WIDE_LANES {
                let child = record.children[slot];
                if child < 0 {
                    continue;
                }
                if record.leaf_info[slot] > 0 {
                    let first = (record.leaf_info[slot] - 1) as usize;
                    for cwbvh_triangle in first..first + child as usize {
                        let triangle = triangle_remap
                            .get(cwbvh_triangle)
                            .and_then(|&source| live.get(source as usize));
                        match triangle {
                            Some(triangle) => {
                                bounds.expand_point(triangle.v0);
                                bounds.expand_point(triangle.v1);
                                bounds.expand_point(triangle.v2);
                            }
                            None => fault = true,
                        }
                    }
                } else if child as u32 != index {
                    // Child bounds were finalized by a deeper bucket.
                    bounds.expand_aabb(&entries[child as usize].bounds);
                }
            }

            let entry = &mut entries[index as usize];
            if fault {
                log::warn!(
                    "refit fault at entry {index}: leaf run beyond live buffer of {}; reusing expanded previous bounds",
                    live.len()
                );
                stats.leaf_faults += 1;
                entry.bounds = fault_expanded(&entry.bounds, options);
            } else if bounds.is_valid() {
                entry.bounds = bounds;
            }
            stats.entries_refit += 1;
        }
        stats.wavefronts += 1;
    }

    stats
}
