// src/cwbvh/linearize.rs
// Tree linearizer - one recursive walk of the static compressed tree into a flat refit arena.
// This file exists to turn the pointer-free wide-node encoding into an explicit index that
// data-parallel refit kernels can navigate without following pointers.
// RELEVANT FILES:src/cwbvh/codec.rs,src/cwbvh/adjacency.rs,src/cwbvh/schedule.rs

use crate::error::{RefitError, RefitResult};

use super::codec::{decode_slot, decode_slot_bounds, SlotKind};
use super::types::{Aabb, RefitIndexEntry, TriangleOwnerRecord, WideNode, WIDE_LANES};

/// Hard recursion cap; a well-formed CWBVH never gets near this, so hitting
/// it means a child-index cycle in the input.
pub const MAX_TREE_DEPTH: u32 = 64;

/// Flat traversal index produced by a single walk of the static tree.
/// The entry arena is never resized after construction; the refit pass
/// mutates `bounds` in place.
#[derive(Debug, Clone)]
pub struct LinearizedTree {
    pub entries: Vec<RefitIndexEntry>,
    pub owners: Vec<TriangleOwnerRecord>,
    /// Per compressed node, the `self_index` of the entry that expanded it
    pub node_to_entry: Vec<u32>,
    pub max_depth: u32,
}

impl LinearizedTree {
    /// Number of refit wavefronts (depth buckets) this tree needs
    pub fn wavefront_count(&self) -> u32 {
        self.max_depth + 1
    }
}

struct Walker<'a> {
    nodes: &'a [WideNode],
    /// CWBVH-ordered slot -> original primitive index
    triangle_remap: &'a [u32],
    entries: Vec<RefitIndexEntry>,
    owners: Vec<TriangleOwnerRecord>,
    node_to_entry: Vec<u32>,
    max_depth: u32,
}

impl<'a> Walker<'a> {
    fn push_entry(
        &mut self,
        parent_entry: u32,
        slot: usize,
        depth: u32,
        is_leaf: bool,
        source_node: u32,
        bounds: Aabb,
    ) -> u32 {
        let self_index = self.entries.len() as u32;
        self.entries.push(RefitIndexEntry {
            self_index,
            parent_index: parent_entry,
            slot_in_parent: slot as u8,
            depth,
            is_leaf,
            source_node,
            source_slot: slot as u8,
            bounds,
        });
        self.max_depth = self.max_depth.max(depth);
        self_index
    }

    /// Expand `node_index`, whose referencing entry is `parent_entry` at
    /// depth `depth`. Slot order 0-7 is required: traversal order only
    /// affects the numbering, but it must be deterministic so rebuilt
    /// buffers are reproducible.
    fn expand(&mut self, node_index: u32, parent_entry: u32, depth: u32) -> RefitResult<()> {
        if depth >= MAX_TREE_DEPTH {
            return Err(RefitError::malformed(
                node_index,
                0,
                format!("tree depth exceeds {MAX_TREE_DEPTH}; child indices likely form a cycle"),
            ));
        }
        self.node_to_entry[node_index as usize] = parent_entry;
        let nodes = self.nodes;
        let node = &nodes[node_index as usize];

        for slot in 0..WIDE_LANES {
            match decode_slot(node, slot) {
                SlotKind::Empty => continue,
                SlotKind::Leaf {
                    first_triangle,
                    triangle_count,
                } => {
                    let bounds = decode_slot_bounds(node, slot);
                    let entry = self.push_entry(
                        parent_entry,
                        slot,
                        depth + 1,
                        true,
                        node_index,
                        bounds,
                    );
                    for cwbvh_triangle in first_triangle..first_triangle + triangle_count {
                        let source_triangle = *self
                            .triangle_remap
                            .get(cwbvh_triangle as usize)
                            .ok_or_else(|| {
                                RefitError::malformed(
                                    node_index,
                                    slot as u8,
                                    format!(
                                        "leaf references triangle {cwbvh_triangle} beyond remap table of {}",
                                        self.triangle_remap.len()
                                    ),
                                )
                            })?;
                        self.owners.push(TriangleOwnerRecord {
                            cwbvh_triangle,
                            source_triangle,
                            owner: entry,
                        });
                    }
                }
                SlotKind::Internal { child_index } => {
                    if child_index as usize >= self.nodes.len() {
                        return Err(RefitError::malformed(
                            node_index,
                            slot as u8,
                            format!(
                                "child index {child_index} beyond node buffer of {}",
                                self.nodes.len()
                            ),
                        ));
                    }
                    let bounds = decode_slot_bounds(node, slot);
                    let entry = self.push_entry(
                        parent_entry,
                        slot,
                        depth + 1,
                        false,
                        node_index,
                        bounds,
                    );
                    self.expand(child_index, entry, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Linearize a static compressed tree rooted at node 0 into the flat refit
/// index. `triangle_remap` is the static builder's reorder table; its length
/// is the CWBVH-ordered triangle count.
pub fn linearize(nodes: &[WideNode], triangle_remap: &[u32]) -> RefitResult<LinearizedTree> {
    if nodes.is_empty() {
        return Err(RefitError::malformed(0, 0, "empty node buffer"));
    }

    let mut walker = Walker {
        nodes,
        triangle_remap,
        entries: Vec::new(),
        owners: Vec::with_capacity(triangle_remap.len()),
        node_to_entry: vec![0; nodes.len()],
        max_depth: 0,
    };

    // Root sentinel: parent is itself, depth 0, never refit directly. Its
    // bounds become the union written by its children in the last wavefront.
    walker.entries.push(RefitIndexEntry {
        self_index: 0,
        parent_index: 0,
        slot_in_parent: 0,
        depth: 0,
        is_leaf: false,
        source_node: 0,
        source_slot: 0,
        bounds: Aabb::empty(),
    });
    walker.expand(0, 0, 0)?;

    if walker.entries.len() > 1 && walker.max_depth == 0 {
        return Err(RefitError::impossible_tree(
            "linearization recorded zero depth for a non-trivial tree",
        ));
    }

    log::debug!(
        "linearized {} entries, {} triangle owners, max depth {}",
        walker.entries.len(),
        walker.owners.len(),
        walker.max_depth
    );

    Ok(LinearizedTree {
        entries: walker.entries,
        owners: walker.owners,
        node_to_entry: walker.node_to_entry,
        max_depth: walker.max_depth,
    })
}
