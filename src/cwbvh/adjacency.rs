// src/cwbvh/adjacency.rs
// Adjacency builder - fixed 8-slot forward/reverse links over the linearized entries.
// This file exists to give refit kernels a pointer-free, doubly-navigable view of the tree
// as one flat, fixed-shape record per entry.
// RELEVANT FILES:src/cwbvh/linearize.rs,src/cwbvh/refit.rs,src/cwbvh/types.rs

use super::codec::{decode_slot, SlotKind};
use super::linearize::LinearizedTree;
use super::types::{AdjacencyRecord, WideNode};

/// Build one adjacency record per linearized entry in two linear passes.
///
/// Self pass: each entry writes its own slot classification into its own
/// record - leaves store their triangle run (children = run length,
/// leaf_info = absolute first triangle + 1, the +1 reserving 0 as "no run"),
/// internal entries store their own index.
///
/// Propagation pass: each entry writes its index into its parent's slot,
/// completing the reverse links. The root sentinel is skipped - propagating
/// it into itself would create a self-loop in its own slot 0.
///
/// Slots never visited by the linearizer stay at the -1 sentinel.
pub fn build_adjacency(nodes: &[WideNode], tree: &LinearizedTree) -> Vec<AdjacencyRecord> {
    let mut records = vec![AdjacencyRecord::empty(); tree.entries.len()];

    for entry in tree.entries.iter().skip(1) {
        let slot = entry.slot_in_parent as usize;
        let record = &mut records[entry.self_index as usize];
        if entry.is_leaf {
            let node = &nodes[entry.source_node as usize];
            if let SlotKind::Leaf {
                first_triangle,
                triangle_count,
            } = decode_slot(node, entry.source_slot as usize)
            {
                record.children[slot] = triangle_count as i32;
                record.leaf_info[slot] = first_triangle as i32 + 1;
            }
        } else {
            record.children[slot] = entry.self_index as i32;
            record.leaf_info[slot] = 0;
        }
    }

    for entry in tree.entries.iter().skip(1) {
        let record = &mut records[entry.parent_index as usize];
        record.children[entry.slot_in_parent as usize] = entry.self_index as i32;
        record.leaf_info[entry.slot_in_parent as usize] = 0;
    }

    records
}
