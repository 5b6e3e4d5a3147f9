// src/cwbvh/recompress.rs
// Node recompressor - re-quantize refreshed bounds back into the compact wire format.
// This file exists to make the refit output byte-compatible with the static builder's
// format so the buffer can be re-uploaded wherever the original is expected.
// RELEVANT FILES:src/cwbvh/codec.rs,src/cwbvh/refit.rs,src/cwbvh/types.rs

use crate::error::RefitResult;

use super::codec::{encode_slot_bounds, pack_node};
use super::linearize::LinearizedTree;
use super::types::{CompressedNode, WideNode};

/// Scatter every entry's refreshed bounds back to its {node, slot} and
/// re-quantize with the node's existing exponent/origin. Topology never
/// changes during refit, so meta, imask and base indices stay untouched;
/// slots the linearizer skipped keep their original bytes.
pub fn write_refreshed_bounds(nodes: &mut [WideNode], tree: &LinearizedTree) -> RefitResult<()> {
    for entry in tree.entries.iter().skip(1) {
        let node_index = entry.source_node;
        let node = &mut nodes[node_index as usize];
        encode_slot_bounds(node, node_index, entry.source_slot as usize, &entry.bounds)?;
    }
    Ok(())
}

/// Pack the full node array into the upload format
pub fn pack_nodes(nodes: &[WideNode]) -> Vec<CompressedNode> {
    nodes.iter().map(pack_node).collect()
}
