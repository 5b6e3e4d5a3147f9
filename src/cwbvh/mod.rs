// src/cwbvh/mod.rs
// CWBVH refit maintenance - unified API over linearization, scheduling, refit and recompression.
// This module keeps a compressed wide BVH's bounds fresh over deforming geometry without
// rebuilding its topology: build the index once per topology change, refit every frame.
// RELEVANT FILES:src/cwbvh/linearize.rs,src/cwbvh/refit.rs,src/cwbvh/recompress.rs

pub mod adjacency;
pub mod codec;
pub mod linearize;
pub mod recompress;
pub mod refit;
pub mod schedule;
pub mod types;

pub use codec::SlotKind;
pub use linearize::LinearizedTree;
pub use refit::{RefitOptions, RefitStats};
pub use types::{
    compute_object_aabb, Aabb, AdjacencyRecord, CompressedNode, RefitIndexEntry, Triangle,
    TriangleOwnerRecord, WideNode, EMPTY_SLOT, WIDE_LANES,
};

use anyhow::{Context, Result};

/// A compressed wide BVH plus the derived traversal index that lets its
/// bounds be refit bottom-up every frame.
///
/// Long-lived: built whenever topology changes (replaced wholesale, never
/// patched), then only bounds and quantized bytes move per frame. The
/// linearized entries, adjacency records and depth buckets are the exact
/// buffers a GPU refit backend binds per wavefront dispatch.
pub struct DeformableBvh {
    nodes: Vec<WideNode>,
    tree: LinearizedTree,
    adjacency: Vec<AdjacencyRecord>,
    buckets: Vec<Vec<u32>>,
    triangle_remap: Vec<u32>,
    options: RefitOptions,
}

impl DeformableBvh {
    /// Build the refit index from the static builder's output: the
    /// compressed node array and the primitive remap table (CWBVH-ordered
    /// slot -> original primitive index).
    pub fn build(compressed: &[CompressedNode], triangle_remap: &[u32]) -> Result<Self> {
        Self::build_with_options(compressed, triangle_remap, RefitOptions::default())
    }

    pub fn build_with_options(
        compressed: &[CompressedNode],
        triangle_remap: &[u32],
        options: RefitOptions,
    ) -> Result<Self> {
        let nodes: Vec<WideNode> = compressed.iter().map(codec::unpack_node).collect();
        let tree = linearize::linearize(&nodes, triangle_remap)
            .context("linearizing compressed wide BVH")?;
        let adjacency = adjacency::build_adjacency(&nodes, &tree);
        let buckets =
            schedule::build_depth_buckets(&tree).context("scheduling refit wavefronts")?;

        log::debug!(
            "refit index ready: {} nodes, {} entries, {} wavefronts",
            nodes.len(),
            tree.entries.len(),
            buckets.len()
        );

        Ok(Self {
            nodes,
            tree,
            adjacency,
            buckets,
            triangle_remap: triangle_remap.to_vec(),
            options,
        })
    }

    /// Refit all bounds from live triangle positions (indexed by original
    /// primitive index) and recompress them into the node array. Runs the
    /// full wavefront sequence, leaves first, root last.
    pub fn refit(&mut self, live: &[Triangle]) -> Result<RefitStats> {
        if live.is_empty() && !self.triangle_remap.is_empty() {
            return Err(crate::error::RefitError::topology(
                "live triangle buffer is empty but the tree references triangles",
            )
            .into());
        }
        if live.len() < self.triangle_remap.len() {
            log::warn!(
                "live buffer holds {} triangles, tree references {}; affected leaves will degrade",
                live.len(),
                self.triangle_remap.len()
            );
        }
        let stats = refit::run_wavefronts(
            &mut self.tree.entries,
            &self.adjacency,
            &self.buckets,
            &self.triangle_remap,
            live,
            &self.options,
        );
        recompress::write_refreshed_bounds(&mut self.nodes, &self.tree)
            .context("recompressing refreshed bounds")?;
        Ok(stats)
    }

    /// Pack the current node array for upload. Byte-identical in shape to
    /// the static builder's output; before the first refit it reproduces the
    /// input exactly.
    pub fn compressed_nodes(&self) -> Vec<CompressedNode> {
        recompress::pack_nodes(&self.nodes)
    }

    /// Root bounds after the last refit (union of the final wavefront)
    pub fn root_bounds(&self) -> Aabb {
        self.tree.entries[0].bounds
    }

    pub fn wavefront_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_remap.len() as u32
    }

    /// Linearized refit entries, the read/write bounds buffer of the GPU contract
    pub fn entries(&self) -> &[RefitIndexEntry] {
        &self.tree.entries
    }

    /// Fixed-shape adjacency records, uploadable verbatim
    pub fn adjacency(&self) -> &[AdjacencyRecord] {
        &self.adjacency
    }

    /// Depth buckets; dispatch order is last bucket first
    pub fn depth_buckets(&self) -> &[Vec<u32>] {
        &self.buckets
    }

    /// Triangle-to-leaf ownership, fixed frame-to-frame
    pub fn triangle_owners(&self) -> &[TriangleOwnerRecord] {
        &self.tree.owners
    }

    /// Per compressed node, the entry that expanded it
    pub fn node_to_entry(&self) -> &[u32] {
        &self.tree.node_to_entry
    }
}
