//! Refit maintenance for GPU-resident compressed wide (8-ary) BVHs.
//!
//! The static CWBVH builder produces a quantized, pointer-free wide-node
//! buffer once; this crate re-derives an explicit traversal index from it so
//! that deforming (skinned) geometry can have its bounds refit bottom-up
//! every frame - leaves first, root last - and re-encoded into the same
//! compact wire format without ever rebuilding the tree.
//!
//! The per-frame path is designed for data-parallel execution: the
//! linearized entries, fixed-shape adjacency records and depth buckets are
//! flat buffer contracts a GPU backend can bind directly, and the CPU
//! executor in [`cwbvh::refit`] runs the identical kernel host-side.

pub mod cwbvh;
pub mod error;
pub mod lighting;

pub use cwbvh::{
    Aabb, AdjacencyRecord, CompressedNode, DeformableBvh, RefitIndexEntry, RefitOptions,
    RefitStats, Triangle, TriangleOwnerRecord, WideNode,
};
pub use error::{RefitError, RefitResult};
pub use lighting::{LightImportanceBuilder, LightImportanceTable, LightTriangle};
