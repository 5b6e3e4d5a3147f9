// src/cwbvh/types.rs
// Core types for CWBVH refit maintenance - AABBs, wire nodes, and linearized records.
// This file exists to provide GPU-compatible data structures shared by the codec, linearizer, and refit passes.
// RELEVANT FILES:src/cwbvh/codec.rs,src/cwbvh/linearize.rs,src/cwbvh/adjacency.rs

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

/// Child slots per wide node
pub const WIDE_LANES: usize = 8;

/// Axis-aligned bounding box - GPU compatible layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Aabb {
    pub min: [f32; 3],
    pub _pad0: f32,
    pub max: [f32; 3],
    pub _pad1: f32,
}

impl Aabb {
    /// Create empty AABB (inverted bounds for union operations)
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            _pad0: 0.0,
            max: [f32::NEG_INFINITY; 3],
            _pad1: 0.0,
        }
    }

    /// Create AABB from min/max points
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            min,
            _pad0: 0.0,
            max,
            _pad1: 0.0,
        }
    }

    /// Expand AABB to include a point
    pub fn expand_point(&mut self, point: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    /// Expand AABB to include another AABB
    pub fn expand_aabb(&mut self, other: &Aabb) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(other.min[i]);
            self.max[i] = self.max[i].max(other.max[i]);
        }
    }

    /// Get AABB center
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Get AABB extent (max - min)
    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Check if AABB is valid (min <= max)
    pub fn is_valid(&self) -> bool {
        self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
    }

    /// Check if this AABB contains another, with per-axis tolerance
    pub fn contains_aabb(&self, other: &Aabb, tolerance: [f32; 3]) -> bool {
        (0..3).all(|i| {
            self.min[i] <= other.min[i] + tolerance[i] && self.max[i] >= other.max[i] - tolerance[i]
        })
    }

    /// Return a copy grown by `padding` on every side
    pub fn padded(&self, padding: f32) -> Aabb {
        Aabb::new(
            [
                self.min[0] - padding,
                self.min[1] - padding,
                self.min[2] - padding,
            ],
            [
                self.max[0] + padding,
                self.max[1] + padding,
                self.max[2] + padding,
            ],
        )
    }

    /// Transform by an affine matrix, producing the AABB of the transformed box.
    /// Uses the center/extent form with the absolute rotation part so the
    /// result never under-approximates.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let center = (Vec3::from(self.min) + Vec3::from(self.max)) * 0.5;
        let extent = (Vec3::from(self.max) - Vec3::from(self.min)) * 0.5;

        let new_center = matrix.transform_point3(center);
        let abs_rotation = Mat3::from_cols(
            matrix.x_axis.truncate().abs(),
            matrix.y_axis.truncate().abs(),
            matrix.z_axis.truncate().abs(),
        );
        let new_extent = abs_rotation * extent;

        Aabb::new(
            (new_center - new_extent).into(),
            (new_center + new_extent).into(),
        )
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Triangle with live (deformed) vertex positions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub v0: [f32; 3],
    pub v1: [f32; 3],
    pub v2: [f32; 3],
}

impl Triangle {
    /// Create triangle from vertices
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Self {
        Self { v0, v1, v2 }
    }

    /// Get triangle AABB
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        aabb.expand_point(self.v0);
        aabb.expand_point(self.v1);
        aabb.expand_point(self.v2);
        aabb
    }

    /// Get triangle normal (not normalized)
    pub fn normal(&self) -> [f32; 3] {
        let e1 = Vec3::from(self.v1) - Vec3::from(self.v0);
        let e2 = Vec3::from(self.v2) - Vec3::from(self.v0);
        e1.cross(e2).into()
    }

    /// Get triangle area
    pub fn area(&self) -> f32 {
        Vec3::from(self.normal()).length() * 0.5
    }
}

/// Compute the union AABB of a triangle set (untransformed object bounds)
pub fn compute_object_aabb(triangles: &[Triangle]) -> Aabb {
    let mut aabb = Aabb::empty();
    for triangle in triangles {
        aabb.expand_aabb(&triangle.aabb());
    }
    aabb
}

/// Compressed wide node - the 80-byte wire format produced by the static
/// builder and re-uploaded after recompression. Byte layout, per u32 word:
/// origin xyz | e.x|e.y|e.z|imask | base child | base triangle | meta 0-3 |
/// meta 4-7 | then per axis: qmin 0-3, qmin 4-7, qmax 0-3, qmax 4-7.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CompressedNode {
    pub origin: [f32; 3],
    pub e_imask: u32,
    pub base_index_child: u32,
    pub base_index_triangle: u32,
    pub meta: [u32; 2],
    pub q_min_x: [u32; 2],
    pub q_max_x: [u32; 2],
    pub q_min_y: [u32; 2],
    pub q_max_y: [u32; 2],
    pub q_min_z: [u32; 2],
    pub q_max_z: [u32; 2],
}

/// Unpacked working form of a compressed node. Field-per-field mirror of the
/// wire format with the byte lanes split out, so the codec and linearizer can
/// index slots directly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WideNode {
    pub origin: [f32; 3],
    /// Per-axis quantization exponent; scale = 2^(e - 127)
    pub exponent: [u8; 3],
    /// Bitmask of slots holding internal children
    pub imask: u8,
    pub base_index_child: u32,
    pub base_index_triangle: u32,
    pub meta: [u8; WIDE_LANES],
    /// Per-axis, per-slot quantized bounds relative to origin and scale
    pub quantized_min: [[u8; WIDE_LANES]; 3],
    pub quantized_max: [[u8; WIDE_LANES]; 3],
}

/// One linearized {node, slot} visit. The arena of these is the refit index:
/// all cross-references are integer indices so the array can be consumed as a
/// flat GPU buffer. `bounds` is the only field mutated after construction.
#[derive(Debug, Clone, Copy)]
pub struct RefitIndexEntry {
    pub self_index: u32,
    /// Index of the entry whose expansion appended this one; the root
    /// sentinel at index 0 points at itself.
    pub parent_index: u32,
    pub slot_in_parent: u8,
    /// Root = 0; always parent depth + 1
    pub depth: u32,
    pub is_leaf: bool,
    /// Back-reference into the compressed node array
    pub source_node: u32,
    pub source_slot: u8,
    /// Refreshed by the wavefront passes each frame
    pub bounds: Aabb,
}

/// Maps one owned primitive to its leaf entry, in both the CWBVH-reordered
/// numbering and the original numbering given by the builder's remap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleOwnerRecord {
    /// Index into the CWBVH-ordered triangle array
    pub cwbvh_triangle: u32,
    /// Original primitive index (remap applied)
    pub source_triangle: u32,
    /// `self_index` of the owning leaf entry
    pub owner: u32,
}

/// Fixed-shape adjacency for one linearized entry, safe to upload verbatim.
/// `children[s]` holds a child entry index (leaf_info[s] == 0), a triangle
/// run length (leaf_info[s] > 0, leaf_info[s] - 1 is the absolute first
/// triangle), or the empty sentinel -1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct AdjacencyRecord {
    pub children: [i32; WIDE_LANES],
    pub leaf_info: [i32; WIDE_LANES],
}

/// Sentinel for slots that must not be traversed
pub const EMPTY_SLOT: i32 = -1;

impl AdjacencyRecord {
    pub fn empty() -> Self {
        Self {
            children: [EMPTY_SLOT; WIDE_LANES],
            leaf_info: [EMPTY_SLOT; WIDE_LANES],
        }
    }
}

impl Default for AdjacencyRecord {
    fn default() -> Self {
        Self::empty()
    }
}
