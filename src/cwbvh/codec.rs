// src/cwbvh/codec.rs
// Quantized node codec - decode/encode the byte-quantized wide-node bounds and meta bytes.
// This file exists to centralize the wire-format bit tricks as pure, testable functions.
// RELEVANT FILES:src/cwbvh/types.rs,src/cwbvh/linearize.rs,src/cwbvh/recompress.rs

use crate::error::{RefitError, RefitResult};

use super::types::{Aabb, CompressedNode, WideNode, WIDE_LANES};

/// Meta offsets below this value mark leaf slots; internal child offsets are
/// biased by it. Fixed wire-format contract, not a tunable.
const INTERNAL_OFFSET_BIAS: u8 = 24;

/// Decoded classification of one child slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Unused slot; refit kernels must not traverse it
    Empty,
    /// Contiguous triangle run. `first_triangle` is absolute (node base
    /// offset already applied).
    Leaf {
        first_triangle: u32,
        triangle_count: u32,
    },
    /// Index of another node in the same array
    Internal { child_index: u32 },
}

/// Per-axis quantization scale: reinterpreting `exponent << 23` as an IEEE
/// float with zero mantissa and sign yields 2^(exponent - 127) directly.
#[inline]
pub fn exponent_scale(exponent: u8) -> f32 {
    f32::from_bits((exponent as u32) << 23)
}

/// Classify slot `slot` of `node` from its meta byte
pub fn decode_slot(node: &WideNode, slot: usize) -> SlotKind {
    let meta = node.meta[slot];
    if meta == 0 {
        return SlotKind::Empty;
    }
    let offset = meta & 0x1f;
    if offset < INTERNAL_OFFSET_BIAS {
        SlotKind::Leaf {
            first_triangle: node.base_index_triangle + offset as u32,
            // High 3 bits are a unary run-length indicator
            triangle_count: (meta >> 5).count_ones(),
        }
    } else {
        SlotKind::Internal {
            child_index: node.base_index_child + (offset - INTERNAL_OFFSET_BIAS) as u32,
        }
    }
}

/// Decode the linear AABB stored in slot `slot`
pub fn decode_slot_bounds(node: &WideNode, slot: usize) -> Aabb {
    let mut min = [0.0f32; 3];
    let mut max = [0.0f32; 3];
    for axis in 0..3 {
        let scale = exponent_scale(node.exponent[axis]);
        min[axis] = node.quantized_min[axis][slot] as f32 * scale + node.origin[axis];
        max[axis] = node.quantized_max[axis][slot] as f32 * scale + node.origin[axis];
    }
    Aabb::new(min, max)
}

/// Re-quantize `bounds` into slot `slot` using the node's existing
/// exponent/origin. The exponent is never re-derived here: siblings share it
/// and the static builder fixed it per node. Min truncates toward 0 and max
/// rounds toward 255 so the decoded box never shrinks the true bounds; a
/// byte outside [0, 255] is refused rather than clamped, since clamping
/// would shrink the decoded box.
pub fn encode_slot_bounds(
    node: &mut WideNode,
    node_index: u32,
    slot: usize,
    bounds: &Aabb,
) -> RefitResult<()> {
    for axis in 0..3 {
        let scale = exponent_scale(node.exponent[axis]);
        let q_min = ((bounds.min[axis] - node.origin[axis]) / scale).floor();
        let q_max = ((bounds.max[axis] - node.origin[axis]) / scale).ceil();
        if !(0.0..=255.0).contains(&q_min) {
            return Err(RefitError::QuantizationOverflow {
                node: node_index,
                slot: slot as u8,
                axis,
                value: q_min,
            });
        }
        if !(0.0..=255.0).contains(&q_max) {
            return Err(RefitError::QuantizationOverflow {
                node: node_index,
                slot: slot as u8,
                axis,
                value: q_max,
            });
        }
        node.quantized_min[axis][slot] = q_min as u8;
        node.quantized_max[axis][slot] = q_max as u8;
    }
    Ok(())
}

/// Smallest per-axis exponent whose scale covers `extent` with 8-bit bytes.
/// Builder-side helper (and test scaffolding); the refit path never derives
/// exponents.
pub fn choose_exponent(extent: f32) -> u8 {
    if extent <= 0.0 {
        return 1;
    }
    let required = extent / 255.0;
    let mut exponent = ((required.to_bits() >> 23) & 0xff) as u8;
    // A non-zero mantissa means the power of two below `required`; step up.
    if exponent_scale(exponent) < required {
        exponent = exponent.saturating_add(1);
    }
    exponent.max(1)
}

#[inline]
fn unpack_lanes(words: &[u32; 2]) -> [u8; WIDE_LANES] {
    let mut lanes = [0u8; WIDE_LANES];
    for (i, lane) in lanes.iter_mut().enumerate() {
        *lane = (words[i / 4] >> ((i % 4) * 8)) as u8;
    }
    lanes
}

#[inline]
fn pack_lanes(lanes: &[u8; WIDE_LANES]) -> [u32; 2] {
    let mut words = [0u32; 2];
    for (i, &lane) in lanes.iter().enumerate() {
        words[i / 4] |= (lane as u32) << ((i % 4) * 8);
    }
    words
}

/// Unpack one wire node into the slot-indexable working form
pub fn unpack_node(raw: &CompressedNode) -> WideNode {
    WideNode {
        origin: raw.origin,
        exponent: [
            raw.e_imask as u8,
            (raw.e_imask >> 8) as u8,
            (raw.e_imask >> 16) as u8,
        ],
        imask: (raw.e_imask >> 24) as u8,
        base_index_child: raw.base_index_child,
        base_index_triangle: raw.base_index_triangle,
        meta: unpack_lanes(&raw.meta),
        quantized_min: [
            unpack_lanes(&raw.q_min_x),
            unpack_lanes(&raw.q_min_y),
            unpack_lanes(&raw.q_min_z),
        ],
        quantized_max: [
            unpack_lanes(&raw.q_max_x),
            unpack_lanes(&raw.q_max_y),
            unpack_lanes(&raw.q_max_z),
        ],
    }
}

/// Pack a working node back into the wire format. Exact inverse of
/// [`unpack_node`].
pub fn pack_node(node: &WideNode) -> CompressedNode {
    CompressedNode {
        origin: node.origin,
        e_imask: node.exponent[0] as u32
            | (node.exponent[1] as u32) << 8
            | (node.exponent[2] as u32) << 16
            | (node.imask as u32) << 24,
        base_index_child: node.base_index_child,
        base_index_triangle: node.base_index_triangle,
        meta: pack_lanes(&node.meta),
        q_min_x: pack_lanes(&node.quantized_min[0]),
        q_max_x: pack_lanes(&node.quantized_max[0]),
        q_min_y: pack_lanes(&node.quantized_min[1]),
        q_max_y: pack_lanes(&node.quantized_max[1]),
        q_min_z: pack_lanes(&node.quantized_min[2]),
        q_max_z: pack_lanes(&node.quantized_max[2]),
    }
}
