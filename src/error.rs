//! Central error handling for the CWBVH refit subsystem
//!
//! Provides a unified RefitError enum with consistent categorization:
//! structural faults in the compressed input, quantization overflow on
//! re-encode, topology/geometry mismatches, and impossible-tree build bugs.

/// Centralized error type for all refit-index operations
#[derive(thiserror::Error, Debug)]
pub enum RefitError {
    /// The compressed input decodes to an out-of-range child or triangle
    /// index. Fatal for the affected node: refusing to refit is preferred
    /// over corrupting downstream GPU buffer reads.
    #[error("malformed node {node} slot {slot}: {reason}")]
    MalformedNode { node: u32, slot: u8, reason: String },

    /// A refreshed bound does not fit the node's fixed exponent/origin.
    /// Clamping would shrink the decoded bounds, so this is refused.
    #[error("quantization overflow in node {node} slot {slot} axis {axis}: byte value {value}")]
    QuantizationOverflow {
        node: u32,
        slot: u8,
        axis: usize,
        value: f32,
    },

    /// Declared geometry does not match the tree's triangle references.
    #[error("topology mismatch: {0}")]
    TopologyMismatch(String),

    /// The linearizer recorded a zero depth despite internal nodes being
    /// present. Can only come from a linearization bug and must never
    /// reach the per-frame path.
    #[error("impossible tree: {0}")]
    ImpossibleTree(String),
}

impl RefitError {
    /// Convenience constructors for common error cases
    pub fn malformed<T: ToString>(node: u32, slot: u8, reason: T) -> Self {
        RefitError::MalformedNode {
            node,
            slot,
            reason: reason.to_string(),
        }
    }

    pub fn topology<T: ToString>(msg: T) -> Self {
        RefitError::TopologyMismatch(msg.to_string())
    }

    pub fn impossible_tree<T: ToString>(msg: T) -> Self {
        RefitError::ImpossibleTree(msg.to_string())
    }
}

/// Result type alias for refit operations
pub type RefitResult<T> = Result<T, RefitError>;
