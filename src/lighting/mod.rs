// src/lighting/mod.rs
// Lighting support for the refit subsystem - emissive triangle importance tables.
// RELEVANT FILES:src/lighting/importance.rs,src/cwbvh/types.rs

pub mod importance;

pub use importance::{
    luminance, LightImportanceBuilder, LightImportanceTable, LightTriangle,
};
