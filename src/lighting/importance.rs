// src/lighting/importance.rs
// Light importance builder - cumulative-energy table over emissive triangles.
// This file exists to produce the sorted prefix-sum table an external importance sampler
// binary-searches with a uniform draw scaled to the total energy.
// RELEVANT FILES:src/lighting/mod.rs,src/cwbvh/types.rs

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::cwbvh::types::Triangle;

/// Rec. 601 luma weights, matching what the sampler expects
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

/// One emissive triangle in the importance table - GPU compatible layout.
/// `radiance` is premultiplied by triangle area; `energy` is its luminance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightTriangle {
    pub position: [f32; 3],
    pub energy: f32,
    pub edge1: [f32; 3],
    pub cumulative_energy: f32,
    pub edge2: [f32; 3],
    pub _pad0: f32,
    pub normal: [f32; 3],
    pub _pad1: f32,
    pub radiance: [f32; 3],
    pub _pad2: f32,
}

/// Sorted table plus the scalar total - the only state a sampler needs
#[derive(Debug, Clone, Default)]
pub struct LightImportanceTable {
    pub entries: Vec<LightTriangle>,
    pub total_energy: f32,
}

impl LightImportanceTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects emissive triangles, then sorts and prefix-sums them. Rebuilt
/// whenever the emissive set changes (topology or material); the per-frame
/// refit never touches it.
#[derive(Debug, Default)]
pub struct LightImportanceBuilder {
    entries: Vec<LightTriangle>,
}

impl LightImportanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one emissive triangle. `radiance` is the emitted radiance
    /// (emission strength times base color); energy is its luminance times
    /// the triangle's area.
    pub fn add_emitter(&mut self, triangle: &Triangle, radiance: [f32; 3]) {
        let area = triangle.area();
        let energy = luminance(radiance) * area;
        let normal = Vec3::from(triangle.normal()).normalize_or_zero();
        let scaled = Vec3::from(radiance) * area;

        self.entries.push(LightTriangle {
            position: triangle.v0,
            energy,
            edge1: (Vec3::from(triangle.v1) - Vec3::from(triangle.v0)).into(),
            cumulative_energy: 0.0,
            edge2: (Vec3::from(triangle.v2) - Vec3::from(triangle.v0)).into(),
            _pad0: 0.0,
            normal: normal.into(),
            _pad1: 0.0,
            radiance: scaled.into(),
            _pad2: 0.0,
        });
    }

    pub fn emitter_count(&self) -> usize {
        self.entries.len()
    }

    /// Stable-sort ascending by energy and write the running prefix sum.
    /// The final entry's cumulative value equals the returned total.
    pub fn build(mut self) -> LightImportanceTable {
        self.entries
            .sort_by(|a, b| a.energy.total_cmp(&b.energy));

        let mut total_energy = 0.0f32;
        for entry in &mut self.entries {
            total_energy += entry.energy;
            entry.cumulative_energy = total_energy;
        }

        log::debug!(
            "light importance table: {} emitters, total energy {total_energy}",
            self.entries.len()
        );

        LightImportanceTable {
            entries: self.entries,
            total_energy,
        }
    }
}
