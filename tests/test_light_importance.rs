// tests/test_light_importance.rs
// Tests for the cumulative-energy light importance table.
// This file exists to validate the ordering and prefix-sum contract the external
// importance sampler binary-searches against.
// RELEVANT FILES:src/lighting/importance.rs,src/cwbvh/types.rs

use anyhow::Result;
use cwbvh_refit::lighting::{luminance, LightImportanceBuilder};
use cwbvh_refit::Triangle;

fn emitter(scale: f32, z: f32) -> Triangle {
    Triangle::new([0.0, 0.0, z], [scale, 0.0, z], [0.0, scale, z])
}

#[test]
fn cumulative_energy_is_nondecreasing_and_sums_to_total() -> Result<()> {
    let mut builder = LightImportanceBuilder::new();
    let radiances = [
        [5.0, 0.0, 0.0],
        [0.1, 0.1, 0.1],
        [0.0, 2.0, 0.0],
        [1.0, 1.0, 1.0],
        [0.0, 0.0, 9.0],
    ];
    for (i, radiance) in radiances.iter().enumerate() {
        builder.add_emitter(&emitter(1.0 + i as f32 * 0.5, 0.0), *radiance);
    }
    let table = builder.build();

    let mut previous = 0.0f32;
    let mut sum = 0.0f32;
    for entry in &table.entries {
        assert!(entry.cumulative_energy >= previous, "prefix must not decrease");
        previous = entry.cumulative_energy;
        sum += entry.energy;
    }
    assert!((table.total_energy - sum).abs() <= sum * 1e-6);
    assert_eq!(
        table.entries.last().map(|e| e.cumulative_energy),
        Some(table.total_energy)
    );
    Ok(())
}

#[test]
fn entries_are_sorted_ascending_by_energy() -> Result<()> {
    let mut builder = LightImportanceBuilder::new();
    builder.add_emitter(&emitter(4.0, 0.0), [1.0, 1.0, 1.0]);
    builder.add_emitter(&emitter(1.0, 0.0), [1.0, 1.0, 1.0]);
    builder.add_emitter(&emitter(2.0, 0.0), [1.0, 1.0, 1.0]);
    let table = builder.build();

    let energies: Vec<f32> = table.entries.iter().map(|e| e.energy).collect();
    assert!(energies.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[test]
fn equal_energies_keep_insertion_order() -> Result<()> {
    // Same shape at different z: identical energy, stable sort must keep
    // the original order.
    let mut builder = LightImportanceBuilder::new();
    for i in 0..4 {
        builder.add_emitter(&emitter(1.0, i as f32), [0.5, 0.5, 0.5]);
    }
    let table = builder.build();

    let z_order: Vec<f32> = table.entries.iter().map(|e| e.position[2]).collect();
    assert_eq!(z_order, vec![0.0, 1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn energy_is_luminance_times_area() -> Result<()> {
    let triangle = emitter(2.0, 0.0); // area 2.0
    let radiance = [0.25, 0.5, 0.75];

    let mut builder = LightImportanceBuilder::new();
    builder.add_emitter(&triangle, radiance);
    let table = builder.build();

    let expected = luminance(radiance) * triangle.area();
    assert!((table.entries[0].energy - expected).abs() < 1e-6);
    assert!((table.total_energy - expected).abs() < 1e-6);
    Ok(())
}

#[test]
fn empty_emissive_set_yields_an_empty_table() {
    let table = LightImportanceBuilder::new().build();
    assert!(table.is_empty());
    assert_eq!(table.total_energy, 0.0);
}
