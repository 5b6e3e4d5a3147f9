// tests/test_refit_index.rs
// Tests for linearization, adjacency and depth scheduling over hand-built trees.
// This file exists to validate the structural invariants of the flat refit index.
// RELEVANT FILES:src/cwbvh/linearize.rs,src/cwbvh/adjacency.rs,src/cwbvh/schedule.rs

use anyhow::Result;
use cwbvh_refit::cwbvh::codec::encode_slot_bounds;
use cwbvh_refit::cwbvh::linearize::LinearizedTree;
use cwbvh_refit::cwbvh::recompress::pack_nodes;
use cwbvh_refit::cwbvh::schedule::build_depth_buckets;
use cwbvh_refit::cwbvh::types::{Aabb, RefitIndexEntry, WideNode, EMPTY_SLOT};
use cwbvh_refit::{DeformableBvh, RefitError, Triangle};

/// Leaf meta byte: run offset in the low 5 bits, one high bit per triangle
fn leaf_meta(offset: u8, count: u8) -> u8 {
    let run = match count {
        1 => 0b001,
        2 => 0b011,
        3 => 0b111,
        _ => panic!("test fixture supports 1-3 triangles per slot"),
    };
    (run << 5) | offset
}

/// Internal meta byte: child offset biased by 24
fn internal_meta(child_offset: u8) -> u8 {
    0b0010_0000 | (24 + child_offset)
}

fn test_triangle(i: usize) -> Triangle {
    let x = 0.4 + i as f32 * 0.15;
    Triangle::new([x, 0.4, 0.4], [x + 0.1, 0.4, 0.4], [x, 0.5, 0.5])
}

/// Root -> 1 internal node -> 8 single-triangle leaves.
fn three_level_tree() -> Result<(Vec<WideNode>, Vec<u32>, Vec<Triangle>)> {
    let triangles: Vec<Triangle> = (0..8).map(test_triangle).collect();

    let mut inner = WideNode {
        exponent: [120; 3],
        ..Default::default()
    };
    let mut whole = Aabb::empty();
    for (slot, triangle) in triangles.iter().enumerate() {
        inner.meta[slot] = leaf_meta(slot as u8, 1);
        let bounds = triangle.aabb();
        whole.expand_aabb(&bounds);
        encode_slot_bounds(&mut inner, 1, slot, &bounds)?;
    }

    let mut root = WideNode {
        exponent: [120; 3],
        imask: 0b1,
        base_index_child: 1,
        ..Default::default()
    };
    root.meta[0] = internal_meta(0);
    encode_slot_bounds(&mut root, 0, 0, &whole)?;

    Ok((vec![root, inner], (0..8).collect(), triangles))
}

/// Root with a direct 2-triangle leaf at slot 0 and an internal child at
/// slot 1 whose node holds single-triangle leaves at slots 0 and 3.
fn mixed_tree() -> Result<(Vec<WideNode>, Vec<u32>, Vec<Triangle>)> {
    let triangles: Vec<Triangle> = (0..4).map(test_triangle).collect();

    let mut root = WideNode {
        exponent: [120; 3],
        imask: 0b10,
        base_index_child: 1,
        base_index_triangle: 0,
        ..Default::default()
    };
    root.meta[0] = leaf_meta(0, 2);
    root.meta[1] = internal_meta(0);
    let mut run = triangles[0].aabb();
    run.expand_aabb(&triangles[1].aabb());
    encode_slot_bounds(&mut root, 0, 0, &run)?;
    let mut rest = triangles[2].aabb();
    rest.expand_aabb(&triangles[3].aabb());
    encode_slot_bounds(&mut root, 0, 1, &rest)?;

    let mut child = WideNode {
        exponent: [120; 3],
        base_index_triangle: 2,
        ..Default::default()
    };
    child.meta[0] = leaf_meta(0, 1);
    child.meta[3] = leaf_meta(1, 1);
    encode_slot_bounds(&mut child, 1, 0, &triangles[2].aabb())?;
    encode_slot_bounds(&mut child, 1, 3, &triangles[3].aabb())?;

    // Reversed remap so owner records exercise the reorder table.
    Ok((vec![root, child], vec![3, 2, 1, 0], triangles))
}

#[test]
fn every_child_is_reachable_from_its_parent() -> Result<()> {
    for (nodes, remap, _) in [three_level_tree()?, mixed_tree()?] {
        let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;
        for entry in bvh.entries().iter().skip(1) {
            let parent = &bvh.adjacency()[entry.parent_index as usize];
            assert_eq!(
                parent.children[entry.slot_in_parent as usize],
                entry.self_index as i32,
                "entry {} not linked from parent {}",
                entry.self_index,
                entry.parent_index
            );
            assert_eq!(parent.leaf_info[entry.slot_in_parent as usize], 0);
        }
    }
    Ok(())
}

#[test]
fn depth_increases_by_one_per_level() -> Result<()> {
    let (nodes, remap, _) = three_level_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    for entry in bvh.entries().iter().skip(1) {
        let parent = &bvh.entries()[entry.parent_index as usize];
        assert_eq!(entry.depth, parent.depth + 1);
    }

    for (depth, bucket) in bvh.depth_buckets().iter().enumerate() {
        for &index in bucket {
            assert_eq!(bvh.entries()[index as usize].depth as usize, depth);
        }
    }
    Ok(())
}

#[test]
fn three_level_tree_linearizes_to_three_buckets() -> Result<()> {
    let (nodes, remap, _) = three_level_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    assert_eq!(bvh.entries().len(), 10); // root + internal + 8 leaves
    assert_eq!(bvh.wavefront_count(), 3);
    assert_eq!(bvh.depth_buckets()[0], vec![0]);
    assert_eq!(bvh.depth_buckets()[1], vec![1]);
    assert_eq!(bvh.depth_buckets()[2].len(), 8);

    // Root sentinel points at itself.
    let root = &bvh.entries()[0];
    assert_eq!(root.parent_index, 0);
    assert_eq!(root.depth, 0);
    Ok(())
}

#[test]
fn leaf_slots_carry_their_triangle_runs() -> Result<()> {
    let (nodes, remap, _) = three_level_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    for entry in bvh.entries().iter().filter(|e| e.is_leaf) {
        let record = &bvh.adjacency()[entry.self_index as usize];
        let slot = entry.slot_in_parent as usize;
        assert_eq!(record.children[slot], 1, "run length");
        assert_eq!(record.leaf_info[slot], slot as i32 + 1, "first triangle + 1");
    }
    Ok(())
}

#[test]
fn empty_slots_stay_at_sentinel() -> Result<()> {
    let (nodes, remap, _) = mixed_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    // The inner node's entry: slots 0 and 3 were propagated by its leaves,
    // slot 1 holds its own self-pass classification, the rest were never
    // visited.
    let inner = bvh
        .entries()
        .iter()
        .find(|e| !e.is_leaf && e.self_index != 0)
        .expect("internal entry");
    let record = &bvh.adjacency()[inner.self_index as usize];
    for slot in [2, 4, 5, 6, 7] {
        assert_eq!(record.children[slot], EMPTY_SLOT);
        assert_eq!(record.leaf_info[slot], EMPTY_SLOT);
    }
    Ok(())
}

#[test]
fn owner_records_apply_the_remap_table() -> Result<()> {
    let (nodes, remap, _) = mixed_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    let owners = bvh.triangle_owners();
    assert_eq!(owners.len(), 4);
    for owner in owners {
        assert_eq!(
            owner.source_triangle,
            remap[owner.cwbvh_triangle as usize],
            "owner {owner:?}"
        );
        assert!(bvh.entries()[owner.owner as usize].is_leaf);
    }
    // Root's direct leaf owns the first two CWBVH slots.
    assert_eq!(owners[0].owner, owners[1].owner);
    assert_ne!(owners[2].owner, owners[3].owner);
    Ok(())
}

#[test]
fn node_to_entry_points_at_the_expanding_entry() -> Result<()> {
    let (nodes, remap, _) = three_level_tree()?;
    let bvh = DeformableBvh::build(&pack_nodes(&nodes), &remap)?;

    assert_eq!(bvh.node_to_entry()[0], 0); // root node expanded by the sentinel
    let inner_entry = bvh.node_to_entry()[1];
    assert!(!bvh.entries()[inner_entry as usize].is_leaf);
    assert_eq!(bvh.entries()[inner_entry as usize].parent_index, 0);
    Ok(())
}

#[test]
fn out_of_range_child_index_is_refused() -> Result<()> {
    let (mut nodes, remap, _) = three_level_tree()?;
    nodes[0].base_index_child = 40; // now points past the node buffer
    let result = DeformableBvh::build(&pack_nodes(&nodes), &remap);
    let err = result.err().expect("malformed child index must fail");
    assert!(matches!(
        err.downcast_ref::<RefitError>(),
        Some(RefitError::MalformedNode { node: 0, .. })
    ));
    Ok(())
}

#[test]
fn out_of_range_triangle_run_is_refused() -> Result<()> {
    let (nodes, _, _) = three_level_tree()?;
    let short_remap: Vec<u32> = (0..4).collect(); // tree references 8 triangles
    let result = DeformableBvh::build(&pack_nodes(&nodes), &short_remap);
    let err = result.err().expect("truncated remap must fail");
    assert!(matches!(
        err.downcast_ref::<RefitError>(),
        Some(RefitError::MalformedNode { node: 1, .. })
    ));
    Ok(())
}

#[test]
fn child_index_cycle_is_refused() -> Result<()> {
    // Root's internal slot points back at the root itself.
    let (mut nodes, remap, _) = three_level_tree()?;
    nodes[0].base_index_child = 0;
    let result = DeformableBvh::build(&pack_nodes(&nodes), &remap);
    assert!(result.is_err(), "self-referential child must fail");
    Ok(())
}

#[test]
fn zero_depth_with_children_is_an_impossible_tree() {
    // Hand-corrupted index simulating a linearization bug: a child entry
    // exists but max depth was recorded as 0.
    let mut entry = RefitIndexEntry {
        self_index: 0,
        parent_index: 0,
        slot_in_parent: 0,
        depth: 0,
        is_leaf: false,
        source_node: 0,
        source_slot: 0,
        bounds: Aabb::empty(),
    };
    let root = entry;
    entry.self_index = 1;
    entry.is_leaf = true;

    let tree = LinearizedTree {
        entries: vec![root, entry],
        owners: vec![],
        node_to_entry: vec![0],
        max_depth: 0,
    };
    assert!(matches!(
        build_depth_buckets(&tree),
        Err(RefitError::ImpossibleTree(_))
    ));
}
