//! End-to-end clustering tests: synthetic FCC crystals and bicrystals run
//! through both stages with each merge algorithm.

mod common;

use common::{assert_partition, bicrystal, cell, perfect_fcc, rot};
use grainseg::{CancelFlag, Error, MergeAlgorithm, SegmentationConfig, Segmenter, StructureType};
use pretty_assertions::assert_eq;

fn mst(threshold: f64) -> SegmentationConfig {
    SegmentationConfig {
        algorithm: MergeAlgorithm::MinimumSpanningTree,
        merging_threshold: threshold,
        min_grain_atom_count: 10,
        ..Default::default()
    }
}

fn manual_graph(threshold: f64) -> SegmentationConfig {
    SegmentationConfig {
        algorithm: MergeAlgorithm::GraphClusteringManual,
        merging_threshold: threshold,
        min_grain_atom_count: 10,
        ..Default::default()
    }
}

// ============================================================================
// 1. Single crystal
// ============================================================================

#[test]
fn test_perfect_crystal_spanning_tree() {
    let atoms = perfect_fcc(4, rot([1.0, 1.0, 0.0], 15.0));
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), mst(4.0)).unwrap();
    let result = segmenter.segment(&atoms).unwrap();

    assert_eq!(result.grain_count(), 1);
    assert_eq!(result.grains[0].size, 256);
    assert_eq!(result.grains[0].structure, StructureType::Fcc);
    assert_eq!(result.unassigned(), 0);
    assert!(result.adoption.is_empty());
    assert!(result.atom_grains.iter().all(|&g| g == 1));
}

#[test]
fn test_perfect_crystal_manual_graph() {
    let atoms = perfect_fcc(4, rot([0.0, 0.0, 1.0], 5.0));
    let segmenter =
        Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), manual_graph(1e6)).unwrap();
    let result = segmenter.segment(&atoms).unwrap();

    assert_eq!(result.grain_count(), 1);
    assert_eq!(result.grains[0].size, 256);
    assert_eq!(result.threshold, 1e6);
}

#[test]
fn test_grain_orientation_matches_crystal() {
    let q = rot([1.0, 2.0, 2.0], 30.0);
    let atoms = perfect_fcc(3, q);
    let segmenter = Segmenter::from_positions(&atoms, cell(3, 3, 3, [true; 3]), mst(4.0)).unwrap();
    let result = segmenter.segment(&atoms).unwrap();
    assert_eq!(result.grain_count(), 1);
    assert!(result.grains[0].orientation.angle_to(&q).to_degrees() < 1e-3);
}

// ============================================================================
// 2. Bicrystals
// ============================================================================

#[test]
fn test_high_angle_boundary_spanning_tree() {
    let atoms = bicrystal(4, 10.0);
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), mst(4.0)).unwrap();
    let result = segmenter.segment(&atoms).unwrap();

    assert_eq!(result.grain_count(), 2);
    let sizes: Vec<usize> = result.grains.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![128, 128]);
    assert_partition(&result.atom_grains, &result.grains);

    // Each half is exactly one grain.
    let first_half = result.atom_grains[0];
    for (p, &g) in atoms.positions.iter().zip(&result.atom_grains) {
        assert_eq!(p.x < 2.0, g == first_half);
    }
}

#[test]
fn test_high_angle_boundary_manual_graph() {
    let atoms = bicrystal(4, 10.0);
    let segmenter =
        Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), manual_graph(1e6)).unwrap();
    let result = segmenter.segment(&atoms).unwrap();
    assert_eq!(result.grain_count(), 2);
    assert_partition(&result.atom_grains, &result.grains);
}

#[test]
fn test_low_angle_boundary_depends_on_threshold() {
    let atoms = bicrystal(4, 2.0);
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), mst(1.0)).unwrap();
    let split = segmenter.segment(&atoms).unwrap();
    assert!(split.grain_count() >= 2);
    assert_partition(&split.atom_grains, &split.grains);

    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), mst(4.0)).unwrap();
    let joined = segmenter.segment(&atoms).unwrap();
    assert_eq!(joined.grain_count(), 1);
    assert_eq!(joined.grains[0].size, 256);
}

// ============================================================================
// 3. Two-stage reuse
// ============================================================================

#[test]
fn test_reassemble_without_recomputing() {
    let atoms = bicrystal(4, 2.0);
    let mut segmenter =
        Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), mst(1.0)).unwrap();
    let cancel = CancelFlag::new();
    let sequence = segmenter.analyze(&atoms, &cancel).unwrap();
    assert_eq!(sequence.num_atoms(), 256);
    assert!(sequence.suggested_threshold.is_none());

    let fine = segmenter.assemble(&sequence, &cancel).unwrap();
    segmenter.set_config(mst(4.0)).unwrap();
    let coarse = segmenter.assemble(&sequence, &cancel).unwrap();

    assert!(fine.grain_count() > coarse.grain_count());
    assert_eq!(coarse.grain_count(), 1);
}

#[test]
fn test_reassemble_rejects_other_algorithm_family() {
    let atoms = perfect_fcc(2, rot([0.0, 1.0, 0.0], 3.0));
    let mut segmenter =
        Segmenter::from_positions(&atoms, cell(2, 2, 2, [true; 3]), mst(4.0)).unwrap();
    let cancel = CancelFlag::new();
    let sequence = segmenter.analyze(&atoms, &cancel).unwrap();

    segmenter.set_config(manual_graph(1.0)).unwrap();
    assert!(matches!(segmenter.assemble(&sequence, &cancel), Err(Error::Config(_))));
}

#[test]
fn test_canceled_stages_return_no_result() {
    let atoms = bicrystal(4, 10.0);
    for config in [mst(4.0), manual_graph(1e6)] {
        let segmenter =
            Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), config).unwrap();
        let canceled = CancelFlag::new();
        canceled.cancel();
        assert!(matches!(segmenter.analyze(&atoms, &canceled), Err(Error::Canceled)));

        let sequence = segmenter.analyze(&atoms, &CancelFlag::new()).unwrap();
        assert!(matches!(segmenter.assemble(&sequence, &canceled), Err(Error::Canceled)));
    }
}

// ============================================================================
// 4. Automatic threshold
// ============================================================================

#[test]
fn test_automatic_graph_partitions_bicrystal() {
    let atoms = bicrystal(4, 10.0);
    let config = SegmentationConfig { min_grain_atom_count: 10, ..Default::default() };
    assert_eq!(config.algorithm, MergeAlgorithm::GraphClusteringAutomatic);
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), config).unwrap();

    let cancel = CancelFlag::new();
    let sequence = segmenter.analyze(&atoms, &cancel).unwrap();
    let suggested = sequence.suggested_threshold.unwrap();
    assert!(suggested.is_finite());
    assert!(sequence.plot.regression.is_some());
    assert!(sequence.dendrogram.windows(2).all(|w| w[0].distance <= w[1].distance));

    let result = segmenter.assemble(&sequence, &cancel).unwrap();
    assert_eq!(result.threshold, suggested);
    assert_eq!(result.grain_count(), 2);
    let sizes: Vec<usize> = result.grains.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![128, 128]);
    assert_eq!(result.unassigned(), 0);
    assert_partition(&result.atom_grains, &result.grains);
}

#[test]
fn test_perfect_crystal_automatic_graph() {
    let atoms = perfect_fcc(4, rot([1.0, 1.0, 1.0], 25.0));
    let config = SegmentationConfig { min_grain_atom_count: 10, ..Default::default() };
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), config).unwrap();
    let result = segmenter.segment(&atoms).unwrap();

    assert_eq!(result.grain_count(), 1);
    assert_eq!(result.grains[0].size, 256);
    assert_eq!(result.unassigned(), 0);
    assert!(result.atom_grains.iter().all(|&g| g == 1));
}

#[test]
fn test_hexagonal_crystal_node_pair_sampling() {
    // One orientation everywhere: every graph weight is identical.
    let q = rot([0.0, 1.0, 1.0], 40.0);
    let atoms = common::label(common::fcc_positions(4, 4, 4), |_| (StructureType::Hcp, q));
    let automatic = SegmentationConfig { min_grain_atom_count: 10, ..Default::default() };
    for config in [manual_graph(1e6), automatic] {
        let segmenter =
            Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), config).unwrap();
        let cancel = CancelFlag::new();
        let sequence = segmenter.analyze(&atoms, &cancel).unwrap();
        assert_eq!(sequence.dendrogram.len(), 255);

        let result = segmenter.assemble(&sequence, &cancel).unwrap();
        assert_eq!(result.grain_count(), 1);
        assert_eq!(result.grains[0].size, 256);
        assert_eq!(result.grains[0].structure, StructureType::Hcp);
    }
}

// ============================================================================
// 5. Determinism and ordering
// ============================================================================

#[test]
fn test_runs_are_deterministic() {
    let atoms = bicrystal(4, 2.0);
    for config in [mst(1.0), manual_graph(0.5), SegmentationConfig::default()] {
        let segmenter =
            Segmenter::from_positions(&atoms, cell(4, 4, 4, [true; 3]), config).unwrap();
        let first = segmenter.segment(&atoms).unwrap();
        let second = segmenter.segment(&atoms).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_grains_ordered_by_size() {
    // Three slabs: 2, 1 and 1 cells thick.
    let q = [rot([0.0, 0.0, 1.0], 0.0), rot([0.0, 0.0, 1.0], 12.0), rot([0.0, 0.0, 1.0], 24.0)];
    let atoms = common::label(common::fcc_positions(4, 3, 3), |p| {
        let slab = if p.x < 2.0 { 0 } else if p.x < 3.0 { 1 } else { 2 };
        (StructureType::Fcc, q[slab])
    });
    let mut config = mst(4.0);
    config.orphan_adoption = false;
    let segmenter = Segmenter::from_positions(&atoms, cell(4, 3, 3, [true; 3]), config).unwrap();
    let result = segmenter.segment(&atoms).unwrap();

    let sizes: Vec<usize> = result.grains.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![72, 36, 36]);
    assert_eq!(result.grain(1).unwrap().size, 72);
    assert!(result.grain(4).is_none());
    assert_partition(&result.atom_grains, &result.grains);
}
