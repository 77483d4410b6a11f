//! # Hierarchical Clustering
//!
//! Turns the disorientation-sorted bond list into a dendrogram: the
//! sequence of binary cluster merges, ordered by merge distance. Two
//! interchangeable builders implement the `DendrogramBuilder` contract.
//!
//! | Builder | Module | Merge distance |
//! |---------|--------|----------------|
//! | `MinimumSpanningTree` | `mst` | Cluster-mean disorientation (degrees) |
//! | `NodePairSampling` | `node_pair` | `w(u)·w(v) / w(u,v)` on the bond graph |
//!
//! Both only consider bonds below `MISORIENTATION_THRESHOLD` whose atoms
//! are crystalline-compatible.

pub mod graph;
pub mod mst;
pub mod node_pair;

use nalgebra::UnitQuaternion;

use crate::config::MergeAlgorithm;
use crate::crystal::OrientationRemap;
use crate::disjoint_set::DisjointSet;
use crate::engine::CancelFlag;
use crate::model::dendrogram::sort_by_distance;
use crate::model::{DendrogramNode, NeighborBond, StructureType, WeightedOrientation};
use crate::Result;

pub use graph::Graph;
pub use mst::MinimumSpanningTree;
pub use node_pair::NodePairSampling;

/// Bonds at or above this disorientation (degrees) never merge clusters.
pub const MISORIENTATION_THRESHOLD: f64 = 4.0;

/// Disorientations below this (degrees) are treated as exactly zero when
/// computing graph weights.
pub const ZERO_DISORIENTATION: f64 = 1e-5;

/// Edge weight of the node-pair-sampling graph.
pub fn graph_weight(disorientation: f64) -> f64 {
    let theta = if disorientation < ZERO_DISORIENTATION { 0.0 } else { disorientation };
    (-theta * theta / 3.0).exp()
}

/// Fold cluster `other` into `into` and return the disorientation (degrees)
/// between the two cluster means before the merge.
///
/// `other`'s mean is first remapped onto the symmetry-equivalent
/// orientation closest to `into`'s mean. On remap failure the weight is
/// still absorbed but the orientation sum is left unchanged, and the error
/// is returned to the caller.
pub fn absorb_cluster<R: OrientationRemap + ?Sized>(
    into: &mut WeightedOrientation,
    structure: StructureType,
    other: &WeightedOrientation,
    remap: &R,
) -> Result<f64> {
    let target = into.mean();
    let remapped = remap.remap(structure, &target, &other.mean());
    if let Ok(r) = &remapped {
        into.sum = target.into_inner() * into.weight + r.orientation.into_inner() * other.weight;
    }
    into.weight += other.weight;
    remapped.map(|r| r.disorientation.to_degrees())
}

/// Adjusted per-atom data and sorted bonds a builder works on.
#[derive(Debug, Clone, Copy)]
pub struct ClusterInput<'a> {
    pub bonds: &'a [NeighborBond],
    pub structures: &'a [StructureType],
    pub orientations: &'a [UnitQuaternion<f64>],
    pub handle_interfaces: bool,
}

impl ClusterInput<'_> {
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Both atoms crystalline and of the same type, or a coherent phase
    /// pair when interface handling is on.
    pub fn is_crystalline_bond(&self, bond: &NeighborBond) -> bool {
        let (a, b) = (self.structures[bond.a], self.structures[bond.b]);
        if !a.is_crystalline() || !b.is_crystalline() {
            return false;
        }
        a == b || (self.handle_interfaces && a.interface_partner() == Some(b))
    }

    /// Bonds eligible for merging, in list order.
    pub fn mergeable_bonds(&self) -> impl Iterator<Item = &NeighborBond> + '_ {
        self.bonds
            .iter()
            .filter(|b| b.disorientation < MISORIENTATION_THRESHOLD && self.is_crystalline_bond(b))
    }
}

/// A clustering strategy producing an (unsorted) dendrogram.
pub trait DendrogramBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    fn build(
        &self,
        input: &ClusterInput<'_>,
        remap: &dyn OrientationRemap,
        cancel: &CancelFlag,
    ) -> Result<Vec<DendrogramNode>>;
}

/// The builder for a configured algorithm.
pub fn builder_for(algorithm: MergeAlgorithm) -> Box<dyn DendrogramBuilder> {
    if algorithm.is_graph() {
        Box::new(NodePairSampling)
    } else {
        Box::new(MinimumSpanningTree)
    }
}

/// Sort by distance, then replay the merges to record each node's
/// sub-cluster sizes.
pub fn finalize_dendrogram(dendrogram: &mut [DendrogramNode], num_atoms: usize) {
    sort_by_distance(dendrogram);
    let mut uf = DisjointSet::new(num_atoms);
    for node in dendrogram.iter_mut() {
        let sa = uf.node_size(node.a);
        let sb = uf.node_size(node.b);
        node.size = sa.min(sb);
        node.merge_size = ((sa * sb) as f64).sqrt();
        uf.merge(node.a, node.b);
    }
}
