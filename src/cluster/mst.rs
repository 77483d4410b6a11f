//! Minimum-spanning-tree agglomeration.
//!
//! Walks the bonds in ascending disorientation order and unites the two
//! clusters of every eligible bond, like Kruskal's algorithm. Each union
//! records the disorientation between the two cluster mean orientations as
//! its merge distance.

use tracing::{debug, info, warn};

use crate::crystal::OrientationRemap;
use crate::disjoint_set::DisjointSet;
use crate::engine::CancelFlag;
use crate::model::{DendrogramNode, WeightedOrientation};
use crate::{Error, Result};
use super::{absorb_cluster, ClusterInput, DendrogramBuilder};

#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumSpanningTree;

impl DendrogramBuilder for MinimumSpanningTree {
    fn name(&self) -> &'static str {
        "minimum spanning tree"
    }

    fn build(
        &self,
        input: &ClusterInput<'_>,
        remap: &dyn OrientationRemap,
        cancel: &CancelFlag,
    ) -> Result<Vec<DendrogramNode>> {
        let mut uf = DisjointSet::new(input.len());
        let mut sums: Vec<WeightedOrientation> =
            input.orientations.iter().copied().map(WeightedOrientation::single).collect();
        let mut dendrogram = Vec::new();
        let mut failures = 0usize;

        for (i, bond) in input.mergeable_bonds().enumerate() {
            if i % 1024 == 0 {
                cancel.check()?;
            }
            let (pa, pb) = (uf.find(bond.a), uf.find(bond.b));
            if pa == pb {
                continue;
            }
            let size = uf.node_size(pa).min(uf.node_size(pb));
            let parent = uf.merge(pa, pb);
            let child = if parent == pa { pb } else { pa };

            let child_sum = sums[child];
            let merged = absorb_cluster(&mut sums[parent], input.structures[parent], &child_sum, remap);
            let distance = match merged {
                Ok(angle) if angle.is_nan() => {
                    return Err(Error::Invariant(format!(
                        "NaN cluster disorientation merging {parent} and {child}"
                    )));
                }
                Ok(angle) => angle,
                Err(Error::RemapFailure { structure }) => {
                    failures += 1;
                    debug!(parent, child, %structure, "cluster remap failed");
                    f64::MAX
                }
                Err(e) => return Err(e),
            };

            dendrogram.push(DendrogramNode::new(
                parent,
                child,
                distance,
                bond.disorientation,
                size,
                sums[parent].mean(),
            ));
        }

        if failures > 0 {
            warn!("Cluster orientation remapping failed for {} merges", failures);
        }
        info!("Spanning-tree clustering recorded {} merges", dendrogram.len());
        Ok(dendrogram)
    }
}
