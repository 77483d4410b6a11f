//! Node-pair-sampling agglomeration on the weighted bond graph.
//!
//! The distance between adjacent clusters is `d(u, v) = w(u)·w(v) / w(u, v)`
//! where `w(u)` is a cluster's total edge weight. This distance is
//! reducible, so merges are found with a nearest-neighbor chain: follow
//! nearest neighbors from the lowest active node until two nodes are each
//! other's nearest neighbor, merge them, and continue from the remaining
//! chain.
//!
//! ```text
//! chain: 3 → 8 → 5 → 8     (5 and 8 reciprocal: merge, chain becomes [3])
//! ```
//!
//! Edge weights come from `graph_weight`, which treats near-zero
//! disorientations as zero so perfect lattices have uniform weights.

use tracing::{debug, info, warn};

use crate::crystal::OrientationRemap;
use crate::engine::CancelFlag;
use crate::model::{DendrogramNode, WeightedOrientation};
use crate::{Error, Result};
use super::{absorb_cluster, graph_weight, ClusterInput, DendrogramBuilder, Graph};

#[derive(Debug, Clone, Copy, Default)]
pub struct NodePairSampling;

impl NodePairSampling {
    /// Bond graph over all mergeable bonds.
    pub fn build_graph(input: &ClusterInput<'_>) -> Result<Graph> {
        let mut graph = Graph::new();
        for bond in input.mergeable_bonds() {
            graph.add_edge(bond.a, bond.b, graph_weight(bond.disorientation))?;
        }
        Ok(graph)
    }
}

impl DendrogramBuilder for NodePairSampling {
    fn name(&self) -> &'static str {
        "node pair sampling"
    }

    fn build(
        &self,
        input: &ClusterInput<'_>,
        remap: &dyn OrientationRemap,
        cancel: &CancelFlag,
    ) -> Result<Vec<DendrogramNode>> {
        cancel.check()?;
        let mut graph = Self::build_graph(input)?;
        debug!(nodes = graph.len(), "built node-pair-sampling graph");

        let mut sums: Vec<WeightedOrientation> =
            input.orientations.iter().copied().map(WeightedOrientation::single).collect();
        let mut dendrogram = Vec::new();
        let mut chain: Vec<usize> = Vec::new();
        let mut failures = 0usize;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps % 1024 == 0 {
                cancel.check()?;
            }

            let u = match chain.last() {
                Some(&u) => u,
                None => match graph.first_active() {
                    Some(u) => {
                        chain.push(u);
                        u
                    }
                    None => break,
                },
            };

            let Some((mut v, mut ratio)) = graph.nearest_neighbor(u)? else {
                graph.remove_node(u);
                chain.pop();
                continue;
            };

            let predecessor = chain.len().checked_sub(2).map(|i| chain[i]);
            if let Some(p) = predecessor {
                if let Some(rp) = graph.distance_ratio(u, p) {
                    if rp <= ratio {
                        v = p;
                        ratio = rp;
                    }
                }
            }

            if predecessor == Some(v) {
                chain.truncate(chain.len() - 2);
            } else if let Some(k) = chain.iter().position(|&x| x == v) {
                // Rounding closed a longer cycle: merge anyway, rewind to before it.
                debug!(u, v, depth = chain.len() - k, "nearest-neighbor chain cycle");
                chain.truncate(k);
            } else {
                chain.push(v);
                continue;
            }

            let wu = graph
                .node_weight(u)
                .ok_or_else(|| Error::Invariant(format!("Node {u} is not in the graph")))?;
            let distance = wu * ratio;
            if distance.is_nan() {
                return Err(Error::Invariant(format!("NaN merge distance between {u} and {v}")));
            }

            let (survivor, absorbed) = graph.contract_edge(u, v)?;
            let size = sums[survivor].weight.min(sums[absorbed].weight) as usize;
            let absorbed_sum = sums[absorbed];
            let merged =
                absorb_cluster(&mut sums[survivor], input.structures[survivor], &absorbed_sum, remap);
            let disorientation = match merged {
                Ok(angle) => angle,
                Err(Error::RemapFailure { structure }) => {
                    failures += 1;
                    debug!(survivor, absorbed, %structure, "cluster remap failed");
                    f64::MAX
                }
                Err(e) => return Err(e),
            };

            dendrogram.push(DendrogramNode::new(
                survivor,
                absorbed,
                distance,
                disorientation,
                size,
                sums[survivor].mean(),
            ));
        }

        if failures > 0 {
            warn!("Cluster orientation remapping failed for {} merges", failures);
        }
        info!("Node-pair sampling recorded {} merges", dendrogram.len());
        Ok(dendrogram)
    }
}
