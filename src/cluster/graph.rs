//! Weighted graph with edge contraction.
//!
//! Nodes are atom indices. Each node keeps its total weight `w(u)` and an
//! ordered adjacency map, so neighbor lookup is `O(log degree)` and
//! iteration visits neighbors in index order. Contracting an edge folds
//! the node with the smaller adjacency into the larger one and sums
//! parallel edges.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct GraphNode {
    weight: f64,
    adjacency: BTreeMap<usize, f64>,
}

/// Sparse undirected graph keyed by atom index.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<usize, GraphNode>,
    active: BTreeSet<usize>,
}

fn invariant(message: String) -> Error {
    Error::Invariant(message)
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active nodes.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, u: usize) -> bool {
        self.active.contains(&u)
    }

    /// Lowest active node id.
    pub fn first_active(&self) -> Option<usize> {
        self.active.first().copied()
    }

    pub fn node_weight(&self, u: usize) -> Option<f64> {
        self.nodes.get(&u).map(|n| n.weight)
    }

    pub fn degree(&self, u: usize) -> usize {
        self.nodes.get(&u).map_or(0, |n| n.adjacency.len())
    }

    pub fn edge_weight(&self, u: usize, v: usize) -> Option<f64> {
        self.nodes.get(&u)?.adjacency.get(&v).copied()
    }

    /// Add weight `w` to edge `(u, v)`, creating nodes as needed.
    pub fn add_edge(&mut self, u: usize, v: usize, w: f64) -> Result<()> {
        if u == v {
            return Err(invariant(format!("Self-loop on node {u}")));
        }
        if !(w > 0.0 && w.is_finite()) {
            return Err(invariant(format!("Edge ({u}, {v}) has weight {w}")));
        }
        for (x, y) in [(u, v), (v, u)] {
            let node = self.nodes.entry(x).or_default();
            node.weight += w;
            *node.adjacency.entry(y).or_insert(0.0) += w;
            self.active.insert(x);
        }
        Ok(())
    }

    /// `w(v) / w(u, v)` for the neighbor `v` of `u`.
    pub fn distance_ratio(&self, u: usize, v: usize) -> Option<f64> {
        let w = self.edge_weight(u, v)?;
        Some(self.node_weight(v)? / w)
    }

    /// Neighbor of `u` minimizing `w(v) / w(u, v)`, smallest id on ties.
    ///
    /// Returns `None` if `u` has no edges left.
    pub fn nearest_neighbor(&self, u: usize) -> Result<Option<(usize, f64)>> {
        let node = self
            .nodes
            .get(&u)
            .ok_or_else(|| invariant(format!("Node {u} is not in the graph")))?;

        let mut best: Option<(usize, f64)> = None;
        for (&v, &w) in &node.adjacency {
            let wv = self
                .node_weight(v)
                .ok_or_else(|| invariant(format!("Neighbor {v} of {u} is not in the graph")))?;
            if wv <= 0.0 {
                return Err(invariant(format!("Node {v} has no accumulated weight")));
            }
            let d = wv / w;
            if d.is_nan() {
                return Err(invariant(format!("NaN distance between {u} and {v}")));
            }
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((v, d));
            }
        }
        Ok(best)
    }

    /// Merge `u` and `v` into one node. Returns `(survivor, absorbed)`.
    ///
    /// The survivor is the endpoint with more neighbors (`u` on ties). Its
    /// weight becomes `w(u) + w(v)`; edges of the absorbed node are moved
    /// over and parallel edges summed.
    pub fn contract_edge(&mut self, u: usize, v: usize) -> Result<(usize, usize)> {
        if u == v {
            return Err(invariant(format!("Cannot contract node {u} with itself")));
        }
        if self.edge_weight(u, v).is_none() {
            return Err(invariant(format!("No edge between {u} and {v}")));
        }
        let (survivor, absorbed) =
            if self.degree(v) > self.degree(u) { (v, u) } else { (u, v) };

        let Some(removed) = self.nodes.remove(&absorbed) else {
            return Err(invariant(format!("Node {absorbed} is not in the graph")));
        };
        self.active.remove(&absorbed);

        for &x in removed.adjacency.keys() {
            if let Some(node) = self.nodes.get_mut(&x) {
                node.adjacency.remove(&absorbed);
            }
        }

        let Some(target) = self.nodes.get_mut(&survivor) else {
            return Err(invariant(format!("Node {survivor} is not in the graph")));
        };
        target.weight += removed.weight;
        for (&x, &w) in &removed.adjacency {
            if x != survivor {
                *target.adjacency.entry(x).or_insert(0.0) += w;
            }
        }
        for (&x, &w) in &removed.adjacency {
            if x != survivor {
                if let Some(node) = self.nodes.get_mut(&x) {
                    *node.adjacency.entry(survivor).or_insert(0.0) += w;
                }
            }
        }
        Ok((survivor, absorbed))
    }

    /// Drop `u` and any edges still attached to it.
    pub fn remove_node(&mut self, u: usize) {
        if let Some(node) = self.nodes.remove(&u) {
            for x in node.adjacency.keys() {
                if let Some(other) = self.nodes.get_mut(x) {
                    other.adjacency.remove(&u);
                }
            }
        }
        self.active.remove(&u);
    }
}
