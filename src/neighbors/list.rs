//! In-memory neighbor lists.
//!
//! This is the reference implementation of `NeighborQuery`. It either wraps
//! lists supplied by the caller (e.g. decoded template correspondences) or
//! builds distance-ordered lists by brute force.
//!
//! ## Limitations
//!
//! - **Quadratic construction**: `from_positions()` compares every pair of
//!   atoms. Fine for tests and small samples, not for production sizes.
//! - **Distance order only**: brute-force lists are ordered by distance
//!   (ties by index), not by a structure template.

use nalgebra::Point3;

use crate::model::SimulationCell;
use crate::{Error, Result};
use super::{Neighbor, NeighborQuery, Neighbors, MAX_NEIGHBORS};

/// Precomputed neighbor lists, one per atom.
#[derive(Debug, Clone, Default)]
pub struct NeighborList {
    entries: Vec<Neighbors>,
}

impl NeighborList {
    /// Wrap caller-supplied lists. Each list is truncated to `MAX_NEIGHBORS`.
    pub fn new(entries: Vec<Vec<Neighbor>>) -> Result<Self> {
        let n = entries.len();
        let mut lists = Vec::with_capacity(n);
        for (i, list) in entries.into_iter().enumerate() {
            if let Some(bad) = list.iter().find(|nb| nb.index >= n || nb.index == i) {
                return Err(Error::InvalidInput(format!(
                    "Atom {i} lists invalid neighbor {} ({n} atoms)",
                    bad.index
                )));
            }
            lists.push(list.into_iter().take(MAX_NEIGHBORS).collect());
        }
        Ok(Self { entries: lists })
    }

    /// Brute-force `max_neighbors` nearest neighbors under the minimum
    /// image convention of `cell`.
    pub fn from_positions(
        positions: &[Point3<f64>],
        cell: &SimulationCell,
        max_neighbors: usize,
    ) -> Self {
        let k = max_neighbors.min(MAX_NEIGHBORS);
        let entries = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut all: Vec<Neighbor> = positions
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, q)| Neighbor::new(j, cell.wrap_delta(p, q)))
                    .collect();
                all.sort_by(|x, y| {
                    x.distance_squared
                        .total_cmp(&y.distance_squared)
                        .then(x.index.cmp(&y.index))
                });
                all.into_iter().take(k).collect()
            })
            .collect();
        Self { entries }
    }
}

impl NeighborQuery for NeighborList {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn neighbors(&self, index: usize) -> Result<Neighbors> {
        self.entries
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("No neighbor list for atom {index}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
