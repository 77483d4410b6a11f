//! # Neighbor Query Contract
//!
//! The segmentation pipeline does not search for neighbors itself. It asks
//! a `NeighborQuery` for the crystallographically ordered neighbors of an
//! atom, i.e. the neighbors in the order of the structure template that
//! classified the atom.
//!
//! ## Implementations
//!
//! | Query | Module | Description |
//! |-------|--------|-------------|
//! | `NeighborList` | `list` | Precomputed in-memory lists, or brute-force minimum image |

pub mod list;
pub mod bonds;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::Result;

pub use list::NeighborList;
pub use bonds::{build_neighbor_bonds, MAX_DISORDERED_NEIGHBORS};

/// Maximum number of neighbors a query returns.
pub const MAX_NEIGHBORS: usize = 18;

/// Neighbor list of one atom, nearest/template order first.
pub type Neighbors = SmallVec<[Neighbor; MAX_NEIGHBORS]>;

/// One neighbor of a central atom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    /// Displacement from the central atom to the neighbor (minimum image).
    pub delta: Vector3<f64>,
    pub distance_squared: f64,
}

impl Neighbor {
    pub fn new(index: usize, delta: Vector3<f64>) -> Self {
        Self { index, delta, distance_squared: delta.norm_squared() }
    }

    pub fn distance(&self) -> f64 {
        self.distance_squared.sqrt()
    }
}

/// The neighbor enumeration capability.
///
/// Called concurrently from worker threads, hence `Sync`.
pub trait NeighborQuery: Sync {
    /// Number of atoms the query covers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered neighbors of atom `index`, at most `MAX_NEIGHBORS`.
    fn neighbors(&self, index: usize) -> Result<Neighbors>;
}

impl<Q: NeighborQuery + ?Sized> NeighborQuery for &Q {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn neighbors(&self, index: usize) -> Result<Neighbors> {
        (**self).neighbors(index)
    }
}
