//! Neighbor bond construction.
//!
//! Every atom contributes one bond per template neighbor. Bonds are
//! gathered per chunk of atoms on the rayon pool and appended to a shared
//! list once per chunk. The merged list is canonicalised, so the result is
//! independent of scheduling and of whether the neighbor relation is
//! symmetric.

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::engine::CancelFlag;
use crate::model::{NeighborBond, SimulationCell, StructureType};
use crate::{Error, Result};
use super::NeighborQuery;

/// Neighbors used for atoms without a structure template.
pub const MAX_DISORDERED_NEIGHBORS: usize = 8;

/// Atoms handled per parallel work item.
const CHUNK_SIZE: usize = 1024;

/// Number of neighbors of an atom of type `structure` that form bonds.
fn bonded_neighbor_count(structure: StructureType, available: usize) -> usize {
    if structure.is_crystalline() {
        structure.num_neighbors().min(available)
    } else {
        available.min(MAX_DISORDERED_NEIGHBORS)
    }
}

/// Build the undirected bond list of the neighbor graph.
///
/// Fails with `Error::CellTooSmall` if any neighbor vector spans half the
/// cell along a periodic axis.
pub fn build_neighbor_bonds<Q: NeighborQuery + ?Sized>(
    query: &Q,
    structures: &[StructureType],
    cell: &SimulationCell,
    cancel: &CancelFlag,
) -> Result<Vec<NeighborBond>> {
    let n = structures.len();
    if query.len() != n {
        return Err(Error::InvalidInput(format!(
            "Neighbor query covers {} atoms, expected {n}",
            query.len()
        )));
    }

    let shared = Mutex::new(Vec::with_capacity(n * 6));
    (0..n.div_ceil(CHUNK_SIZE)).into_par_iter().try_for_each(|chunk| -> Result<()> {
        cancel.check()?;
        let start = chunk * CHUNK_SIZE;
        let end = (start + CHUNK_SIZE).min(n);
        let mut local = Vec::with_capacity((end - start) * 8);

        for index in start..end {
            let neighbors = query.neighbors(index)?;
            let count = bonded_neighbor_count(structures[index], neighbors.len());
            for nb in &neighbors[..count] {
                if nb.index >= n || nb.index == index {
                    return Err(Error::InvalidInput(format!(
                        "Atom {index} has invalid neighbor {}",
                        nb.index
                    )));
                }
                cell.check_neighbor_vector(&nb.delta)?;
                local.push(NeighborBond::new(index, nb.index, nb.distance()));
            }
        }

        shared.lock().extend(local);
        Ok(())
    })?;

    let mut bonds = shared.into_inner();
    let raw = bonds.len();
    bonds.sort_by(|x, y| {
        x.a.cmp(&y.a)
            .then(x.b.cmp(&y.b))
            .then(x.length.total_cmp(&y.length))
    });
    bonds.dedup_by(|next, kept| next.a == kept.a && next.b == kept.b);

    debug!(raw, unique = bonds.len(), "merged neighbor bonds");
    info!("Built {} neighbor bonds for {} atoms", bonds.len(), n);
    Ok(bonds)
}

// ============================================================================
// Tests
// ============================================================================
