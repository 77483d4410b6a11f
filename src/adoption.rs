//! Orphan adoption.
//!
//! Atoms left in grain 0 after the cut are handed to the grain that is
//! closest along bonds through other orphans. This is Dijkstra's algorithm
//! with all grains as sources and lazy deletion: an atom may be queued
//! several times, only its first pop counts.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::CancelFlag;
use crate::model::{Grain, NeighborBond};
use crate::{Error, Result};

/// One orphan atom and the grain that took it in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdoptedAtom {
    pub atom: usize,
    pub grain: i64,
    /// Summed bond length from the nearest atom of the grain.
    pub path_length: f64,
}

/// Outcome of orphan adoption, in adoption order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdoptionReport {
    pub adopted: Vec<AdoptedAtom>,
    /// Orphans with no bond path to any grain.
    pub remaining: usize,
}

impl AdoptionReport {
    pub fn len(&self) -> usize {
        self.adopted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adopted.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    path_length: f64,
    seq: u64,
    grain: i64,
    atom: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed: BinaryHeap pops the shortest path, earliest push first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .path_length
            .total_cmp(&self.path_length)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct OrphanAdopter {
    heap: BinaryHeap<Pending>,
    seq: u64,
}

impl OrphanAdopter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, grain: i64, atom: usize, path_length: f64) {
        self.heap.push(Pending { path_length, seq: self.seq, grain, atom });
        self.seq += 1;
    }

    /// Assign every reachable grain-0 atom. Grain sizes are updated in
    /// place; `grains[k]` must have id `k + 1`.
    pub fn adopt(
        &mut self,
        bonds: &[NeighborBond],
        atom_grains: &mut [i64],
        grains: &mut [Grain],
        cancel: &CancelFlag,
    ) -> Result<AdoptionReport> {
        cancel.check()?;
        let n = atom_grains.len();
        let num_grains = grains.len();
        let grain_index = |id: i64| -> Result<usize> {
            usize::try_from(id - 1)
                .ok()
                .filter(|&k| k < num_grains)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown grain id {id}")))
        };

        // Directed copies of bonds touching an orphan, grouped by source.
        let mut orphan_bonds: Vec<NeighborBond> = Vec::new();
        for bond in bonds {
            if bond.a >= n || bond.b >= n {
                return Err(Error::InvalidInput(format!("Bond ({}, {}) out of range", bond.a, bond.b)));
            }
            if atom_grains[bond.a] == 0 || atom_grains[bond.b] == 0 {
                orphan_bonds.push(*bond);
                orphan_bonds.push(bond.reversed());
            }
        }
        orphan_bonds.sort_by_key(|b| b.a);

        for bond in bonds {
            match (atom_grains[bond.a], atom_grains[bond.b]) {
                (ga, 0) if ga != 0 => self.push(ga, bond.b, bond.length),
                (0, gb) if gb != 0 => self.push(gb, bond.a, bond.length),
                _ => {}
            }
        }

        let mut report = AdoptionReport::default();
        let mut popped = 0usize;
        while let Some(entry) = self.heap.pop() {
            popped += 1;
            if popped % 1024 == 0 {
                cancel.check()?;
            }
            if atom_grains[entry.atom] != 0 {
                continue;
            }

            let k = grain_index(entry.grain)?;
            atom_grains[entry.atom] = entry.grain;
            grains[k].size += 1;
            report.adopted.push(AdoptedAtom {
                atom: entry.atom,
                grain: entry.grain,
                path_length: entry.path_length,
            });

            let start = orphan_bonds.partition_point(|b| b.a < entry.atom);
            for bond in orphan_bonds[start..].iter().take_while(|b| b.a == entry.atom) {
                if atom_grains[bond.b] == 0 {
                    self.push(entry.grain, bond.b, entry.path_length + bond.length);
                }
            }
        }

        report.remaining = atom_grains.iter().filter(|&&g| g == 0).count();
        info!(
            "Adopted {} orphan atoms ({} without a path to any grain)",
            report.adopted.len(),
            report.remaining
        );
        Ok(report)
    }
}
