//! Dendrogram cut and grain table assembly.

use nalgebra::UnitQuaternion;
use tracing::{debug, info};

use crate::disjoint_set::DisjointSet;
use crate::engine::CancelFlag;
use crate::model::dendrogram::is_sorted_by_distance;
use crate::model::{Color, DendrogramNode, Grain, StructureType};
use crate::{Error, Result};

/// Per-atom grain ids (0 = no grain) and the grain table, largest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainAssignment {
    pub atom_grains: Vec<i64>,
    pub grains: Vec<Grain>,
}

/// Cuts a sorted dendrogram and labels the resulting clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainBuilder {
    /// Clusters with fewer atoms dissolve into grain 0.
    pub min_grain_atom_count: usize,
}

struct Cluster {
    size: usize,
    structure: StructureType,
    orientation: UnitQuaternion<f64>,
}

impl GrainBuilder {
    pub fn new(min_grain_atom_count: usize) -> Self {
        Self { min_grain_atom_count }
    }

    /// Replay merges while `ln(distance) <= log_threshold`, then turn the
    /// surviving clusters into grains.
    pub fn build(
        &self,
        dendrogram: &[DendrogramNode],
        log_threshold: f64,
        structures: &[StructureType],
        orientations: &[UnitQuaternion<f64>],
        cancel: &CancelFlag,
    ) -> Result<GrainAssignment> {
        let n = structures.len();
        if orientations.len() != n {
            return Err(Error::InvalidInput("Structure and orientation arrays differ in length".into()));
        }
        if !is_sorted_by_distance(dendrogram) {
            return Err(Error::Invariant("Dendrogram is not sorted by distance".into()));
        }

        let mut uf = DisjointSet::new(n);
        let mut mean = orientations.to_vec();
        let mut replayed = 0usize;
        for node in dendrogram {
            if replayed % 1024 == 0 {
                cancel.check()?;
            }
            if node.log_distance() > log_threshold {
                break;
            }
            if node.a >= n || node.b >= n {
                return Err(Error::InvalidInput(format!(
                    "Dendrogram merge ({}, {}) out of range",
                    node.a, node.b
                )));
            }
            uf.merge(node.a, node.b);
            let root = uf.find(node.a);
            mean[root] = node.orientation;
            replayed += 1;
        }
        debug!(replayed, total = dendrogram.len(), log_threshold, "cut dendrogram");

        let mut cluster_ids = vec![0i64; n];
        let mut clusters: Vec<Cluster> = Vec::new();
        for i in 0..n {
            if uf.find(i) != i {
                continue;
            }
            let size = uf.node_size(i);
            if size < self.min_grain_atom_count || !structures[i].is_crystalline() {
                continue;
            }
            clusters.push(Cluster { size: 0, structure: structures[i], orientation: mean[i] });
            cluster_ids[i] = clusters.len() as i64;
        }
        cancel.check()?;

        let mut atom_grains = vec![0i64; n];
        for i in 0..n {
            let id = cluster_ids[uf.find(i)];
            atom_grains[i] = id;
            if id != 0 {
                clusters[(id - 1) as usize].size += 1;
            }
        }

        // Largest grain first; ties keep discovery order.
        let mut order: Vec<usize> = (0..clusters.len()).collect();
        order.sort_by(|&x, &y| clusters[y].size.cmp(&clusters[x].size));
        let mut new_id = vec![0i64; clusters.len() + 1];
        for (rank, &old) in order.iter().enumerate() {
            new_id[old + 1] = rank as i64 + 1;
        }
        for id in atom_grains.iter_mut() {
            *id = new_id[*id as usize];
        }

        let colors = Color::palette(order.len());
        let grains: Vec<Grain> = order
            .iter()
            .zip(colors)
            .enumerate()
            .map(|(rank, (&old, color))| {
                let c = &clusters[old];
                Grain {
                    id: rank as i64 + 1,
                    size: c.size,
                    structure: c.structure,
                    color,
                    orientation: c.orientation,
                }
            })
            .collect();

        info!("Assembled {} grains", grains.len());
        Ok(GrainAssignment { atom_grains, grains })
    }
}
