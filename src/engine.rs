//! # Segmentation Stages
//!
//! The computation is split into two pure stages so the expensive part can
//! be reused when only cut parameters change:
//!
//! ```text
//! analyze:  bonds → interface handling → disorientations → dendrogram
//!           (+ plot, suggested threshold)              ⇒ MergeSequence
//! assemble: MergeSequence + cut parameters → grains → orphan adoption
//!                                                     ⇒ SegmentationResult
//! ```
//!
//! Stages run strictly in sequence. Bond building and disorientation
//! computation are data-parallel; everything after is single-threaded.
//! Either stage returns `Error::Canceled` once its `CancelFlag` is set, and
//! never a partial result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adoption::{AdoptionReport, OrphanAdopter};
use crate::cluster::{builder_for, finalize_dendrogram, ClusterInput};
use crate::config::{MergeAlgorithm, SegmentationConfig};
use crate::crystal::OrientationRemap;
use crate::disorientation::compute_disorientations;
use crate::grains::GrainBuilder;
use crate::interface::InterfaceHandler;
use crate::model::plot::MIN_PLOT_SIZE;
use crate::model::{
    DendrogramNode, Grain, MergePlot, NeighborBond, RegressionSeries, SimulationCell, StructureType,
};
use crate::neighbors::{build_neighbor_bonds, NeighborQuery};
use crate::threshold::{RobustLogLogRegressor, ThresholdSelector};
use crate::{Error, Result};

/// Tolerance on the norm of input orientations.
pub const ORIENTATION_NORM_TOLERANCE: f64 = 1e-3;

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation shared between a caller and a running stage.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Error::Canceled)` once canceled.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() { Err(Error::Canceled) } else { Ok(()) }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Per-atom input arrays from structure identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atoms {
    pub positions: Vec<Point3<f64>>,
    pub structures: Vec<StructureType>,
    pub orientations: Vec<UnitQuaternion<f64>>,
}

impl Atoms {
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.structures.len();
        if self.positions.len() != n || self.orientations.len() != n {
            return Err(Error::InvalidInput(format!(
                "Atom arrays differ in length: {} positions, {} structures, {} orientations",
                self.positions.len(),
                n,
                self.orientations.len()
            )));
        }
        if let Some(i) = self.positions.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::InvalidInput(format!("Atom {i} has a non-finite position")));
        }
        for (i, (q, s)) in self.orientations.iter().zip(&self.structures).enumerate() {
            let norm = q.quaternion().norm();
            if s.is_crystalline() && !((norm - 1.0).abs() <= ORIENTATION_NORM_TOLERANCE) {
                return Err(Error::InvalidInput(format!(
                    "Atom {i} has an orientation of norm {norm}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Stage 1: merge sequence
// ============================================================================

/// Immutable result of stage 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSequence {
    pub algorithm: MergeAlgorithm,
    pub handle_coherent_interfaces: bool,
    /// Bonds sorted by ascending disorientation.
    pub bonds: Vec<NeighborBond>,
    /// Structure types after interface handling.
    pub structures: Vec<StructureType>,
    /// Orientations after interface handling.
    pub orientations: Vec<UnitQuaternion<f64>>,
    /// Number of atoms converted to their parent phase.
    pub converted_atoms: usize,
    /// Merges sorted by non-decreasing distance.
    pub dendrogram: Vec<DendrogramNode>,
    pub plot: MergePlot,
    /// Suggested cut on `ln(distance)`, graph clustering only.
    pub suggested_threshold: Option<f64>,
}

impl MergeSequence {
    pub fn num_atoms(&self) -> usize {
        self.structures.len()
    }
}

fn merge_plot(dendrogram: &[DendrogramNode], graph: bool) -> MergePlot {
    let (merge_distance, merge_size) = dendrogram
        .iter()
        .filter(|n| n.size >= MIN_PLOT_SIZE)
        .map(|n| (if graph { n.log_distance() } else { n.distance }, n.size as f64))
        .unzip();
    MergePlot { merge_distance, merge_size, regression: None }
}

/// Keep only points with a positive log distance.
fn positive_series(series: RegressionSeries) -> RegressionSeries {
    let mut out = RegressionSeries::default();
    for ((x, y), f) in series
        .log_merge_size
        .into_iter()
        .zip(series.log_merge_distance)
        .zip(series.fitted_log_distance)
    {
        if y > 0.0 {
            out.log_merge_size.push(x);
            out.log_merge_distance.push(y);
            out.fitted_log_distance.push(f);
        }
    }
    out
}

/// Stage 1: compute the sorted dendrogram and its diagnostics.
pub fn analyze<Q, R>(
    atoms: &Atoms,
    query: &Q,
    remap: &R,
    cell: &SimulationCell,
    config: &SegmentationConfig,
    cancel: &CancelFlag,
) -> Result<MergeSequence>
where
    Q: NeighborQuery + ?Sized,
    R: OrientationRemap,
{
    atoms.validate()?;
    let n = atoms.len();

    let mut bonds = build_neighbor_bonds(query, &atoms.structures, cell, cancel)?;

    let mut structures = atoms.structures.clone();
    let mut orientations = atoms.orientations.clone();
    let converted_atoms = if config.handle_coherent_interfaces {
        InterfaceHandler::new(remap, &atoms.structures).run(
            &bonds,
            &mut structures,
            &mut orientations,
            cancel,
        )?
    } else {
        0
    };

    compute_disorientations(&mut bonds, &structures, &orientations, remap, cancel)?;

    let input = ClusterInput {
        bonds: &bonds,
        structures: &structures,
        orientations: &orientations,
        handle_interfaces: config.handle_coherent_interfaces,
    };
    let builder = builder_for(config.algorithm);
    let mut dendrogram = builder.build(&input, remap, cancel)?;
    cancel.check()?;
    finalize_dendrogram(&mut dendrogram, n);

    let graph = config.algorithm.is_graph();
    let mut plot = merge_plot(&dendrogram, graph);
    let suggested_threshold = if graph {
        let suggestion = RobustLogLogRegressor::default().suggest(&dendrogram);
        plot.regression = Some(positive_series(suggestion.regression));
        Some(suggestion.threshold)
    } else {
        None
    };

    info!(
        "Merge sequence ready: {} merges via {}, suggested threshold {:?}",
        dendrogram.len(),
        builder.name(),
        suggested_threshold
    );

    Ok(MergeSequence {
        algorithm: config.algorithm,
        handle_coherent_interfaces: config.handle_coherent_interfaces,
        bonds,
        structures,
        orientations,
        converted_atoms,
        dendrogram,
        plot,
        suggested_threshold,
    })
}

// ============================================================================
// Stage 2: grains
// ============================================================================

/// Final segmentation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    /// Grain id per atom; 0 means no grain.
    pub atom_grains: Vec<i64>,
    /// Grain table; ids run from 1, largest grain first before adoption.
    pub grains: Vec<Grain>,
    /// Cut applied to `ln(distance)`.
    pub threshold: f64,
    pub adoption: AdoptionReport,
}

impl SegmentationResult {
    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    pub fn grain(&self, id: i64) -> Option<&Grain> {
        usize::try_from(id - 1).ok().and_then(|k| self.grains.get(k))
    }

    /// Atoms that belong to no grain.
    pub fn unassigned(&self) -> usize {
        self.atom_grains.iter().filter(|&&g| g == 0).count()
    }
}

/// Stage 2: cut the merge sequence and build grains.
///
/// Only the cut parameters of `config` are used. Its algorithm must be of
/// the same family (spanning tree or graph) as the one `sequence` was built
/// with; switching between manual and automatic graph thresholds is fine.
pub fn assemble(
    sequence: &MergeSequence,
    config: &SegmentationConfig,
    cancel: &CancelFlag,
) -> Result<SegmentationResult> {
    config.validate()?;
    if config.algorithm.is_graph() != sequence.algorithm.is_graph() {
        return Err(Error::Config(format!(
            "Merge sequence was built with {:?}, cannot cut it as {:?}",
            sequence.algorithm, config.algorithm
        )));
    }

    let threshold = config.log_threshold(sequence.suggested_threshold);
    let mut assignment = GrainBuilder::new(config.min_grain_atom_count).build(
        &sequence.dendrogram,
        threshold,
        &sequence.structures,
        &sequence.orientations,
        cancel,
    )?;

    let adoption = if config.orphan_adoption && !assignment.grains.is_empty() {
        OrphanAdopter::new().adopt(
            &sequence.bonds,
            &mut assignment.atom_grains,
            &mut assignment.grains,
            cancel,
        )?
    } else {
        AdoptionReport {
            adopted: Vec::new(),
            remaining: assignment.atom_grains.iter().filter(|&&g| g == 0).count(),
        }
    };

    Ok(SegmentationResult {
        atom_grains: assignment.atom_grains,
        grains: assignment.grains,
        threshold,
        adoption,
    })
}
