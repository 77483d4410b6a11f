//! # grainseg — Grain Segmentation of Atomic Configurations
//!
//! Decomposes a polycrystalline atomic configuration into grains: connected
//! regions of atoms sharing a lattice orientation, separated by grain
//! boundaries, stacking faults or disordered atoms.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: neighbor enumeration (`NeighborQuery`) and
//!    crystallographic remapping (`OrientationRemap`) are collaborator
//!    contracts with in-memory reference implementations
//! 2. **Clean DTOs**: `NeighborBond`, `DendrogramNode`, `Grain` cross all
//!    stage boundaries
//! 3. **Two pure stages**: `analyze` builds an immutable `MergeSequence`,
//!    `assemble` cuts it; changing the cut never recomputes the dendrogram
//! 4. **Pluggable clustering**: spanning-tree and node-pair-sampling
//!    builders behind one `DendrogramBuilder` contract
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grainseg::{Atoms, MergeAlgorithm, SegmentationConfig, Segmenter, SimulationCell};
//!
//! # fn example(atoms: Atoms) -> grainseg::Result<()> {
//! let cell = SimulationCell::orthogonal(40.0, 40.0, 40.0, [true; 3])?;
//! let config = SegmentationConfig {
//!     algorithm: MergeAlgorithm::MinimumSpanningTree,
//!     merging_threshold: 4.0,
//!     ..Default::default()
//! };
//!
//! let segmenter = Segmenter::from_positions(&atoms, cell, config)?;
//! let result = segmenter.segment(&atoms)?;
//! for grain in &result.grains {
//!     println!("grain {}: {} atoms ({})", grain.id, grain.size, grain.structure);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Parallel |
//! |-------|--------|----------|
//! | Neighbor bonds | `neighbors::bonds` | yes |
//! | Coherent interfaces | `interface` | no |
//! | Disorientations | `disorientation` | yes |
//! | Dendrogram | `cluster` | no |
//! | Threshold suggestion | `threshold` | no |
//! | Grain table | `grains` | no |
//! | Orphan adoption | `adoption` | no |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod crystal;
pub mod neighbors;
pub mod disjoint_set;
pub mod interface;
pub mod disorientation;
pub mod cluster;
pub mod threshold;
pub mod grains;
pub mod adoption;
pub mod config;
pub mod engine;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    StructureType, NeighborBond, DendrogramNode, Grain, Color,
    WeightedOrientation, SimulationCell, MergePlot, RegressionSeries,
};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use neighbors::{Neighbor, NeighborQuery, NeighborList, MAX_NEIGHBORS};
pub use crystal::{OrientationRemap, Remapped, SymmetryRemap};

// ============================================================================
// Re-exports: Stages
// ============================================================================

pub use cluster::{DendrogramBuilder, MinimumSpanningTree, NodePairSampling};
pub use threshold::{ThresholdSelector, RobustLogLogRegressor};
pub use adoption::{AdoptionReport, AdoptedAtom};
pub use config::{MergeAlgorithm, SegmentationConfig};
pub use engine::{Atoms, CancelFlag, MergeSequence, SegmentationResult};

// ============================================================================
// Top-level Segmenter handle
// ============================================================================

/// The primary entry point. A `Segmenter` owns the collaborators, the
/// simulation cell and the configuration.
pub struct Segmenter<Q: NeighborQuery, R: OrientationRemap> {
    query: Q,
    remap: R,
    cell: SimulationCell,
    config: SegmentationConfig,
}

impl<Q: NeighborQuery, R: OrientationRemap> Segmenter<Q, R> {
    /// Create a segmenter. Fails if `config` does not validate.
    pub fn new(query: Q, remap: R, cell: SimulationCell, config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { query, remap, cell, config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Replace the configuration, e.g. to re-cut with new stage-2 values.
    pub fn set_config(&mut self, config: SegmentationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn cell(&self) -> &SimulationCell {
        &self.cell
    }

    /// Stage 1: build the merge sequence.
    pub fn analyze(&self, atoms: &Atoms, cancel: &CancelFlag) -> Result<MergeSequence> {
        engine::analyze(atoms, &self.query, &self.remap, &self.cell, &self.config, cancel)
    }

    /// Stage 2: cut a merge sequence with the current configuration.
    pub fn assemble(&self, sequence: &MergeSequence, cancel: &CancelFlag) -> Result<SegmentationResult> {
        engine::assemble(sequence, &self.config, cancel)
    }

    /// Both stages, without cancellation.
    pub fn segment(&self, atoms: &Atoms) -> Result<SegmentationResult> {
        let cancel = CancelFlag::new();
        let sequence = self.analyze(atoms, &cancel)?;
        self.assemble(&sequence, &cancel)
    }
}

/// Brute-force neighbor lists with the point-group remap, for testing and
/// small samples.
impl Segmenter<NeighborList, SymmetryRemap> {
    pub fn from_positions(atoms: &Atoms, cell: SimulationCell, config: SegmentationConfig) -> Result<Self> {
        let query = NeighborList::from_positions(&atoms.positions, &cell, MAX_NEIGHBORS);
        Self::new(query, SymmetryRemap, cell, config)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Simulation box is too short along cell vector {dimension} ({axis}) to perform analysis. \
         Please extend it first by replicating the cell."
    )]
    CellTooSmall { dimension: usize, axis: char },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("Orientation remap failed for structure {structure}")]
    RemapFailure { structure: StructureType },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation canceled")]
    Canceled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
