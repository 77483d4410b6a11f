//! # Segmentation Model
//!
//! Plain DTOs shared by every pipeline stage: per-atom structure labels,
//! neighbor bonds, dendrogram entries, grains and the simulation cell.
//!
//! Design rule: no algorithm state here. These types are created by one
//! stage, handed to the next, and never own a collaborator.

pub mod structure;
pub mod bond;
pub mod dendrogram;
pub mod grain;
pub mod orientation;
pub mod cell;
pub mod plot;

pub use structure::{StructureType, NUM_STRUCTURE_TYPES};
pub use bond::NeighborBond;
pub use dendrogram::DendrogramNode;
pub use grain::{Grain, Color};
pub use orientation::WeightedOrientation;
pub use cell::SimulationCell;
pub use plot::{MergePlot, RegressionSeries};
