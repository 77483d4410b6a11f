//! # Crystallographic Remap Contract
//!
//! Orientation comparisons must account for the point-group symmetry of the
//! lattice: two quaternions that differ by a symmetry operation describe the
//! same crystal. This module defines the contract the segmentation pipeline
//! uses to compare orientations, and a reference implementation.
//!
//! ## Implementations
//!
//! | Remap | Module | Description |
//! |-------|--------|-------------|
//! | `SymmetryRemap` | `symmetry` | Enumerates proper-rotation point groups |

pub mod symmetry;

use nalgebra::UnitQuaternion;

use crate::model::StructureType;
use crate::Result;

pub use symmetry::SymmetryRemap;

/// Outcome of remapping one orientation onto another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Remapped {
    /// Minimal rotation angle between the two orientations, in radians.
    pub disorientation: f64,
    /// The symmetry-equivalent of the input orientation closest to the
    /// target, sign-chosen so its dot product with the target is >= 0.
    pub orientation: UnitQuaternion<f64>,
}

/// The crystallographic remap capability.
///
/// Implementations must be deterministic and thread-safe: the pipeline
/// calls them from worker threads during the disorientation stage.
pub trait OrientationRemap: Send + Sync {
    /// Remap `q` onto `target` using the symmetry of `structure`.
    ///
    /// Returns `Error::RemapFailure` for structures without a symmetry
    /// group (disordered atoms). Callers treat that as a soft failure.
    fn remap(
        &self,
        structure: StructureType,
        target: &UnitQuaternion<f64>,
        q: &UnitQuaternion<f64>,
    ) -> Result<Remapped>;

    /// Remap the orientation of a `defect`-phase atom across a coherent
    /// interface onto a `parent`-phase atom.
    ///
    /// `q_defect` is first converted into the parent phase's frame (cubic
    /// to hexagonal or vice versa), then remapped with the parent's symmetry.
    fn remap_interface(
        &self,
        parent: StructureType,
        q_parent: &UnitQuaternion<f64>,
        q_defect: &UnitQuaternion<f64>,
    ) -> Result<Remapped>;
}

impl<R: OrientationRemap + ?Sized> OrientationRemap for &R {
    fn remap(
        &self,
        structure: StructureType,
        target: &UnitQuaternion<f64>,
        q: &UnitQuaternion<f64>,
    ) -> Result<Remapped> {
        (**self).remap(structure, target, q)
    }

    fn remap_interface(
        &self,
        parent: StructureType,
        q_parent: &UnitQuaternion<f64>,
        q_defect: &UnitQuaternion<f64>,
    ) -> Result<Remapped> {
        (**self).remap_interface(parent, q_parent, q_defect)
    }
}
