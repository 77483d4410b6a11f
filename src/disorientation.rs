//! Per-bond disorientation angles.
//!
//! Every bond between two atoms of the same crystalline type gets the
//! minimal rotation angle between their orientations, in degrees, under the
//! point-group symmetry of that type. All other bonds get `f64::MAX` and
//! never take part in clustering. Afterwards the bond list is sorted by
//! ascending disorientation, which both clustering variants rely on.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::UnitQuaternion;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::crystal::OrientationRemap;
use crate::engine::CancelFlag;
use crate::model::{NeighborBond, StructureType};
use crate::{Error, Result};

const CHUNK_SIZE: usize = 4096;

/// Disorientation (degrees) of a single bond, or `f64::MAX` if the atoms
/// cannot be compared.
///
/// Remap failures return `Err(Error::RemapFailure)`; callers decide whether
/// to downgrade them.
pub fn bond_disorientation<R: OrientationRemap + ?Sized>(
    bond: &NeighborBond,
    structures: &[StructureType],
    orientations: &[UnitQuaternion<f64>],
    remap: &R,
) -> Result<f64> {
    let (sa, sb) = (structures[bond.a], structures[bond.b]);
    if sa != sb || !sa.is_crystalline() {
        return Ok(f64::MAX);
    }
    let r = remap.remap(sa, &orientations[bond.a], &orientations[bond.b])?;
    let degrees = r.disorientation.to_degrees();
    debug_assert!(!degrees.is_nan(), "NaN disorientation for bond ({}, {})", bond.a, bond.b);
    if degrees.is_nan() {
        return Err(Error::Invariant(format!(
            "NaN disorientation for bond ({}, {})",
            bond.a, bond.b
        )));
    }
    Ok(degrees)
}

/// Fill in `disorientation` for every bond and sort the list by it.
///
/// Ties are ordered by endpoint indices so the order does not depend on
/// thread scheduling.
pub fn compute_disorientations<R: OrientationRemap + ?Sized>(
    bonds: &mut [NeighborBond],
    structures: &[StructureType],
    orientations: &[UnitQuaternion<f64>],
    remap: &R,
    cancel: &CancelFlag,
) -> Result<()> {
    let n = structures.len();
    if orientations.len() != n {
        return Err(Error::InvalidInput("Structure and orientation arrays differ in length".into()));
    }
    if let Some(bond) = bonds.iter().find(|b| b.a >= n || b.b >= n) {
        return Err(Error::InvalidInput(format!("Bond ({}, {}) out of range", bond.a, bond.b)));
    }

    let failures = AtomicUsize::new(0);
    bonds.par_chunks_mut(CHUNK_SIZE).try_for_each(|chunk| -> Result<()> {
        cancel.check()?;
        for bond in chunk.iter_mut() {
            bond.disorientation = match bond_disorientation(bond, structures, orientations, remap) {
                Ok(angle) => angle,
                Err(Error::RemapFailure { structure }) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    debug!(a = bond.a, b = bond.b, %structure, "disorientation remap failed");
                    f64::MAX
                }
                Err(e) => return Err(e),
            };
        }
        Ok(())
    })?;

    let failures = failures.into_inner();
    if failures > 0 {
        warn!("Orientation remapping failed for {} bonds; they are excluded from clustering", failures);
    }

    bonds.par_sort_by(|x, y| {
        x.disorientation
            .total_cmp(&y.disorientation)
            .then(x.a.cmp(&y.a))
            .then(x.b.cmp(&y.b))
    });
    cancel.check()?;

    let crystalline = bonds.iter().filter(|b| b.disorientation < f64::MAX).count();
    info!("Computed disorientations for {} bonds ({} crystalline)", bonds.len(), crystalline);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::{Remapped, SymmetryRemap};
    use nalgebra::Vector3;

    fn rot_z(degrees: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), degrees.to_radians())
    }

    #[test]
    fn test_sorted_and_excluded() {
        let structures = vec![
            StructureType::Fcc,
            StructureType::Fcc,
            StructureType::Fcc,
            StructureType::Bcc,
            StructureType::Other,
        ];
        let orientations = vec![rot_z(0.0), rot_z(3.0), rot_z(4.0), rot_z(0.0), rot_z(0.0)];
        let mut bonds = vec![
            NeighborBond::new(0, 1, 1.0),
            NeighborBond::new(1, 2, 1.0),
            NeighborBond::new(2, 3, 1.0),
            NeighborBond::new(3, 4, 1.0),
            NeighborBond::new(0, 2, 1.0),
        ];

        compute_disorientations(&mut bonds, &structures, &orientations, &SymmetryRemap, &CancelFlag::new())
            .unwrap();

        let pairs: Vec<_> = bonds.iter().map(|b| (b.a, b.b)).collect();
        assert_eq!(pairs, vec![(1, 2), (0, 1), (0, 2), (2, 3), (3, 4)]);
        assert!((bonds[0].disorientation - 1.0).abs() < 1e-6);
        assert!((bonds[1].disorientation - 3.0).abs() < 1e-6);
        assert!((bonds[2].disorientation - 4.0).abs() < 1e-6);
        assert_eq!(bonds[3].disorientation, f64::MAX);
        assert_eq!(bonds[4].disorientation, f64::MAX);
    }

    struct FailingRemap;

    impl OrientationRemap for FailingRemap {
        fn remap(
            &self,
            structure: StructureType,
            _target: &UnitQuaternion<f64>,
            _q: &UnitQuaternion<f64>,
        ) -> Result<Remapped> {
            Err(Error::RemapFailure { structure })
        }

        fn remap_interface(
            &self,
            parent: StructureType,
            _q_parent: &UnitQuaternion<f64>,
            _q_defect: &UnitQuaternion<f64>,
        ) -> Result<Remapped> {
            Err(Error::RemapFailure { structure: parent })
        }
    }

    #[test]
    fn test_remap_failure_is_soft() {
        let structures = vec![StructureType::Fcc; 2];
        let orientations = vec![rot_z(0.0); 2];
        let mut bonds = vec![NeighborBond::new(0, 1, 1.0)];
        compute_disorientations(&mut bonds, &structures, &orientations, &FailingRemap, &CancelFlag::new())
            .unwrap();
        assert_eq!(bonds[0].disorientation, f64::MAX);
    }

    #[test]
    fn test_out_of_range_bond() {
        let mut bonds = vec![NeighborBond::new(0, 5, 1.0)];
        let result = compute_disorientations(
            &mut bonds,
            &[StructureType::Fcc],
            &[rot_z(0.0)],
            &SymmetryRemap,
            &CancelFlag::new(),
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
