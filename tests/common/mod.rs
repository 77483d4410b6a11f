//! Synthetic lattices shared by the end-to-end tests.
//!
//! Positions always form a perfect FCC lattice (lattice constant 1); grains
//! and defects are expressed through the per-atom structure labels and
//! orientations, the way a template matcher would report them.

#![allow(dead_code)]

use grainseg::{Atoms, SimulationCell, StructureType};
use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

/// FCC positions in `nx × ny × nz` conventional cells.
pub fn fcc_positions(nx: usize, ny: usize, nz: usize) -> Vec<Point3<f64>> {
    let basis = [[0.0, 0.0, 0.0], [0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]];
    let mut positions = Vec::with_capacity(4 * nx * ny * nz);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                for b in &basis {
                    positions.push(Point3::new(x as f64 + b[0], y as f64 + b[1], z as f64 + b[2]));
                }
            }
        }
    }
    positions
}

pub fn cell(nx: usize, ny: usize, nz: usize, pbc: [bool; 3]) -> SimulationCell {
    SimulationCell::orthogonal(nx as f64, ny as f64, nz as f64, pbc).unwrap()
}

pub fn rot(axis: [f64; 3], degrees: f64) -> UnitQuaternion<f64> {
    let axis = Unit::new_normalize(Vector3::new(axis[0], axis[1], axis[2]));
    UnitQuaternion::from_axis_angle(&axis, degrees.to_radians())
}

/// Label every atom through `f`.
pub fn label<F>(positions: Vec<Point3<f64>>, f: F) -> Atoms
where
    F: Fn(&Point3<f64>) -> (StructureType, UnitQuaternion<f64>),
{
    let (structures, orientations) = positions.iter().map(f).unzip();
    Atoms { positions, structures, orientations }
}

/// A single perfect FCC crystal with orientation `q`.
pub fn perfect_fcc(n: usize, q: UnitQuaternion<f64>) -> Atoms {
    label(fcc_positions(n, n, n), |_| (StructureType::Fcc, q))
}

/// Two FCC grains split at `x = n / 2`, rotated `boundary_degrees` apart
/// about z.
pub fn bicrystal(n: usize, boundary_degrees: f64) -> Atoms {
    let q1 = rot([1.0, 2.0, 3.0], 20.0);
    let q2 = q1 * rot([0.0, 0.0, 1.0], boundary_degrees);
    let half = n as f64 / 2.0;
    label(fcc_positions(n, n, n), |p| {
        (StructureType::Fcc, if p.x < half { q1 } else { q2 })
    })
}

/// Every grain id is in range and grain sizes match the per-atom ids.
pub fn assert_partition(atom_grains: &[i64], grains: &[grainseg::Grain]) {
    let mut counts = vec![0usize; grains.len()];
    for &g in atom_grains {
        assert!(g >= 0 && g as usize <= grains.len(), "grain id {g} out of range");
        if g > 0 {
            counts[g as usize - 1] += 1;
        }
    }
    for (k, grain) in grains.iter().enumerate() {
        assert_eq!(grain.id, k as i64 + 1);
        assert_eq!(grain.size, counts[k], "size of grain {}", grain.id);
    }
}
