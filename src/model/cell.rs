//! Simulation cell geometry with per-axis periodicity.

use nalgebra::{Matrix3, Point3, Vector3};
use crate::{Error, Result};

/// Slack on the half-cell criterion for neighbor vectors.
pub const HALF_CELL_EPSILON: f64 = 1e-6;

/// Axis labels used in user-facing messages.
pub const AXIS_LABELS: [char; 3] = ['X', 'Y', 'Z'];

/// Parallelepiped simulation cell. The columns of `matrix` are the three
/// cell vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationCell {
    pub matrix: Matrix3<f64>,
    pub origin: Point3<f64>,
    pub pbc: [bool; 3],
    inverse: Matrix3<f64>,
}

impl SimulationCell {
    pub fn new(matrix: Matrix3<f64>, origin: Point3<f64>, pbc: [bool; 3]) -> Result<Self> {
        let inverse = matrix.try_inverse().ok_or_else(|| {
            Error::InvalidInput("Simulation cell matrix is singular".into())
        })?;
        Ok(Self { matrix, origin, pbc, inverse })
    }

    /// Orthogonal box with edge lengths `lx`, `ly`, `lz` at the origin.
    pub fn orthogonal(lx: f64, ly: f64, lz: f64, pbc: [bool; 3]) -> Result<Self> {
        Self::new(Matrix3::from_diagonal(&Vector3::new(lx, ly, lz)), Point3::origin(), pbc)
    }

    /// Component `dim` of a vector expressed in reduced cell coordinates.
    pub fn reduced_component(&self, v: &Vector3<f64>, dim: usize) -> f64 {
        (self.inverse * v)[dim]
    }

    /// Minimum-image displacement from `from` to `to`.
    pub fn wrap_delta(&self, from: &Point3<f64>, to: &Point3<f64>) -> Vector3<f64> {
        let mut reduced = self.inverse * (to - from);
        for dim in 0..3 {
            if self.pbc[dim] {
                reduced[dim] -= reduced[dim].round();
            }
        }
        self.matrix * reduced
    }

    /// Fail if `delta` spans half of the cell or more along a periodic axis.
    ///
    /// A neighbor vector that long means the atom may see a periodic image
    /// of its own neighborhood, which corrupts every orientation comparison.
    pub fn check_neighbor_vector(&self, delta: &Vector3<f64>) -> Result<()> {
        for dim in 0..3 {
            if self.pbc[dim]
                && self.reduced_component(delta, dim).abs() >= 0.5 + HALF_CELL_EPSILON
            {
                return Err(Error::CellTooSmall {
                    dimension: dim + 1,
                    axis: AXIS_LABELS[dim],
                });
            }
        }
        Ok(())
    }
}
