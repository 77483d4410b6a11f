//! A cluster's running orientation sum.
//!
//! Cluster orientations are averaged by summing symmetry-remapped
//! quaternions. The weight (atom count) is carried explicitly next to the
//! sum rather than being folded into the quaternion norm.

use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Orientation sum of a cluster together with its atom count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedOrientation {
    pub sum: Quaternion<f64>,
    pub weight: f64,
}

impl WeightedOrientation {
    /// A single atom with unit weight.
    pub fn single(q: UnitQuaternion<f64>) -> Self {
        Self { sum: q.into_inner(), weight: 1.0 }
    }

    /// Normalized mean orientation. Falls back to identity for a zero sum.
    pub fn mean(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::try_new(self.sum, f64::EPSILON).unwrap_or_else(UnitQuaternion::identity)
    }
}
