//! Point-group symmetry remapping.
//!
//! Orientations map crystal coordinates to lab coordinates. A symmetry
//! operation `s` of the lattice acts in the crystal frame, so `q` and
//! `q * s` describe the same crystal. The disorientation between `qa` and
//! `qb` is the smallest rotation angle of `qa⁻¹ * qb * s` over the group.
//!
//! ```text
//! cubic (24)      identity, 3 × 180° ⟨100⟩, 6 × 90° ⟨100⟩,
//!                 6 × 180° ⟨110⟩, 8 × 120° ⟨111⟩
//! hexagonal (12)  6 × k·60° about c, 6 × 180° about in-plane axes
//! ```
//!
//! The hexagonal frame relates to the cubic one through the close-packed
//! stacking: c ∥ [111], a1 ∥ [1̄10]. A hexagonal orientation `qh` has the
//! cubic equivalent `qh * HEX_TO_CUBIC`.

use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::LazyLock;

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion};

use crate::model::StructureType;
use crate::{Error, Result};
use super::{OrientationRemap, Remapped};

/// Proper rotations of the cubic point group.
pub static CUBIC_GROUP: LazyLock<Vec<UnitQuaternion<f64>>> = LazyLock::new(|| {
    let h = 0.5;
    let c = FRAC_1_SQRT_2;
    let mut ops = vec![
        Quaternion::new(1.0, 0.0, 0.0, 0.0),
        // 180° about the cube axes
        Quaternion::new(0.0, 1.0, 0.0, 0.0),
        Quaternion::new(0.0, 0.0, 1.0, 0.0),
        Quaternion::new(0.0, 0.0, 0.0, 1.0),
        // ±90° about the cube axes
        Quaternion::new(c, c, 0.0, 0.0),
        Quaternion::new(c, -c, 0.0, 0.0),
        Quaternion::new(c, 0.0, c, 0.0),
        Quaternion::new(c, 0.0, -c, 0.0),
        Quaternion::new(c, 0.0, 0.0, c),
        Quaternion::new(c, 0.0, 0.0, -c),
        // 180° about the face diagonals
        Quaternion::new(0.0, c, c, 0.0),
        Quaternion::new(0.0, c, -c, 0.0),
        Quaternion::new(0.0, c, 0.0, c),
        Quaternion::new(0.0, c, 0.0, -c),
        Quaternion::new(0.0, 0.0, c, c),
        Quaternion::new(0.0, 0.0, c, -c),
    ];
    // 120° about the body diagonals
    for sx in [h, -h] {
        for sy in [h, -h] {
            for sz in [h, -h] {
                ops.push(Quaternion::new(h, sx, sy, sz));
            }
        }
    }
    ops.into_iter().map(UnitQuaternion::new_normalize).collect()
});

/// Proper rotations of the conventional hexagonal point group.
pub static HEXAGONAL_GROUP: LazyLock<Vec<UnitQuaternion<f64>>> = LazyLock::new(|| {
    let mut ops = Vec::with_capacity(12);
    for k in 0..6 {
        let half = (k as f64 * 30.0).to_radians();
        ops.push(Quaternion::new(half.cos(), 0.0, 0.0, half.sin()));
    }
    for k in 0..6 {
        let phi = (k as f64 * 30.0).to_radians();
        ops.push(Quaternion::new(0.0, phi.cos(), phi.sin(), 0.0));
    }
    ops.into_iter().map(UnitQuaternion::new_normalize).collect()
});

/// Rotation taking cubic crystal coordinates into the hexagonal frame.
pub static HEX_TO_CUBIC: LazyLock<UnitQuaternion<f64>> = LazyLock::new(|| {
    let s2 = 2f64.sqrt();
    let s3 = 3f64.sqrt();
    let s6 = 6f64.sqrt();
    #[rustfmt::skip]
    let m = Matrix3::new(
        1.0 / s2, -1.0 / s2,  0.0,
        1.0 / s6,  1.0 / s6, -2.0 / s6,
        1.0 / s3,  1.0 / s3,  1.0 / s3,
    );
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
});

/// The symmetry group used for orientations of `structure`.
pub fn symmetry_group(structure: StructureType) -> Option<&'static [UnitQuaternion<f64>]> {
    if structure.is_cubic() {
        Some(CUBIC_GROUP.as_slice())
    } else if structure.is_hexagonal() {
        Some(HEXAGONAL_GROUP.as_slice())
    } else {
        None
    }
}

/// Rotation angle (radians) of a unit quaternion, in `[0, π]`.
///
/// Uses `atan2` so that angles near zero keep full precision.
pub fn rotation_angle(q: &UnitQuaternion<f64>) -> f64 {
    2.0 * q.imag().norm().atan2(q.w.abs())
}

/// Reference remap implementation over the proper-rotation point groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymmetryRemap;

impl SymmetryRemap {
    fn remap_with_group(
        group: &[UnitQuaternion<f64>],
        target: &UnitQuaternion<f64>,
        q: &UnitQuaternion<f64>,
    ) -> Remapped {
        let target_inv = target.inverse();
        let mut best = *q;
        let mut best_w = -1.0;
        for s in group {
            let candidate = q * s;
            let w = (target_inv * candidate).w.abs();
            if w > best_w {
                best_w = w;
                best = candidate;
            }
        }

        if target.coords.dot(&best.coords) < 0.0 {
            best = UnitQuaternion::new_unchecked(-best.into_inner());
        }

        Remapped {
            disorientation: rotation_angle(&(target_inv * best)),
            orientation: best,
        }
    }
}

impl OrientationRemap for SymmetryRemap {
    fn remap(
        &self,
        structure: StructureType,
        target: &UnitQuaternion<f64>,
        q: &UnitQuaternion<f64>,
    ) -> Result<Remapped> {
        let group = symmetry_group(structure).ok_or(Error::RemapFailure { structure })?;
        Ok(Self::remap_with_group(group, target, q))
    }

    fn remap_interface(
        &self,
        parent: StructureType,
        q_parent: &UnitQuaternion<f64>,
        q_defect: &UnitQuaternion<f64>,
    ) -> Result<Remapped> {
        let converted = if parent.is_cubic() {
            q_defect * *HEX_TO_CUBIC
        } else if parent.is_hexagonal() {
            q_defect * HEX_TO_CUBIC.inverse()
        } else {
            return Err(Error::RemapFailure { structure: parent });
        };
        self.remap(parent, q_parent, &converted)
    }
}
