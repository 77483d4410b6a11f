//! Grains: contiguous, commonly oriented crystalline regions.

use nalgebra::UnitQuaternion;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::StructureType;

/// Seed of the grain color generator. Fixed so results are reproducible.
pub const COLOR_SEED: u64 = 1;

/// RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Color used for atoms that belong to no grain.
    pub const UNASSIGNED: Color = Color { r: 0.8, g: 0.8, b: 0.8 };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Convert hue/saturation/value (all in `[0, 1]`) to RGB.
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        if s == 0.0 {
            return Self::new(v, v, v);
        }
        let h = (h - h.floor()) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match sector as u8 {
            0 => Self::new(v, t, p),
            1 => Self::new(q, v, p),
            2 => Self::new(p, v, t),
            3 => Self::new(p, q, v),
            4 => Self::new(t, p, v),
            _ => Self::new(v, p, q),
        }
    }

    /// `count` reproducible grain colors.
    pub fn palette(count: usize) -> Vec<Color> {
        let mut rng = ChaCha8Rng::seed_from_u64(COLOR_SEED);
        (0..count)
            .map(|_| {
                let h: f64 = rng.r#gen();
                let s = 1.0 - rng.r#gen::<f64>() * 0.8;
                let v = 1.0 - rng.r#gen::<f64>() * 0.5;
                Color::from_hsv(h, s, v)
            })
            .collect()
    }
}

/// A grain in the segmentation output. Ids start at 1; id 0 is reserved
/// for atoms that belong to no grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grain {
    pub id: i64,
    pub size: usize,
    pub structure: StructureType,
    pub color: Color,
    /// Normalized mean lattice orientation.
    pub orientation: UnitQuaternion<f64>,
}
