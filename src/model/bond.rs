//! An undirected edge of the atomic neighbor graph.

use serde::{Deserialize, Serialize};

/// A bond between two neighboring atoms.
///
/// Stored once per atom pair with `a < b`. `disorientation` is in degrees
/// and stays `+inf` until the disorientation stage has run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborBond {
    pub a: usize,
    pub b: usize,
    pub disorientation: f64,
    pub length: f64,
}

impl NeighborBond {
    /// Canonical bond between `i` and `j` (endpoints are ordered).
    pub fn new(i: usize, j: usize, length: f64) -> Self {
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        Self { a, b, disorientation: f64::INFINITY, length }
    }

    /// The same bond traversed from `b` to `a`.
    pub fn reversed(&self) -> Self {
        Self { a: self.b, b: self.a, ..*self }
    }
}
