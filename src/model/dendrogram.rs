//! One binary cluster merge of the dendrogram.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

/// A single merge of two clusters, identified by representative atoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendrogramNode {
    /// Representative of the absorbing cluster.
    pub a: usize,
    /// Representative of the absorbed cluster.
    pub b: usize,
    /// Merge distance the dendrogram is ordered by. Degrees for the
    /// spanning-tree variant, node-pair-sampling distance otherwise.
    pub distance: f64,
    /// Physical disorientation (degrees) associated with the merge.
    pub disorientation: f64,
    /// Size of the smaller sub-cluster at merge time.
    pub size: usize,
    /// Geometric mean of the two sub-cluster sizes at merge time.
    pub merge_size: f64,
    /// Mean orientation of the merged cluster.
    pub orientation: UnitQuaternion<f64>,
}

impl DendrogramNode {
    pub fn new(
        a: usize,
        b: usize,
        distance: f64,
        disorientation: f64,
        size: usize,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        Self { a, b, distance, disorientation, size, merge_size: size as f64, orientation }
    }

    /// `ln(distance)`, the quantity compared against merge thresholds.
    pub fn log_distance(&self) -> f64 {
        self.distance.ln()
    }
}

/// Sort dendrogram entries by non-decreasing distance (stable).
pub fn sort_by_distance(dendrogram: &mut [DendrogramNode]) {
    dendrogram.sort_by(|x, y| x.distance.total_cmp(&y.distance));
}

/// True if every entry's distance is `<=` its successor's.
pub fn is_sorted_by_distance(dendrogram: &[DendrogramNode]) -> bool {
    dendrogram.windows(2).all(|w| w[0].distance <= w[1].distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(distance: f64) -> DendrogramNode {
        DendrogramNode::new(0, 1, distance, 0.0, 1, UnitQuaternion::identity())
    }

    #[test]
    fn test_sort_by_distance() {
        let mut d = vec![node(3.0), node(0.5), node(2.0), node(0.0)];
        sort_by_distance(&mut d);
        assert!(is_sorted_by_distance(&d));
        assert_eq!(d[0].distance, 0.0);
        assert_eq!(d[3].distance, 3.0);
    }

    #[test]
    fn test_log_distance_of_zero() {
        assert_eq!(node(0.0).log_distance(), f64::NEG_INFINITY);
    }
}
