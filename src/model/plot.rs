//! Diagnostic series describing the merge sequence.

use serde::{Deserialize, Serialize};

/// Merges involving fewer atoms than this are left out of the plot; they
/// stretch the axis without adding information.
pub const MIN_PLOT_SIZE: usize = 20;

/// Scatter data for user inspection of the dendrogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergePlot {
    /// Merge distance (spanning tree: degrees; graph: `ln(distance)`).
    pub merge_distance: Vec<f64>,
    /// Size of the smaller cluster at each plotted merge.
    pub merge_size: Vec<f64>,
    /// Regression series, graph clustering only.
    pub regression: Option<RegressionSeries>,
}

/// Log-log scatter and the fitted trend used for threshold selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionSeries {
    pub log_merge_size: Vec<f64>,
    pub log_merge_distance: Vec<f64>,
    pub fitted_log_distance: Vec<f64>,
}

impl MergePlot {
    pub fn len(&self) -> usize {
        self.merge_distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merge_distance.is_empty()
    }
}
