//! Segmentation parameters.
//!
//! Parameters fall into two groups. `algorithm` and
//! `handle_coherent_interfaces` shape the merge sequence (stage 1); the
//! rest only affect how it is cut and post-processed (stage 2). A
//! `MergeSequence` can be reassembled with new stage-2 values without
//! recomputing stage 1.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Clustering strategy and threshold mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MergeAlgorithm {
    /// Spanning-tree agglomeration; threshold in degrees.
    MinimumSpanningTree,
    /// Node-pair sampling with an automatically suggested threshold.
    #[default]
    GraphClusteringAutomatic,
    /// Node-pair sampling with a user threshold on `ln(distance)`.
    GraphClusteringManual,
}

impl MergeAlgorithm {
    pub fn is_graph(self) -> bool {
        !matches!(self, MergeAlgorithm::MinimumSpanningTree)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub algorithm: MergeAlgorithm,
    /// Convert stacking-fault and twin atoms to their parent phase.
    pub handle_coherent_interfaces: bool,
    pub merging_threshold: f64,
    pub min_grain_atom_count: usize,
    pub orphan_adoption: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            algorithm: MergeAlgorithm::default(),
            handle_coherent_interfaces: true,
            merging_threshold: 0.0,
            min_grain_atom_count: 100,
            orphan_adoption: true,
        }
    }
}

impl SegmentationConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.merging_threshold.is_finite() {
            return Err(Error::Config(format!(
                "merging_threshold must be finite, got {}",
                self.merging_threshold
            )));
        }
        if self.min_grain_atom_count == 0 {
            return Err(Error::Config("min_grain_atom_count must be at least 1".into()));
        }
        if self.algorithm == MergeAlgorithm::MinimumSpanningTree && self.merging_threshold <= 0.0 {
            return Err(Error::Config(
                "merging_threshold must be positive (degrees) for spanning-tree clustering".into(),
            ));
        }
        Ok(())
    }

    /// The cut applied to `ln(distance)`, given the suggested threshold of
    /// the merge sequence.
    pub fn log_threshold(&self, suggested: Option<f64>) -> f64 {
        match self.algorithm {
            MergeAlgorithm::MinimumSpanningTree => self.merging_threshold.ln(),
            MergeAlgorithm::GraphClusteringManual => self.merging_threshold,
            MergeAlgorithm::GraphClusteringAutomatic => suggested.unwrap_or(self.merging_threshold),
        }
    }
}
