//! Automatic merge threshold for graph clustering.
//!
//! In a log-log plot of merge size against merge distance, merges inside
//! grains follow a smooth trend. Merges across grain boundaries sit well
//! above it. The suggested threshold separates the two populations.
//!
//! The result is advisory. A manual threshold always takes precedence.

use tracing::debug;

use crate::model::{DendrogramNode, RegressionSeries};

/// Huber tuning constant, 95% efficiency under Gaussian noise.
const HUBER_C: f64 = 1.345;

/// Consistency factor turning a MAD into a Gaussian standard deviation.
const MAD_SCALE: f64 = 1.4826;

const SCALE_EPSILON: f64 = 1e-12;

/// Threshold suggestion together with the regression it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdSuggestion {
    /// Suggested cut on `ln(distance)`.
    pub threshold: f64,
    pub regression: RegressionSeries,
}

/// A strategy for picking the dendrogram cut.
pub trait ThresholdSelector {
    fn suggest(&self, dendrogram: &[DendrogramNode]) -> ThresholdSuggestion;
}

/// Robust straight-line fit in log-log space. The largest merges are
/// treated as over-merges when every one of them lies far above the line
/// and they sit at least `min_tail_gap` above every other merge. Otherwise
/// the whole dendrogram is kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustLogLogRegressor {
    /// Scaled residual above which a merge counts as an outlier.
    pub outlier_cutoff: f64,
    /// Reweighting rounds.
    pub iterations: usize,
    /// Smallest `ln(distance)` drop between the outlier tail and the next
    /// merge for the tail to be cut off.
    pub min_tail_gap: f64,
}

impl Default for RobustLogLogRegressor {
    fn default() -> Self {
        Self { outlier_cutoff: 1.5, iterations: 10, min_tail_gap: 1.0 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Line {
    intercept: f64,
    slope: f64,
}

impl Line {
    fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

fn weighted_fit(xs: &[f64], ys: &[f64], weights: &[f64]) -> Line {
    let (mut sw, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for ((&x, &y), &w) in xs.iter().zip(ys).zip(weights) {
        sw += w;
        sx += w * x;
        sy += w * y;
        sxx += w * x * x;
        sxy += w * x * y;
    }
    let denom = sw * sxx - sx * sx;
    if denom.abs() < SCALE_EPSILON * sw.max(1.0) {
        return Line { intercept: sy / sw, slope: 0.0 };
    }
    let slope = (sw * sxy - sx * sy) / denom;
    Line { intercept: (sy - slope * sx) / sw, slope }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 { values[n / 2] } else { 0.5 * (values[n / 2 - 1] + values[n / 2]) }
}

/// Robust scale of residuals, or `None` for a (near) perfect fit.
fn robust_scale(residuals: &[f64]) -> Option<f64> {
    let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let mad = MAD_SCALE * median(&mut abs);
    if mad > SCALE_EPSILON {
        return Some(mad);
    }
    let rms = (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();
    (rms > SCALE_EPSILON).then_some(rms)
}

impl RobustLogLogRegressor {
    /// `(ln merge_size, ln distance)` for merges with a usable distance.
    pub fn scatter(dendrogram: &[DendrogramNode]) -> (Vec<f64>, Vec<f64>) {
        dendrogram
            .iter()
            .filter(|n| n.distance > 0.0 && n.distance.is_finite() && n.merge_size > 0.0)
            .map(|n| (n.merge_size.ln(), n.distance.ln()))
            .unzip()
    }

    fn fit(&self, xs: &[f64], ys: &[f64]) -> (Line, Vec<f64>, Option<f64>) {
        let mut weights = vec![1.0; xs.len()];
        let mut line = weighted_fit(xs, ys, &weights);
        for _ in 0..self.iterations {
            let residuals: Vec<f64> = xs.iter().zip(ys).map(|(&x, &y)| y - line.at(x)).collect();
            let Some(scale) = robust_scale(&residuals) else {
                break;
            };
            for (w, r) in weights.iter_mut().zip(&residuals) {
                let u = (r / scale).abs();
                *w = if u <= HUBER_C { 1.0 } else { HUBER_C / u };
            }
            line = weighted_fit(xs, ys, &weights);
        }
        let residuals: Vec<f64> = xs.iter().zip(ys).map(|(&x, &y)| y - line.at(x)).collect();
        let scale = robust_scale(&residuals);
        (line, residuals, scale)
    }
}

impl ThresholdSelector for RobustLogLogRegressor {
    fn suggest(&self, dendrogram: &[DendrogramNode]) -> ThresholdSuggestion {
        let (xs, ys) = Self::scatter(dendrogram);
        if xs.len() < 2 {
            return ThresholdSuggestion {
                threshold: 0.0,
                regression: RegressionSeries {
                    log_merge_size: xs,
                    fitted_log_distance: ys.clone(),
                    log_merge_distance: ys,
                },
            };
        }

        let (line, residuals, scale) = self.fit(&xs, &ys);
        let is_outlier = |i: usize| scale.is_some_and(|s| residuals[i] / s > self.outlier_cutoff);

        let mut order: Vec<usize> = (0..ys.len()).collect();
        order.sort_by(|&i, &j| ys[j].total_cmp(&ys[i]));
        let tail = order.iter().take_while(|&&i| is_outlier(i)).count();
        let max_y = ys[order[0]];

        // Over-merges form the top of the ln-distance order and stand clear of the rest.
        let threshold = match (order[..tail].last(), order.get(tail)) {
            (Some(&lowest_tail), Some(&highest_rest)) => {
                let (y_out, y_in) = (ys[lowest_tail], ys[highest_rest]);
                let gap = scale.map_or(0.0, |s| self.outlier_cutoff * s).max(self.min_tail_gap);
                if y_out - y_in >= gap { 0.5 * (y_in + y_out) } else { max_y }
            }
            _ => max_y,
        };

        let outliers = (0..ys.len()).filter(|&i| is_outlier(i)).count();
        debug!(
            points = xs.len(),
            outliers,
            tail,
            slope = line.slope,
            intercept = line.intercept,
            threshold,
            "log-log regression"
        );

        ThresholdSuggestion {
            threshold,
            regression: RegressionSeries {
                fitted_log_distance: xs.iter().map(|&x| line.at(x)).collect(),
                log_merge_size: xs,
                log_merge_distance: ys,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use proptest::prelude::*;

    fn node(merge_size: f64, log_distance: f64) -> DendrogramNode {
        let mut n = DendrogramNode::new(0, 1, log_distance.exp(), 0.0, 1, UnitQuaternion::identity());
        n.merge_size = merge_size;
        n
    }

    #[test]
    fn test_empty_scatter() {
        let s = RobustLogLogRegressor::default().suggest(&[]);
        assert_eq!(s.threshold, 0.0);
        assert!(s.regression.log_merge_size.is_empty());
    }

    #[test]
    fn test_non_positive_distances_are_ignored() {
        let mut zero = node(4.0, 0.0);
        zero.distance = 0.0;
        let (xs, _) = RobustLogLogRegressor::scatter(&[zero, node(2.0, 1.0)]);
        assert_eq!(xs.len(), 1);
    }

    #[test]
    fn test_separates_boundary_merges() {
        // Trend y = 1 + 0.5 x with a small alternating wiggle.
        let mut dendrogram: Vec<_> = (1..=60)
            .map(|i| {
                let x = (i as f64).ln();
                let wiggle = if i % 2 == 0 { 0.05 } else { -0.05 };
                node(i as f64, 1.0 + 0.5 * x + wiggle)
            })
            .collect();
        let inlier_max = dendrogram.iter().map(|n| n.log_distance()).fold(f64::MIN, f64::max);
        for size in [10.0, 20.0, 30.0] {
            dendrogram.push(node(size, 1.0 + 0.5 * f64::ln(size) + 5.0));
        }

        let s = RobustLogLogRegressor::default().suggest(&dendrogram);
        let outlier_min = 1.0 + 0.5 * 10f64.ln() + 5.0;
        assert!(s.threshold > inlier_max - 1e-9, "threshold {}", s.threshold);
        assert!(s.threshold < outlier_min);
        assert_eq!(s.regression.log_merge_size.len(), 63);
        let slope = (s.regression.fitted_log_distance[59] - s.regression.fitted_log_distance[0])
            / s.regression.log_merge_size[59];
        assert!((slope - 0.5).abs() < 0.05, "slope {slope}");
    }

    fn trend(n: usize) -> Vec<DendrogramNode> {
        (1..=n)
            .map(|i| {
                let wiggle = if i % 2 == 0 { 0.05 } else { -0.05 };
                node(i as f64, 1.0 + 0.5 * (i as f64).ln() + wiggle)
            })
            .collect()
    }

    fn max_log_distance(dendrogram: &[DendrogramNode]) -> f64 {
        dendrogram.iter().map(|n| n.log_distance()).fold(f64::MIN, f64::max)
    }

    #[test]
    fn test_mid_trend_outlier_keeps_every_merge() {
        let mut dendrogram = trend(60);
        // Far above the line, but below the largest merges.
        dendrogram.push(node(2.0, 1.0 + 0.5 * 2f64.ln() + 1.5));
        let s = RobustLogLogRegressor::default().suggest(&dendrogram);
        assert_eq!(s.threshold, max_log_distance(&dendrogram));
    }

    #[test]
    fn test_small_drop_below_top_merge_is_kept() {
        let mut dendrogram = trend(60);
        let top = max_log_distance(&dendrogram) + 0.6;
        dendrogram.push(node(60.0, top));
        let s = RobustLogLogRegressor::default().suggest(&dendrogram);
        assert_eq!(s.threshold, max_log_distance(&dendrogram));
    }

    #[test]
    fn test_doubling_hierarchy_keeps_every_merge() {
        // Pairwise merges of equal clusters: 128 singleton merges, 64 of size 2, ...
        let mut dendrogram = Vec::new();
        for k in 0..8 {
            let size = f64::from(1u32 << k);
            for j in 0..(128 >> k) {
                let jitter = 0.02 * ((j % 5) as f64 - 2.0);
                dendrogram.push(node(size, 5.0 + 1.2 * size.ln() + jitter));
            }
        }
        let s = RobustLogLogRegressor::default().suggest(&dendrogram);
        assert!(s.threshold >= max_log_distance(&dendrogram) - 1e-9, "threshold {}", s.threshold);
    }

    #[test]
    fn test_two_points_keep_every_merge() {
        let dendrogram = vec![node(1.0, 1.0), node(2.0, 4.0)];
        let s = RobustLogLogRegressor::default().suggest(&dendrogram);
        assert_eq!(s.threshold, max_log_distance(&dendrogram));
    }

    proptest! {
        #[test]
        fn test_clean_line_keeps_every_merge(
            intercept in -3.0f64..3.0,
            slope in -1.0f64..1.0,
            n in 3usize..40,
        ) {
            let dendrogram: Vec<_> = (1..=n)
                .map(|i| node(i as f64, intercept + slope * (i as f64).ln()))
                .collect();
            let max_y = dendrogram.iter().map(|d| d.log_distance()).fold(f64::MIN, f64::max);
            let s = RobustLogLogRegressor::default().suggest(&dendrogram);
            prop_assert!(s.threshold >= max_y - 1e-9);
        }
    }
}
