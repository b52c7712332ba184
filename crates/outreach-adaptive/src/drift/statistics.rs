//! Sample statistics and the fixed-bin histogram used for PSI.

use serde::{Deserialize, Serialize};

/// Added to a baseline standard deviation before dividing by it
pub const STDDEV_EPSILON: f64 = 1e-10;

/// Floor applied to histogram proportions before taking logarithms in PSI.
///
/// Empty bins on one side otherwise produce `ln(0)`. Too small a floor inflates
/// PSI for a single stray value; too large a floor hides real shifts.
pub const PSI_PROPORTION_FLOOR: f64 = 1e-4;

/// Half-width used to widen a zero-width baseline range into usable bins
pub const DEGENERATE_RANGE_PADDING: f64 = 0.5;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around `mean`
pub fn population_stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Fixed bin edges with per-bin counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Equal-width bins spanning the sample's range.
    ///
    /// A zero-width range is widened by [`DEGENERATE_RANGE_PADDING`] on each side.
    pub fn from_sample(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (min, max) = min_max(values);
        let (low, high) = if max > min {
            (min, max)
        } else {
            (min - DEGENERATE_RANGE_PADDING, max + DEGENERATE_RANGE_PADDING)
        };

        let width = high - low;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| {
                if i == bins {
                    high
                } else {
                    low + width * i as f64 / bins as f64
                }
            })
            .collect();
        let counts = bin_counts(&edges, values);
        Self { edges, counts }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Count `values` into this histogram's edges
    pub fn count(&self, values: &[f64]) -> Vec<u64> {
        bin_counts(&self.edges, values)
    }
}

/// Bin index for each value. Values outside the edges land in the end bins;
/// the last bin includes its right edge.
fn bin_counts(edges: &[f64], values: &[f64]) -> Vec<u64> {
    let bins = edges.len().saturating_sub(1).max(1);
    let mut counts = vec![0u64; bins];
    for value in values {
        let upper = edges.partition_point(|edge| edge <= value);
        let index = upper.saturating_sub(1).min(bins - 1);
        counts[index] += 1;
    }
    counts
}

/// Proportion per bin, floored at [`PSI_PROPORTION_FLOOR`]
pub fn proportions(counts: &[u64]) -> Vec<f64> {
    let total: u64 = counts.iter().sum();
    counts
        .iter()
        .map(|count| {
            let p = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64
            };
            p.max(PSI_PROPORTION_FLOOR)
        })
        .collect()
}

/// `Σ (cur − base) · ln(cur / base)` over floored proportions
pub fn population_stability_index(baseline_counts: &[u64], current_counts: &[u64]) -> f64 {
    let base = proportions(baseline_counts);
    let current = proportions(current_counts);
    base.iter()
        .zip(current.iter())
        .map(|(b, c)| (c - b) * (c / b).ln())
        .sum()
}

pub(crate) fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(*v), hi.max(*v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert_eq!(population_stddev(&values, m), 2.0);
    }

    #[test]
    fn test_histogram_edges_and_counts() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        let histogram = Histogram::from_sample(&values, 4);
        assert_eq!(histogram.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // Right edge closes the last bin
        assert_eq!(histogram.counts, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_out_of_range_values_clamp_to_end_bins() {
        let histogram = Histogram::from_sample(&[0.0, 10.0], 2);
        assert_eq!(histogram.count(&[-5.0, 50.0, 5.0]), vec![1, 2]);
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        let histogram = Histogram::from_sample(&[0.97; 100], 10);
        assert!((histogram.edges[0] - 0.47).abs() < 1e-12);
        assert!((histogram.edges[10] - 1.47).abs() < 1e-12);
        assert_eq!(histogram.counts.iter().sum::<u64>(), 100);
    }

    #[test]
    fn test_psi_of_identical_counts_is_zero() {
        let counts = [10, 0, 25, 65];
        assert_eq!(population_stability_index(&counts, &counts), 0.0);
    }

    #[test]
    fn test_proportion_floor_boundary() {
        // All mass moves from bin 0 to bin 1: both empty bins sit exactly at the floor
        let psi = population_stability_index(&[100, 0], &[0, 100]);
        let expected = 2.0 * (1.0 - PSI_PROPORTION_FLOOR) * (1.0 / PSI_PROPORTION_FLOOR).ln();
        assert!((psi - expected).abs() < 1e-9);

        // A proportion just above the floor is kept as-is
        let just_above = proportions(&[2, 9_998]);
        assert_eq!(just_above[0], 2.0 / 10_000.0);
        let below = proportions(&[1, 99_999]);
        assert_eq!(below[0], PSI_PROPORTION_FLOOR);
    }
}
