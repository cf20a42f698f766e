//! Distance diagnostics over the raw data, independent of any pairing
//! decision: every track of `model1` is compared with every track of
//! `model2`, without a distance threshold, and the distances of all
//! frame-matched correspondences are collected.
//!
//! Two views are derived from that sample:
//! - an empirical cumulative distribution (step function, `2N + 1` points);
//! - an equal-width histogram whose bin count follows the Freedman–Diaconis
//!   rule, clamped to a configurable range.

use crate::{correspondence::find_correspondences, types::Model};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default bounds of the automatic bin count.
pub const MIN_BINS: usize = 8;
pub const MAX_BINS: usize = 100;

/// Configuration of the histogram view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistogramConfig {
    pub min_bins: usize,
    pub max_bins: usize,
    /// Fixed bin count; automatic when `None`
    pub bins: Option<usize>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            min_bins: MIN_BINS,
            max_bins: MAX_BINS,
            bins: None,
        }
    }
}

/// Distances of all frame-matched correspondences across every track
/// combination, threshold disabled.
///
/// Track combinations are visited in parallel; the collect keeps the
/// (track1, track2, spot) order so the sample is deterministic.
pub fn distance_sample(model1: &Model, model2: &Model) -> Vec<f64> {
    let tracks1: Vec<_> = model1.tracks.values().collect();
    let tracks2: Vec<_> = model2.tracks.values().collect();
    tracks1
        .par_iter()
        .flat_map_iter(|&t1| {
            tracks2
                .iter()
                .flat_map(|&t2| find_correspondences(t1, t2, f64::INFINITY))
                .map(|p| p.distance())
                .collect::<Vec<_>>()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Empirical CDF
// ---------------------------------------------------------------------------

/// Step-function representation of the empirical CDF.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeHistogram {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl CumulativeHistogram {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Fraction of the sample strictly below `threshold`: the pairing yield
    /// of a correspondence threshold.
    pub fn fraction_below(&self, threshold: f64) -> f64 {
        self.x
            .iter()
            .zip(&self.y)
            .filter(|(x, _)| **x < threshold)
            .map(|(_, y)| *y)
            .fold(0.0, f64::max)
    }
}

/// Build the empirical CDF of `values`.
///
/// The first point is `(0, 0)`. Each sorted value `v` then contributes two
/// points, `(v, y)` and `(v, y + 1/N)`, so the curve rises in vertical steps.
pub fn cumulative_histogram(values: &[f64]) -> CumulativeHistogram {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let step = 1.0 / n as f64;

    let mut x = Vec::with_capacity(2 * n + 1);
    let mut y = Vec::with_capacity(2 * n + 1);
    x.push(0.0);
    y.push(0.0);
    let mut level = 0.0;
    for v in sorted {
        x.push(v);
        y.push(level);
        level += step;
        x.push(v);
        y.push(level);
    }
    CumulativeHistogram { x, y }
}

// ---------------------------------------------------------------------------
// Binned histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram between the sample minimum and maximum.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn n_samples(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Lower edge of every bin followed by the upper edge of the last one.
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..=self.counts.len())
            .map(|i| self.min + i as f64 * self.bin_width)
            .collect()
    }
}

/// Percentile with linear interpolation at rank `p * (N + 1)`.
/// `p` is in `(0, 1]`. NaN for an empty sample.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    match n {
        0 => return f64::NAN,
        1 => return values[0],
        _ => {}
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = p * (n as f64 + 1.0);
    let fpos = pos.floor();
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }
    let i = fpos as usize;
    let lower = sorted[i - 1];
    let upper = sorted[i];
    lower + (pos - fpos) * (upper - lower)
}

/// Freedman–Diaconis bin count, clamped to `[min_bins, max_bins]`.
pub fn n_bins(values: &[f64], min_bins: usize, max_bins: usize) -> usize {
    let n = values.len();
    let iqr = percentile(values, 0.75) - percentile(values, 0.25);
    let bin_width = 2.0 * iqr * (n as f64).powf(-0.33);
    let (lo, hi) = range(values);
    // NaN (empty or constant sample) casts to 0, infinity saturates.
    let raw = ((hi - lo) / bin_width + 1.0) as usize;
    // Swapped bounds (e.g. from a hand-edited config) are reordered.
    raw.clamp(min_bins.min(max_bins), min_bins.max(max_bins))
}

fn range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Bin `values` into `n_bins` equal-width bins spanning min..=max.
/// The maximum falls in the last bin.
pub fn histogram(values: &[f64], n_bins: usize) -> Histogram {
    let n_bins = n_bins.max(1);
    if values.is_empty() {
        return Histogram {
            counts: vec![0; n_bins],
            ..Histogram::default()
        };
    }
    let (min, max) = range(values);
    let bin_width = (max - min) / n_bins as f64;

    let mut counts = vec![0; n_bins];
    for &v in values {
        let idx = if bin_width > 0.0 {
            (((v - min) / bin_width) as usize).min(n_bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    Histogram {
        min,
        max,
        bin_width,
        counts,
    }
}

// ---------------------------------------------------------------------------
// Combined report
// ---------------------------------------------------------------------------

/// Both distance views of two models, ready for serialisation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistanceReport {
    pub units: String,
    pub n_samples: usize,
    pub histogram: Histogram,
    pub cumulative: CumulativeHistogram,
}

impl DistanceReport {
    pub fn compute(model1: &Model, model2: &Model, config: &HistogramConfig) -> Self {
        let sample = distance_sample(model1, model2);
        let bins = config
            .bins
            .unwrap_or_else(|| n_bins(&sample, config.min_bins, config.max_bins));
        Self {
            units: model1.space_units.clone(),
            n_samples: sample.len(),
            histogram: histogram(&sample, bins),
            cumulative: cumulative_histogram(&sample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Spot, Track};
    use approx::assert_abs_diff_eq;

    #[test]
    fn cdf_of_known_sample() {
        let cdf = cumulative_histogram(&[2.0, 3.0, 1.0, 2.0]);
        assert_eq!(cdf.x, vec![0.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0]);
        let expected = [0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0];
        for (y, e) in cdf.y.iter().zip(expected) {
            assert_abs_diff_eq!(*y, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn cdf_is_monotonic_and_ends_at_one() {
        let values: Vec<f64> = (0..37).map(|i| ((i * 7919) % 101) as f64 / 3.0).collect();
        let cdf = cumulative_histogram(&values);
        assert_eq!(cdf.len(), 2 * values.len() + 1);
        assert_eq!(cdf.y[0], 0.0);
        assert!(cdf.y.windows(2).all(|w| w[0] <= w[1]));
        assert!(cdf.x.windows(2).all(|w| w[0] <= w[1]));
        assert_abs_diff_eq!(*cdf.y.last().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn cdf_of_empty_sample_is_origin() {
        let cdf = cumulative_histogram(&[]);
        assert_eq!(cdf.x, vec![0.0]);
        assert_eq!(cdf.y, vec![0.0]);
    }

    #[test]
    fn fraction_below_reads_the_step_curve() {
        let cdf = cumulative_histogram(&[1.0, 2.0, 2.0, 3.0]);
        assert_abs_diff_eq!(cdf.fraction_below(0.5), 0.0);
        assert_abs_diff_eq!(cdf.fraction_below(2.5), 0.75);
        assert_abs_diff_eq!(cdf.fraction_below(10.0), 1.0);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        // rank 0.25 * 5 = 1.25 → 1 + 0.25 * (2 - 1)
        assert_abs_diff_eq!(percentile(&v, 0.25), 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&v, 0.75), 3.75, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&v, 1.0), 4.0, epsilon = 1e-12);
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn bin_count_is_clamped() {
        assert_eq!(n_bins(&[], 8, 100), 8);
        assert_eq!(n_bins(&[1.0; 20], 8, 100), 8);
        // Zero IQR with a non-zero range gives an infinite count.
        let mut peaked = vec![1.0; 18];
        peaked.extend([0.0, 5.0]);
        assert_eq!(n_bins(&peaked, 8, 100), 100);
        let spread: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let n = n_bins(&spread, 8, 100);
        assert!((8..=100).contains(&n));
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_abs_diff_eq!(h.bin_width, 1.0, epsilon = 1e-12);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.n_samples(), 5);
        assert_eq!(h.bin_edges().len(), 5);
    }

    #[test]
    fn histogram_of_constant_sample_uses_first_bin() {
        let h = histogram(&[2.0, 2.0, 2.0], 8);
        assert_eq!(h.counts[0], 3);
        assert_eq!(h.n_bins(), 8);
    }

    #[test]
    fn sample_ignores_pairing_and_threshold() {
        let mut m1 = Model::new("µm");
        m1.add_track(Track::new(1, vec![Spot::new_2d(0, 0, 0.0, 0.0)]));
        m1.add_track(Track::new(2, vec![Spot::new_2d(1, 0, 10.0, 0.0)]));
        let mut m2 = Model::new("µm");
        m2.add_track(Track::new(1, vec![Spot::new_2d(0, 0, 3.0, 4.0)]));
        m2.add_track(Track::new(2, vec![Spot::new_2d(1, 1, 0.0, 0.0)]));

        let sample = distance_sample(&m1, &m2);
        // Only frame 0 co-occurs: (0,0)-(3,4) and (10,0)-(3,4).
        assert_eq!(sample.len(), 2);
        assert_abs_diff_eq!(sample[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample[1], (49.0f64 + 16.0).sqrt(), epsilon = 1e-12);

        let report = DistanceReport::compute(&m1, &m2, &HistogramConfig::default());
        assert_eq!(report.n_samples, 2);
        assert_eq!(report.histogram.n_bins(), MIN_BINS);
        assert_eq!(report.cumulative.len(), 5);
    }

    #[test]
    fn swapped_bin_bounds_are_reordered() {
        let constant = [2.0; 10];
        assert_eq!(n_bins(&constant, 100, 8), 8);
        let mut peaked = vec![1.0; 18];
        peaked.extend([0.0, 5.0]);
        assert_eq!(n_bins(&peaked, 100, 8), 100);
    }
}
