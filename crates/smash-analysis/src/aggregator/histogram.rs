//! Fixed-width one-dimensional histogram.

use crate::utils::error::HistogramError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Uniformly binned frequency counter over `[lower, upper)`
///
/// Geometry is fixed at construction; only the bin contents change.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    lower: f64,
    upper: f64,
    width: f64,
    counts: Vec<f64>,
}

impl Histogram {
    /// Create an empty histogram
    ///
    /// # Errors
    /// * `HistogramError::InvalidBinning` - non-finite bounds, `upper <= lower`, or zero bins
    pub fn new(lower: f64, upper: f64, bins: usize) -> Result<Self, HistogramError> {
        if !lower.is_finite() || !upper.is_finite() || upper <= lower || bins == 0 {
            return Err(HistogramError::InvalidBinning { lower, upper, bins });
        }

        Ok(Self {
            lower,
            upper,
            width: (upper - lower) / bins as f64,
            counts: vec![0.0; bins],
        })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn bin_width(&self) -> f64 {
        self.width
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Add one entry; values outside `[lower, upper)` are ignored
    pub fn fill(&mut self, value: f64) {
        self.fill_weighted(value, 1.0);
    }

    /// Add a weighted entry; values outside `[lower, upper)` are ignored
    pub fn fill_weighted(&mut self, value: f64, weight: f64) {
        // Negated form also rejects NaN
        if !(value >= self.lower && value < self.upper) {
            return;
        }

        let bin = ((value - self.lower) / self.width).floor() as usize;
        let last = self.counts.len() - 1;
        self.counts[bin.min(last)] += weight;
    }

    /// Bin-wise sum with a histogram of identical binning
    ///
    /// # Errors
    /// * `HistogramError::BinningMismatch` - bounds or bin count differ; `self` is untouched
    pub fn merge(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        self.check_binning(other)?;

        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        Ok(())
    }

    /// Multiply every bin by `factor`
    pub fn scale(&mut self, factor: f64) {
        for count in &mut self.counts {
            *count *= factor;
        }
    }

    /// Accumulated weight of bin `i`
    pub fn bin_count(&self, i: usize) -> Option<f64> {
        self.counts.get(i).copied()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Sum of all bins
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Left edge of bin `i`; `i == num_bins()` yields the upper bound
    pub fn bin_edge(&self, i: usize) -> f64 {
        if i >= self.counts.len() {
            self.upper
        } else {
            self.lower + i as f64 * self.width
        }
    }

    pub fn bin_edges(&self) -> Vec<f64> {
        (0..=self.counts.len()).map(|i| self.bin_edge(i)).collect()
    }

    pub fn bin_center(&self, i: usize) -> f64 {
        self.lower + (i as f64 + 0.5) * self.width
    }

    /// Statistical error of bin `i` once normalized per event and bin width
    ///
    /// Must be evaluated on the raw (unscaled) histogram:
    /// `sqrt(raw) / (bin_width × n_events)`.
    pub fn normalized_error(&self, i: usize, n_events: u64) -> Option<f64> {
        let raw = self.bin_count(i)?;
        if n_events == 0 || raw <= 0.0 {
            return Some(0.0);
        }
        Some(raw.sqrt() / (self.width * n_events as f64))
    }

    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.lower == other.lower && self.upper == other.upper && self.counts.len() == other.counts.len()
    }

    /// `Ok` when `merge` with `other` would succeed
    pub fn check_binning(&self, other: &Histogram) -> Result<(), HistogramError> {
        if self.same_binning(other) {
            return Ok(());
        }
        Err(HistogramError::BinningMismatch {
            left: self.describe_binning(),
            right: other.describe_binning(),
        })
    }

    fn describe_binning(&self) -> String {
        format!("[{}, {}) x {}", self.lower, self.upper, self.counts.len())
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("bins", &self.bin_edges())?;
        map.serialize_entry("values", &self.counts)?;
        map.end()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, count) in self.counts.iter().enumerate() {
            writeln!(f, "{:.4}\t{:.4}", self.bin_center(i), count)?;
        }
        Ok(())
    }
}
