//! Fixed-width bucket histogram over an integer column.
//!
//! The histogram covers an inclusive range `[min, max]` with `bucket_count`
//! equal-width buckets. The width is `ceil((max - min + 1) / bucket_count)`,
//! so every in-range value lands on a valid bucket. `max` itself is always
//! assigned to the last bucket. Only per-bucket counts are kept: memory is
//! constant in the number of values added.
//!
//! # Estimation
//! - `=`: the value's bucket height spread uniformly over the bucket width,
//!   as a fraction of all values.
//! - `<>`: one minus the `=` estimate.
//! - `<`, `<=`: full buckets below the value plus the linearly interpolated
//!   share of the value's own bucket. `<=` uses the same formula.
//! - `>`, `>=`: the mirror image, summing buckets above the value.
//! - `LIKE`: not estimated.
//!
//! Range estimates short-circuit to 0 or 1 at and beyond the recorded edges.
//! An empty histogram answers 0 to every query.

use std::fmt;

use fstats_error::{Result, StatsError};
use fstats_types::PredicateOp;
use serde::Serialize;

/// Equal-width histogram of `i64` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntHistogram {
    /// Inclusive lower bound of the covered range.
    min: i64,
    /// Inclusive upper bound of the covered range.
    max: i64,
    /// Number of distinct integers covered by each bucket (at least 1).
    bucket_width: u64,
    /// Per-bucket counts, index 0 is the lowest range.
    counts: Vec<u64>,
    /// Number of values ever added; always equals `counts.iter().sum()`.
    total_count: u64,
}

impl IntHistogram {
    /// Create an empty histogram with `bucket_count` buckets over `[min, max]`.
    ///
    /// # Errors
    /// Returns `StatsError::InvalidConfig` if `bucket_count == 0` or
    /// `min > max`.
    pub fn new(bucket_count: usize, min: i64, max: i64) -> Result<Self> {
        if bucket_count == 0 {
            return Err(StatsError::invalid_config(
                "histogram bucket count must be positive",
            ));
        }
        if min > max {
            return Err(StatsError::invalid_config(format!(
                "histogram range is inverted: [{min}, {max}]"
            )));
        }

        // Span of [i64::MIN, i64::MAX] is 2^64, so widen before adding one.
        let span = (i128::from(max) - i128::from(min) + 1) as u128;
        let width = span.div_ceil(bucket_count as u128);
        // Only a single bucket over the full i64 domain overflows; every
        // offset is still below u64::MAX in that case.
        let bucket_width = u64::try_from(width).unwrap_or(u64::MAX);

        Ok(Self {
            min,
            max,
            bucket_width,
            counts: vec![0; bucket_count],
            total_count: 0,
        })
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    #[must_use]
    pub const fn bucket_width(&self) -> u64 {
        self.bucket_width
    }

    /// Number of values added so far.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Per-bucket counts, lowest range first.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Whether `v` lies inside `[min, max]`.
    #[must_use]
    pub const fn covers(&self, v: i64) -> bool {
        self.min <= v && v <= self.max
    }

    /// Bucket holding `v`, or `None` if `v` is outside `[min, max]`.
    #[must_use]
    pub fn bucket_index(&self, v: i64) -> Option<usize> {
        if !self.covers(v) {
            return None;
        }
        let last = self.counts.len() - 1;
        if v == self.max {
            return Some(last);
        }
        let index = self.offset(v) / u128::from(self.bucket_width);
        Some(usize::try_from(index).map_or(last, |i| i.min(last)))
    }

    /// Left and right edges of bucket `index` on the real line.
    #[must_use]
    pub fn bucket_edges(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.counts.len() {
            return None;
        }
        let width = self.bucket_width as f64;
        let left = self.min as f64 + width * index as f64;
        Some((left, left + width))
    }

    /// Record one occurrence of `v`.
    ///
    /// # Errors
    /// Returns `StatsError::ValueOutOfRange` if `v` is outside `[min, max]`;
    /// the histogram is left unchanged.
    pub fn add_value(&mut self, v: i64) -> Result<()> {
        let index = self.bucket_index(v).ok_or(StatsError::ValueOutOfRange {
            value: v,
            min: self.min,
            max: self.max,
        })?;
        self.counts[index] += 1;
        self.total_count += 1;
        Ok(())
    }

    /// Estimate the fraction of values satisfying `column op v`.
    ///
    /// Returns `None` for operators the histogram cannot estimate (`LIKE`).
    /// Every other result lies in `[0, 1]`.
    #[must_use]
    pub fn estimate_selectivity(&self, op: PredicateOp, v: i64) -> Option<f64> {
        let selectivity = match op {
            PredicateOp::Like => return None,
            _ if self.total_count == 0 => 0.0,
            PredicateOp::Eq => self.equality(v),
            PredicateOp::Ne => 1.0 - self.equality(v),
            PredicateOp::Lt | PredicateOp::Le => self.less_than(v),
            PredicateOp::Gt | PredicateOp::Ge => self.greater_than(v),
        };
        Some(selectivity.clamp(0.0, 1.0))
    }

    /// Selectivity of an equality predicate whose constant is unknown: mean
    /// bucket height spread over the bucket width, as a fraction of all values.
    #[must_use]
    pub fn avg_selectivity(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let total = self.total_count as f64;
        let mean_height = total / self.counts.len() as f64;
        (mean_height / self.bucket_width as f64) / total
    }

    fn offset(&self, v: i64) -> u128 {
        (i128::from(v) - i128::from(self.min)) as u128
    }

    fn fraction(&self, index: usize) -> f64 {
        self.counts[index] as f64 / self.total_count as f64
    }

    /// Distance of `v` from the left edge of bucket `index`, in units.
    fn offset_in_bucket(&self, v: i64, index: usize) -> u128 {
        self.offset(v)
            .saturating_sub(index as u128 * u128::from(self.bucket_width))
    }

    fn equality(&self, v: i64) -> f64 {
        match self.bucket_index(v) {
            Some(index) => {
                (self.counts[index] as f64 / self.bucket_width as f64) / self.total_count as f64
            }
            None => 0.0,
        }
    }

    fn less_than(&self, v: i64) -> f64 {
        if v <= self.min {
            return 0.0;
        }
        if v >= self.max {
            return 1.0;
        }
        let index = self.bucket_index(v).unwrap_or(0);
        let width = self.bucket_width as f64;
        let partial = self.offset_in_bucket(v, index) as f64 / width;
        let below: f64 = (0..index).map(|i| self.fraction(i)).sum();
        below + partial * self.fraction(index)
    }

    fn greater_than(&self, v: i64) -> f64 {
        if v >= self.max {
            return 0.0;
        }
        if v <= self.min {
            return 1.0;
        }
        let index = self.bucket_index(v).unwrap_or(0);
        let width = self.bucket_width as f64;
        let remaining =
            u128::from(self.bucket_width).saturating_sub(self.offset_in_bucket(v, index));
        let partial = remaining as f64 / width;
        let above: f64 = (index + 1..self.counts.len()).map(|i| self.fraction(i)).sum();
        above + partial * self.fraction(index)
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, count) in self.counts.iter().enumerate() {
            let (from, to) = self.bucket_edges(index).unwrap_or_default();
            writeln!(f, "bucket #{index}: height {count} from {from} to {to}")?;
        }
        Ok(())
    }
}
