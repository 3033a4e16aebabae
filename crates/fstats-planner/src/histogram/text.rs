//! Text histogram: an [`IntHistogram`] over a fixed integer encoding of text.
//!
//! A string is keyed by its first four bytes read big-endian, with missing
//! bytes treated as zero. This keeps the byte-wise ordering of short prefixes.
//! The covered domain is fixed to `[key(""), key("zzzz")]` rather than
//! discovered by a scan; keys outside it are clamped to the nearest edge.

use std::fmt;

use fstats_error::Result;
use fstats_types::PredicateOp;
use serde::Serialize;

use super::IntHistogram;

/// Key of the empty string; lower edge of the text domain.
pub const TEXT_DOMAIN_MIN: i64 = 0;
/// Key of `"zzzz"`; upper edge of the text domain.
pub const TEXT_DOMAIN_MAX: i64 = 0x7a7a_7a7a;

/// Number of leading bytes that contribute to a text key.
const KEY_PREFIX_BYTES: usize = 4;

/// Map a string onto the integer text domain.
#[must_use]
pub fn text_key(s: &str) -> i64 {
    let key = s
        .bytes()
        .chain(std::iter::repeat(0))
        .take(KEY_PREFIX_BYTES)
        .fold(0_i64, |acc, b| (acc << 8) | i64::from(b));
    key.clamp(TEXT_DOMAIN_MIN, TEXT_DOMAIN_MAX)
}

/// Equal-width histogram over text values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextHistogram {
    inner: IntHistogram,
}

impl TextHistogram {
    /// Create an empty text histogram with `bucket_count` buckets.
    ///
    /// # Errors
    /// Returns `StatsError::InvalidConfig` if `bucket_count == 0`.
    pub fn new(bucket_count: usize) -> Result<Self> {
        Ok(Self {
            inner: IntHistogram::new(bucket_count, TEXT_DOMAIN_MIN, TEXT_DOMAIN_MAX)?,
        })
    }

    pub fn add_value(&mut self, s: &str) -> Result<()> {
        self.inner.add_value(text_key(s))
    }

    /// Estimate the fraction of values satisfying `column op s`.
    #[must_use]
    pub fn estimate_selectivity(&self, op: PredicateOp, s: &str) -> Option<f64> {
        self.inner.estimate_selectivity(op, text_key(s))
    }

    #[must_use]
    pub fn avg_selectivity(&self) -> f64 {
        self.inner.avg_selectivity()
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.inner.total_count()
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.inner.bucket_count()
    }

    /// The underlying integer histogram over text keys.
    #[must_use]
    pub const fn keyed(&self) -> &IntHistogram {
        &self.inner
    }
}

impl fmt::Display for TextHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}
