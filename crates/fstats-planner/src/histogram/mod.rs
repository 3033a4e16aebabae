//! Per-column histograms.
//!
//! Integer columns get an [`IntHistogram`] sized from the column's observed
//! range; text columns get a [`TextHistogram`] over a fixed key domain.
//! [`ColumnHistogram`] ties the two together so table statistics can feed
//! and query any column through one type-checked entry point.

mod int;
mod text;

pub use int::IntHistogram;
pub use text::{TEXT_DOMAIN_MAX, TEXT_DOMAIN_MIN, TextHistogram, text_key};

use fstats_error::{Result, StatsError};
use fstats_types::{ColumnType, PredicateOp, Value};
use serde::Serialize;

/// Histogram of one column, integer or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColumnHistogram {
    Integer(IntHistogram),
    Text(TextHistogram),
}

impl ColumnHistogram {
    /// Type tag of the values this histogram accepts.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Integer(_) => ColumnType::Integer,
            Self::Text(_) => ColumnType::Text,
        }
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        match self {
            Self::Integer(h) => h.total_count(),
            Self::Text(h) => h.total_count(),
        }
    }

    #[must_use]
    pub fn avg_selectivity(&self) -> f64 {
        match self {
            Self::Integer(h) => h.avg_selectivity(),
            Self::Text(h) => h.avg_selectivity(),
        }
    }

    /// Feed one stored value of column `column` into the histogram.
    ///
    /// # Errors
    /// `TypeMismatch` if the value's type differs from the histogram's;
    /// `ValueOutOfRange` if an integer lies outside the covered range.
    pub fn add(&mut self, column: usize, value: &Value) -> Result<()> {
        match (self, value) {
            (Self::Integer(h), Value::Integer(v)) => h.add_value(*v),
            (Self::Text(h), Value::Text(s)) => h.add_value(s),
            (hist, value) => Err(StatsError::type_mismatch(
                column,
                hist.column_type(),
                value.column_type(),
            )),
        }
    }

    /// Estimate `column op constant`, selecting the histogram family from
    /// the constant's type.
    ///
    /// # Errors
    /// `TypeMismatch` if the constant's type differs from the column's.
    pub fn estimate(
        &self,
        column: usize,
        op: PredicateOp,
        constant: &Value,
    ) -> Result<Option<f64>> {
        match (self, constant) {
            (Self::Integer(h), Value::Integer(v)) => Ok(h.estimate_selectivity(op, *v)),
            (Self::Text(h), Value::Text(s)) => Ok(h.estimate_selectivity(op, s)),
            _ => Err(StatsError::type_mismatch(
                column,
                self.column_type(),
                constant.column_type(),
            )),
        }
    }
}
