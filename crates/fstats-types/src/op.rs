//! Comparison operators a predicate may apply to a column.

use std::fmt;
use std::str::FromStr;

use fstats_error::StatsError;
use serde::{Deserialize, Serialize};

/// Closed set of predicate operators seen by the selectivity estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Pattern match. Histograms never estimate it.
    Like,
}

impl PredicateOp {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::Like,
    ];

    /// SQL spelling of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PredicateOp {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim() {
            "=" | "==" => Self::Eq,
            "<>" | "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            other if other.eq_ignore_ascii_case("like") => Self::Like,
            other => {
                return Err(StatsError::invalid_config(format!(
                    "unknown predicate operator: {other:?}"
                )));
            }
        };
        Ok(op)
    }
}
