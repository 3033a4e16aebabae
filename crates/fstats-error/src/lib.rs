//! Error types shared by the statistics crates.
//!
//! One enum covers every failure class the statistics layer can report:
//! configuration mistakes caught before any row is read, caller contract
//! violations on queries, and storage failures surfaced by a row stream.

use std::fmt;

/// Result alias used throughout the statistics crates.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors produced while building or querying column statistics.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Bad bucket count, inverted value range, or bad cost configuration.
    #[error("invalid statistics configuration: {detail}")]
    InvalidConfig { detail: String },

    /// A value was added to a histogram that does not cover it.
    #[error("value {value} outside histogram range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    /// Column index beyond the table schema.
    #[error("no such column: index {column} (schema has {width} columns)")]
    NoSuchColumn { column: usize, width: usize },

    /// A value or constant whose type tag disagrees with the schema.
    #[error("type mismatch in column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        column: usize,
        expected: String,
        found: String,
    },

    /// No statistics registered (or catalog entry) under this table.
    #[error("no such table: {name}")]
    NoSuchTable { name: String },

    /// The underlying row stream failed.
    #[error("storage error: {detail}")]
    Storage { detail: String },

    /// I/O error surfaced by a row stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The second scan pass did not reproduce the first pass.
    #[error("row stream changed between passes: {detail}")]
    UnstableScan { detail: String },
}

impl StatsError {
    /// Create a configuration error.
    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage {
            detail: detail.into(),
        }
    }

    /// Create a type-mismatch error from any two displayable type tags.
    pub fn type_mismatch(
        column: usize,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Self::TypeMismatch {
            column,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Whether the error signals a caller contract violation rather than a
    /// data or storage condition.
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NoSuchColumn { .. } | Self::TypeMismatch { .. } | Self::ValueOutOfRange { .. }
        )
    }

    /// Whether the error came from the storage collaborator.
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_) | Self::UnstableScan { .. })
    }
}
