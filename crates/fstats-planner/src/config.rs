//! Statistics build configuration.

use fstats_error::{Result, StatsError};
use serde::{Deserialize, Serialize};

/// Default number of histogram buckets per column.
pub const DEFAULT_BUCKET_COUNT: usize = 100;
/// Default I/O cost of reading one page.
pub const DEFAULT_IO_COST_PER_PAGE: f64 = 1000.0;

/// Knobs for building table statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatsConfig {
    /// Buckets per column histogram (integer and text alike).
    pub bucket_count: usize,
    /// Abstract cost units charged for every page of a sequential scan.
    pub io_cost_per_page: f64,
    /// Worker threads used by a full recompute; 1 builds tables in order.
    pub build_threads: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            io_cost_per_page: DEFAULT_IO_COST_PER_PAGE,
            build_threads: 1,
        }
    }
}

impl StatsConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StatsError::invalid_config(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    #[must_use]
    pub fn with_io_cost_per_page(mut self, io_cost_per_page: f64) -> Self {
        self.io_cost_per_page = io_cost_per_page;
        self
    }

    #[must_use]
    pub fn with_build_threads(mut self, build_threads: usize) -> Self {
        self.build_threads = build_threads;
        self
    }

    /// Reject configurations that would fail or mislead before a scan starts.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 {
            return Err(StatsError::invalid_config("bucket_count must be positive"));
        }
        if !self.io_cost_per_page.is_finite() || self.io_cost_per_page < 0.0 {
            return Err(StatsError::invalid_config(format!(
                "io_cost_per_page must be finite and non-negative, got {}",
                self.io_cost_per_page
            )));
        }
        if self.build_threads == 0 {
            return Err(StatsError::invalid_config("build_threads must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StatsConfig::default();
        assert_eq!(config.bucket_count, 100);
        assert_eq!(config.io_cost_per_page, 1000.0);
        assert_eq!(config.build_threads, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = StatsConfig::from_json_str(r#"{"bucket_count": 250}"#).unwrap();
        assert_eq!(config.bucket_count, 250);
        assert_eq!(
            config.io_cost_per_page, DEFAULT_IO_COST_PER_PAGE,
            "case=missing_field_defaults"
        );
    }

    #[test]
    fn test_from_json_rejects() {
        assert!(StatsConfig::from_json_str(r#"{"bucket_count": 0}"#).is_err());
        assert!(StatsConfig::from_json_str(r#"{"io_cost_per_page": -1.0}"#).is_err());
        assert!(StatsConfig::from_json_str(r#"{"build_threads": 0}"#).is_err());
        assert!(
            StatsConfig::from_json_str(r#"{"buckets": 10}"#).is_err(),
            "case=unknown_field"
        );
        assert!(StatsConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_builder() {
        let config = StatsConfig::default()
            .with_bucket_count(8)
            .with_io_cost_per_page(2.5)
            .with_build_threads(4);
        assert_eq!(config.bucket_count, 8);
        assert_eq!(config.io_cost_per_page, 2.5);
        assert_eq!(config.build_threads, 4);
        assert!(
            StatsConfig::default()
                .with_io_cost_per_page(f64::NAN)
                .validate()
                .is_err()
        );
    }
}
