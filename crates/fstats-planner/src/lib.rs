//! Statistics and selectivity estimation for cost-based planning.
//!
//! Builds fixed-memory equal-width histograms for every column of a table
//! from two sequential scans, and answers the planner's questions without
//! touching the data again:
//! - how much a full scan of a table costs,
//! - what fraction of rows a `column op constant` predicate keeps,
//! - how many rows survive a given combined selectivity.
//!
//! [`StatsRegistry`] caches one [`TableStats`] per table name and rebuilds
//! them from a [`Catalog`] on demand.

pub mod config;
pub mod histogram;
pub mod registry;
pub mod source;
pub mod table_stats;

pub use config::{DEFAULT_BUCKET_COUNT, DEFAULT_IO_COST_PER_PAGE, StatsConfig};
pub use histogram::{ColumnHistogram, IntHistogram, TextHistogram};
pub use registry::{RecomputeReport, StatsRegistry};
pub use source::memory::{MemoryCatalog, MemoryTable};
pub use source::{Catalog, RowStream, TableSource};
pub use table_stats::TableStats;
