//! Narrow interfaces to the catalog and storage collaborators.
//!
//! The statistics builder never touches pages or tuples directly. It asks a
//! [`TableSource`] for a table's schema, page count, and a rewindable
//! [`RowStream`], and a [`Catalog`] for the set of tables to recompute.

pub mod memory;

use fstats_error::Result;
use fstats_types::{Row, Schema, TableId};

/// Forward-only scan over a table that can be restarted from the first row.
///
/// A build calls `open`, reads to exhaustion, calls `rewind`, reads to
/// exhaustion again, and finally calls `close`. `rewind` must reproduce the
/// first pass exactly.
pub trait RowStream {
    /// Prepare the stream for reading from the first row.
    fn open(&mut self) -> Result<()>;

    /// Next row, or `None` once the pass is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Restart from the first row.
    fn rewind(&mut self) -> Result<()>;

    /// Release resources. Calling `close` on a closed stream is a no-op.
    fn close(&mut self);
}

/// Per-table storage facts the builder needs.
pub trait TableSource {
    fn schema(&self, table: TableId) -> Result<Schema>;

    /// Pages the table currently occupies.
    fn page_count(&self, table: TableId) -> Result<u64>;

    /// A fresh, unopened row stream over the table.
    fn row_stream(&self, table: TableId) -> Result<Box<dyn RowStream + '_>>;

    /// Page count and an unopened row stream taken from the same view of
    /// the table. Sources whose tables can grow between the two calls must
    /// override this so the page count matches the rows the stream yields.
    fn paged_row_stream(&self, table: TableId) -> Result<(u64, Box<dyn RowStream + '_>)> {
        let page_count = self.page_count(table)?;
        let stream = self.row_stream(table)?;
        Ok((page_count, stream))
    }
}

/// Registry of tables known to the database.
pub trait Catalog: TableSource {
    /// Every table id, in catalog order.
    fn table_ids(&self) -> Vec<TableId>;

    fn table_name(&self, table: TableId) -> Result<String>;
}
