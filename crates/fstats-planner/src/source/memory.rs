//! In-process catalog with deterministic, rewindable row streams.
//!
//! `MemoryCatalog` stands in for the storage engine when none is attached:
//! tables are plain row vectors, page counts derive from a rows-per-page
//! figure, and every stream replays a snapshot of the rows taken when the
//! stream was created, so a concurrent `append_rows` can never change a
//! scan that is already running.

use std::collections::BTreeMap;
use std::sync::Arc;

use fstats_error::{Result, StatsError};
use fstats_types::{Row, Schema, TableId};
use parking_lot::RwLock;

use super::{Catalog, RowStream, TableSource};

/// Rows stored per page unless a table says otherwise.
pub const DEFAULT_ROWS_PER_PAGE: usize = 64;

/// One table held in memory.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    schema: Schema,
    rows: Arc<Vec<Row>>,
    rows_per_page: usize,
    /// Pages allocated regardless of how many rows they hold.
    reserved_pages: u64,
    /// Inject a storage error once a pass reaches this many rows.
    fail_after: Option<usize>,
}

impl MemoryTable {
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Arc::new(Vec::new()),
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            reserved_pages: 0,
            fail_after: None,
        }
    }

    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows = Arc::new(rows.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_rows_per_page(mut self, rows_per_page: usize) -> Self {
        self.rows_per_page = rows_per_page.max(1);
        self
    }

    /// Keep at least `pages` pages allocated, as a file that has been
    /// emptied without being truncated would.
    #[must_use]
    pub fn with_reserved_pages(mut self, pages: u64) -> Self {
        self.reserved_pages = pages;
        self
    }

    /// Make every pass fail with a storage error after `rows` rows.
    #[must_use]
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Pages needed to hold the rows; a partly filled page counts in full.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        (self.rows.len().div_ceil(self.rows_per_page) as u64).max(self.reserved_pages)
    }

    fn stream(&self) -> MemoryRowStream {
        MemoryRowStream {
            rows: Arc::clone(&self.rows),
            cursor: 0,
            is_open: false,
            fail_after: self.fail_after,
        }
    }
}

/// Catalog of [`MemoryTable`]s keyed by sequentially assigned ids.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<BTreeMap<TableId, MemoryTable>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table and return its id.
    pub fn add_table(&self, table: MemoryTable) -> TableId {
        let mut tables = self.tables.write();
        let next = tables.keys().next_back().map_or(0, |id| id.get() + 1);
        let id = TableId::new(next);
        tables.insert(id, table);
        id
    }

    /// Append rows to an existing table. Streams already handed out keep
    /// scanning their old snapshot.
    pub fn append_rows(&self, table: TableId, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        let mut tables = self.tables.write();
        let entry = tables.get_mut(&table).ok_or_else(|| no_such_table(table))?;
        Arc::make_mut(&mut entry.rows).extend(rows);
        Ok(())
    }

    /// Id of the table called `name`, if any.
    #[must_use]
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables
            .read()
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| *id)
    }

    fn with_table<T>(&self, table: TableId, f: impl FnOnce(&MemoryTable) -> T) -> Result<T> {
        let tables = self.tables.read();
        let entry = tables.get(&table).ok_or_else(|| no_such_table(table))?;
        Ok(f(entry))
    }
}

fn no_such_table(table: TableId) -> StatsError {
    StatsError::NoSuchTable {
        name: table.to_string(),
    }
}

impl TableSource for MemoryCatalog {
    fn schema(&self, table: TableId) -> Result<Schema> {
        self.with_table(table, |t| t.schema.clone())
    }

    fn page_count(&self, table: TableId) -> Result<u64> {
        self.with_table(table, MemoryTable::page_count)
    }

    fn row_stream(&self, table: TableId) -> Result<Box<dyn RowStream + '_>> {
        let stream = self.with_table(table, MemoryTable::stream)?;
        Ok(Box::new(stream))
    }

    fn paged_row_stream(&self, table: TableId) -> Result<(u64, Box<dyn RowStream + '_>)> {
        let (page_count, stream) = self.with_table(table, |t| (t.page_count(), t.stream()))?;
        Ok((page_count, Box::new(stream)))
    }
}

impl Catalog for MemoryCatalog {
    fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }

    fn table_name(&self, table: TableId) -> Result<String> {
        self.with_table(table, |t| t.name.clone())
    }
}

/// Row stream over a snapshot of a [`MemoryTable`].
#[derive(Debug)]
pub struct MemoryRowStream {
    rows: Arc<Vec<Row>>,
    cursor: usize,
    is_open: bool,
    fail_after: Option<usize>,
}

impl RowStream for MemoryRowStream {
    fn open(&mut self) -> Result<()> {
        self.cursor = 0;
        self.is_open = true;
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if !self.is_open {
            return Err(StatsError::storage("row stream is not open"));
        }
        if self.fail_after == Some(self.cursor) {
            return Err(StatsError::storage(format!(
                "injected read failure at row {}",
                self.cursor
            )));
        }
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.is_open {
            return Err(StatsError::storage("cannot rewind a closed row stream"));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use fstats_types::{ColumnDef, ColumnType, Value};

    use super::*;

    fn int_schema() -> Schema {
        Schema::new(vec![ColumnDef::new("a", ColumnType::Integer)])
    }

    fn int_rows(values: impl IntoIterator<Item = i64>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| Row::new([Value::Integer(v)]))
            .collect()
    }

    fn drain(stream: &mut dyn RowStream) -> Vec<Row> {
        let mut out = Vec::new();
        while let Some(row) = stream.next_row().unwrap() {
            out.push(row);
        }
        out
    }

    #[test]
    fn test_page_count_rounds_up() {
        let table = MemoryTable::new("t", int_schema())
            .with_rows(int_rows(0..10))
            .with_rows_per_page(4);
        assert_eq!(table.page_count(), 3);
        assert_eq!(MemoryTable::new("e", int_schema()).page_count(), 0);
        let reserved = MemoryTable::new("r", int_schema()).with_reserved_pages(5);
        assert_eq!(reserved.page_count(), 5, "case=reserved_pages_floor");
    }

    #[test]
    fn test_stream_rewind_replays() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(MemoryTable::new("t", int_schema()).with_rows(int_rows(0..5)));
        let mut stream = catalog.row_stream(id).unwrap();
        assert!(stream.next_row().is_err(), "case=read_before_open");

        stream.open().unwrap();
        let first = drain(stream.as_mut());
        stream.rewind().unwrap();
        let second = drain(stream.as_mut());
        assert_eq!(first.len(), 5);
        assert_eq!(first, second, "case=rewind_identical");

        stream.close();
        assert!(stream.rewind().is_err());
    }

    #[test]
    fn test_snapshot_isolated_from_appends() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(MemoryTable::new("t", int_schema()).with_rows(int_rows(0..3)));
        let mut stream = catalog.row_stream(id).unwrap();
        stream.open().unwrap();
        catalog.append_rows(id, int_rows(3..6)).unwrap();
        assert_eq!(drain(stream.as_mut()).len(), 3, "case=old_snapshot");

        let mut fresh = catalog.row_stream(id).unwrap();
        fresh.open().unwrap();
        assert_eq!(drain(fresh.as_mut()).len(), 6);
    }

    #[test]
    fn test_paged_stream_matches_its_snapshot() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(
            MemoryTable::new("t", int_schema())
                .with_rows(int_rows(0..4))
                .with_rows_per_page(4),
        );
        let (pages, mut stream) = catalog.paged_row_stream(id).unwrap();
        catalog.append_rows(id, int_rows(4..40)).unwrap();
        assert_eq!(catalog.page_count(id).unwrap(), 10);

        stream.open().unwrap();
        assert_eq!(drain(stream.as_mut()).len(), 4);
        assert_eq!(pages, 1, "case=pages_from_same_snapshot");
    }

    #[test]
    fn test_injected_failure() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(
            MemoryTable::new("t", int_schema())
                .with_rows(int_rows(0..5))
                .failing_after(2),
        );
        let mut stream = catalog.row_stream(id).unwrap();
        stream.open().unwrap();
        assert!(stream.next_row().unwrap().is_some());
        assert!(stream.next_row().unwrap().is_some());
        let err = stream.next_row().unwrap_err();
        assert!(err.is_storage(), "case=injected_storage_error");
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = MemoryCatalog::new();
        let a = catalog.add_table(MemoryTable::new("a", int_schema()));
        let b = catalog.add_table(MemoryTable::new("b", int_schema()));
        assert_ne!(a, b);
        assert_eq!(catalog.table_ids(), vec![a, b]);
        assert_eq!(catalog.table_name(b).unwrap(), "b");
        assert_eq!(catalog.table_id("a"), Some(a));
        assert!(catalog.schema(TableId::new(99)).is_err());
        assert!(catalog.append_rows(TableId::new(99), Vec::new()).is_err());
    }
}
