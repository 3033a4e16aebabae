//! Shared cache of table statistics keyed by table name.
//!
//! The registry is an explicit context object: whoever plans queries holds a
//! reference to it and looks tables up by name. Entries are immutable
//! [`TableStats`] behind an `Arc`; publishing a table swaps its `Arc` under
//! the write lock, so a reader sees either the old object or the new one,
//! never a half-built histogram set.
//!
//! A recompute publishes tables one at a time as each build finishes.
//! While it runs, readers may observe a mix of old and new entries. Once
//! every table has built, entries for tables the catalog no longer lists
//! are dropped, so the registry never merges stale tables into a fresh
//! recompute.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use fstats_error::{Result, StatsError};
use fstats_types::{PredicateOp, TableId, Value};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::StatsConfig;
use crate::source::Catalog;
use crate::table_stats::TableStats;

/// Summary of a completed recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecomputeReport {
    /// Tables built and published.
    pub tables_built: usize,
    /// Rows scanned across all tables (per pass).
    pub total_rows: u64,
    /// Pages across all tables.
    pub total_pages: u64,
}

impl RecomputeReport {
    fn absorb(&mut self, stats: &TableStats) {
        self.tables_built += 1;
        self.total_rows += stats.total_tuples();
        self.total_pages += stats.page_count();
    }
}

/// Name-keyed statistics cache, safe to read from any number of threads.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    tables: RwLock<HashMap<String, Arc<TableStats>>>,
}

impl StatsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for `name`, if any have been published.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<TableStats>> {
        self.tables.read().get(name).cloned()
    }

    /// Publish (or replace) the statistics for one table. Returns the entry
    /// it replaced.
    pub fn set_table_stats(
        &self,
        name: impl Into<String>,
        stats: TableStats,
    ) -> Option<Arc<TableStats>> {
        self.publish(name.into(), Arc::new(stats))
    }

    /// Swap in a whole new mapping at once.
    pub fn replace_all(&self, tables: impl IntoIterator<Item = (String, TableStats)>) {
        let fresh: HashMap<_, _> = tables
            .into_iter()
            .map(|(name, stats)| (name, Arc::new(stats)))
            .collect();
        let count = fresh.len();
        *self.tables.write() = fresh;
        debug!(tables = count, "statistics registry replaced");
    }

    /// Point-in-time copy of the mapping.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Arc<TableStats>> {
        self.tables.read().clone()
    }

    /// Registered table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    /// Rebuild statistics for every catalog table, publishing each table as
    /// soon as its build completes.
    ///
    /// With `config.build_threads > 1` tables are built concurrently, each
    /// with its own row stream. The first failure stops the recompute and is
    /// returned; the failed table keeps its previous entry, and tables that
    /// already finished stay published.
    ///
    /// After a fully successful recompute the registry holds exactly the
    /// catalog's tables: entries under names the catalog no longer lists are
    /// removed. A failed recompute removes nothing.
    pub fn recompute_all<C>(&self, catalog: &C, config: &StatsConfig) -> Result<RecomputeReport>
    where
        C: Catalog + Sync + ?Sized,
    {
        config.validate()?;
        let table_ids = catalog.table_ids();
        let live = table_ids
            .iter()
            .map(|&table| catalog.table_name(table))
            .collect::<Result<HashSet<_>>>()?;
        info!(
            tables = table_ids.len(),
            threads = config.build_threads,
            "computing table statistics"
        );

        let report = if config.build_threads <= 1 || table_ids.len() <= 1 {
            let mut report = RecomputeReport::default();
            for &table in &table_ids {
                let stats = self.rebuild_one(catalog, table, config)?;
                report.absorb(&stats);
            }
            report
        } else {
            self.recompute_parallel(catalog, &table_ids, config)?
        };
        self.retain_live(&live);

        info!(
            tables = report.tables_built,
            rows = report.total_rows,
            pages = report.total_pages,
            "table statistics recomputed"
        );
        Ok(report)
    }

    fn recompute_parallel<C>(
        &self,
        catalog: &C,
        table_ids: &[TableId],
        config: &StatsConfig,
    ) -> Result<RecomputeReport>
    where
        C: Catalog + Sync + ?Sized,
    {
        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<StatsError>> = Mutex::new(None);
        let report = Mutex::new(RecomputeReport::default());
        let workers = config.build_threads.min(table_ids.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !failed.load(Ordering::Acquire) {
                        let slot = next.fetch_add(1, Ordering::Relaxed);
                        let Some(&table) = table_ids.get(slot) else {
                            break;
                        };
                        match self.rebuild_one(catalog, table, config) {
                            Ok(stats) => report.lock().absorb(&stats),
                            Err(err) => {
                                failed.store(true, Ordering::Release);
                                first_error.lock().get_or_insert(err);
                                break;
                            }
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(err) => Err(err),
            None => Ok(report.into_inner()),
        }
    }

    /// Build one table and publish it under its catalog name.
    fn rebuild_one<C>(
        &self,
        catalog: &C,
        table: TableId,
        config: &StatsConfig,
    ) -> Result<Arc<TableStats>>
    where
        C: Catalog + ?Sized,
    {
        let name = catalog.table_name(table)?;
        let stats = TableStats::build(catalog, table, config).inspect_err(|err| {
            error!(table = %name, error = %err, "keeping previous statistics after failed build");
        })?;
        let stats = Arc::new(stats);
        self.publish(name, Arc::clone(&stats));
        Ok(stats)
    }

    /// Drop every entry whose table is not in `live`.
    fn retain_live(&self, live: &HashSet<String>) {
        let mut tables = self.tables.write();
        let before = tables.len();
        tables.retain(|name, _| live.contains(name));
        let dropped = before - tables.len();
        if dropped > 0 {
            debug!(dropped, "removed statistics for tables no longer in the catalog");
        }
    }

    fn publish(&self, name: String, stats: Arc<TableStats>) -> Option<Arc<TableStats>> {
        debug!(table = %name, rows = stats.total_tuples(), "publishing table statistics");
        self.tables.write().insert(name, stats)
    }

    fn require(&self, table: &str) -> Result<Arc<TableStats>> {
        self.lookup(table).ok_or_else(|| StatsError::NoSuchTable {
            name: table.to_owned(),
        })
    }

    // -----------------------------------------------------------------------
    // Optimizer-facing estimates
    // -----------------------------------------------------------------------

    /// I/O cost of a full sequential scan of `table`.
    pub fn estimate_scan_cost(&self, table: &str) -> Result<f64> {
        Ok(self.require(table)?.estimate_scan_cost())
    }

    /// Selectivity of `column op constant` on `table`; `Ok(None)` for
    /// operators without an estimate.
    pub fn estimate_selectivity(
        &self,
        table: &str,
        column: usize,
        op: PredicateOp,
        constant: &Value,
    ) -> Result<Option<f64>> {
        self.require(table)?.estimate_selectivity(column, op, constant)
    }

    /// Selectivity of a predicate on `column` with an unknown constant.
    pub fn avg_selectivity(&self, table: &str, column: usize, op: PredicateOp) -> Result<f64> {
        self.require(table)?.avg_selectivity(column, op)
    }

    /// Rows recorded for `table` at build time.
    pub fn total_tuples(&self, table: &str) -> Result<u64> {
        Ok(self.require(table)?.total_tuples())
    }

    /// Rows of `table` expected to survive a combined selectivity.
    pub fn estimate_table_cardinality(&self, table: &str, selectivity_factor: f64) -> Result<u64> {
        Ok(self
            .require(table)?
            .estimate_table_cardinality(selectivity_factor))
    }
}
