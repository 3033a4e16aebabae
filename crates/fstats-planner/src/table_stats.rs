//! Per-table statistics built from two sequential scans.
//!
//! Pass 1 discovers each integer column's `[min, max]` and counts rows.
//! Histogram geometry depends on that range, so the buckets are only laid
//! out once pass 1 has finished. Pass 2 then rewinds the stream and feeds
//! every field into its column's histogram. The two passes never fuse.
//!
//! # Cost model
//! A sequential scan costs `page_count * io_cost_per_page`: no seeks, a cold
//! cache, and whole pages read even when only part of a page is needed.

use fstats_error::{Result, StatsError};
use fstats_types::{ColumnType, PredicateOp, Row, Schema, TableId, Value};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::StatsConfig;
use crate::histogram::{ColumnHistogram, IntHistogram, TextHistogram};
use crate::source::{RowStream, TableSource};

/// Statistics snapshot for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    table_id: TableId,
    io_cost_per_page: f64,
    /// Pages occupied at build time.
    page_count: u64,
    /// Rows observed by the build scan.
    row_count: u64,
    /// One histogram per schema column, indexed by column position.
    histograms: Vec<ColumnHistogram>,
}

impl TableStats {
    /// Scan `table` twice through `source` and build its statistics.
    ///
    /// The row stream is closed on every path, including failures.
    ///
    /// # Errors
    /// - `InvalidConfig` for a bad configuration, before any row is read.
    /// - `TypeMismatch` / `Storage` when a row disagrees with the schema.
    /// - `UnstableScan` when the second pass does not replay the first.
    /// - Any error the row stream reports.
    pub fn build<S>(source: &S, table: TableId, config: &StatsConfig) -> Result<Self>
    where
        S: TableSource + ?Sized,
    {
        config.validate()?;
        let schema = source.schema(table)?;
        let (page_count, mut stream) = source.paged_row_stream(table)?;
        let scanned = stream
            .open()
            .and_then(|()| scan_two_passes(stream.as_mut(), &schema, config.bucket_count));
        stream.close();

        let (row_count, histograms) = scanned.inspect_err(|err| {
            error!(table = %table, error = %err, "statistics build failed");
        })?;

        info!(
            table = %table,
            rows = row_count,
            pages = page_count,
            columns = histograms.len(),
            "table statistics built"
        );

        Ok(Self {
            table_id: table,
            io_cost_per_page: config.io_cost_per_page,
            page_count,
            row_count,
            histograms,
        })
    }

    /// Assemble statistics from prebuilt parts, for injecting test fixtures.
    ///
    /// # Errors
    /// `InvalidConfig` if a histogram's count differs from `row_count` or the
    /// cost is not a finite non-negative number.
    pub fn from_parts(
        table_id: TableId,
        io_cost_per_page: f64,
        page_count: u64,
        row_count: u64,
        histograms: Vec<ColumnHistogram>,
    ) -> Result<Self> {
        if !io_cost_per_page.is_finite() || io_cost_per_page < 0.0 {
            return Err(StatsError::invalid_config(format!(
                "io_cost_per_page must be finite and non-negative, got {io_cost_per_page}"
            )));
        }
        if let Some((column, hist)) = histograms
            .iter()
            .enumerate()
            .find(|(_, h)| h.total_count() != row_count)
        {
            return Err(StatsError::invalid_config(format!(
                "histogram for column {column} holds {} values, table has {row_count} rows",
                hist.total_count()
            )));
        }
        Ok(Self {
            table_id,
            io_cost_per_page,
            page_count,
            row_count,
            histograms,
        })
    }

    #[must_use]
    pub const fn table_id(&self) -> TableId {
        self.table_id
    }

    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.page_count
    }

    #[must_use]
    pub const fn io_cost_per_page(&self) -> f64 {
        self.io_cost_per_page
    }

    /// Rows recorded during the build scan.
    #[must_use]
    pub const fn total_tuples(&self) -> u64 {
        self.row_count
    }

    /// Number of columns with a histogram.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.histograms.len()
    }

    #[must_use]
    pub fn histogram(&self, column: usize) -> Option<&ColumnHistogram> {
        self.histograms.get(column)
    }

    /// Cost of reading every page of the table once.
    #[must_use]
    pub fn estimate_scan_cost(&self) -> f64 {
        self.page_count as f64 * self.io_cost_per_page
    }

    /// Rows expected to survive predicates of combined selectivity
    /// `selectivity_factor`, rounded to the nearest row.
    #[must_use]
    pub fn estimate_table_cardinality(&self, selectivity_factor: f64) -> u64 {
        let factor = if selectivity_factor.is_nan() {
            0.0
        } else {
            selectivity_factor.clamp(0.0, 1.0)
        };
        (factor * self.row_count as f64).round() as u64
    }

    /// Estimate the selectivity of `column op constant`.
    ///
    /// `Ok(None)` means the operator cannot be estimated (`LIKE`).
    ///
    /// # Errors
    /// `NoSuchColumn` for an index beyond the schema; `TypeMismatch` if the
    /// constant's type differs from the column's.
    pub fn estimate_selectivity(
        &self,
        column: usize,
        op: PredicateOp,
        constant: &Value,
    ) -> Result<Option<f64>> {
        self.column_histogram(column)?
            .estimate(column, op, constant)
            .inspect_err(|err| {
                warn!(
                    table = %self.table_id,
                    column,
                    op = %op,
                    error = %err,
                    "selectivity query outside schema"
                );
            })
    }

    /// Expected selectivity of a predicate on `column` whose constant is not
    /// known. The operator does not affect the estimate.
    pub fn avg_selectivity(&self, column: usize, _op: PredicateOp) -> Result<f64> {
        Ok(self.column_histogram(column)?.avg_selectivity())
    }

    fn column_histogram(&self, column: usize) -> Result<&ColumnHistogram> {
        self.histograms.get(column).ok_or(StatsError::NoSuchColumn {
            column,
            width: self.histograms.len(),
        })
    }
}

/// Check a row's width and field types against the schema.
fn check_row(row: &Row, schema: &Schema) -> Result<()> {
    if row.len() != schema.len() {
        return Err(StatsError::storage(format!(
            "row has {} fields, schema has {} columns",
            row.len(),
            schema.len()
        )));
    }
    for (column, (value, def)) in row.iter().zip(schema.iter()).enumerate() {
        if value.column_type() != def.column_type {
            return Err(StatsError::type_mismatch(
                column,
                def.column_type,
                value.column_type(),
            ));
        }
    }
    Ok(())
}

/// Run both passes over an already opened stream.
fn scan_two_passes(
    stream: &mut dyn RowStream,
    schema: &Schema,
    bucket_count: usize,
) -> Result<(u64, Vec<ColumnHistogram>)> {
    // Pass 1: integer ranges and row count.
    let mut ranges: Vec<Option<(i64, i64)>> = vec![None; schema.len()];
    let mut row_count: u64 = 0;
    while let Some(row) = stream.next_row()? {
        check_row(&row, schema)?;
        for (range, value) in ranges.iter_mut().zip(row.iter()) {
            if let Value::Integer(v) = *value {
                *range = Some(range.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))));
            }
        }
        row_count += 1;
    }
    debug!(rows = row_count, "statistics pass 1 complete");

    let mut histograms = schema
        .iter()
        .zip(&ranges)
        .map(|(def, range)| match def.column_type {
            ColumnType::Integer => {
                // An empty table has no observed range; any valid one will do.
                let (lo, hi) = range.unwrap_or((0, 0));
                IntHistogram::new(bucket_count, lo, hi).map(ColumnHistogram::Integer)
            }
            ColumnType::Text => TextHistogram::new(bucket_count).map(ColumnHistogram::Text),
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(
        columns = histograms.len(),
        bucket_count, "histograms laid out from pass 1 ranges"
    );

    // Pass 2: populate.
    stream.rewind()?;
    let mut replayed: u64 = 0;
    while let Some(row) = stream.next_row()? {
        check_row(&row, schema)?;
        replayed += 1;
        if replayed > row_count {
            return Err(StatsError::UnstableScan {
                detail: format!("second pass yielded more than {row_count} rows"),
            });
        }
        for (column, (hist, value)) in histograms.iter_mut().zip(row.iter()).enumerate() {
            hist.add(column, value).map_err(|err| match err {
                StatsError::ValueOutOfRange { value, min, max } => StatsError::UnstableScan {
                    detail: format!(
                        "column {column} value {value} outside pass 1 range [{min}, {max}]"
                    ),
                },
                other => other,
            })?;
        }
    }
    if replayed != row_count {
        return Err(StatsError::UnstableScan {
            detail: format!("first pass saw {row_count} rows, second pass {replayed}"),
        });
    }
    debug!(rows = replayed, "statistics pass 2 complete");

    Ok((row_count, histograms))
}

#[cfg(test)]
mod tests {
    use fstats_types::ColumnDef;

    use super::*;
    use crate::source::memory::{MemoryCatalog, MemoryTable};

    fn mixed_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("score", ColumnType::Integer),
        ])
    }

    fn mixed_rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| {
                Row::new([
                    Value::Integer(i),
                    Value::Text(format!("user{i}")),
                    Value::Integer(i % 10 - 5),
                ])
            })
            .collect()
    }

    fn build_mixed(n: i64) -> TableStats {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(
            MemoryTable::new("people", mixed_schema())
                .with_rows(mixed_rows(n))
                .with_rows_per_page(10),
        );
        TableStats::build(&catalog, id, &StatsConfig::default()).unwrap()
    }

    #[test]
    fn test_build_records_shape() {
        let stats = build_mixed(95);
        assert_eq!(stats.total_tuples(), 95);
        assert_eq!(stats.page_count(), 10);
        assert_eq!(stats.column_count(), 3);
        for column in 0..3 {
            assert_eq!(
                stats.histogram(column).unwrap().total_count(),
                95,
                "case=histogram_count_equals_rows column={column}"
            );
        }
        let Some(ColumnHistogram::Integer(score)) = stats.histogram(2) else {
            panic!("score column should be an integer histogram");
        };
        assert_eq!((score.min(), score.max()), (-5, 4), "case=pass1_range");
        assert_eq!(score.bucket_count(), 100);
    }

    #[test]
    fn test_scan_cost_and_cardinality() {
        let stats = build_mixed(95);
        assert_eq!(stats.estimate_scan_cost(), 10.0 * 1000.0);
        assert_eq!(stats.estimate_table_cardinality(0.5), 48, "case=round_half_up");
        assert_eq!(stats.estimate_table_cardinality(0.1), 10);
        assert_eq!(stats.estimate_table_cardinality(0.0), 0);
        assert_eq!(stats.estimate_table_cardinality(1.0), 95);
        assert_eq!(stats.estimate_table_cardinality(7.0), 95, "case=clamped");
        assert_eq!(stats.estimate_table_cardinality(f64::NAN), 0);
    }

    #[test]
    fn test_selectivity_dispatch() {
        let stats = build_mixed(100);
        let lt = stats
            .estimate_selectivity(0, PredicateOp::Lt, &Value::Integer(50))
            .unwrap()
            .unwrap();
        assert!((lt - 0.5).abs() < 0.02, "case=lt_mid lt={lt}");

        let eq = stats
            .estimate_selectivity(2, PredicateOp::Eq, &Value::Integer(0))
            .unwrap()
            .unwrap();
        assert!((eq - 0.1).abs() < 1e-9, "case=eq_small_domain eq={eq}");

        assert!(
            stats
                .estimate_selectivity(1, PredicateOp::Lt, &Value::from("v"))
                .unwrap()
                .is_some()
        );
        assert_eq!(
            stats
                .estimate_selectivity(1, PredicateOp::Like, &Value::from("u%"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_out_of_schema_queries() {
        let stats = build_mixed(10);
        assert!(matches!(
            stats.estimate_selectivity(3, PredicateOp::Eq, &Value::Integer(1)),
            Err(StatsError::NoSuchColumn {
                column: 3,
                width: 3
            })
        ));
        assert!(matches!(
            stats.estimate_selectivity(1, PredicateOp::Eq, &Value::Integer(1)),
            Err(StatsError::TypeMismatch { column: 1, .. })
        ));
        assert!(stats.avg_selectivity(9, PredicateOp::Eq).is_err());
    }

    #[test]
    fn test_avg_selectivity_ignores_operator() {
        let stats = build_mixed(100);
        let eq = stats.avg_selectivity(2, PredicateOp::Eq).unwrap();
        let gt = stats.avg_selectivity(2, PredicateOp::Gt).unwrap();
        assert_eq!(eq, gt);
        assert!(eq > 0.0);
    }

    #[test]
    fn test_build_rejects_mistyped_row() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(
            MemoryTable::new("bad", mixed_schema()).with_rows([Row::new([
                Value::from("oops"),
                Value::from("x"),
                Value::Integer(1),
            ])]),
        );
        let err = TableStats::build(&catalog, id, &StatsConfig::default()).unwrap_err();
        assert!(matches!(err, StatsError::TypeMismatch { column: 0, .. }));
    }

    #[test]
    fn test_build_rejects_bad_config_before_scan() {
        let catalog = MemoryCatalog::new();
        let id = catalog.add_table(
            MemoryTable::new("t", mixed_schema())
                .with_rows(mixed_rows(3))
                .failing_after(0),
        );
        let err =
            TableStats::build(&catalog, id, &StatsConfig::default().with_bucket_count(0))
                .unwrap_err();
        assert!(
            matches!(err, StatsError::InvalidConfig { .. }),
            "case=config_checked_first err={err}"
        );
    }

    #[test]
    fn test_from_parts_checks_counts() {
        let mut hist = IntHistogram::new(4, 0, 3).unwrap();
        hist.add_value(1).unwrap();
        let ok = TableStats::from_parts(
            TableId::new(1),
            1.0,
            1,
            1,
            vec![ColumnHistogram::Integer(hist.clone())],
        );
        assert!(ok.is_ok());
        let bad = TableStats::from_parts(
            TableId::new(1),
            1.0,
            1,
            2,
            vec![ColumnHistogram::Integer(hist)],
        );
        assert!(matches!(bad, Err(StatsError::InvalidConfig { .. })));
    }
}
