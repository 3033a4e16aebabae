//! Core type definitions for the statistics layer.
//!
//! These are the narrow views of catalog and storage concepts the histogram
//! engine consumes: typed field values, rows, table schemas, and the closed
//! set of comparison operators a predicate may carry.

pub mod op;
pub mod row;
pub mod schema;
pub mod value;

pub use op::PredicateOp;
pub use row::Row;
pub use schema::{ColumnDef, Schema, TableId};
pub use value::{ColumnType, Value};
