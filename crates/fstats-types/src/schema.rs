//! Table identity and column schema.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ColumnType;

/// Opaque catalog identifier of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u32);

impl TableId {
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of a table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    #[must_use]
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Type tag of the column at `index`.
    #[must_use]
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.columns.get(index).map(|c| c.column_type)
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }
}

impl FromIterator<ColumnDef> for Schema {
    fn from_iter<I: IntoIterator<Item = ColumnDef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema: Schema = [
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("Name", ColumnType::Text),
        ]
        .into_iter()
        .collect();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.column_type(0), Some(ColumnType::Integer));
        assert_eq!(schema.column_type(1), Some(ColumnType::Text));
        assert_eq!(schema.column_type(2), None, "case=column_past_end");
        assert_eq!(schema.column(1).map(|c| c.name.as_str()), Some("Name"));
    }

    #[test]
    fn test_table_id_display() {
        assert_eq!(TableId::new(7).to_string(), "table#7");
        assert_eq!(TableId::new(7).get(), 7);
    }
}
