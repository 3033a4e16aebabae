//! Rows as produced by a sequential scan.

use smallvec::SmallVec;

use crate::value::Value;

/// Inline capacity for row fields; most test and catalog tables are narrow.
const INLINE_FIELDS: usize = 8;

/// One row of a table: an ordered list of field values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    fields: SmallVec<[Value; INLINE_FIELDS]>,
}

impl Row {
    #[must_use]
    pub fn new(fields: impl IntoIterator<Item = Value>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Field accessor: the stored value at `index`, if the row has one.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Number of fields in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter()
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<Value>> for Row {
    fn from(fields: Vec<Value>) -> Self {
        Self {
            fields: SmallVec::from_vec(fields),
        }
    }
}
