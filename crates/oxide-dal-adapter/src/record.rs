//! Result rows.

use oxide_dal_core::{Row, SqlValue};

/// One result row: `(column, value)` pairs in the order the driver returned
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Row,
}

impl Record {
    #[must_use]
    pub const fn new(cells: Row) -> Self {
        Self { cells }
    }

    /// Value of the first column named `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value at position `index`.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&SqlValue> {
        self.cells.get(index).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn into_row(self) -> Row {
        self.cells
    }
}

impl From<Row> for Record {
    fn from(cells: Row) -> Self {
        Self::new(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_column_order() {
        let record = Record::from(vec![
            ("b".to_string(), SqlValue::Int(2)),
            ("a".to_string(), SqlValue::Int(1)),
        ]);
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(record.get("a"), Some(&SqlValue::Int(1)));
        assert_eq!(record.get_index(0), Some(&SqlValue::Int(2)));
        assert_eq!(record.get("c"), None);
    }
}
