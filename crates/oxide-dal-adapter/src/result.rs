//! Normalized execution results.

use oxide_dal_core::SqlValue;

use crate::error::{AdapterError, Result};
use crate::record::Record;

/// Outcome of [`Adapter::execute`](crate::Adapter::execute).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Returned rows. `None` when the operation returns no rows, or
    /// returning was requested but couldn't be honoured.
    pub rows: Option<Vec<Record>>,
    pub rows_affected: u64,
    /// Primary key of the last inserted row.
    pub insert_id: Option<SqlValue>,
    /// Set for count and exists queries.
    pub count: Option<u64>,
}

impl QueryOutcome {
    /// `count > 0`, for exists queries.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.count.is_some_and(|c| c > 0)
    }

    /// The rows, or an empty slice.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.rows.as_deref().unwrap_or_default()
    }
}

/// Drivers report counts as integers, floats or text depending on the
/// engine and column type.
pub(crate) fn normalize_count(value: &SqlValue) -> Result<u64> {
    let invalid = || AdapterError::InvalidResult(format!("not a row count: {value:?}"));
    match value {
        SqlValue::Int(n) => u64::try_from(*n).map_err(|_| invalid()),
        SqlValue::Float(f) if f.is_finite() && *f >= 0.0 && f.fract() == 0.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok(*f as u64)
        }
        SqlValue::Text(text) => {
            let text = text.trim();
            text.parse::<u64>().or_else(|_| {
                text.parse::<f64>()
                    .ok()
                    .map(SqlValue::Float)
                    .ok_or_else(invalid)
                    .and_then(|f| normalize_count(&f))
            })
        }
        SqlValue::Bool(b) => Ok(u64::from(*b)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_count() {
        assert_eq!(normalize_count(&SqlValue::Int(3)).unwrap(), 3);
        assert_eq!(normalize_count(&SqlValue::Float(4.0)).unwrap(), 4);
        assert_eq!(normalize_count(&SqlValue::Text("12".into())).unwrap(), 12);
        assert_eq!(normalize_count(&SqlValue::Text("7.0".into())).unwrap(), 7);
        assert!(normalize_count(&SqlValue::Int(-1)).is_err());
        assert!(normalize_count(&SqlValue::Text("many".into())).is_err());
        assert!(normalize_count(&SqlValue::Null).is_err());
    }

    #[test]
    fn test_exists() {
        let outcome = QueryOutcome {
            count: Some(1),
            ..QueryOutcome::default()
        };
        assert!(outcome.exists());
        assert!(!QueryOutcome::default().exists());
        assert!(QueryOutcome::default().records().is_empty());
    }
}
