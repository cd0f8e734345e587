//! Table and column references.

use serde::{Deserialize, Serialize};

/// A reference to a table, optionally schema-qualified and aliased.
///
/// ```rust
/// use oxide_dal_core::TableRef;
///
/// let t = TableRef::from("billing.invoices");
/// assert_eq!(t.schema.as_deref(), Some("billing"));
/// assert_eq!(t.name, "invoices");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema (or database, on engines that conflate the two).
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Alias used in FROM and JOIN clauses.
    pub alias: Option<String>,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a schema-qualified table reference.
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns the same table without its alias.
    #[must_use]
    pub fn unaliased(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            name: self.name.clone(),
            alias: None,
        }
    }
}

impl From<&str> for TableRef {
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, name)) => Self::qualified(schema, name),
            None => Self::new(value),
        }
    }
}

impl From<String> for TableRef {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// A column reference with an optional table (or alias) qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnPath {
    /// Table name or alias.
    pub qualifier: Option<String>,
    /// Column name, or `*`.
    pub name: String,
}

impl ColumnPath {
    /// Parses `"col"` or `"table.col"`.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((qualifier, name)) => Self {
                qualifier: Some(qualifier.to_string()),
                name: name.to_string(),
            },
            None => Self {
                qualifier: None,
                name: path.to_string(),
            },
        }
    }

    /// Returns whether the path carries a qualifier.
    #[must_use]
    pub const fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }
}

impl From<&str> for ColumnPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for ColumnPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}
