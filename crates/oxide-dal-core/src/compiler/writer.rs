//! Statement writer shared by the DML and DDL compilers.

use crate::dialect::Dialect;
use crate::table::{ColumnPath, TableRef};
use crate::value::SqlValue;

use super::SqlStatement;

/// Accumulates SQL text and bound values, allocating placeholders left to
/// right.
pub(crate) struct SqlWriter<'d> {
    pub(crate) dialect: &'d Dialect,
    sql: String,
    values: Vec<SqlValue>,
}

impl<'d> SqlWriter<'d> {
    pub(crate) const fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Binds a value and writes its placeholder.
    pub(crate) fn bind(&mut self, value: SqlValue) -> &mut Self {
        let placeholder = self.dialect.placeholder_at(self.values.len());
        self.values.push(value);
        self.sql.push_str(&placeholder);
        self
    }

    /// Binds a value whose placeholder is already part of verbatim text.
    pub(crate) fn bind_silent(&mut self, value: SqlValue) {
        self.values.push(value);
    }

    pub(crate) fn ident(&mut self, name: &str) -> &mut Self {
        let quoted = self.dialect.quote_identifier(name);
        self.push(&quoted)
    }

    pub(crate) fn idents(&mut self, names: &[String]) -> &mut Self {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(name);
        }
        self
    }

    pub(crate) fn table(&mut self, table: &TableRef) -> &mut Self {
        let quoted = self.dialect.quote_table(table);
        self.push(&quoted)
    }

    pub(crate) fn table_source(&mut self, table: &TableRef) -> &mut Self {
        let quoted = self.dialect.quote_table_source(table);
        self.push(&quoted)
    }

    pub(crate) fn column(&mut self, column: &ColumnPath) -> &mut Self {
        let quoted = self.dialect.quote_column_path(column);
        self.push(&quoted)
    }

    pub(crate) fn columns(&mut self, columns: &[ColumnPath]) -> &mut Self {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.column(column);
        }
        self
    }

    pub(crate) fn finish(self) -> SqlStatement {
        SqlStatement {
            text: self.sql,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_numbered_left_to_right() {
        let dialect = Dialect::postgres();
        let mut w = SqlWriter::new(&dialect);
        w.push("select ")
            .bind(SqlValue::Int(1))
            .push(", ")
            .bind(SqlValue::Int(2));
        let stmt = w.finish();
        assert_eq!(stmt.text, "select $1, $2");
        assert_eq!(stmt.values, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }
}
