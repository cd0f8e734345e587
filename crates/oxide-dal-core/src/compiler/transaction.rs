//! Transaction, savepoint and catalog statements.

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, SetTransaction};
use crate::error::{CompileError, Result};
use crate::table::TableRef;
use crate::value::SqlValue;

use super::SqlStatement;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read uncommitted",
            Self::ReadCommitted => "read committed",
            Self::RepeatableRead => "repeatable read",
            Self::Serializable => "serializable",
        }
    }
}

/// Options for opening a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

impl TransactionOptions {
    #[must_use]
    pub const fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    const fn is_default(&self) -> bool {
        self.isolation.is_none() && !self.read_only
    }
}

/// Statements opening a transaction, in execution order.
///
/// # Errors
///
/// Returns [`CompileError::Unsupported`] when options are requested on a
/// dialect that can't set them per transaction.
pub fn compile_begin(dialect: &Dialect, options: TransactionOptions) -> Result<Vec<SqlStatement>> {
    let begin = SqlStatement::text(dialect.transactions.begin);
    if options.is_default() {
        return Ok(vec![begin]);
    }

    let mut set = String::from("set transaction");
    match (options.isolation, options.read_only) {
        (Some(level), read_only) => {
            set.push_str(" isolation level ");
            set.push_str(level.as_sql());
            if read_only {
                set.push_str(", read only");
            }
        }
        (None, _) => set.push_str(" read only"),
    }
    let set = SqlStatement::text(set);

    match dialect.transactions.set_transaction {
        SetTransaction::AfterBegin => Ok(vec![begin, set]),
        SetTransaction::BeforeBegin => Ok(vec![set, begin]),
        SetTransaction::Unsupported => Err(CompileError::unsupported(
            "transaction isolation and access mode",
            dialect.name,
        )),
    }
}

#[must_use]
pub fn compile_commit() -> SqlStatement {
    SqlStatement::text("commit")
}

#[must_use]
pub fn compile_rollback() -> SqlStatement {
    SqlStatement::text("rollback")
}

/// `savepoint "name"`.
///
/// # Errors
///
/// Fails on dialects without savepoints.
pub fn compile_savepoint(dialect: &Dialect, name: &str) -> Result<SqlStatement> {
    savepoint_statement(dialect, "savepoint ", name)
}

/// `rollback to savepoint "name"`.
///
/// # Errors
///
/// Fails on dialects without savepoints.
pub fn compile_rollback_to_savepoint(dialect: &Dialect, name: &str) -> Result<SqlStatement> {
    savepoint_statement(dialect, "rollback to savepoint ", name)
}

/// `release savepoint "name"`.
///
/// # Errors
///
/// Fails on dialects without savepoints.
pub fn compile_release_savepoint(dialect: &Dialect, name: &str) -> Result<SqlStatement> {
    savepoint_statement(dialect, "release savepoint ", name)
}

fn savepoint_statement(dialect: &Dialect, prefix: &str, name: &str) -> Result<SqlStatement> {
    if !dialect.transactions.savepoints {
        return Err(CompileError::unsupported("savepoints", dialect.name));
    }
    Ok(SqlStatement::text(format!(
        "{prefix}{}",
        dialect.quote_identifier(name)
    )))
}

/// Counts catalog rows naming `table`. The count is `1` when the table
/// exists. A qualified table is looked up in its own schema, otherwise in the
/// connection's current one.
#[must_use]
pub fn compile_table_exists(dialect: &Dialect, table: &TableRef) -> SqlStatement {
    let catalog = &dialect.catalog;
    let mut values = vec![SqlValue::Text(table.name.clone())];

    let source = match (&table.schema, catalog.schema_column) {
        (Some(schema), None) => format!("{}.{}", dialect.quote_identifier(schema), catalog.table),
        _ => catalog.table.to_string(),
    };
    let mut text = format!(
        "select count(*) as {} from {source} where {} = {}",
        dialect.quote_identifier("count"),
        catalog.name_column,
        dialect.placeholder_at(0)
    );

    if let Some(column) = catalog.schema_column {
        match (&table.schema, catalog.current_schema) {
            (Some(schema), _) => {
                text.push_str(&format!(" and {column} = {}", dialect.placeholder_at(1)));
                values.push(SqlValue::Text(schema.clone()));
            }
            (None, Some(current)) => text.push_str(&format!(" and {column} = {current}")),
            (None, None) => {}
        }
    }
    if let Some(filter) = catalog.filter {
        text.push_str(" and ");
        text.push_str(filter);
    }
    SqlStatement { text, values }
}

/// Statement acquiring the named migration lock, if the dialect has one.
#[must_use]
pub fn compile_lock_acquire(dialect: &Dialect, name: &str) -> Option<SqlStatement> {
    dialect
        .migration_lock
        .map(|lock| SqlStatement::text((lock.acquire)(name)))
}

/// Statement releasing the named migration lock, if the dialect has one.
#[must_use]
pub fn compile_lock_release(dialect: &Dialect, name: &str) -> Option<SqlStatement> {
    dialect
        .migration_lock
        .map(|lock| SqlStatement::text((lock.release)(name)))
}
