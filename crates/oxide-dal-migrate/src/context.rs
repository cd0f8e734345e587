//! The environment a migration handler runs in.

use oxide_dal_adapter::{Adapter, QueryOutcome, TransactionToken};
use oxide_dal_core::schema::{AlterTableBuilder, CreateTableOp, MigrationOp};
use oxide_dal_core::{Query, SqlStatement};
use tracing::debug;

use crate::error::Result;

/// Runs a handler's schema changes on the migration's transaction, or only
/// compiles and collects them during a dry run.
pub struct MigrationContext<'a> {
    adapter: &'a Adapter,
    transaction: Option<TransactionToken>,
    dry_run: bool,
    statements: Vec<SqlStatement>,
}

impl<'a> MigrationContext<'a> {
    pub(crate) const fn new(
        adapter: &'a Adapter,
        transaction: Option<TransactionToken>,
        dry_run: bool,
    ) -> Self {
        Self {
            adapter,
            transaction,
            dry_run,
            statements: Vec::new(),
        }
    }

    /// Compiles and runs one schema operation.
    ///
    /// # Errors
    ///
    /// Fails if the operation can't be compiled for the database or a
    /// statement fails.
    pub async fn apply(&mut self, op: &MigrationOp) -> Result<()> {
        for statement in self.adapter.compile_migration(op)? {
            self.run(statement).await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn create_table(&mut self, op: CreateTableOp) -> Result<()> {
        self.apply(&MigrationOp::CreateTable(op)).await
    }

    /// Collects changes for `table` with an [`AlterTableBuilder`] and runs
    /// them in order.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn alter_table(
        &mut self,
        table: &str,
        build: impl FnOnce(&mut AlterTableBuilder) + Send,
    ) -> Result<()> {
        let mut builder = AlterTableBuilder::new(table);
        build(&mut builder);
        self.apply(&MigrationOp::AlterTable(builder.build())).await
    }

    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn drop_table(&mut self, table: &str) -> Result<()> {
        self.apply(&MigrationOp::drop_table(table)).await
    }

    /// Runs SQL text verbatim.
    ///
    /// # Errors
    ///
    /// Fails if the statement fails.
    pub async fn raw(&mut self, sql: &str) -> Result<()> {
        self.run(SqlStatement::text(sql)).await
    }

    /// Runs a data query, e.g. a backfill. During a dry run the query is only
    /// compiled and an empty outcome is returned.
    ///
    /// # Errors
    ///
    /// Fails if the query doesn't compile or the statement fails.
    pub async fn execute(&mut self, query: &Query) -> Result<QueryOutcome> {
        if self.dry_run {
            let statement = self.adapter.compile_sql(query)?;
            self.statements.push(statement);
            return Ok(QueryOutcome::default());
        }
        let outcome = self.adapter.execute(query, self.transaction).await?;
        self.statements.push(self.adapter.compile_sql(query)?);
        Ok(outcome)
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    #[must_use]
    pub const fn adapter(&self) -> &Adapter {
        self.adapter
    }

    /// Statements run (or planned) so far.
    #[must_use]
    pub fn statements(&self) -> &[SqlStatement] {
        &self.statements
    }

    pub(crate) fn into_statements(self) -> Vec<SqlStatement> {
        self.statements
    }

    pub(crate) async fn run(&mut self, statement: SqlStatement) -> Result<()> {
        if self.dry_run {
            debug!(sql = %statement.text, "Planned SQL");
        } else {
            self.adapter
                .run_statement(&statement, self.transaction)
                .await?;
        }
        self.statements.push(statement);
        Ok(())
    }
}
