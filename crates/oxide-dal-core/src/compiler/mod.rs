//! Dialect-neutral operation compiler.
//!
//! [`compile`] turns an [`Operation`] into the statements a client executes.
//! Everything dialect-specific is read from the [`Dialect`] descriptor, so
//! adding an engine never touches this module.
//!
//! # Example
//!
//! ```rust
//! use oxide_dal_core::compiler::compile_query;
//! use oxide_dal_core::{Dialect, Predicate, Query, Select};
//!
//! let query = Query::Select(
//!     Select::from("users")
//!         .columns(&["id", "name"])
//!         .filter(Predicate::eq("active", true))
//!         .limit(10),
//! );
//!
//! let stmt = compile_query(&query, &Dialect::postgres()).unwrap();
//! assert_eq!(
//!     stmt.text,
//!     "select \"id\", \"name\" from \"users\" where \"active\" = $1 limit 10"
//! );
//! ```

mod ddl;
mod dml;
mod predicate;
mod transaction;
mod writer;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::query::Query;
use crate::schema::MigrationOp;
use crate::value::SqlValue;

pub use transaction::{
    compile_begin, compile_commit, compile_lock_acquire, compile_lock_release,
    compile_release_savepoint, compile_rollback, compile_rollback_to_savepoint, compile_savepoint,
    compile_table_exists, IsolationLevel, TransactionOptions,
};

use writer::SqlWriter;

/// SQL text with its bound values in placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub text: String,
    pub values: Vec<SqlValue>,
}

impl SqlStatement {
    /// A statement without bound values.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            values: Vec::new(),
        }
    }
}

/// Anything the compiler accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Query(Query),
    Migration(MigrationOp),
}

impl From<Query> for Operation {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

impl From<MigrationOp> for Operation {
    fn from(op: MigrationOp) -> Self {
        Self::Migration(op)
    }
}

/// Compiles any operation. Queries yield exactly one statement, migrations
/// one or more (an empty `alter table` yields none).
///
/// # Errors
///
/// Returns a [`CompileError`](crate::CompileError) for invalid operations or
/// features the dialect can't express.
pub fn compile(operation: &Operation, dialect: &Dialect) -> Result<Vec<SqlStatement>> {
    match operation {
        Operation::Query(query) => compile_query(query, dialect).map(|stmt| vec![stmt]),
        Operation::Migration(op) => compile_migration(op, dialect),
    }
}

/// Compiles a data query into a single statement.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_query(query: &Query, dialect: &Dialect) -> Result<SqlStatement> {
    let mut w = SqlWriter::new(dialect);
    dml::write_query(&mut w, query)?;
    Ok(w.finish())
}

/// Compiles a schema operation into its statements.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_migration(op: &MigrationOp, dialect: &Dialect) -> Result<Vec<SqlStatement>> {
    ddl::compile_op(op, dialect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::predicate::Predicate;
    use crate::query::{Aggregate, InsertMany, JoinKind, Returning, Select, SortDirection, Upsert};
    use crate::table::TableRef;

    fn pg() -> Dialect {
        Dialect::postgres()
    }

    #[test]
    fn test_select_clause_order() {
        let q = Select::from(TableRef::new("users").alias("u"))
            .columns(&["u.id", "p.title"])
            .distinct()
            .join(
                JoinKind::Left,
                TableRef::new("posts").alias("p"),
                Predicate::eq("u.id", "p.author_id"),
            )
            .filter(Predicate::gt("u.age", 18))
            .group_by(&["u.id", "p.title"])
            .having(Predicate::raw("count(*) > ?", vec![SqlValue::Int(1)]))
            .order_by("u.id", SortDirection::Desc)
            .limit(5)
            .offset(10);
        let stmt = compile_query(&Query::Select(q), &pg()).unwrap();
        assert_eq!(
            stmt.text,
            "select distinct \"u\".\"id\", \"p\".\"title\" from \"users\" as \"u\" \
             left join \"posts\" as \"p\" on \"u\".\"id\" = \"p\".\"author_id\" \
             where \"u\".\"age\" > $1 group by \"u\".\"id\", \"p\".\"title\" \
             having count(*) > $2 order by \"u\".\"id\" desc limit 5 offset 10"
        );
        assert_eq!(stmt.values, vec![SqlValue::Int(18), SqlValue::Int(1)]);
    }

    #[test]
    fn test_offset_without_limit() {
        let q = Query::Select(Select::from("t").offset(3));
        assert_eq!(
            compile_query(&q, &pg()).unwrap().text,
            "select * from \"t\" offset 3"
        );
        assert_eq!(
            compile_query(&q, &Dialect::sqlite()).unwrap().text,
            "select * from \"t\" limit -1 offset 3"
        );
        assert_eq!(
            compile_query(&q, &Dialect::mysql()).unwrap().text,
            "select * from `t` limit 18446744073709551615 offset 3"
        );
    }

    #[test]
    fn test_count_and_exists() {
        let agg = Aggregate::from("users").filter(Predicate::eq("active", true));
        assert_eq!(
            compile_query(&Query::Count(agg.clone()), &pg()).unwrap().text,
            "select count(*) as \"count\" from (select 1 from \"users\" where \"active\" = $1) as __dt_count"
        );
        assert_eq!(
            compile_query(&Query::Exists(agg), &pg()).unwrap().text,
            "select count(*) as \"count\" from (select 1 from \"users\" where \"active\" = $1 limit 1) as __dt_count"
        );
    }

    #[test]
    fn test_insert_returning_only_where_supported() {
        let insert = Query::insert("users", [("name", "ann")]).returning(Returning::All);
        assert_eq!(
            compile_query(&insert.clone().into(), &pg()).unwrap().text,
            "insert into \"users\" (\"name\") values ($1) returning *"
        );
        assert_eq!(
            compile_query(&insert.into(), &Dialect::mysql()).unwrap().text,
            "insert into `users` (`name`) values (?)"
        );
    }

    #[test]
    fn test_insert_empty_row_uses_default_values() {
        let insert = Query::insert("t", Vec::<(&str, i64)>::new());
        assert_eq!(
            compile_query(&insert.clone().into(), &pg()).unwrap().text,
            "insert into \"t\" default values"
        );
        assert_eq!(
            compile_query(&insert.into(), &Dialect::mysql()).unwrap().text,
            "insert into `t` () values ()"
        );
    }

    #[test]
    fn test_insert_many_union_of_columns() {
        let q = InsertMany {
            table: "t".into(),
            rows: vec![
                vec![("a".into(), SqlValue::Int(1))],
                vec![("b".into(), SqlValue::Int(2)), ("a".into(), SqlValue::Int(3))],
            ],
            returning: Returning::None,
            primary_key: vec![],
        };
        let stmt = compile_query(&q.into(), &pg()).unwrap();
        assert_eq!(
            stmt.text,
            "insert into \"t\" (\"a\", \"b\") values ($1, $2), ($3, $4)"
        );
        assert_eq!(
            stmt.values,
            vec![
                SqlValue::Int(1),
                SqlValue::Null,
                SqlValue::Int(3),
                SqlValue::Int(2)
            ]
        );
    }

    #[test]
    fn test_insert_many_zero_rows_is_a_no_op_select() {
        let q = InsertMany {
            table: "t".into(),
            rows: vec![],
            returning: Returning::None,
            primary_key: vec![],
        };
        let stmt = compile_query(&q.into(), &pg()).unwrap();
        assert_eq!(stmt.text, "select * from \"t\" where 1 = 0");
        assert!(stmt.values.is_empty());
    }

    #[test]
    fn test_update_requires_changes() {
        let q = Query::update("t", Vec::<(&str, i64)>::new(), None);
        assert_eq!(
            compile_query(&q, &pg()).unwrap_err(),
            CompileError::EmptyUpdate("t".into())
        );
    }

    #[test]
    fn test_upsert_variants() {
        let upsert = Upsert {
            table: "users".into(),
            values: vec![
                ("id".into(), SqlValue::Int(1)),
                ("name".into(), SqlValue::Text("ann".into())),
            ],
            conflict_target: vec!["id".into()],
            update_columns: vec!["name".into()],
            returning: Returning::None,
            primary_key: vec![],
        };
        assert_eq!(
            compile_query(&upsert.clone().into(), &pg()).unwrap().text,
            "insert into \"users\" (\"id\", \"name\") values ($1, $2) on conflict (\"id\") do update set \"name\" = excluded.\"name\""
        );
        assert_eq!(
            compile_query(&upsert.clone().into(), &Dialect::mysql()).unwrap().text,
            "insert into `users` (`id`, `name`) values (?, ?) on duplicate key update `name` = values(`name`)"
        );

        let mut nothing = upsert.clone();
        nothing.update_columns.clear();
        assert_eq!(
            compile_query(&nothing.clone().into(), &Dialect::sqlite()).unwrap().text,
            "insert into \"users\" (\"id\", \"name\") values (?, ?) on conflict (\"id\") do nothing"
        );
        assert_eq!(
            compile_query(&nothing.into(), &Dialect::mysql()).unwrap().text,
            "insert into `users` (`id`, `name`) values (?, ?) on duplicate key update `id` = `id`"
        );

        let mut untargeted = upsert;
        untargeted.conflict_target.clear();
        assert_eq!(
            compile_query(&untargeted.into(), &pg()).unwrap_err(),
            CompileError::MissingConflictTarget("users".into())
        );
    }

    #[test]
    fn test_compile_dispatches_queries_and_migrations() {
        let op = Operation::from(MigrationOp::drop_table_if_exists("t"));
        let stmts = compile(&op, &Dialect::sqlite()).unwrap();
        assert_eq!(stmts, vec![SqlStatement::text("drop table if exists \"t\"")]);

        let op = Operation::from(Query::delete("t", Some(Predicate::eq("id", 1))));
        let stmts = compile(&op, &Dialect::mysql()).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].text, "delete from `t` where `id` = ?");
    }
}
