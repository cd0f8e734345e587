//! PostgreSQL dialect.

use super::{
    AlterColumn, Autoincrement, ComputedColumns, ConstraintDrop, DdlStyle, Dialect, EnumStyle,
    IndexRename, MigrationLock, PrimaryKeyDrop, SetTransaction, TableCatalog, TableRename,
    TransactionStyle, TypeNames, UpsertStyle,
};

fn placeholder(n: usize) -> String {
    format!("${n}")
}

fn blob_literal(bytes: &[u8]) -> String {
    format!("'\\x{}'::bytea", hex::encode(bytes))
}

// Postgres names an unnamed primary key `<table>_pkey`.
fn primary_key_name(table: &str) -> String {
    format!("{table}_pkey")
}

fn lock_key(name: &str) -> String {
    format!("hashtext('{}')", name.replace('\'', "''"))
}

fn acquire_lock(name: &str) -> String {
    format!("select pg_advisory_lock({})", lock_key(name))
}

fn release_lock(name: &str) -> String {
    format!("select pg_advisory_unlock({})", lock_key(name))
}

impl Dialect {
    /// PostgreSQL: `$n` placeholders, `returning`, `ilike`, `on conflict`,
    /// transactional DDL and advisory locks.
    #[must_use]
    pub fn postgres() -> Self {
        Self {
            name: "postgres",
            identifier_quote: '"',
            placeholder,
            placeholder_start: 1,
            true_literal: "true",
            false_literal: "false",
            escape_backslash: false,
            blob_literal,
            default_values: "default values",
            now: "now()",
            supports_returning: true,
            supports_ilike: true,
            rewrite_raw_placeholders: true,
            offset_without_limit: None,
            upsert: UpsertStyle::OnConflict,
            types: TypeNames {
                smallint: "smallint",
                integer: "integer",
                bigint: "bigint",
                real: "real",
                double: "double precision",
                decimal: "numeric",
                char: "char",
                varchar: "varchar",
                varchar_default_length: None,
                text: "text",
                boolean: "boolean",
                date: "date",
                time: "time",
                time_tz: "time with time zone",
                timestamp: "timestamp",
                timestamp_tz: "timestamp with time zone",
                json: "jsonb",
                uuid: "uuid",
                binary: "bytea",
                enum_style: EnumStyle::CheckConstraint,
            },
            ddl: DdlStyle {
                drop_primary_key: PrimaryKeyDrop::ConstraintName {
                    fallback: Some(primary_key_name),
                },
                rename_table: TableRename::AlterTableRenameTo,
                rename_index: IndexRename::AlterIndex,
                supports_cascade: true,
                computed_columns: ComputedColumns::StoredOnly,
                alter_column: AlterColumn::AlterColumn,
                add_constraint: true,
                drop_foreign_key: ConstraintDrop::DropConstraint,
                drop_check: ConstraintDrop::DropConstraint,
                drop_unique: ConstraintDrop::DropConstraint,
                drop_index_on_table: false,
                index_if_not_exists: true,
                partial_indexes: true,
                autoincrement: Autoincrement::SerialType,
                wrap_default_expressions: false,
            },
            transactions: TransactionStyle {
                begin: "begin",
                set_transaction: SetTransaction::AfterBegin,
                savepoints: true,
                transactional_ddl: true,
            },
            migration_lock: Some(MigrationLock {
                acquire: acquire_lock,
                release: release_lock,
            }),
            catalog: TableCatalog {
                table: "information_schema.tables",
                name_column: "table_name",
                schema_column: Some("table_schema"),
                current_schema: Some("current_schema()"),
                filter: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_statements_escape_name() {
        let lock = Dialect::postgres().migration_lock.unwrap();
        assert_eq!(
            (lock.acquire)("oxide_migrations"),
            "select pg_advisory_lock(hashtext('oxide_migrations'))"
        );
        assert_eq!(
            (lock.release)("o'm"),
            "select pg_advisory_unlock(hashtext('o''m'))"
        );
    }

    #[test]
    fn test_primary_key_fallback_name() {
        match Dialect::postgres().ddl.drop_primary_key {
            PrimaryKeyDrop::ConstraintName {
                fallback: Some(f),
            } => assert_eq!(f("users"), "users_pkey"),
            other => panic!("unexpected style: {other:?}"),
        }
    }
}
