//! MySQL / MariaDB dialect.

use super::{
    AlterColumn, Autoincrement, ComputedColumns, ConstraintDrop, DdlStyle, Dialect, EnumStyle,
    IndexRename, MigrationLock, PrimaryKeyDrop, SetTransaction, TableCatalog, TableRename,
    TransactionStyle, TypeNames, UpsertStyle,
};

fn placeholder(_: usize) -> String {
    String::from("?")
}

fn blob_literal(bytes: &[u8]) -> String {
    format!("x'{}'", hex::encode(bytes))
}

fn quote_lock_name(name: &str) -> String {
    format!("'{}'", name.replace('\\', "\\\\").replace('\'', "''"))
}

fn acquire_lock(name: &str) -> String {
    format!("select get_lock({}, -1)", quote_lock_name(name))
}

fn release_lock(name: &str) -> String {
    format!("select release_lock({})", quote_lock_name(name))
}

impl Dialect {
    /// MySQL: backtick identifiers, `?` placeholders, `1/0` booleans,
    /// `on duplicate key update` and non-transactional DDL.
    #[must_use]
    pub fn mysql() -> Self {
        Self {
            name: "mysql",
            identifier_quote: '`',
            placeholder,
            placeholder_start: 1,
            true_literal: "1",
            false_literal: "0",
            escape_backslash: true,
            blob_literal,
            default_values: "() values ()",
            now: "current_timestamp",
            supports_returning: false,
            supports_ilike: false,
            rewrite_raw_placeholders: false,
            // 2^64 - 1, the documented way to say "all remaining rows".
            offset_without_limit: Some("18446744073709551615"),
            upsert: UpsertStyle::OnDuplicateKey,
            types: TypeNames {
                smallint: "smallint",
                integer: "int",
                bigint: "bigint",
                real: "float",
                double: "double",
                decimal: "decimal",
                char: "char",
                varchar: "varchar",
                varchar_default_length: Some(255),
                text: "text",
                boolean: "tinyint(1)",
                date: "date",
                time: "time",
                time_tz: "time",
                timestamp: "datetime",
                timestamp_tz: "timestamp",
                json: "json",
                uuid: "char(36)",
                binary: "longblob",
                enum_style: EnumStyle::Inline,
            },
            ddl: DdlStyle {
                drop_primary_key: PrimaryKeyDrop::Direct,
                rename_table: TableRename::RenameTableTo,
                rename_index: IndexRename::AlterTable,
                supports_cascade: false,
                computed_columns: ComputedColumns::StoredOrVirtual,
                alter_column: AlterColumn::ModifyColumn,
                add_constraint: true,
                drop_foreign_key: ConstraintDrop::Keyword("foreign key"),
                drop_check: ConstraintDrop::Keyword("check"),
                drop_unique: ConstraintDrop::Keyword("index"),
                drop_index_on_table: true,
                index_if_not_exists: false,
                partial_indexes: false,
                autoincrement: Autoincrement::Keyword("auto_increment"),
                wrap_default_expressions: true,
            },
            transactions: TransactionStyle {
                begin: "start transaction",
                set_transaction: SetTransaction::BeforeBegin,
                savepoints: true,
                transactional_ddl: false,
            },
            migration_lock: Some(MigrationLock {
                acquire: acquire_lock,
                release: release_lock,
            }),
            catalog: TableCatalog {
                table: "information_schema.tables",
                name_column: "table_name",
                schema_column: Some("table_schema"),
                current_schema: Some("database()"),
                filter: None,
            },
        }
    }
}
