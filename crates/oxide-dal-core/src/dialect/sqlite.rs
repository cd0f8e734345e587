//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: columns can be added, dropped and
//! renamed, but not retyped, and constraints can't be added or dropped after
//! creation. Those operations fail to compile rather than silently rebuilding
//! the table.

use super::{
    AlterColumn, Autoincrement, ComputedColumns, ConstraintDrop, DdlStyle, Dialect, EnumStyle,
    IndexRename, PrimaryKeyDrop, SetTransaction, TableCatalog, TableRename, TransactionStyle,
    TypeNames, UpsertStyle,
};

fn placeholder(_: usize) -> String {
    String::from("?")
}

fn blob_literal(bytes: &[u8]) -> String {
    format!("x'{}'", hex::encode(bytes))
}

impl Dialect {
    /// SQLite 3.35+: `?` placeholders, `returning`, `on conflict`, `1/0`
    /// booleans and transactional DDL.
    #[must_use]
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite",
            identifier_quote: '"',
            placeholder,
            placeholder_start: 1,
            true_literal: "1",
            false_literal: "0",
            escape_backslash: false,
            blob_literal,
            default_values: "default values",
            now: "current_timestamp",
            supports_returning: true,
            supports_ilike: false,
            rewrite_raw_placeholders: false,
            offset_without_limit: Some("-1"),
            upsert: UpsertStyle::OnConflict,
            types: TypeNames {
                smallint: "integer",
                integer: "integer",
                bigint: "integer",
                real: "real",
                double: "real",
                decimal: "numeric",
                char: "char",
                varchar: "varchar",
                varchar_default_length: None,
                text: "text",
                boolean: "boolean",
                date: "date",
                time: "time",
                time_tz: "time",
                timestamp: "datetime",
                timestamp_tz: "datetime",
                json: "text",
                uuid: "text",
                binary: "blob",
                enum_style: EnumStyle::CheckConstraint,
            },
            ddl: DdlStyle {
                drop_primary_key: PrimaryKeyDrop::Unsupported,
                rename_table: TableRename::AlterTableRenameTo,
                rename_index: IndexRename::Unsupported,
                supports_cascade: false,
                computed_columns: ComputedColumns::StoredOrVirtual,
                alter_column: AlterColumn::Unsupported,
                add_constraint: false,
                drop_foreign_key: ConstraintDrop::Unsupported,
                drop_check: ConstraintDrop::Unsupported,
                drop_unique: ConstraintDrop::Unsupported,
                drop_index_on_table: false,
                index_if_not_exists: true,
                partial_indexes: true,
                autoincrement: Autoincrement::RowidAlias,
                wrap_default_expressions: true,
            },
            transactions: TransactionStyle {
                begin: "begin",
                set_transaction: SetTransaction::Unsupported,
                savepoints: true,
                transactional_ddl: true,
            },
            migration_lock: None,
            catalog: TableCatalog {
                table: "sqlite_master",
                name_column: "name",
                schema_column: None,
                current_schema: None,
                filter: Some("type = 'table'"),
            },
        }
    }
}
