//! Dialect descriptors.
//!
//! A [`Dialect`] is a plain value describing how one engine family spells
//! things: identifier quoting, literals, placeholders, upserts, DDL variants,
//! transactions and advisory locks. The compiler reads these fields and never
//! looks at [`Dialect::name`], so supporting a new engine means building a new
//! value (or tweaking an existing one field by field):
//!
//! ```rust
//! use oxide_dal_core::Dialect;
//!
//! let mut legacy = Dialect::sqlite();
//! legacy.supports_returning = false;
//! assert_eq!(legacy.quote_identifier("user"), "\"user\"");
//! ```

mod mysql;
mod postgres;
mod sqlite;

use crate::schema::ColumnType;
use crate::table::{ColumnPath, TableRef};
use crate::value::SqlValue;

/// How an engine resolves insert conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `on conflict (target) do update set ... | do nothing`
    OnConflict,
    /// `on duplicate key update ...`, conflict target is implicit.
    OnDuplicateKey,
}

/// How enum columns are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStyle {
    /// Text column plus `check ("col" in (...))`.
    CheckConstraint,
    /// Native `enum('a', 'b')` type.
    Inline,
}

/// Engine type names used when rendering [`ColumnType`].
#[derive(Debug, Clone, Copy)]
pub struct TypeNames {
    pub smallint: &'static str,
    pub integer: &'static str,
    pub bigint: &'static str,
    pub real: &'static str,
    pub double: &'static str,
    pub decimal: &'static str,
    pub char: &'static str,
    pub varchar: &'static str,
    /// Length used for `varchar` without an explicit one, on engines that
    /// require a length.
    pub varchar_default_length: Option<u32>,
    pub text: &'static str,
    pub boolean: &'static str,
    pub date: &'static str,
    pub time: &'static str,
    pub time_tz: &'static str,
    pub timestamp: &'static str,
    pub timestamp_tz: &'static str,
    pub json: &'static str,
    pub uuid: &'static str,
    pub binary: &'static str,
    pub enum_style: EnumStyle,
}

/// How a primary key is dropped.
#[derive(Debug, Clone, Copy)]
pub enum PrimaryKeyDrop {
    /// `alter table t drop constraint "name"`.
    ///
    /// `fallback` derives a conventional name from the table name when the
    /// operation carries none. Without a fallback, an unnamed drop is a
    /// compile error.
    ConstraintName {
        fallback: Option<fn(&str) -> String>,
    },
    /// `alter table t drop primary key`.
    Direct,
    /// The engine can't drop a primary key after creation.
    Unsupported,
}

/// How tables are renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRename {
    /// `alter table a rename to b`
    AlterTableRenameTo,
    /// `rename table a to b`
    RenameTableTo,
}

/// How indexes are renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRename {
    /// `alter index a rename to b`
    AlterIndex,
    /// `alter table t rename index a to b`
    AlterTable,
    /// Not supported.
    Unsupported,
}

/// Which kinds of generated columns the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedColumns {
    /// Only `stored` generated columns.
    StoredOnly,
    /// Both `stored` and `virtual`.
    StoredOrVirtual,
}

/// How column type, nullability and default changes are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterColumn {
    /// `alter table t alter column c type ...` / `set not null` / `set default ...`
    AlterColumn,
    /// `alter table t modify column c <type>` plus `alter column c set default ...`
    ModifyColumn,
    /// Columns can't be altered in place.
    Unsupported,
}

/// How a named constraint of some kind is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintDrop {
    /// `alter table t drop constraint "name"`
    DropConstraint,
    /// `alter table t drop <keyword> "name"`, e.g. `foreign key`, `check`, `index`.
    Keyword(&'static str),
    /// Not supported.
    Unsupported,
}

/// How auto-incrementing primary keys are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Autoincrement {
    /// Replace the integer type with a serial type (`serial`, `bigserial`).
    SerialType,
    /// Append a keyword after the column definition.
    Keyword(&'static str),
    /// `integer primary key autoincrement` rowid alias.
    RowidAlias,
}

/// DDL spelling rules.
#[derive(Debug, Clone, Copy)]
pub struct DdlStyle {
    pub drop_primary_key: PrimaryKeyDrop,
    pub rename_table: TableRename,
    pub rename_index: IndexRename,
    /// `drop table ... cascade`
    pub supports_cascade: bool,
    pub computed_columns: ComputedColumns,
    pub alter_column: AlterColumn,
    /// `alter table ... add constraint ...` after creation.
    pub add_constraint: bool,
    pub drop_foreign_key: ConstraintDrop,
    pub drop_check: ConstraintDrop,
    pub drop_unique: ConstraintDrop,
    /// `drop index i on t` instead of `drop index i`.
    pub drop_index_on_table: bool,
    /// `create index if not exists`
    pub index_if_not_exists: bool,
    /// `create index ... where ...`
    pub partial_indexes: bool,
    pub autoincrement: Autoincrement,
    /// Raw default expressions must be parenthesized.
    pub wrap_default_expressions: bool,
}

/// Where `set transaction` goes relative to `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetTransaction {
    /// Issued right after `begin`.
    AfterBegin,
    /// Issued right before `begin`, applying to the next transaction.
    BeforeBegin,
    /// Isolation and access mode can't be set per transaction.
    Unsupported,
}

/// Transaction statements.
#[derive(Debug, Clone, Copy)]
pub struct TransactionStyle {
    pub begin: &'static str,
    pub set_transaction: SetTransaction,
    pub savepoints: bool,
    /// DDL statements participate in transactions.
    pub transactional_ddl: bool,
}

/// Advisory lock statements, parameterized by lock name.
#[derive(Debug, Clone, Copy)]
pub struct MigrationLock {
    pub acquire: fn(&str) -> String,
    pub release: fn(&str) -> String,
}

/// Catalog table listing existing tables.
#[derive(Debug, Clone, Copy)]
pub struct TableCatalog {
    pub table: &'static str,
    pub name_column: &'static str,
    /// Column holding the schema. Engines without one read
    /// `<schema>.<table>` instead.
    pub schema_column: Option<&'static str>,
    /// Expression for the current schema, compared against `schema_column`
    /// when the table is unqualified.
    pub current_schema: Option<&'static str>,
    /// Condition always applied, e.g. restricting rows to tables.
    pub filter: Option<&'static str>,
}

/// A declarative description of one engine family.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    /// Display name. Never used for branching.
    pub name: &'static str,
    pub identifier_quote: char,
    /// Renders the placeholder with the given 1-based position (after
    /// applying `placeholder_start`).
    pub placeholder: fn(usize) -> String,
    pub placeholder_start: usize,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    /// Backslashes in string literals must be doubled.
    pub escape_backslash: bool,
    pub blob_literal: fn(&[u8]) -> String,
    /// Tail of an insert that supplies no columns, after the table name.
    pub default_values: &'static str,
    pub now: &'static str,
    pub supports_returning: bool,
    pub supports_ilike: bool,
    /// Rewrite generic `?` placeholders in raw SQL into native ones.
    pub rewrite_raw_placeholders: bool,
    /// Limit text used when an offset is given without a limit. `None` means
    /// an offset may stand alone.
    pub offset_without_limit: Option<&'static str>,
    pub upsert: UpsertStyle,
    pub types: TypeNames,
    pub ddl: DdlStyle,
    pub transactions: TransactionStyle,
    pub migration_lock: Option<MigrationLock>,
    pub catalog: TableCatalog,
}

impl Dialect {
    /// Quotes an identifier, doubling any embedded quote character.
    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        let q = self.identifier_quote;
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(q);
        for ch in ident.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
        out
    }

    /// Quotes a table reference without its alias.
    #[must_use]
    pub fn quote_table(&self, table: &TableRef) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            None => self.quote_identifier(&table.name),
        }
    }

    /// Quotes a table reference for a FROM or JOIN clause, alias included.
    #[must_use]
    pub fn quote_table_source(&self, table: &TableRef) -> String {
        let mut out = self.quote_table(table);
        if let Some(alias) = &table.alias {
            out.push_str(" as ");
            out.push_str(&self.quote_identifier(alias));
        }
        out
    }

    /// Quotes a column path. `*` stays bare.
    #[must_use]
    pub fn quote_column_path(&self, column: &ColumnPath) -> String {
        let mut out = String::new();
        if let Some(qualifier) = &column.qualifier {
            for part in qualifier.split('.') {
                out.push_str(&self.quote_identifier(part));
                out.push('.');
            }
        }
        if column.name == "*" {
            out.push('*');
        } else {
            out.push_str(&self.quote_identifier(&column.name));
        }
        out
    }

    /// Quotes a string literal.
    #[must_use]
    pub fn quote_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' if self.escape_backslash => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    /// Renders a value as an inline literal.
    ///
    /// Only used where engines don't accept parameters, such as column
    /// defaults and enum checks.
    #[must_use]
    pub fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => String::from("null"),
            SqlValue::Bool(true) => self.true_literal.to_string(),
            SqlValue::Bool(false) => self.false_literal.to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => self.quote_string(s),
            SqlValue::Blob(bytes) => (self.blob_literal)(bytes),
        }
    }

    /// Renders the placeholder for the `index`-th bound value (0-based).
    #[must_use]
    pub fn placeholder_at(&self, index: usize) -> String {
        (self.placeholder)(self.placeholder_start + index)
    }

    /// Renders a column type.
    #[must_use]
    pub fn render_type(&self, ty: &ColumnType) -> String {
        let t = &self.types;
        match ty {
            ColumnType::SmallInt => t.smallint.to_string(),
            ColumnType::Integer => t.integer.to_string(),
            ColumnType::BigInt => t.bigint.to_string(),
            ColumnType::Real => t.real.to_string(),
            ColumnType::Double => t.double.to_string(),
            ColumnType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("{}({p}, {s})", t.decimal),
                (Some(p), None) => format!("{}({p})", t.decimal),
                _ => t.decimal.to_string(),
            },
            ColumnType::Char(len) => format!("{}({len})", t.char),
            ColumnType::Varchar(len) => match len.or(t.varchar_default_length) {
                Some(n) => format!("{}({n})", t.varchar),
                None => t.varchar.to_string(),
            },
            ColumnType::Text => t.text.to_string(),
            ColumnType::Boolean => t.boolean.to_string(),
            ColumnType::Date => t.date.to_string(),
            ColumnType::Time { with_tz: false } => t.time.to_string(),
            ColumnType::Time { with_tz: true } => t.time_tz.to_string(),
            ColumnType::Timestamp { with_tz: false } => t.timestamp.to_string(),
            ColumnType::Timestamp { with_tz: true } => t.timestamp_tz.to_string(),
            ColumnType::Json => t.json.to_string(),
            ColumnType::Uuid => t.uuid.to_string(),
            ColumnType::Binary => t.binary.to_string(),
            ColumnType::Enum(values) => match t.enum_style {
                EnumStyle::CheckConstraint => t.text.to_string(),
                EnumStyle::Inline => {
                    let mut out = String::from("enum(");
                    for (i, v) in values.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.quote_string(v));
                    }
                    out.push(')');
                    out
                }
            },
            ColumnType::Custom(name) => name.clone(),
        }
    }
}
