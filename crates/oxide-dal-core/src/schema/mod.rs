//! Schema definitions for migrations.
//!
//! ```rust
//! use oxide_dal_core::schema::{CreateTableBuilder, MigrationOp, bigint, varchar, timestamp};
//!
//! let up: Vec<MigrationOp> = vec![
//!     CreateTableBuilder::new()
//!         .name("users")
//!         .column(bigint("id").primary_key().autoincrement().build())
//!         .column(varchar("username", 255).not_null().unique().build())
//!         .column(timestamp("created_at").not_null().default_now().build())
//!         .build()
//!         .into(),
//! ];
//! let down: Vec<MigrationOp> = up.iter().rev().filter_map(MigrationOp::reverse).collect();
//! assert_eq!(down, vec![MigrationOp::drop_table("users")]);
//! ```

mod column;
mod operation;
mod table_builder;

pub use column::{
    ColumnBuilder, ColumnDefinition, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyRef,
    Generated, bigint, binary, boolean, char, date, decimal, double, enumeration, integer, json,
    real, smallint, text, timestamp, timestamp_tz, uuid, varchar,
};
pub use operation::{
    AddCheckOp, AddForeignKeyOp, AlterTableOp, CreateIndexOp, CreateTableOp, DropConstraintOp,
    DropIndexOp, DropTableOp, ForeignKey, MigrationOp, RawSqlOp, RenameIndexOp, RenameTableOp,
    TableChange, TableConstraint,
};
pub use table_builder::{AlterTableBuilder, CreateTableBuilder, HasColumns, HasName, NoColumns, NoName};
