//! Schema migration operations.
//!
//! Defines every data-definition operation the compiler knows: table and
//! index lifecycle, ordered `alter table` change lists, constraints and raw
//! SQL.

use serde::{Deserialize, Serialize};

use super::column::{ColumnDefinition, ColumnType, DefaultValue, ForeignKeyAction};
use crate::table::TableRef;

/// All possible migration operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOp {
    CreateTable(CreateTableOp),
    /// Ordered list of changes to one table; one statement per change.
    AlterTable(AlterTableOp),
    RenameTable(RenameTableOp),
    DropTable(DropTableOp),
    CreateIndex(CreateIndexOp),
    DropIndex(DropIndexOp),
    RenameIndex(RenameIndexOp),
    AddForeignKey(AddForeignKeyOp),
    DropForeignKey(DropConstraintOp),
    AddCheck(AddCheckOp),
    DropCheck(DropConstraintOp),
    Raw(RawSqlOp),
}

impl MigrationOp {
    /// Creates a drop table operation.
    #[must_use]
    pub fn drop_table(table: impl Into<TableRef>) -> Self {
        Self::DropTable(DropTableOp {
            table: table.into(),
            if_exists: false,
            cascade: false,
        })
    }

    /// Creates a drop table if exists operation.
    #[must_use]
    pub fn drop_table_if_exists(table: impl Into<TableRef>) -> Self {
        Self::DropTable(DropTableOp {
            table: table.into(),
            if_exists: true,
            cascade: false,
        })
    }

    /// Creates a rename table operation.
    #[must_use]
    pub fn rename_table(from: impl Into<TableRef>, to: impl Into<String>) -> Self {
        Self::RenameTable(RenameTableOp {
            table: from.into(),
            new_name: to.into(),
        })
    }

    /// Creates an index on `columns`.
    #[must_use]
    pub fn create_index(
        name: impl Into<String>,
        table: impl Into<TableRef>,
        columns: &[&str],
    ) -> CreateIndexOp {
        CreateIndexOp {
            name: name.into(),
            table: table.into(),
            columns: columns.iter().map(ToString::to_string).collect(),
            unique: false,
            if_not_exists: false,
            condition: None,
        }
    }

    /// Creates a drop index operation.
    #[must_use]
    pub fn drop_index(name: impl Into<String>, table: impl Into<TableRef>) -> Self {
        Self::DropIndex(DropIndexOp {
            name: name.into(),
            table: table.into(),
            if_exists: false,
        })
    }

    /// Creates a rename index operation.
    #[must_use]
    pub fn rename_index(
        table: impl Into<TableRef>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameIndex(RenameIndexOp {
            table: table.into(),
            old_name: from.into(),
            new_name: to.into(),
        })
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn add_foreign_key(table: impl Into<TableRef>, foreign_key: ForeignKey) -> Self {
        Self::AddForeignKey(AddForeignKeyOp {
            table: table.into(),
            foreign_key,
        })
    }

    /// Drops a named foreign key constraint.
    #[must_use]
    pub fn drop_foreign_key(table: impl Into<TableRef>, name: impl Into<String>) -> Self {
        Self::DropForeignKey(DropConstraintOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn add_check(
        table: impl Into<TableRef>,
        name: Option<&str>,
        expression: impl Into<String>,
    ) -> Self {
        Self::AddCheck(AddCheckOp {
            table: table.into(),
            name: name.map(ToString::to_string),
            expression: expression.into(),
        })
    }

    /// Drops a named check constraint.
    #[must_use]
    pub fn drop_check(table: impl Into<TableRef>, name: impl Into<String>) -> Self {
        Self::DropCheck(DropConstraintOp {
            table: table.into(),
            name: name.into(),
        })
    }

    /// Runs raw SQL.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(RawSqlOp {
            sql: sql.into(),
            reverse_sql: None,
        })
    }

    /// Runs raw SQL with a known inverse.
    #[must_use]
    pub fn raw_reversible(sql: impl Into<String>, reverse_sql: impl Into<String>) -> Self {
        Self::Raw(RawSqlOp {
            sql: sql.into(),
            reverse_sql: Some(reverse_sql.into()),
        })
    }

    /// Attempts to generate the reverse operation.
    ///
    /// Returns `None` if the operation is not reversible.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        match self {
            Self::CreateTable(op) if op.if_not_exists => {
                Some(Self::drop_table_if_exists(op.table.clone()))
            }
            Self::CreateTable(op) => Some(Self::drop_table(op.table.clone())),
            Self::AlterTable(op) => op.reverse().map(Self::AlterTable),
            Self::RenameTable(op) => {
                let renamed = TableRef {
                    schema: op.table.schema.clone(),
                    name: op.new_name.clone(),
                    alias: None,
                };
                Some(Self::rename_table(renamed, op.table.name.clone()))
            }
            Self::CreateIndex(op) => Some(Self::drop_index(op.name.clone(), op.table.clone())),
            Self::RenameIndex(op) => Some(Self::rename_index(
                op.table.clone(),
                op.new_name.clone(),
                op.old_name.clone(),
            )),
            Self::AddForeignKey(op) => op
                .foreign_key
                .name
                .as_ref()
                .map(|name| Self::drop_foreign_key(op.table.clone(), name.clone())),
            Self::AddCheck(op) => op
                .name
                .as_ref()
                .map(|name| Self::drop_check(op.table.clone(), name.clone())),
            Self::Raw(op) => op.reverse_sql.as_ref().map(|sql| Self::raw(sql.clone())),
            // Dropping loses the definition.
            Self::DropTable(_) | Self::DropIndex(_) | Self::DropForeignKey(_) | Self::DropCheck(_) => {
                None
            }
        }
    }

    /// Returns whether this operation is reversible.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.reverse().is_some()
    }
}

/// Create table operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableOp {
    pub table: TableRef,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<TableConstraint>,
    pub if_not_exists: bool,
}

impl From<CreateTableOp> for MigrationOp {
    fn from(op: CreateTableOp) -> Self {
        Self::CreateTable(op)
    }
}

/// Alter table operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTableOp {
    pub table: TableRef,
    pub changes: Vec<TableChange>,
}

impl AlterTableOp {
    /// Reverses every change, in reverse order. `None` if any change is
    /// irreversible.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        let changes = self
            .changes
            .iter()
            .rev()
            .map(TableChange::reverse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            table: self.table.clone(),
            changes,
        })
    }
}

impl From<AlterTableOp> for MigrationOp {
    fn from(op: AlterTableOp) -> Self {
        Self::AlterTable(op)
    }
}

/// Rename table operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTableOp {
    pub table: TableRef,
    /// New unqualified name; the schema is kept.
    pub new_name: String,
}

/// Drop table operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableOp {
    pub table: TableRef,
    pub if_exists: bool,
    pub cascade: bool,
}

/// Create index operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndexOp {
    pub name: String,
    pub table: TableRef,
    pub columns: Vec<String>,
    pub unique: bool,
    pub if_not_exists: bool,
    /// Partial index condition (raw SQL).
    pub condition: Option<String>,
}

impl CreateIndexOp {
    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds `if not exists`.
    #[must_use]
    pub const fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Restricts the index to rows matching `condition`.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

impl From<CreateIndexOp> for MigrationOp {
    fn from(op: CreateIndexOp) -> Self {
        Self::CreateIndex(op)
    }
}

/// Drop index operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndexOp {
    pub name: String,
    /// Owning table, required by engines that scope indexes per table.
    pub table: TableRef,
    pub if_exists: bool,
}

/// Rename index operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameIndexOp {
    pub table: TableRef,
    pub old_name: String,
    pub new_name: String,
}

/// Add foreign key operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddForeignKeyOp {
    pub table: TableRef,
    pub foreign_key: ForeignKey,
}

/// Add check constraint operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCheckOp {
    pub table: TableRef,
    pub name: Option<String>,
    pub expression: String,
}

/// Drops a named constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropConstraintOp {
    pub table: TableRef,
    pub name: String,
}

/// Raw SQL operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSqlOp {
    pub sql: String,
    pub reverse_sql: Option<String>,
}

/// A table-level foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references_table: TableRef,
    pub references_columns: Vec<String>,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKey {
    /// `columns` referencing `table(references)`.
    #[must_use]
    pub fn new(columns: &[&str], table: impl Into<TableRef>, references: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(ToString::to_string).collect(),
            references_table: table.into(),
            references_columns: references.iter().map(ToString::to_string).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Names the constraint.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// Table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    Check {
        name: Option<String>,
        expression: String,
    },
    ForeignKey(ForeignKey),
}

/// One discrete change inside an `alter table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableChange {
    AddColumn(ColumnDefinition),
    DropColumn {
        name: String,
    },
    RenameColumn {
        from: String,
        to: String,
    },
    AlterColumnType {
        column: String,
        column_type: ColumnType,
    },
    /// Engines that restate the whole column to change nullability need the
    /// column type.
    SetNotNull {
        column: String,
        column_type: Option<ColumnType>,
    },
    DropNotNull {
        column: String,
        column_type: Option<ColumnType>,
    },
    SetDefault {
        column: String,
        default: DefaultValue,
    },
    DropDefault {
        column: String,
    },
    AddPrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    /// Without a name the dialect's conventional name is used, if it has one.
    DropPrimaryKey {
        name: Option<String>,
    },
    AddUnique {
        name: Option<String>,
        columns: Vec<String>,
    },
    DropUnique {
        name: String,
    },
    AddCheck {
        name: Option<String>,
        expression: String,
    },
    DropCheck {
        name: String,
    },
    AddForeignKey(ForeignKey),
    DropForeignKey {
        name: String,
    },
}

impl TableChange {
    /// Attempts to generate the reverse change.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        match self {
            Self::AddColumn(col) => Some(Self::DropColumn {
                name: col.name.clone(),
            }),
            Self::RenameColumn { from, to } => Some(Self::RenameColumn {
                from: to.clone(),
                to: from.clone(),
            }),
            Self::SetNotNull {
                column,
                column_type,
            } => Some(Self::DropNotNull {
                column: column.clone(),
                column_type: column_type.clone(),
            }),
            Self::DropNotNull {
                column,
                column_type,
            } => Some(Self::SetNotNull {
                column: column.clone(),
                column_type: column_type.clone(),
            }),
            Self::AddPrimaryKey { name, .. } => {
                Some(Self::DropPrimaryKey { name: name.clone() })
            }
            Self::AddUnique {
                name: Some(name), ..
            } => Some(Self::DropUnique { name: name.clone() }),
            Self::AddCheck {
                name: Some(name), ..
            } => Some(Self::DropCheck { name: name.clone() }),
            Self::AddForeignKey(ForeignKey {
                name: Some(name), ..
            }) => Some(Self::DropForeignKey { name: name.clone() }),
            _ => None,
        }
    }
}
