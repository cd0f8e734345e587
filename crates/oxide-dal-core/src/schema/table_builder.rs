//! Table builders.
//!
//! [`CreateTableBuilder`] uses the typestate pattern: `build()` is only
//! available once a name and at least one column are set. [`AlterTableBuilder`]
//! collects an ordered list of changes that compiles to one statement per
//! change.

use std::marker::PhantomData;

use super::column::{ColumnDefinition, ColumnType, DefaultValue};
use super::operation::{AlterTableOp, CreateTableOp, ForeignKey, TableChange, TableConstraint};
use crate::table::TableRef;
use crate::value::ToSqlValue;

// =============================================================================
// Typestate Markers
// =============================================================================

/// Marker: table has no name set.
#[derive(Debug, Clone, Copy)]
pub struct NoName;

/// Marker: table has a name set.
#[derive(Debug, Clone, Copy)]
pub struct HasName;

/// Marker: table has no columns.
#[derive(Debug, Clone, Copy)]
pub struct NoColumns;

/// Marker: table has at least one column.
#[derive(Debug, Clone, Copy)]
pub struct HasColumns;

// =============================================================================
// CreateTableBuilder
// =============================================================================

/// Type-safe CREATE TABLE builder.
///
/// ```rust
/// use oxide_dal_core::schema::{CreateTableBuilder, bigint, varchar, timestamp};
///
/// let op = CreateTableBuilder::new()
///     .name("users")
///     .column(bigint("id").primary_key().autoincrement().build())
///     .column(varchar("username", 255).not_null().unique().build())
///     .column(timestamp("created_at").not_null().default_now().build())
///     .build();
///
/// assert_eq!(op.table.name, "users");
/// assert_eq!(op.columns.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CreateTableBuilder<Name, Cols> {
    table: Option<TableRef>,
    columns: Vec<ColumnDefinition>,
    constraints: Vec<TableConstraint>,
    if_not_exists: bool,
    _state: PhantomData<(Name, Cols)>,
}

impl Default for CreateTableBuilder<NoName, NoColumns> {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateTableBuilder<NoName, NoColumns> {
    /// Creates a new `CreateTableBuilder`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: None,
            columns: Vec::new(),
            constraints: Vec::new(),
            if_not_exists: false,
            _state: PhantomData,
        }
    }
}

impl<Cols> CreateTableBuilder<NoName, Cols> {
    /// Sets the table name. `"schema.table"` is split into its parts.
    #[must_use]
    pub fn name(self, table: impl Into<TableRef>) -> CreateTableBuilder<HasName, Cols> {
        CreateTableBuilder {
            table: Some(table.into()),
            columns: self.columns,
            constraints: self.constraints,
            if_not_exists: self.if_not_exists,
            _state: PhantomData,
        }
    }
}

impl<Name> CreateTableBuilder<Name, NoColumns> {
    /// Adds the first column to the table.
    #[must_use]
    pub fn column(self, column: ColumnDefinition) -> CreateTableBuilder<Name, HasColumns> {
        CreateTableBuilder {
            table: self.table,
            columns: vec![column],
            constraints: self.constraints,
            if_not_exists: self.if_not_exists,
            _state: PhantomData,
        }
    }
}

impl<Name> CreateTableBuilder<Name, HasColumns> {
    /// Adds another column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }
}

impl<Name, Cols> CreateTableBuilder<Name, Cols> {
    /// Uses IF NOT EXISTS clause.
    #[must_use]
    pub const fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Adds a table-level constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds a composite primary key constraint.
    #[must_use]
    pub fn primary_key(self, columns: &[&str]) -> Self {
        self.constraint(TableConstraint::PrimaryKey {
            name: None,
            columns: to_strings(columns),
        })
    }

    /// Adds a unique constraint on multiple columns.
    #[must_use]
    pub fn unique_constraint(self, name: Option<&str>, columns: &[&str]) -> Self {
        self.constraint(TableConstraint::Unique {
            name: name.map(ToString::to_string),
            columns: to_strings(columns),
        })
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check_constraint(self, name: Option<&str>, expression: impl Into<String>) -> Self {
        self.constraint(TableConstraint::Check {
            name: name.map(ToString::to_string),
            expression: expression.into(),
        })
    }

    /// Adds a table-level foreign key.
    #[must_use]
    pub fn foreign_key(self, foreign_key: ForeignKey) -> Self {
        self.constraint(TableConstraint::ForeignKey(foreign_key))
    }
}

impl CreateTableBuilder<HasName, HasColumns> {
    /// Builds the CREATE TABLE operation.
    #[must_use]
    pub fn build(self) -> CreateTableOp {
        CreateTableOp {
            table: self.table.expect("Name was set"),
            columns: self.columns,
            constraints: self.constraints,
            if_not_exists: self.if_not_exists,
        }
    }
}

// =============================================================================
// AlterTableBuilder
// =============================================================================

/// Collects an ordered list of changes to one table.
///
/// ```rust
/// use oxide_dal_core::schema::{AlterTableBuilder, varchar};
///
/// let mut t = AlterTableBuilder::new("users");
/// t.add_column(varchar("email", 255).not_null().build())
///     .rename_column("name", "full_name")
///     .drop_column("legacy_flag");
/// let op = t.build();
/// assert_eq!(op.changes.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct AlterTableBuilder {
    table: TableRef,
    changes: Vec<TableChange>,
}

impl AlterTableBuilder {
    /// Starts an empty change list for `table`.
    #[must_use]
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            changes: Vec::new(),
        }
    }

    /// Appends an arbitrary change.
    pub fn change(&mut self, change: TableChange) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn add_column(&mut self, column: ColumnDefinition) -> &mut Self {
        self.change(TableChange::AddColumn(column))
    }

    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.change(TableChange::DropColumn { name: name.into() })
    }

    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.change(TableChange::RenameColumn {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn alter_column_type(
        &mut self,
        column: impl Into<String>,
        column_type: ColumnType,
    ) -> &mut Self {
        self.change(TableChange::AlterColumnType {
            column: column.into(),
            column_type,
        })
    }

    /// Makes a column NOT NULL. `column_type` is required on engines that
    /// restate the column definition.
    pub fn set_not_null(
        &mut self,
        column: impl Into<String>,
        column_type: Option<ColumnType>,
    ) -> &mut Self {
        self.change(TableChange::SetNotNull {
            column: column.into(),
            column_type,
        })
    }

    pub fn drop_not_null(
        &mut self,
        column: impl Into<String>,
        column_type: Option<ColumnType>,
    ) -> &mut Self {
        self.change(TableChange::DropNotNull {
            column: column.into(),
            column_type,
        })
    }

    /// Sets a literal default.
    pub fn set_default(&mut self, column: impl Into<String>, value: impl ToSqlValue) -> &mut Self {
        self.change(TableChange::SetDefault {
            column: column.into(),
            default: DefaultValue::Literal(value.to_sql_value()),
        })
    }

    pub fn set_default_now(&mut self, column: impl Into<String>) -> &mut Self {
        self.change(TableChange::SetDefault {
            column: column.into(),
            default: DefaultValue::Now,
        })
    }

    pub fn drop_default(&mut self, column: impl Into<String>) -> &mut Self {
        self.change(TableChange::DropDefault {
            column: column.into(),
        })
    }

    pub fn add_primary_key(&mut self, name: Option<&str>, columns: &[&str]) -> &mut Self {
        self.change(TableChange::AddPrimaryKey {
            name: name.map(ToString::to_string),
            columns: to_strings(columns),
        })
    }

    pub fn drop_primary_key(&mut self, name: Option<&str>) -> &mut Self {
        self.change(TableChange::DropPrimaryKey {
            name: name.map(ToString::to_string),
        })
    }

    pub fn add_unique(&mut self, name: Option<&str>, columns: &[&str]) -> &mut Self {
        self.change(TableChange::AddUnique {
            name: name.map(ToString::to_string),
            columns: to_strings(columns),
        })
    }

    pub fn drop_unique(&mut self, name: impl Into<String>) -> &mut Self {
        self.change(TableChange::DropUnique { name: name.into() })
    }

    pub fn add_check(&mut self, name: Option<&str>, expression: impl Into<String>) -> &mut Self {
        self.change(TableChange::AddCheck {
            name: name.map(ToString::to_string),
            expression: expression.into(),
        })
    }

    pub fn drop_check(&mut self, name: impl Into<String>) -> &mut Self {
        self.change(TableChange::DropCheck { name: name.into() })
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> &mut Self {
        self.change(TableChange::AddForeignKey(foreign_key))
    }

    pub fn drop_foreign_key(&mut self, name: impl Into<String>) -> &mut Self {
        self.change(TableChange::DropForeignKey { name: name.into() })
    }

    /// Returns whether no change was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Emits the ALTER TABLE operation.
    #[must_use]
    pub fn build(self) -> AlterTableOp {
        AlterTableOp {
            table: self.table,
            changes: self.changes,
        }
    }
}

fn to_strings(columns: &[&str]) -> Vec<String> {
    columns.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::{bigint, integer, varchar};

    #[test]
    fn test_create_table_builder() {
        let op = CreateTableBuilder::new()
            .name("users")
            .column(bigint("id").primary_key().autoincrement().build())
            .column(varchar("username", 255).not_null().unique().build())
            .if_not_exists()
            .build();

        assert_eq!(op.table.name, "users");
        assert_eq!(op.columns.len(), 2);
        assert!(op.if_not_exists);
    }

    #[test]
    fn test_create_table_with_constraints() {
        let op = CreateTableBuilder::new()
            .name("memberships")
            .column(integer("user_id").not_null().build())
            .column(integer("group_id").not_null().build())
            .primary_key(&["user_id", "group_id"])
            .foreign_key(ForeignKey::new(&["user_id"], "users", &["id"]).named("fk_user"))
            .build();

        assert_eq!(op.constraints.len(), 2);
        assert!(matches!(
            op.constraints[0],
            TableConstraint::PrimaryKey { ref columns, .. } if columns.len() == 2
        ));
    }

    #[test]
    fn test_alter_table_builder_keeps_order() {
        let mut t = AlterTableBuilder::new("users");
        assert!(t.is_empty());
        t.drop_default("status")
            .set_default("status", "active")
            .drop_column("legacy");
        let op = t.build();
        assert!(matches!(op.changes[0], TableChange::DropDefault { .. }));
        assert!(matches!(op.changes[1], TableChange::SetDefault { .. }));
        assert!(matches!(op.changes[2], TableChange::DropColumn { .. }));
    }
}
