//! Data definition compilation.
//!
//! Every operation compiles to one or more standalone statements. `alter
//! table` emits one statement per change so that engines with partial ALTER
//! support fail on the exact change they can't express.

use crate::dialect::{
    AlterColumn, Autoincrement, ComputedColumns, ConstraintDrop, Dialect, EnumStyle, IndexRename,
    PrimaryKeyDrop, TableRename,
};
use crate::error::{CompileError, Result};
use crate::schema::{
    AlterTableOp, ColumnDefinition, ColumnType, CreateIndexOp, CreateTableOp, DefaultValue,
    DropIndexOp, DropTableOp, ForeignKey, ForeignKeyRef, MigrationOp, RenameIndexOp,
    RenameTableOp, TableChange, TableConstraint,
};
use crate::table::TableRef;

use super::writer::SqlWriter;
use super::SqlStatement;

pub(crate) fn compile_op(op: &MigrationOp, dialect: &Dialect) -> Result<Vec<SqlStatement>> {
    let single = |text: String| -> Result<Vec<SqlStatement>> { Ok(vec![SqlStatement::text(text)]) };
    match op {
        MigrationOp::CreateTable(op) => single(create_table(op, dialect)?),
        MigrationOp::AlterTable(op) => alter_table(op, dialect),
        MigrationOp::RenameTable(op) => single(rename_table(op, dialect)),
        MigrationOp::DropTable(op) => single(drop_table(op, dialect)?),
        MigrationOp::CreateIndex(op) => single(create_index(op, dialect)?),
        MigrationOp::DropIndex(op) => single(drop_index(op, dialect)?),
        MigrationOp::RenameIndex(op) => single(rename_index(op, dialect)?),
        MigrationOp::AddForeignKey(op) => {
            let change = TableChange::AddForeignKey(op.foreign_key.clone());
            single(alter_change(&op.table, &change, dialect)?)
        }
        MigrationOp::DropForeignKey(op) => {
            let change = TableChange::DropForeignKey {
                name: op.name.clone(),
            };
            single(alter_change(&op.table, &change, dialect)?)
        }
        MigrationOp::AddCheck(op) => {
            let change = TableChange::AddCheck {
                name: op.name.clone(),
                expression: op.expression.clone(),
            };
            single(alter_change(&op.table, &change, dialect)?)
        }
        MigrationOp::DropCheck(op) => {
            let change = TableChange::DropCheck {
                name: op.name.clone(),
            };
            single(alter_change(&op.table, &change, dialect)?)
        }
        MigrationOp::Raw(op) => single(op.sql.clone()),
    }
}

fn create_table(op: &CreateTableOp, dialect: &Dialect) -> Result<String> {
    if op.columns.is_empty() {
        return Err(CompileError::NoColumns(op.table.name.clone()));
    }

    // More than one primary key column can't be declared inline.
    let inline_pk: Vec<&str> = op
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    let composite = inline_pk.len() > 1;

    let mut parts = Vec::with_capacity(op.columns.len() + op.constraints.len() + 1);
    for column in &op.columns {
        parts.push(column_definition(column, !composite, dialect)?);
    }
    if composite {
        parts.push(format!("primary key ({})", quote_list(dialect, &inline_pk)));
    }
    for constraint in &op.constraints {
        parts.push(table_constraint(constraint, dialect));
    }

    let mut w = SqlWriter::new(dialect);
    w.push("create table ");
    if op.if_not_exists {
        w.push("if not exists ");
    }
    w.table(&op.table).push(" (").push(&parts.join(", ")).push(")");
    Ok(w.finish().text)
}

fn drop_table(op: &DropTableOp, dialect: &Dialect) -> Result<String> {
    let mut sql = String::from("drop table ");
    if op.if_exists {
        sql.push_str("if exists ");
    }
    sql.push_str(&dialect.quote_table(&op.table));
    if op.cascade {
        if !dialect.ddl.supports_cascade {
            return Err(CompileError::unsupported("drop table ... cascade", dialect.name));
        }
        sql.push_str(" cascade");
    }
    Ok(sql)
}

fn rename_table(op: &RenameTableOp, dialect: &Dialect) -> String {
    let target = TableRef {
        schema: op.table.schema.clone(),
        name: op.new_name.clone(),
        alias: None,
    };
    match dialect.ddl.rename_table {
        TableRename::AlterTableRenameTo => format!(
            "alter table {} rename to {}",
            dialect.quote_table(&op.table),
            dialect.quote_identifier(&op.new_name)
        ),
        TableRename::RenameTableTo => format!(
            "rename table {} to {}",
            dialect.quote_table(&op.table),
            dialect.quote_table(&target)
        ),
    }
}

fn create_index(op: &CreateIndexOp, dialect: &Dialect) -> Result<String> {
    let mut sql = String::from("create ");
    if op.unique {
        sql.push_str("unique ");
    }
    sql.push_str("index ");
    if op.if_not_exists {
        if !dialect.ddl.index_if_not_exists {
            return Err(CompileError::unsupported(
                "create index if not exists",
                dialect.name,
            ));
        }
        sql.push_str("if not exists ");
    }
    sql.push_str(&dialect.quote_identifier(&op.name));
    sql.push_str(" on ");
    sql.push_str(&dialect.quote_table(&op.table));
    sql.push_str(" (");
    sql.push_str(&quote_list(dialect, &op.columns));
    sql.push(')');
    if let Some(condition) = &op.condition {
        if !dialect.ddl.partial_indexes {
            return Err(CompileError::unsupported("partial indexes", dialect.name));
        }
        sql.push_str(" where ");
        sql.push_str(condition);
    }
    Ok(sql)
}

/// Index names live in the table's schema.
fn qualified_index(dialect: &Dialect, table: &TableRef, index: &str) -> String {
    dialect.quote_table(&TableRef {
        schema: table.schema.clone(),
        name: index.to_string(),
        alias: None,
    })
}

fn drop_index(op: &DropIndexOp, dialect: &Dialect) -> Result<String> {
    let mut sql = String::from("drop index ");
    if op.if_exists {
        if !dialect.ddl.index_if_not_exists {
            return Err(CompileError::unsupported("drop index if exists", dialect.name));
        }
        sql.push_str("if exists ");
    }
    if dialect.ddl.drop_index_on_table {
        sql.push_str(&dialect.quote_identifier(&op.name));
        sql.push_str(" on ");
        sql.push_str(&dialect.quote_table(&op.table));
    } else {
        sql.push_str(&qualified_index(dialect, &op.table, &op.name));
    }
    Ok(sql)
}

fn rename_index(op: &RenameIndexOp, dialect: &Dialect) -> Result<String> {
    match dialect.ddl.rename_index {
        IndexRename::AlterIndex => Ok(format!(
            "alter index {} rename to {}",
            qualified_index(dialect, &op.table, &op.old_name),
            dialect.quote_identifier(&op.new_name)
        )),
        IndexRename::AlterTable => Ok(format!(
            "alter table {} rename index {} to {}",
            dialect.quote_table(&op.table),
            dialect.quote_identifier(&op.old_name),
            dialect.quote_identifier(&op.new_name)
        )),
        IndexRename::Unsupported => Err(CompileError::unsupported("rename index", dialect.name)),
    }
}

fn alter_table(op: &AlterTableOp, dialect: &Dialect) -> Result<Vec<SqlStatement>> {
    op.changes
        .iter()
        .map(|change| alter_change(&op.table, change, dialect).map(SqlStatement::text))
        .collect()
}

#[allow(clippy::too_many_lines)]
fn alter_change(table: &TableRef, change: &TableChange, dialect: &Dialect) -> Result<String> {
    let ddl = &dialect.ddl;
    let q = |ident: &str| dialect.quote_identifier(ident);
    let unsupported = |feature: &str| CompileError::unsupported(feature, dialect.name);
    let require_add_constraint = || {
        if ddl.add_constraint {
            Ok(())
        } else {
            Err(unsupported("adding constraints to an existing table"))
        }
    };

    let tail = match change {
        TableChange::AddColumn(column) => {
            format!("add column {}", column_definition(column, true, dialect)?)
        }
        TableChange::DropColumn { name } => format!("drop column {}", q(name)),
        TableChange::RenameColumn { from, to } => {
            format!("rename column {} to {}", q(from), q(to))
        }
        TableChange::AlterColumnType {
            column,
            column_type,
        } => match ddl.alter_column {
            AlterColumn::AlterColumn => format!(
                "alter column {} type {}",
                q(column),
                dialect.render_type(column_type)
            ),
            AlterColumn::ModifyColumn => format!(
                "modify column {} {}",
                q(column),
                dialect.render_type(column_type)
            ),
            AlterColumn::Unsupported => return Err(unsupported("alter column type")),
        },
        TableChange::SetNotNull {
            column,
            column_type,
        }
        | TableChange::DropNotNull {
            column,
            column_type,
        } => {
            let not_null = matches!(change, TableChange::SetNotNull { .. });
            match ddl.alter_column {
                AlterColumn::AlterColumn => format!(
                    "alter column {} {} not null",
                    q(column),
                    if not_null { "set" } else { "drop" }
                ),
                AlterColumn::ModifyColumn => {
                    let Some(column_type) = column_type else {
                        return Err(unsupported(&format!(
                            "changing nullability of '{column}' without its column type"
                        )));
                    };
                    format!(
                        "modify column {} {} {}",
                        q(column),
                        dialect.render_type(column_type),
                        if not_null { "not null" } else { "null" }
                    )
                }
                AlterColumn::Unsupported => return Err(unsupported("alter column nullability")),
            }
        }
        TableChange::SetDefault { column, default } => {
            if ddl.alter_column == AlterColumn::Unsupported {
                return Err(unsupported("alter column default"));
            }
            format!(
                "alter column {} set default {}",
                q(column),
                render_default(default, dialect)
            )
        }
        TableChange::DropDefault { column } => {
            if ddl.alter_column == AlterColumn::Unsupported {
                return Err(unsupported("alter column default"));
            }
            format!("alter column {} drop default", q(column))
        }
        TableChange::AddPrimaryKey { name, columns } => {
            require_add_constraint()?;
            format!(
                "add {}primary key ({})",
                constraint_prefix(dialect, name.as_deref()),
                quote_list(dialect, columns)
            )
        }
        TableChange::DropPrimaryKey { name } => match ddl.drop_primary_key {
            PrimaryKeyDrop::ConstraintName { fallback } => {
                let name = match (name, fallback) {
                    (Some(name), _) => name.clone(),
                    (None, Some(fallback)) => fallback(&table.name),
                    (None, None) => {
                        return Err(CompileError::MissingConstraintName {
                            kind: "primary key",
                            table: table.name.clone(),
                            dialect: dialect.name,
                        })
                    }
                };
                format!("drop constraint {}", q(&name))
            }
            PrimaryKeyDrop::Direct => String::from("drop primary key"),
            PrimaryKeyDrop::Unsupported => return Err(unsupported("drop primary key")),
        },
        TableChange::AddUnique { name, columns } => {
            require_add_constraint()?;
            format!(
                "add {}unique ({})",
                constraint_prefix(dialect, name.as_deref()),
                quote_list(dialect, columns)
            )
        }
        TableChange::DropUnique { name } => {
            drop_constraint(ddl.drop_unique, name, dialect, "drop unique constraint")?
        }
        TableChange::AddCheck { name, expression } => {
            require_add_constraint()?;
            format!(
                "add {}check ({expression})",
                constraint_prefix(dialect, name.as_deref())
            )
        }
        TableChange::DropCheck { name } => {
            drop_constraint(ddl.drop_check, name, dialect, "drop check constraint")?
        }
        TableChange::AddForeignKey(fk) => {
            require_add_constraint()?;
            format!("add {}", foreign_key_clause(fk, dialect))
        }
        TableChange::DropForeignKey { name } => {
            drop_constraint(ddl.drop_foreign_key, name, dialect, "drop foreign key")?
        }
    };

    Ok(format!("alter table {} {tail}", dialect.quote_table(table)))
}

fn drop_constraint(
    style: ConstraintDrop,
    name: &str,
    dialect: &Dialect,
    feature: &str,
) -> Result<String> {
    match style {
        ConstraintDrop::DropConstraint => Ok(format!(
            "drop constraint {}",
            dialect.quote_identifier(name)
        )),
        ConstraintDrop::Keyword(keyword) => {
            Ok(format!("drop {keyword} {}", dialect.quote_identifier(name)))
        }
        ConstraintDrop::Unsupported => Err(CompileError::unsupported(feature, dialect.name)),
    }
}

/// Renders one column definition.
///
/// `inline_pk` is false when the primary key is declared as a table
/// constraint instead.
fn column_definition(
    column: &ColumnDefinition,
    inline_pk: bool,
    dialect: &Dialect,
) -> Result<String> {
    let ddl = &dialect.ddl;
    let primary_key = column.primary_key && inline_pk;
    let auto = column.autoincrement && primary_key && column.column_type.is_integer();

    let type_name = match (auto, ddl.autoincrement) {
        (true, Autoincrement::SerialType) => match column.column_type {
            ColumnType::SmallInt => String::from("smallserial"),
            ColumnType::BigInt => String::from("bigserial"),
            _ => String::from("serial"),
        },
        (true, Autoincrement::RowidAlias) => String::from("integer"),
        _ => dialect.render_type(&column.column_type),
    };

    let mut sql = format!("{} {type_name}", dialect.quote_identifier(&column.name));

    if let Some(generated) = &column.generated {
        if !generated.stored && ddl.computed_columns == ComputedColumns::StoredOnly {
            return Err(CompileError::unsupported(
                format!("virtual generated column '{}'", column.name),
                dialect.name,
            ));
        }
        sql.push_str(" generated always as (");
        sql.push_str(&generated.expression);
        sql.push_str(if generated.stored { ") stored" } else { ") virtual" });
    }

    if primary_key {
        sql.push_str(" primary key");
        if auto {
            match ddl.autoincrement {
                Autoincrement::RowidAlias => sql.push_str(" autoincrement"),
                Autoincrement::Keyword(keyword) => {
                    sql.push(' ');
                    sql.push_str(keyword);
                }
                Autoincrement::SerialType => {}
            }
        }
    } else {
        if !column.nullable {
            sql.push_str(" not null");
        }
        if column.unique {
            sql.push_str(" unique");
        }
    }

    if let Some(default) = &column.default {
        sql.push_str(" default ");
        sql.push_str(&render_default(default, dialect));
    }

    if let Some(fk) = &column.references {
        sql.push(' ');
        sql.push_str(&references_clause(fk, dialect));
    }

    if let ColumnType::Enum(values) = &column.column_type {
        if dialect.types.enum_style == EnumStyle::CheckConstraint {
            let list: Vec<String> = values.iter().map(|v| dialect.quote_string(v)).collect();
            sql.push_str(&format!(
                " check ({} in ({}))",
                dialect.quote_identifier(&column.name),
                list.join(", ")
            ));
        }
    }

    for check in &column.checks {
        sql.push_str(" check (");
        sql.push_str(check);
        sql.push(')');
    }

    Ok(sql)
}

fn render_default(default: &DefaultValue, dialect: &Dialect) -> String {
    match default {
        DefaultValue::Literal(value) => dialect.literal(value),
        DefaultValue::Now => dialect.now.to_string(),
        DefaultValue::Raw(expr) if dialect.ddl.wrap_default_expressions => format!("({expr})"),
        DefaultValue::Raw(expr) => expr.clone(),
    }
}

fn references_clause(fk: &ForeignKeyRef, dialect: &Dialect) -> String {
    let mut sql = format!(
        "references {} ({})",
        dialect.quote_table(&TableRef::from(fk.table.as_str())),
        dialect.quote_identifier(&fk.column)
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(" on delete ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        sql.push_str(" on update ");
        sql.push_str(action.as_sql());
    }
    sql
}

fn foreign_key_clause(fk: &ForeignKey, dialect: &Dialect) -> String {
    let mut sql = format!(
        "{}foreign key ({}) references {} ({})",
        constraint_prefix(dialect, fk.name.as_deref()),
        quote_list(dialect, &fk.columns),
        dialect.quote_table(&fk.references_table),
        quote_list(dialect, &fk.references_columns)
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(" on delete ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        sql.push_str(" on update ");
        sql.push_str(action.as_sql());
    }
    sql
}

fn table_constraint(constraint: &TableConstraint, dialect: &Dialect) -> String {
    match constraint {
        TableConstraint::PrimaryKey { name, columns } => format!(
            "{}primary key ({})",
            constraint_prefix(dialect, name.as_deref()),
            quote_list(dialect, columns)
        ),
        TableConstraint::Unique { name, columns } => format!(
            "{}unique ({})",
            constraint_prefix(dialect, name.as_deref()),
            quote_list(dialect, columns)
        ),
        TableConstraint::Check { name, expression } => format!(
            "{}check ({expression})",
            constraint_prefix(dialect, name.as_deref())
        ),
        TableConstraint::ForeignKey(fk) => foreign_key_clause(fk, dialect),
    }
}

fn constraint_prefix(dialect: &Dialect, name: Option<&str>) -> String {
    name.map_or_else(String::new, |name| {
        format!("constraint {} ", dialect.quote_identifier(name))
    })
}

fn quote_list<S: AsRef<str>>(dialect: &Dialect, names: &[S]) -> String {
    names
        .iter()
        .map(|n| dialect.quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
