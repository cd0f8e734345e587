//! Data manipulation compilation.

use crate::dialect::UpsertStyle;
use crate::error::{CompileError, Result};
use crate::predicate::Predicate;
use crate::query::{
    Aggregate, Delete, Insert, InsertMany, Join, JoinKind, OrderBy, Query, RawSql, Returning,
    Row, Select, SortDirection, Update, Upsert,
};
use crate::table::{ColumnPath, TableRef};
use crate::value::SqlValue;

use super::predicate::{write_predicate, write_raw};
use super::writer::SqlWriter;

pub(crate) fn write_query(w: &mut SqlWriter<'_>, query: &Query) -> Result<()> {
    match query {
        Query::Select(q) => write_select(w, q),
        Query::Count(q) => write_aggregate(w, q, false),
        Query::Exists(q) => write_aggregate(w, q, true),
        Query::Insert(q) => {
            write_insert(w, q);
            Ok(())
        }
        Query::InsertMany(q) => write_insert_many(w, q),
        Query::Update(q) => write_update(w, q),
        Query::Delete(q) => write_delete(w, q),
        Query::Upsert(q) => write_upsert(w, q),
        Query::Raw(RawSql { sql, values }) => write_raw(w, sql, values),
    }
}

fn write_select(w: &mut SqlWriter<'_>, q: &Select) -> Result<()> {
    w.push("select ");
    if q.distinct {
        w.push("distinct ");
    }
    if q.columns.is_empty() {
        w.push("*");
    } else {
        w.columns(&q.columns);
    }
    w.push(" from ").table_source(&q.table);
    write_joins(w, &q.joins)?;
    write_where(w, q.filter.as_ref())?;
    write_group_having(w, &q.group_by, q.having.as_ref())?;
    write_order_by(w, &q.order_by);
    write_limit_offset(w, q.limit, q.offset);
    Ok(())
}

// Counting over a derived table keeps `group by`/`having` semantics intact:
// the outer count sees one row per group.
fn write_aggregate(w: &mut SqlWriter<'_>, q: &Aggregate, exists: bool) -> Result<()> {
    w.push("select count(*) as ")
        .ident("count")
        .push(" from (select 1 from ")
        .table_source(&q.table);
    write_joins(w, &q.joins)?;
    write_where(w, q.filter.as_ref())?;
    write_group_having(w, &q.group_by, q.having.as_ref())?;
    if exists {
        w.push(" limit 1");
    }
    w.push(") as __dt_count");
    Ok(())
}

fn write_joins(w: &mut SqlWriter<'_>, joins: &[Join]) -> Result<()> {
    for join in joins {
        w.push(" ").push(join.kind.as_sql()).push(" ").table_source(&join.table);
        if join.kind != JoinKind::Cross {
            if let Some(on) = &join.on {
                w.push(" on ");
                write_predicate(w, on)?;
            }
        }
    }
    Ok(())
}

fn write_where(w: &mut SqlWriter<'_>, filter: Option<&Predicate>) -> Result<()> {
    if let Some(predicate) = filter {
        w.push(" where ");
        write_predicate(w, predicate)?;
    }
    Ok(())
}

fn write_group_having(
    w: &mut SqlWriter<'_>,
    group_by: &[ColumnPath],
    having: Option<&Predicate>,
) -> Result<()> {
    if !group_by.is_empty() {
        w.push(" group by ").columns(group_by);
    }
    if let Some(predicate) = having {
        w.push(" having ");
        write_predicate(w, predicate)?;
    }
    Ok(())
}

fn write_order_by(w: &mut SqlWriter<'_>, order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    w.push(" order by ");
    for (i, term) in order_by.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.column(&term.column).push(match term.direction {
            SortDirection::Asc => " asc",
            SortDirection::Desc => " desc",
        });
    }
}

fn write_limit_offset(w: &mut SqlWriter<'_>, limit: Option<u64>, offset: Option<u64>) {
    match (limit, offset) {
        (Some(limit), _) => {
            w.push(&format!(" limit {limit}"));
        }
        (None, Some(_)) => {
            if let Some(unbounded) = w.dialect.offset_without_limit {
                w.push(" limit ").push(unbounded);
            }
        }
        (None, None) => {}
    }
    if let Some(offset) = offset {
        w.push(&format!(" offset {offset}"));
    }
}

fn write_returning(w: &mut SqlWriter<'_>, returning: &Returning) {
    if !w.dialect.supports_returning {
        return;
    }
    match returning {
        Returning::None => {}
        Returning::All => {
            w.push(" returning *");
        }
        Returning::Columns(columns) => {
            w.push(" returning ").idents(columns);
        }
    }
}

fn write_values_row(w: &mut SqlWriter<'_>, cells: impl Iterator<Item = SqlValue>) {
    w.push("(");
    for (i, value) in cells.enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.bind(value);
    }
    w.push(")");
}

fn write_insert_head(w: &mut SqlWriter<'_>, table: &TableRef, columns: &[String]) {
    w.push("insert into ")
        .table(table)
        .push(" (")
        .idents(columns)
        .push(") values ");
}

fn write_insert(w: &mut SqlWriter<'_>, q: &Insert) {
    if q.row.is_empty() {
        let default_values = w.dialect.default_values;
        w.push("insert into ")
            .table(&q.table)
            .push(" ")
            .push(default_values);
    } else {
        let columns = row_columns(&q.row);
        write_insert_head(w, &q.table, &columns);
        write_values_row(w, q.row.iter().map(|(_, v)| v.clone()));
    }
    write_returning(w, &q.returning);
}

/// Union of row keys in first-seen order.
pub(crate) fn union_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (column, _) in row {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }
    columns
}

fn write_insert_many(w: &mut SqlWriter<'_>, q: &InsertMany) -> Result<()> {
    if q.rows.is_empty() {
        w.push("select * from ").table(&q.table).push(" where 1 = 0");
        return Ok(());
    }
    let columns = union_columns(&q.rows);
    if columns.is_empty() {
        if let [_] = q.rows.as_slice() {
            let default_values = w.dialect.default_values;
            w.push("insert into ")
                .table(&q.table)
                .push(" ")
                .push(default_values);
            write_returning(w, &q.returning);
            return Ok(());
        }
        return Err(CompileError::EmptyInsert(q.table.name.clone()));
    }

    write_insert_head(w, &q.table, &columns);
    for (i, row) in q.rows.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        write_values_row(
            w,
            columns.iter().map(|column| {
                row.iter()
                    .find(|(c, _)| c == column)
                    .map_or(SqlValue::Null, |(_, v)| v.clone())
            }),
        );
    }
    write_returning(w, &q.returning);
    Ok(())
}

fn write_update(w: &mut SqlWriter<'_>, q: &Update) -> Result<()> {
    if q.changes.is_empty() {
        return Err(CompileError::EmptyUpdate(q.table.name.clone()));
    }
    w.push("update ").table(&q.table).push(" set ");
    for (i, (column, value)) in q.changes.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.ident(column).push(" = ").bind(value.clone());
    }
    write_where(w, q.filter.as_ref())?;
    write_returning(w, &q.returning);
    Ok(())
}

fn write_delete(w: &mut SqlWriter<'_>, q: &Delete) -> Result<()> {
    w.push("delete from ").table(&q.table);
    write_where(w, q.filter.as_ref())?;
    write_returning(w, &q.returning);
    Ok(())
}

fn write_upsert(w: &mut SqlWriter<'_>, q: &Upsert) -> Result<()> {
    if q.values.is_empty() {
        return Err(CompileError::EmptyUpsert(q.table.name.clone()));
    }
    let columns = row_columns(&q.values);

    match w.dialect.upsert {
        UpsertStyle::OnConflict => {
            let target = if q.conflict_target.is_empty() {
                &q.primary_key
            } else {
                &q.conflict_target
            };
            if target.is_empty() {
                return Err(CompileError::MissingConflictTarget(q.table.name.clone()));
            }
            write_insert_head(w, &q.table, &columns);
            write_values_row(w, q.values.iter().map(|(_, v)| v.clone()));
            w.push(" on conflict (").idents(target).push(")");
            if q.update_columns.is_empty() {
                w.push(" do nothing");
            } else {
                w.push(" do update set ");
                for (i, column) in q.update_columns.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.ident(column).push(" = excluded.").ident(column);
                }
            }
        }
        UpsertStyle::OnDuplicateKey => {
            write_insert_head(w, &q.table, &columns);
            write_values_row(w, q.values.iter().map(|(_, v)| v.clone()));
            w.push(" on duplicate key update ");
            if q.update_columns.is_empty() {
                // A no-op assignment keeps the statement valid.
                let column = q
                    .primary_key
                    .first()
                    .or_else(|| q.conflict_target.first())
                    .unwrap_or(&columns[0]);
                w.ident(column).push(" = ").ident(column);
            } else {
                for (i, column) in q.update_columns.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.ident(column).push(" = values(").ident(column).push(")");
                }
            }
        }
    }
    write_returning(w, &q.returning);
    Ok(())
}

fn row_columns(row: &Row) -> Vec<String> {
    row.iter().map(|(c, _)| c.clone()).collect()
}
