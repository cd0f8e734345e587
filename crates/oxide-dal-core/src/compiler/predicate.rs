//! Predicate rendering.

use crate::error::{CompileError, Result};
use crate::predicate::{ComparisonOp, LogicalOp, Operand, Predicate};
use crate::table::ColumnPath;
use crate::value::SqlValue;

use super::writer::SqlWriter;

const ALWAYS_TRUE: &str = "1 = 1";
const ALWAYS_FALSE: &str = "1 = 0";

pub(crate) fn write_predicate(w: &mut SqlWriter<'_>, predicate: &Predicate) -> Result<()> {
    match predicate {
        Predicate::Comparison {
            column,
            op,
            operand,
        } => write_comparison(w, column, *op, operand),
        Predicate::Between {
            column,
            lower,
            upper,
        } => {
            w.column(column)
                .push(" between ")
                .bind(lower.clone())
                .push(" and ")
                .bind(upper.clone());
            Ok(())
        }
        Predicate::Null { column, is_null } => {
            w.column(column)
                .push(if *is_null { " is null" } else { " is not null" });
            Ok(())
        }
        Predicate::Logical { op, children } => write_logical(w, *op, children),
        Predicate::Not(inner) => {
            w.push("not (");
            write_predicate(w, inner)?;
            w.push(")");
            Ok(())
        }
        Predicate::Raw { sql, values } => write_raw(w, sql, values),
    }
}

fn write_logical(w: &mut SqlWriter<'_>, op: LogicalOp, children: &[Predicate]) -> Result<()> {
    match children {
        [] => {
            w.push(match op {
                LogicalOp::And => ALWAYS_TRUE,
                LogicalOp::Or => ALWAYS_FALSE,
            });
            Ok(())
        }
        [only] => write_predicate(w, only),
        _ => {
            let joiner = match op {
                LogicalOp::And => " and ",
                LogicalOp::Or => " or ",
            };
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    w.push(joiner);
                }
                w.push("(");
                write_predicate(w, child)?;
                w.push(")");
            }
            Ok(())
        }
    }
}

fn write_comparison(
    w: &mut SqlWriter<'_>,
    column: &ColumnPath,
    op: ComparisonOp,
    operand: &Operand,
) -> Result<()> {
    match (op, operand) {
        (ComparisonOp::In | ComparisonOp::NotIn, Operand::List(values)) => {
            if values.is_empty() {
                w.push(if op == ComparisonOp::In {
                    ALWAYS_FALSE
                } else {
                    ALWAYS_TRUE
                });
                return Ok(());
            }
            w.column(column).push(" ").push(op.as_sql()).push(" (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.bind(value.clone());
            }
            w.push(")");
        }
        (ComparisonOp::In | ComparisonOp::NotIn, single) => {
            w.column(column).push(" ").push(op.as_sql()).push(" (");
            write_operand(w, single);
            w.push(")");
        }
        (ComparisonOp::Eq, Operand::Value(SqlValue::Null)) => {
            w.column(column).push(" is null");
        }
        (ComparisonOp::Ne, Operand::Value(SqlValue::Null)) => {
            w.column(column).push(" is not null");
        }
        (_, Operand::List(_)) => {
            return Err(CompileError::unsupported(
                format!("list operand for '{}'", op.as_sql()),
                w.dialect.name,
            ));
        }
        (ComparisonOp::ILike, rhs) if !w.dialect.supports_ilike => {
            w.push("lower(").column(column).push(") like lower(");
            write_operand(w, rhs);
            w.push(")");
        }
        (_, rhs) => {
            w.column(column).push(" ").push(op.as_sql()).push(" ");
            write_operand(w, rhs);
        }
    }
    Ok(())
}

fn write_operand(w: &mut SqlWriter<'_>, operand: &Operand) {
    match operand {
        Operand::Value(value) => {
            w.bind(value.clone());
        }
        Operand::Column(column) => {
            w.column(column);
        }
        Operand::List(values) => {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.bind(value.clone());
            }
        }
    }
}

/// Writes raw SQL with generic `?` placeholders.
///
/// Dialects that rewrite placeholders get native ones in value order; others
/// keep the text verbatim. `?` inside quoted literals or identifiers is not a
/// placeholder.
pub(crate) fn write_raw(w: &mut SqlWriter<'_>, sql: &str, values: &[SqlValue]) -> Result<()> {
    let positions = placeholder_positions(sql);
    if positions.len() != values.len() {
        return Err(CompileError::PlaceholderMismatch {
            placeholders: positions.len(),
            values: values.len(),
        });
    }

    if !w.dialect.rewrite_raw_placeholders {
        w.push(sql);
        for value in values {
            w.bind_silent(value.clone());
        }
        return Ok(());
    }

    let mut last = 0;
    for (pos, value) in positions.into_iter().zip(values) {
        w.push(&sql[last..pos]).bind(value.clone());
        last = pos + 1;
    }
    w.push(&sql[last..]);
    Ok(())
}

fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;
    for (i, ch) in sql.char_indices() {
        match quote {
            // A doubled quote closes and immediately reopens, which is fine.
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => positions.push(i),
                _ => {}
            },
        }
    }
    positions
}
