//! Data manipulation operations.
//!
//! A [`Query`] is a dialect-neutral description of one statement. The fluent
//! chaining surface lives in callers; the builders here only cover what the
//! adapter and migration runner need to put a query together.

use serde::{Deserialize, Serialize};

use crate::predicate::Predicate;
use crate::table::{ColumnPath, TableRef};
use crate::value::{SqlValue, ToSqlValue};

/// An ordered list of `(column, value)` cells.
pub type Row = Vec<(String, SqlValue)>;

/// Which columns an insert, update, delete or upsert hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Returning {
    /// Nothing.
    #[default]
    None,
    /// Every column.
    All,
    /// The listed columns.
    Columns(Vec<String>),
}

impl Returning {
    /// Returns `true` unless this is [`Returning::None`].
    #[must_use]
    pub const fn is_requested(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    /// SQL keyword(s) for this join.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "inner join",
            Self::Left => "left join",
            Self::Right => "right join",
            Self::Full => "full join",
            Self::Cross => "cross join",
        }
    }
}

/// A join clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    /// Join condition. Ignored for cross joins.
    pub on: Option<Predicate>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// An `order by` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: ColumnPath,
    pub direction: SortDirection,
}

/// `select`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub table: TableRef,
    /// Selected columns, `*` when empty.
    pub columns: Vec<ColumnPath>,
    pub distinct: bool,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<ColumnPath>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// Selects every column of `table`.
    #[must_use]
    pub fn from(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Sets the selected columns.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| ColumnPath::parse(c)).collect();
        self
    }

    /// Selects distinct rows.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, kind: JoinKind, table: impl Into<TableRef>, on: Predicate) -> Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            on: Some(on),
        });
        self
    }

    /// Adds a condition, combined with `and` when one is already set.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(predicate),
            None => predicate,
        });
        self
    }

    /// Sets the `group by` columns.
    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by = columns.iter().map(|c| ColumnPath::parse(c)).collect();
        self
    }

    /// Sets the `having` condition.
    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(predicate);
        self
    }

    /// Appends an `order by` term.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            column: ColumnPath::parse(column),
            direction,
        });
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Source of a `count` or `exists` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub table: TableRef,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<ColumnPath>,
    pub having: Option<Predicate>,
}

impl Aggregate {
    /// Counts rows of `table`.
    #[must_use]
    pub fn from(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            filter: None,
            group_by: Vec::new(),
            having: None,
        }
    }

    /// Sets the condition.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

/// `insert` of a single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub table: TableRef,
    pub row: Row,
    pub returning: Returning,
    pub primary_key: Vec<String>,
}

/// `insert` of several rows in one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertMany {
    pub table: TableRef,
    pub rows: Vec<Row>,
    pub returning: Returning,
    pub primary_key: Vec<String>,
}

/// `update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table: TableRef,
    pub changes: Row,
    pub filter: Option<Predicate>,
    pub returning: Returning,
}

/// `delete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    pub table: TableRef,
    pub filter: Option<Predicate>,
    pub returning: Returning,
}

/// Insert-or-update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upsert {
    pub table: TableRef,
    pub values: Row,
    /// Conflict columns. Falls back to `primary_key` when empty.
    pub conflict_target: Vec<String>,
    /// Columns overwritten on conflict. Empty means "keep the existing row".
    pub update_columns: Vec<String>,
    pub returning: Returning,
    pub primary_key: Vec<String>,
}

impl Upsert {
    /// Updates every inserted column that isn't part of the conflict target.
    #[must_use]
    pub fn update_all(mut self) -> Self {
        let target = if self.conflict_target.is_empty() {
            &self.primary_key
        } else {
            &self.conflict_target
        };
        self.update_columns = self
            .values
            .iter()
            .map(|(c, _)| c)
            .filter(|c| !target.contains(c))
            .cloned()
            .collect();
        self
    }
}

/// Raw SQL with generic `?` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSql {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// A data manipulation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Select(Select),
    Count(Aggregate),
    Exists(Aggregate),
    Insert(Insert),
    InsertMany(InsertMany),
    Update(Update),
    Delete(Delete),
    Upsert(Upsert),
    Raw(RawSql),
}

impl Query {
    /// Builds an insert from `(column, value)` pairs.
    #[must_use]
    pub fn insert<V: ToSqlValue>(
        table: impl Into<TableRef>,
        row: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Insert {
        Insert {
            table: table.into(),
            row: into_row(row),
            returning: Returning::None,
            primary_key: Vec::new(),
        }
    }

    /// Builds an update.
    #[must_use]
    pub fn update<V: ToSqlValue>(
        table: impl Into<TableRef>,
        changes: impl IntoIterator<Item = (&'static str, V)>,
        filter: Option<Predicate>,
    ) -> Self {
        Self::Update(Update {
            table: table.into(),
            changes: into_row(changes),
            filter,
            returning: Returning::None,
        })
    }

    /// Builds a delete.
    #[must_use]
    pub fn delete(table: impl Into<TableRef>, filter: Option<Predicate>) -> Self {
        Self::Delete(Delete {
            table: table.into(),
            filter,
            returning: Returning::None,
        })
    }

    /// Builds a raw statement.
    #[must_use]
    pub fn raw(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self::Raw(RawSql {
            sql: sql.into(),
            values,
        })
    }

    /// Target table, if the operation has one.
    #[must_use]
    pub const fn table(&self) -> Option<&TableRef> {
        match self {
            Self::Select(q) => Some(&q.table),
            Self::Count(q) | Self::Exists(q) => Some(&q.table),
            Self::Insert(q) => Some(&q.table),
            Self::InsertMany(q) => Some(&q.table),
            Self::Update(q) => Some(&q.table),
            Self::Delete(q) => Some(&q.table),
            Self::Upsert(q) => Some(&q.table),
            Self::Raw(_) => None,
        }
    }

    /// Requested returning columns.
    #[must_use]
    pub const fn returning(&self) -> &Returning {
        const NONE: &Returning = &Returning::None;
        match self {
            Self::Insert(q) => &q.returning,
            Self::InsertMany(q) => &q.returning,
            Self::Update(q) => &q.returning,
            Self::Delete(q) => &q.returning,
            Self::Upsert(q) => &q.returning,
            Self::Select(_) | Self::Count(_) | Self::Exists(_) | Self::Raw(_) => NONE,
        }
    }

    /// Declared primary key columns.
    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        match self {
            Self::Insert(q) => &q.primary_key,
            Self::InsertMany(q) => &q.primary_key,
            Self::Upsert(q) => &q.primary_key,
            _ => &[],
        }
    }
}

impl Insert {
    /// Sets the returning clause.
    #[must_use]
    pub fn returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    /// Declares the primary key columns.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(ToString::to_string).collect();
        self
    }
}

impl From<Select> for Query {
    fn from(q: Select) -> Self {
        Self::Select(q)
    }
}

impl From<Insert> for Query {
    fn from(q: Insert) -> Self {
        Self::Insert(q)
    }
}

impl From<InsertMany> for Query {
    fn from(q: InsertMany) -> Self {
        Self::InsertMany(q)
    }
}

impl From<Upsert> for Query {
    fn from(q: Upsert) -> Self {
        Self::Upsert(q)
    }
}

fn into_row<V: ToSqlValue>(cells: impl IntoIterator<Item = (&'static str, V)>) -> Row {
    cells
        .into_iter()
        .map(|(c, v)| (c.to_string(), v.to_sql_value()))
        .collect()
}
