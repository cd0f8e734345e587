//! Predicate model for WHERE, HAVING and JOIN conditions.
//!
//! Predicates are plain data. They know nothing about quoting or placeholders;
//! the compiler renders them against a [`Dialect`](crate::dialect::Dialect).
//!
//! ```rust
//! use oxide_dal_core::Predicate;
//!
//! let filter = Predicate::and(vec![
//!     Predicate::eq("status", "active"),
//!     Predicate::or(vec![Predicate::gt("age", 18), Predicate::eq("verified", true)]),
//! ]);
//! assert!(matches!(filter, Predicate::Logical { .. }));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::table::ColumnPath;
use crate::value::{SqlValue, ToSqlValue};

static QUALIFIED_IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex")
});

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// `=`, or `is null` against a null value.
    Eq,
    /// `<>`, or `is not null` against a null value.
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `like`
    Like,
    /// `not like`
    NotLike,
    /// Case-insensitive `like`.
    ILike,
    /// `in (...)`
    In,
    /// `not in (...)`
    NotIn,
}

impl ComparisonOp {
    /// Returns the SQL operator text for binary operators.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// A bound value.
    Value(SqlValue),
    /// A list of bound values, for `in` / `not in`.
    List(Vec<SqlValue>),
    /// Another column.
    Column(ColumnPath),
}

impl<T: ToSqlValue> From<T> for Operand {
    fn from(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl From<ColumnPath> for Operand {
    fn from(value: ColumnPath) -> Self {
        Self::Column(value)
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// All children must hold. No children means true.
    And,
    /// At least one child must hold. No children means false.
    Or,
}

/// A condition over column paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `column op operand`
    Comparison {
        /// Left-hand column.
        column: ColumnPath,
        /// Operator.
        op: ComparisonOp,
        /// Right-hand side.
        operand: Operand,
    },
    /// `column between lower and upper`
    Between {
        /// Tested column.
        column: ColumnPath,
        /// Inclusive lower bound.
        lower: SqlValue,
        /// Inclusive upper bound.
        upper: SqlValue,
    },
    /// `column is [not] null`
    Null {
        /// Tested column.
        column: ColumnPath,
        /// `true` for `is null`, `false` for `is not null`.
        is_null: bool,
    },
    /// `and` / `or` over any number of children.
    Logical {
        /// Connective.
        op: LogicalOp,
        /// Children, rendered in order.
        children: Vec<Predicate>,
    },
    /// `not (...)`
    Not(Box<Predicate>),
    /// Raw SQL fragment with generic `?` placeholders.
    ///
    /// **Warning**: the text is emitted verbatim; only use it for fragments
    /// that don't contain user input.
    Raw {
        /// SQL text.
        sql: String,
        /// Values for the `?` placeholders, in order.
        values: Vec<SqlValue>,
    },
}

impl Predicate {
    /// Builds a comparison.
    ///
    /// When both `column` and a text operand look like qualified identifiers
    /// (`a.id`, `b.id`), the operand is taken as a column reference.
    #[must_use]
    pub fn compare(column: &str, op: ComparisonOp, operand: impl Into<Operand>) -> Self {
        let column = ColumnPath::parse(column);
        let operand = match operand.into() {
            Operand::Value(SqlValue::Text(text))
                if column.is_qualified() && QUALIFIED_IDENT.is_match(&text) =>
            {
                Operand::Column(ColumnPath::parse(&text))
            }
            other => other,
        };
        Self::Comparison {
            column,
            op,
            operand,
        }
    }

    /// `column = value` (`is null` when the value is null).
    #[must_use]
    pub fn eq(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Eq, value)
    }

    /// `column <> value` (`is not null` when the value is null).
    #[must_use]
    pub fn ne(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Ne, value)
    }

    /// `column > value`
    #[must_use]
    pub fn gt(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Gt, value)
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Gte, value)
    }

    /// `column < value`
    #[must_use]
    pub fn lt(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Lt, value)
    }

    /// `column <= value`
    #[must_use]
    pub fn lte(column: &str, value: impl Into<Operand>) -> Self {
        Self::compare(column, ComparisonOp::Lte, value)
    }

    /// `column like pattern`
    #[must_use]
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::compare(column, ComparisonOp::Like, Operand::Value(pattern.to_sql_value()))
    }

    /// `column not like pattern`
    #[must_use]
    pub fn not_like(column: &str, pattern: &str) -> Self {
        Self::compare(
            column,
            ComparisonOp::NotLike,
            Operand::Value(pattern.to_sql_value()),
        )
    }

    /// Case-insensitive `like`.
    #[must_use]
    pub fn ilike(column: &str, pattern: &str) -> Self {
        Self::compare(column, ComparisonOp::ILike, Operand::Value(pattern.to_sql_value()))
    }

    /// `column in (values...)`. An empty list never matches.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(column: &str, values: impl IntoIterator<Item = T>) -> Self {
        Self::Comparison {
            column: ColumnPath::parse(column),
            op: ComparisonOp::In,
            operand: Operand::List(values.into_iter().map(ToSqlValue::to_sql_value).collect()),
        }
    }

    /// `column not in (values...)`. An empty list always matches.
    #[must_use]
    pub fn not_in<T: ToSqlValue>(column: &str, values: impl IntoIterator<Item = T>) -> Self {
        Self::Comparison {
            column: ColumnPath::parse(column),
            op: ComparisonOp::NotIn,
            operand: Operand::List(values.into_iter().map(ToSqlValue::to_sql_value).collect()),
        }
    }

    /// Compares two columns.
    #[must_use]
    pub fn columns(left: &str, op: ComparisonOp, right: &str) -> Self {
        Self::Comparison {
            column: ColumnPath::parse(left),
            op,
            operand: Operand::Column(ColumnPath::parse(right)),
        }
    }

    /// `column between lower and upper`
    #[must_use]
    pub fn between<L: ToSqlValue, U: ToSqlValue>(column: &str, lower: L, upper: U) -> Self {
        Self::Between {
            column: ColumnPath::parse(column),
            lower: lower.to_sql_value(),
            upper: upper.to_sql_value(),
        }
    }

    /// `column is null`
    #[must_use]
    pub fn is_null(column: &str) -> Self {
        Self::Null {
            column: ColumnPath::parse(column),
            is_null: true,
        }
    }

    /// `column is not null`
    #[must_use]
    pub fn is_not_null(column: &str) -> Self {
        Self::Null {
            column: ColumnPath::parse(column),
            is_null: false,
        }
    }

    /// Conjunction of all children.
    #[must_use]
    pub const fn and(children: Vec<Self>) -> Self {
        Self::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    /// Disjunction of all children.
    #[must_use]
    pub const fn or(children: Vec<Self>) -> Self {
        Self::Logical {
            op: LogicalOp::Or,
            children,
        }
    }

    /// Negation.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Raw SQL fragment.
    #[must_use]
    pub fn raw(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self::Raw {
            sql: sql.into(),
            values,
        }
    }

    /// Combines with another predicate using `and`, flattening nested `and`s.
    #[must_use]
    pub fn and_also(self, other: Self) -> Self {
        match self {
            Self::Logical {
                op: LogicalOp::And,
                mut children,
            } => {
                children.push(other);
                Self::and(children)
            }
            first => Self::and(vec![first, other]),
        }
    }
}
