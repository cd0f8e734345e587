//! Column definitions.
//!
//! Provides a fluent API for defining columns in migrations.

use serde::{Deserialize, Serialize};

use crate::value::{SqlValue, ToSqlValue};

/// Dialect-neutral column type. Rendering is up to the dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },
    Char(u32),
    /// Variable-length text; `None` uses the dialect's default length.
    Varchar(Option<u32>),
    Text,
    Boolean,
    Date,
    Time {
        with_tz: bool,
    },
    Timestamp {
        with_tz: bool,
    },
    Json,
    Uuid,
    Binary,
    /// Enumerated text values.
    Enum(Vec<String>),
    /// Engine-specific type name, emitted verbatim.
    Custom(String),
}

impl ColumnType {
    /// Returns whether this is one of the integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "no action",
            Self::Restrict => "restrict",
            Self::Cascade => "cascade",
            Self::SetNull => "set null",
            Self::SetDefault => "set default",
        }
    }
}

/// A reference to a column in another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// A literal, rendered by the dialect.
    Literal(SqlValue),
    /// The dialect's current-timestamp expression.
    Now,
    /// Raw SQL expression.
    Raw(String),
}

/// A generated (computed) column expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    pub expression: String,
    /// `stored` when true, `virtual` otherwise.
    pub stored: bool,
}

/// A complete column definition for migrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub unique: bool,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub generated: Option<Generated>,
    pub references: Option<ForeignKeyRef>,
    /// Check expressions attached to this column.
    pub checks: Vec<String>,
}

impl ColumnDefinition {
    /// Creates a nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            unique: false,
            primary_key: false,
            autoincrement: false,
            generated: None,
            references: None,
            checks: Vec::new(),
        }
    }
}

/// Fluent column definition builder.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    def: ColumnDefinition,
}

impl ColumnBuilder {
    /// Creates a new column builder with name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            def: ColumnDefinition::new(name, column_type),
        }
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.def.nullable = false;
        self
    }

    /// Marks the column as nullable (default).
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.def.nullable = true;
        self
    }

    /// Marks the column as PRIMARY KEY. Primary keys are implicitly NOT NULL.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.def.primary_key = true;
        self.def.nullable = false;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.def.unique = true;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub const fn autoincrement(mut self) -> Self {
        self.def.autoincrement = true;
        self
    }

    /// Sets a literal default.
    #[must_use]
    pub fn default_value(mut self, value: impl ToSqlValue) -> Self {
        self.def.default = Some(DefaultValue::Literal(value.to_sql_value()));
        self
    }

    /// Defaults to the current timestamp.
    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.def.default = Some(DefaultValue::Now);
        self
    }

    /// Sets a raw SQL expression as default.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.def.default = Some(DefaultValue::Raw(expr.into()));
        self
    }

    /// Makes this a stored generated column.
    #[must_use]
    pub fn generated_stored(mut self, expression: impl Into<String>) -> Self {
        self.def.generated = Some(Generated {
            expression: expression.into(),
            stored: true,
        });
        self
    }

    /// Makes this a virtual generated column.
    #[must_use]
    pub fn generated_virtual(mut self, expression: impl Into<String>) -> Self {
        self.def.generated = Some(Generated {
            expression: expression.into(),
            stored: false,
        });
        self
    }

    /// Sets a foreign key reference.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.def.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
            on_delete: None,
            on_update: None,
        });
        self
    }

    /// Sets the ON DELETE action of the foreign key reference.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = self.def.references.as_mut() {
            fk.on_delete = Some(action);
        }
        self
    }

    /// Sets the ON UPDATE action of the foreign key reference.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = self.def.references.as_mut() {
            fk.on_update = Some(action);
        }
        self
    }

    /// Adds a CHECK expression.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.def.checks.push(expr.into());
        self
    }

    /// Builds the column definition.
    #[must_use]
    pub fn build(self) -> ColumnDefinition {
        self.def
    }
}

// =============================================================================
// Shorthand Functions for Common Types
// =============================================================================

/// Creates a SMALLINT column builder.
#[must_use]
pub fn smallint(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::SmallInt)
}

/// Creates an INTEGER column builder.
#[must_use]
pub fn integer(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Integer)
}

/// Creates a BIGINT column builder.
#[must_use]
pub fn bigint(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::BigInt)
}

/// Creates a REAL column builder.
#[must_use]
pub fn real(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Real)
}

/// Creates a DOUBLE column builder.
#[must_use]
pub fn double(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Double)
}

/// Creates a DECIMAL column builder.
#[must_use]
pub fn decimal(name: impl Into<String>, precision: u16, scale: u16) -> ColumnBuilder {
    ColumnBuilder::new(
        name,
        ColumnType::Decimal {
            precision: Some(precision),
            scale: Some(scale),
        },
    )
}

/// Creates a CHAR column builder.
#[must_use]
pub fn char(name: impl Into<String>, len: u32) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Char(len))
}

/// Creates a VARCHAR column builder.
#[must_use]
pub fn varchar(name: impl Into<String>, len: u32) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Varchar(Some(len)))
}

/// Creates a TEXT column builder.
#[must_use]
pub fn text(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Text)
}

/// Creates a BOOLEAN column builder.
#[must_use]
pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Boolean)
}

/// Creates a DATE column builder.
#[must_use]
pub fn date(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Date)
}

/// Creates a TIMESTAMP column builder.
#[must_use]
pub fn timestamp(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Timestamp { with_tz: false })
}

/// Creates a TIMESTAMP WITH TIME ZONE column builder.
#[must_use]
pub fn timestamp_tz(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Timestamp { with_tz: true })
}

/// Creates a JSON column builder.
#[must_use]
pub fn json(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Json)
}

/// Creates a UUID column builder.
#[must_use]
pub fn uuid(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Uuid)
}

/// Creates a binary column builder.
#[must_use]
pub fn binary(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, ColumnType::Binary)
}

/// Creates an enum column builder.
#[must_use]
pub fn enumeration(name: impl Into<String>, values: &[&str]) -> ColumnBuilder {
    ColumnBuilder::new(
        name,
        ColumnType::Enum(values.iter().map(ToString::to_string).collect()),
    )
}
