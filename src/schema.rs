//! Declarative description of the `user` table.
//!
//! The definitions here are the single source of truth for record shape: the
//! stores validate inserts against them and the SQLite backend derives its DDL
//! from them. Definitions are built once per process and never mutated.

use std::fmt;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::error::Violation;
use crate::value::{Params, Value};

/// Logical name of the persisted table.
pub const USER_TABLE: &str = "user";

/// Upper bound, in characters, for the user's text columns.
pub const MAX_TEXT_LENGTH: usize = 100;

/// Column names of the `user` table.
pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const AGE: &str = "age";
    pub const EMAIL: &str = "email";
}

/// Which contract the `age` column follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    /// `age` is NOT NULL, as the table was originally declared.
    #[default]
    Strict,
    /// `age` may be omitted.
    Relaxed,
}

impl SchemaVariant {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "relaxed" => Some(Self::Relaxed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Uuid,
    Text { max_length: Option<usize> },
    Integer,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Uuid => f.write_str("uuid"),
            DataType::Text { max_length: Some(max) } => write!(f, "text({max})"),
            DataType::Text { max_length: None } => f.write_str("text"),
            DataType::Integer => f.write_str("integer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
    /// Text must contain something other than whitespace.
    NonBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// A fresh random (v4) UUID per record.
    RandomUuid,
}

impl DefaultValue {
    fn generate(self) -> Value {
        match self {
            DefaultValue::RandomUuid => Value::Uuid(Uuid::new_v4()),
        }
    }
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn with_default(mut self, default_value: DefaultValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn has(&self, constraint: ColumnConstraint) -> bool {
        self.constraints.contains(&constraint)
    }

    /// Whether an insert must supply a value for this column.
    pub fn is_required(&self) -> bool {
        (self.has(ColumnConstraint::NotNull) || self.has(ColumnConstraint::PrimaryKey))
            && self.default_value.is_none()
    }

    pub fn is_unique(&self) -> bool {
        self.has(ColumnConstraint::Unique) || self.has(ColumnConstraint::PrimaryKey)
    }

    fn check(&self, value: &Value) -> Result<(), Violation> {
        match (self.data_type, value) {
            (DataType::Uuid, Value::Uuid(_)) | (DataType::Integer, Value::Integer(_)) => Ok(()),
            (DataType::Text { max_length }, Value::Text(text)) => {
                if self.has(ColumnConstraint::NonBlank) && text.trim().is_empty() {
                    return Err(Violation::Blank {
                        column: self.name.clone(),
                    });
                }
                if let Some(max) = max_length {
                    let actual = text.chars().count();
                    if actual > max {
                        return Err(Violation::TooLong {
                            column: self.name.clone(),
                            max,
                            actual,
                        });
                    }
                }
                Ok(())
            }
            _ => Err(Violation::WrongType {
                column: self.name.clone(),
                expected: self.data_type.to_string(),
            }),
        }
    }

    fn sql(&self) -> String {
        let name = quote_ident(&self.name);
        let mut sql = format!("{name} {}", sqlite_type(self.data_type));
        if self.has(ColumnConstraint::PrimaryKey) {
            sql.push_str(" PRIMARY KEY");
        }
        if self.has(ColumnConstraint::NotNull) || self.has(ColumnConstraint::PrimaryKey) {
            sql.push_str(" NOT NULL");
        }
        if self.has(ColumnConstraint::Unique) {
            sql.push_str(" UNIQUE");
        }
        if let DataType::Text {
            max_length: Some(max),
        } = self.data_type
        {
            sql.push_str(&format!(" CHECK (length({name}) <= {max})"));
        }
        if self.has(ColumnConstraint::NonBlank) {
            sql.push_str(&format!(" CHECK (length(trim({name})) > 0)"));
        }
        sql
    }
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns whose values must not repeat across records.
    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|column| column.is_unique())
    }

    /// Fill in every absent column that declares a default.
    pub fn apply_defaults(&self, mut params: Params) -> Params {
        for column in &self.columns {
            if let Some(default_value) = column.default_value {
                if !params.contains(&column.name) {
                    params
                        .values
                        .insert(column.name.clone(), default_value.generate());
                }
            }
        }
        params
    }

    /// Check a candidate record against every declared column rule.
    ///
    /// Uniqueness is not checked here; it depends on what is already stored
    /// and is left to the backing store.
    pub fn validate(&self, params: &Params) -> Result<(), Violation> {
        if let Some(unknown) = params
            .values
            .keys()
            .find(|name| self.column(name).is_none())
        {
            return Err(Violation::UnknownColumn {
                column: unknown.clone(),
            });
        }
        for column in &self.columns {
            match params.get(&column.name) {
                Some(value) => column.check(value)?,
                None if column.is_required() => {
                    return Err(Violation::Missing {
                        column: column.name.clone(),
                    })
                }
                None => {}
            }
        }
        Ok(())
    }

    /// SQLite DDL creating the table when it does not exist yet.
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ColumnDefinition::sql)
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            quote_ident(&self.name),
            columns
        )
    }

    /// Comma-separated, quoted column list in declaration order.
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| quote_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn sqlite_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Uuid | DataType::Text { .. } => "TEXT",
        DataType::Integer => "INTEGER",
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn build_user_table(variant: SchemaVariant) -> TableDefinition {
    let bounded_text = DataType::Text {
        max_length: Some(MAX_TEXT_LENGTH),
    };
    let age = ColumnDefinition::new(columns::AGE, DataType::Integer);
    let age = match variant {
        SchemaVariant::Strict => age.with_constraint(ColumnConstraint::NotNull),
        SchemaVariant::Relaxed => age,
    };

    TableDefinition::new(USER_TABLE)
        .add_column(
            ColumnDefinition::new(columns::ID, DataType::Uuid)
                .with_constraint(ColumnConstraint::PrimaryKey)
                .with_default(DefaultValue::RandomUuid),
        )
        .add_column(
            ColumnDefinition::new(columns::NAME, bounded_text)
                .with_constraint(ColumnConstraint::NotNull)
                .with_constraint(ColumnConstraint::NonBlank),
        )
        .add_column(age)
        .add_column(
            ColumnDefinition::new(columns::EMAIL, bounded_text)
                .with_constraint(ColumnConstraint::NotNull)
                .with_constraint(ColumnConstraint::Unique)
                .with_constraint(ColumnConstraint::NonBlank),
        )
}

static STRICT_USER_TABLE: OnceLock<TableDefinition> = OnceLock::new();
static RELAXED_USER_TABLE: OnceLock<TableDefinition> = OnceLock::new();

/// The process-wide `user` table definition for `variant`.
pub fn user_table(variant: SchemaVariant) -> &'static TableDefinition {
    match variant {
        SchemaVariant::Strict => STRICT_USER_TABLE.get_or_init(|| build_user_table(variant)),
        SchemaVariant::Relaxed => RELAXED_USER_TABLE.get_or_init(|| build_user_table(variant)),
    }
}
