use serde::{Deserialize, Serialize};

use crate::error::{ScopeKeyError, ScopeKeyResult};
use crate::models::Namespace;

pub const DEFAULT_ID_COLUMN: &str = "id";
pub const DEFAULT_UPDATED_AT_COLUMN: &str = "updated_at";

/// A value bound as a query parameter. Filter values never reach the SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsNull,
    IsNotNull,
    In,
}

impl Comparison {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Lt => "<",
            Comparison::LtEq => "<=",
            Comparison::Gt => ">",
            Comparison::GtEq => ">=",
            Comparison::IsNull => "IS NULL",
            Comparison::IsNotNull => "IS NOT NULL",
            Comparison::In => "IN",
        }
    }

    /// Number of bound values the comparison expects, `None` for a list.
    fn arity(&self) -> Option<usize> {
        match self {
            Comparison::IsNull | Comparison::IsNotNull => Some(0),
            Comparison::In => None,
            _ => Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
    pub values: Vec<SqlValue>,
}

/// A filtered, unordered view over the rows of one table.
///
/// Only identifiers end up in the generated SQL (quoted); every filter value
/// is carried as a bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    table: String,
    namespace: Option<String>,
    id_column: String,
    updated_at_column: String,
    conditions: Vec<Condition>,
}

impl Scope {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            namespace: None,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            updated_at_column: DEFAULT_UPDATED_AT_COLUMN.to_string(),
            conditions: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn updated_at_column(mut self, column: impl Into<String>) -> Self {
        self.updated_at_column = column.into();
        self
    }

    pub fn filter(
        mut self,
        column: impl Into<String>,
        comparison: Comparison,
        values: Vec<SqlValue>,
    ) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            comparison,
            values,
        });
        self
    }

    /// `None` matches rows where the column is NULL.
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filter(column, Comparison::Eq, vec![value.into()])
    }

    pub fn where_not_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filter(column, Comparison::NotEq, vec![value.into()])
    }

    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.filter(column, Comparison::IsNull, Vec::new())
    }

    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.filter(column, Comparison::IsNotNull, Vec::new())
    }

    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(column, Comparison::In, values)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn id_column_name(&self) -> &str {
        &self.id_column
    }

    pub fn updated_at_column_name(&self) -> &str {
        &self.updated_at_column
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The namespace prefix for keys of this scope: the explicit override, or
    /// the table name without its schema qualifier.
    pub fn resolve_namespace(&self) -> ScopeKeyResult<Namespace> {
        match &self.namespace {
            Some(namespace) => Namespace::new(namespace.clone()),
            None => {
                let bare = self.table.rsplit('.').next().unwrap_or(&self.table);
                Namespace::new(bare)
            }
        }
    }

    pub fn validate(&self) -> ScopeKeyResult<()> {
        if self.table.trim().is_empty() {
            return Err(ScopeKeyError::QueryConstruction(
                "scope has no table".to_string(),
            ));
        }
        for condition in &self.conditions {
            if let Some(expected) = condition.comparison.arity() {
                if condition.values.len() != expected {
                    return Err(ScopeKeyError::QueryConstruction(format!(
                        "condition on {} with {} expects {} value(s), got {}",
                        condition.column,
                        condition.comparison.operator(),
                        expected,
                        condition.values.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
