use crate::error::{ScopeKeyError, ScopeKeyResult};
use crate::models::{Comparison, Condition, Scope, SqlValue};
use crate::repositories::Dialect;

const TOKEN_EXPR: &str = "query.id || '-' || query.updated_at";

pub fn quote_identifier(identifier: &str) -> ScopeKeyResult<String> {
    if identifier.is_empty() {
        return Err(ScopeKeyError::QueryConstruction(
            "empty identifier".to_string(),
        ));
    }
    if identifier.contains('\0') {
        return Err(ScopeKeyError::QueryConstruction(format!(
            "identifier {:?} contains a NUL byte",
            identifier
        )));
    }
    Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
}

/// Quotes every part of a dotted name: `public.items` -> `"public"."items"`.
pub fn quote_qualified(name: &str) -> ScopeKeyResult<String> {
    let parts = name
        .split('.')
        .map(quote_identifier)
        .collect::<ScopeKeyResult<Vec<_>>>()?;
    Ok(parts.join("."))
}

pub fn placeholder(dialect: Dialect, index: usize) -> String {
    match dialect {
        Dialect::Postgres => format!("${}", index),
        Dialect::Sqlite => format!("?{}", index),
    }
}

/// The scope as a subquery yielding exactly `id` and `updated_at` per row.
pub fn build_scope_query(dialect: Dialect, scope: &Scope) -> ScopeKeyResult<(String, Vec<SqlValue>)> {
    scope.validate()?;

    let table = quote_qualified(scope.table_name())?;
    let id = quote_identifier(scope.id_column_name())?;
    let updated_at = quote_identifier(scope.updated_at_column_name())?;

    let mut sql = format!(
        "SELECT {table}.{id} AS id, {table}.{updated_at} AS updated_at FROM {table}"
    );
    let mut params = Vec::new();

    let mut predicates = Vec::with_capacity(scope.conditions().len());
    for condition in scope.conditions() {
        predicates.push(render_condition(dialect, &table, condition, &mut params)?);
    }
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    Ok((sql, params))
}

/// One statement that aggregates the scope's tokens and hashes them
/// server-side.
pub fn build_aggregate_query(
    dialect: Dialect,
    scope: &Scope,
) -> ScopeKeyResult<(String, Vec<SqlValue>)> {
    let (inner, params) = build_scope_query(dialect, scope)?;
    let sql = match dialect {
        Dialect::Postgres => format!(
            "SELECT md5(array_agg({tok} ORDER BY ({tok}) COLLATE \"C\")::text) FROM ({inner}) AS query",
            tok = TOKEN_EXPR
        ),
        Dialect::Sqlite => format!(
            "SELECT md5(array_agg({tok})) FROM ({inner}) AS query",
            tok = TOKEN_EXPR
        ),
    };
    Ok((sql, params))
}

fn render_condition(
    dialect: Dialect,
    table: &str,
    condition: &Condition,
    params: &mut Vec<SqlValue>,
) -> ScopeKeyResult<String> {
    let column = format!("{}.{}", table, quote_identifier(&condition.column)?);
    let predicate = match condition.comparison {
        Comparison::IsNull | Comparison::IsNotNull => {
            format!("{} {}", column, condition.comparison.operator())
        }
        // `col = NULL` never holds; compare against NULL the way SQL means it.
        Comparison::Eq if condition.values == [SqlValue::Null] => {
            format!("{} {}", column, Comparison::IsNull.operator())
        }
        Comparison::NotEq if condition.values == [SqlValue::Null] => {
            format!("{} {}", column, Comparison::IsNotNull.operator())
        }
        Comparison::In if condition.values.is_empty() => "1 = 0".to_string(),
        Comparison::In => {
            let placeholders = condition
                .values
                .iter()
                .map(|value| {
                    params.push(value.clone());
                    placeholder(dialect, params.len())
                })
                .collect::<Vec<_>>();
            format!("{} IN ({})", column, placeholders.join(", "))
        }
        _ => {
            params.extend(condition.values.iter().cloned());
            format!(
                "{} {} {}",
                column,
                condition.comparison.operator(),
                placeholder(dialect, params.len())
            )
        }
    };
    Ok(predicate)
}
