use anyhow::{Context as _, Result};
use rusqlite::functions::{Aggregate, Context, FunctionFlags};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ScopeKeyError, ScopeKeyResult};
use crate::models::SqlValue;
use crate::repositories::{Dialect, ScalarStore};
use crate::utils::{md5_hex, render_array_text};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            SqlValue::Real(value) => ToSqlOutput::Owned(Value::Real(*value)),
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

/// SQLite connection with `md5` and `array_agg` installed, matching the
/// PostgreSQL built-ins the aggregate statement relies on.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create sqlite database directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open sqlite database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn).context("Failed to register scope key SQL functions")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ScalarStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn select_value(&self, sql: &str, params: &[SqlValue]) -> ScopeKeyResult<Option<String>> {
        debug!(sql, params = params.len(), "running scalar query on sqlite");
        let mut stmt = self.conn.prepare(sql).map_err(classify_prepare_error)?;
        let value = stmt
            .query_row(params_from_iter(params.iter()), |row| {
                row.get::<_, Option<String>>(0)
            })
            .map_err(ScopeKeyError::store)?;
        Ok(value)
    }
}

/// Only a plain `SQLITE_ERROR` says something about the statement itself; busy,
/// locked, I/O and corruption codes come from the store.
fn classify_prepare_error(err: rusqlite::Error) -> ScopeKeyError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::Unknown =>
        {
            if message.starts_with("no such function") {
                warn!("sqlite connection is missing scope key functions: {}", message);
                ScopeKeyError::AggregationUnsupported(message.clone())
            } else {
                ScopeKeyError::QueryConstruction(err.to_string())
            }
        }
        _ => ScopeKeyError::store(err),
    }
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "md5",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(bytes_of(ctx.get_raw(0)).map(|bytes| md5_hex(&bytes))),
    )?;
    conn.create_aggregate_function("array_agg", 1, FunctionFlags::SQLITE_UTF8, ArrayAgg)?;
    Ok(())
}

fn bytes_of(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
    }
}

/// Collects its argument per row and finishes with the sorted array text, or
/// NULL when no row was seen.
struct ArrayAgg;

impl Aggregate<Vec<Option<String>>, Option<String>> for ArrayAgg {
    fn init(&self, _ctx: &mut Context<'_>) -> rusqlite::Result<Vec<Option<String>>> {
        Ok(Vec::new())
    }

    fn step(&self, ctx: &mut Context<'_>, tokens: &mut Vec<Option<String>>) -> rusqlite::Result<()> {
        let token = bytes_of(ctx.get_raw(0)).map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        tokens.push(token);
        Ok(())
    }

    fn finalize(
        &self,
        _ctx: &mut Context<'_>,
        tokens: Option<Vec<Option<String>>>,
    ) -> rusqlite::Result<Option<String>> {
        Ok(tokens.map(render_array_text))
    }
}
